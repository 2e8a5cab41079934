//! Engine and collaborator errors.

use thiserror::Error;

use dispas_core::{Address, Amount, ParseError};
use dispas_ledger::LedgerError;

/// Why a transition or a settlement attempt was refused.
///
/// Every variant except [`EngineError::Ledger`] and
/// [`EngineError::SettlementFailed`] is detected locally, before anything is
/// submitted. A refused transition never changes engine state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("recipient {0} already added")]
    DuplicateRecipient(Address),

    #[error("recipient {0} is not in the list")]
    UnknownRecipient(Address),

    /// Total does not equal the sum of the recipient amounts.
    #[error("total {total} does not match sum of payments {sum}")]
    Unbalanced { total: Amount, sum: Amount },

    /// Zero, missing or unparseable amount.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("no recipients")]
    NoRecipients,

    #[error("no change to gift")]
    NoChange,

    #[error("a settlement is already in flight")]
    SettlementInFlight,

    #[error("no settlement in flight")]
    NoSettlementInFlight,

    /// Secondary-currency input or display needs an exchange rate.
    #[error("exchange rate not available yet")]
    RateUnavailable,

    #[error("invalid exchange rate: {0}")]
    InvalidRate(String),

    #[error("wallet not connected")]
    WalletNotConnected,

    /// Revert reason reported by the ledger, unchanged.
    #[error("ledger rejected settlement: {0}")]
    Ledger(LedgerError),

    /// Opaque failure from the transaction submitter.
    #[error("settlement failed: {0}")]
    SettlementFailed(String),
}

impl EngineError {
    pub fn invalid_amount(msg: impl Into<String>) -> Self {
        Self::InvalidAmount(msg.into())
    }
}

impl From<ParseError> for EngineError {
    fn from(value: ParseError) -> Self {
        Self::InvalidAmount(value.to_string())
    }
}

/// Failure reported by a transaction submitter or allowance source.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// The ledger reverted the transaction.
    #[error("reverted: {0}")]
    Rejected(LedgerError),

    /// The submitter could not be reached or is not ready.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// The user or wallet declined to sign.
    #[error("declined: {0}")]
    Declined(String),
}

impl From<SubmitError> for EngineError {
    fn from(value: SubmitError) -> Self {
        match value {
            SubmitError::Rejected(err) => EngineError::Ledger(err),
            other => EngineError::SettlementFailed(other.to_string()),
        }
    }
}

/// Failure reported by a profile resolver.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("lookup failed: {0}")]
    Failed(String),
}
