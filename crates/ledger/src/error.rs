//! Ledger revert reasons.

use thiserror::Error;

use dispas_core::{Address, Amount, PaymentViolation};

/// Why a ledger transaction reverted.
///
/// A reverted transaction leaves every balance, allowance and the event log
/// exactly as they were.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// A payment (or transfer) targets the null address.
    #[error("payment {index} targets the zero address")]
    ZeroAddress { index: usize },

    /// A payment (or transfer) moves zero units.
    #[error("payment {index} has a zero amount")]
    ZeroAmount { index: usize },

    /// Native value sent does not match the batch sum exactly.
    #[error("value sent ({sent}) does not equal the batch total ({required})")]
    InsufficientValue { sent: Amount, required: Amount },

    /// Token allowance granted to the distributor is below the batch sum.
    #[error("allowance ({allowed}) is below the batch total ({required})")]
    InsufficientAllowance { allowed: Amount, required: Amount },

    /// The paying account does not hold enough of the asset.
    #[error("balance of {account} ({available}) is below {required}")]
    InsufficientBalance {
        account: Address,
        available: Amount,
        required: Amount,
    },

    /// Bare value transfers to the distributor are not accepted.
    #[error("direct transfers to the distributor are rejected")]
    DirectTransferRejected,

    #[error("unknown token contract {0}")]
    UnknownToken(Address),

    #[error("token contract {0} already deployed")]
    TokenAlreadyDeployed(Address),

    /// A sum or balance would exceed the representable range.
    #[error("arithmetic overflow")]
    Overflow,
}

impl LedgerError {
    pub(crate) fn from_violation(index: usize, violation: PaymentViolation) -> Self {
        match violation {
            PaymentViolation::ZeroAddress => Self::ZeroAddress { index },
            PaymentViolation::ZeroAmount => Self::ZeroAmount { index },
        }
    }

    /// Short stable name, as a contract's custom error would carry.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ZeroAddress { .. } => "ZeroAddress",
            Self::ZeroAmount { .. } => "ZeroAmount",
            Self::InsufficientValue { .. } => "InsufficientValue",
            Self::InsufficientAllowance { .. } => "InsufficientAllowance",
            Self::InsufficientBalance { .. } => "InsufficientBalance",
            Self::DirectTransferRejected => "DirectTransferRejected",
            Self::UnknownToken(_) => "UnknownToken",
            Self::TokenAlreadyDeployed(_) => "TokenAlreadyDeployed",
            Self::Overflow => "Overflow",
        }
    }
}
