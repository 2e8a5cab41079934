//! Narrow interfaces to the outside world.
//!
//! The engine never talks to a wallet, a price API or a profile index
//! directly; it goes through these traits so each can be swapped or faked.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use dispas_core::{Address, Amount, Asset, PaymentBatch, TxId};

use crate::error::{ResolveError, SubmitError};

/// A transaction the engine wants signed and sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TxIntent {
    /// Plain transfer to a single recipient, bypassing the distributor.
    Transfer {
        asset: Asset,
        to: Address,
        amount: Amount,
    },
    /// Native batch; `value` is attached to the call.
    DistributeFunds { payments: PaymentBatch, value: Amount },
    /// Token batch pulled through the distributor's allowance.
    DistributeTokens { token: Address, payments: PaymentBatch },
    /// Grant the distributor an allowance of `amount` on `token`.
    Approve { token: Address, amount: Amount },
}

impl TxIntent {
    pub fn kind(&self) -> &'static str {
        match self {
            TxIntent::Transfer { .. } => "transfer",
            TxIntent::DistributeFunds { .. } => "distribute_funds",
            TxIntent::DistributeTokens { .. } => "distribute_tokens",
            TxIntent::Approve { .. } => "approve",
        }
    }
}

/// Reference to a submitted transaction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHandle {
    pub tx_id: TxId,
}

/// Signs and sends transactions. No retries: a failure is final for this attempt.
pub trait TransactionSubmitter {
    fn submit(&mut self, sender: Address, intent: &TxIntent) -> Result<TxHandle, SubmitError>;
}

/// Reads the allowance `owner` has granted the distributor on `token`.
pub trait AllowanceProvider {
    fn allowance(&self, token: Address, owner: Address) -> Result<Amount, SubmitError>;
}

/// Result of asking for the current exchange rate.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PriceQuote {
    /// Fiat per whole native unit.
    Rate(Decimal),
    /// No rate yet; ask again later.
    Pending,
}

pub trait PriceFeed {
    fn fetch_price(&mut self) -> PriceQuote;
}

/// A resolvable recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub address: Address,
    pub display_name: Option<String>,
}

/// Name → address lookup.
pub trait ProfileResolver {
    fn search(&self, query: &str) -> Result<Vec<Profile>, ResolveError>;
}
