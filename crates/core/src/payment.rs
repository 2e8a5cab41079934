//! Payments, batches and funding sources.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::amount::Amount;
use crate::value_object::ValueObject;

/// One transfer of `amount` base units to `recipient`.
///
/// Construction is unchecked so that a ledger can receive and reject malformed
/// input; [`Payment::violation`] reports the first broken rule.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Payment {
    pub recipient: Address,
    pub amount: Amount,
}

impl ValueObject for Payment {}

/// Rule broken by a single payment entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PaymentViolation {
    ZeroAddress,
    ZeroAmount,
}

impl Payment {
    pub fn new(recipient: Address, amount: Amount) -> Self {
        Self { recipient, amount }
    }

    /// Recipient is checked before amount.
    pub fn violation(&self) -> Option<PaymentViolation> {
        if self.recipient.is_zero() {
            Some(PaymentViolation::ZeroAddress)
        } else if self.amount.is_zero() {
            Some(PaymentViolation::ZeroAmount)
        } else {
            None
        }
    }
}

/// Ordered payments submitted in one settlement call.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentBatch(Vec<Payment>);

impl PaymentBatch {
    pub fn new(payments: Vec<Payment>) -> Self {
        Self(payments)
    }

    pub fn payments(&self) -> &[Payment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Payment> {
        self.0.iter()
    }

    /// Sum of all amounts; `None` if it overflows.
    pub fn total(&self) -> Option<Amount> {
        Amount::checked_sum(self.0.iter().map(|p| p.amount))
    }

    /// First violation in sequence order, with its index.
    pub fn first_violation(&self) -> Option<(usize, PaymentViolation)> {
        self.0
            .iter()
            .enumerate()
            .find_map(|(i, p)| p.violation().map(|v| (i, v)))
    }

    pub fn into_inner(self) -> Vec<Payment> {
        self.0
    }
}

impl From<Vec<Payment>> for PaymentBatch {
    fn from(payments: Vec<Payment>) -> Self {
        Self(payments)
    }
}

impl<'a> IntoIterator for &'a PaymentBatch {
    type Item = &'a Payment;
    type IntoIter = core::slice::Iter<'a, Payment>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// What is being moved: the chain's native currency or a fungible token.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "contract")]
pub enum Asset {
    Native,
    Token(Address),
}

impl core::fmt::Display for Asset {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Asset::Native => f.write_str("native"),
            Asset::Token(addr) => write!(f, "token:{addr}"),
        }
    }
}

/// How a batch is paid for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum FundingSource {
    /// Value attached to the call; must equal the batch sum exactly.
    Native { value: Amount },
    /// Allowance granted to the ledger on `contract`; must cover the batch sum.
    Token { contract: Address, allowance: Amount },
}

impl FundingSource {
    pub fn asset(&self) -> Asset {
        match self {
            FundingSource::Native { .. } => Asset::Native,
            FundingSource::Token { contract, .. } => Asset::Token(*contract),
        }
    }

    /// Whether this funding can pay for `batch_total`.
    pub fn covers(&self, batch_total: Amount) -> bool {
        match self {
            FundingSource::Native { value } => *value == batch_total,
            FundingSource::Token { allowance, .. } => *allowance >= batch_total,
        }
    }
}
