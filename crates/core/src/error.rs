//! Parse errors for the shared value types.

use thiserror::Error;

/// Failure to turn user or wire input into a typed value.
///
/// Parsing never truncates or guesses: any input that cannot be represented
/// exactly is rejected with one of these variants.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Not a `0x`-prefixed, 40 hex digit address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Not a plain non-negative decimal number.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// More fractional digits than the denomination can represent.
    #[error("too many decimal places in {input} (max {decimals})")]
    TooPrecise { input: String, decimals: u8 },

    /// An identifier was malformed.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Value does not fit into the amount range.
    #[error("amount out of range: {0}")]
    Overflow(String),
}

impl ParseError {
    pub fn invalid_address(msg: impl Into<String>) -> Self {
        Self::InvalidAddress(msg.into())
    }

    pub fn invalid_amount(msg: impl Into<String>) -> Self {
        Self::InvalidAmount(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn overflow(msg: impl Into<String>) -> Self {
        Self::Overflow(msg.into())
    }
}
