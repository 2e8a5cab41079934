//! Secondary-currency conversion.
//!
//! Fiat values are display aids only. Conversions into the settlement asset
//! round toward zero to whole base units; conversions for display round to
//! cents.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use dispas_core::Amount;

use crate::error::EngineError;

/// Which unit the user is currently typing in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayCurrency {
    #[default]
    Native,
    Fiat,
}

impl DisplayCurrency {
    pub fn toggled(self) -> Self {
        match self {
            DisplayCurrency::Native => DisplayCurrency::Fiat,
            DisplayCurrency::Fiat => DisplayCurrency::Native,
        }
    }
}

/// Parse a non-negative fiat amount such as `"12.50"`.
pub fn parse_fiat(input: &str) -> Result<Decimal, EngineError> {
    let raw = input.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return Err(EngineError::invalid_amount(input));
    }
    Decimal::from_str_exact(raw).map_err(|e| EngineError::invalid_amount(format!("{input}: {e}")))
}

/// Check a quoted rate (fiat per whole native unit).
pub fn validate_rate(rate: Decimal) -> Result<Decimal, EngineError> {
    if rate <= Decimal::ZERO {
        return Err(EngineError::InvalidRate(rate.to_string()));
    }
    Ok(rate)
}

/// `fiat / rate`, floored to whole base units.
pub fn fiat_to_native(fiat: Decimal, rate: Decimal, decimals: u8) -> Result<Amount, EngineError> {
    let native = fiat
        .checked_div(rate)
        .ok_or_else(|| EngineError::invalid_amount(format!("{fiat} out of range")))?
        .round_dp_with_strategy(decimals as u32, RoundingStrategy::ToZero);

    let mantissa = u128::try_from(native.mantissa())
        .map_err(|_| EngineError::invalid_amount(format!("{fiat} is negative")))?;
    let missing_scale = (decimals as u32).saturating_sub(native.scale());

    10u128
        .checked_pow(missing_scale)
        .and_then(|factor| mantissa.checked_mul(factor))
        .map(Amount::from_units)
        .ok_or_else(|| EngineError::invalid_amount(format!("{fiat} out of range")))
}

/// `native * rate`, rounded to cents. `None` if the value cannot be represented.
pub fn native_to_fiat(amount: Amount, rate: Decimal, decimals: u8) -> Option<Decimal> {
    let units = i128::try_from(amount.units()).ok()?;
    let native = Decimal::try_from_i128_with_scale(units, decimals as u32).ok()?;
    native.checked_mul(rate).map(|fiat| fiat.round_dp(2))
}
