//! Fixed-point amounts in smallest indivisible units.
//!
//! An [`Amount`] is an unsigned integer count of base units (wei-like). Decimal
//! strings are converted with an explicit number of decimals; nothing here uses
//! floating point and nothing rounds silently.

use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ParseError;
use crate::value_object::ValueObject;

/// Largest supported number of decimals (10^38 still fits in a `u128`).
pub const MAX_DECIMALS: u8 = 38;

/// Non-negative amount of base units.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Amount(u128);

impl ValueObject for Amount {}

/// Outcome of dividing an amount evenly between `count` parts.
///
/// `share * count + remainder == total` and `remainder < count` always hold.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EvenSplit {
    pub share: Amount,
    pub distributed: Amount,
    pub remainder: Amount,
}

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_units(units: u128) -> Self {
        Self(units)
    }

    pub const fn units(&self) -> u128 {
        self.0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn saturating_add(self, other: Amount) -> Amount {
        Amount(self.0.saturating_add(other.0))
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    pub fn saturating_sub(self, other: Amount) -> Amount {
        Amount(self.0.saturating_sub(other.0))
    }

    pub fn checked_mul(self, factor: u128) -> Option<Amount> {
        self.0.checked_mul(factor).map(Amount)
    }

    /// Checked sum of a sequence of amounts. `None` on overflow.
    pub fn checked_sum<I>(amounts: I) -> Option<Amount>
    where
        I: IntoIterator<Item = Amount>,
    {
        amounts
            .into_iter()
            .try_fold(Amount::ZERO, |acc, a| acc.checked_add(a))
    }

    /// Floor-divide between `count` parts. Returns `None` when `count == 0`.
    pub fn split_evenly(self, count: usize) -> Option<EvenSplit> {
        if count == 0 {
            return None;
        }
        let count = count as u128;
        let share = self.0 / count;
        let distributed = share * count;
        Some(EvenSplit {
            share: Amount(share),
            distributed: Amount(distributed),
            remainder: Amount(self.0 - distributed),
        })
    }

    /// Parse a decimal string such as `"1.75"` into base units.
    ///
    /// Accepts `digits`, `digits.digits`, `.digits` and `digits.`. Rejects signs,
    /// exponents, separators and any fractional digits beyond `decimals`.
    pub fn parse(input: &str, decimals: u8) -> Result<Amount, ParseError> {
        if decimals > MAX_DECIMALS {
            return Err(ParseError::overflow(format!("{decimals} decimals")));
        }

        let raw = input.trim();
        let (int_part, frac_part) = match raw.split_once('.') {
            Some((i, f)) => (i, f),
            None => (raw, ""),
        };

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(ParseError::invalid_amount(input));
        }
        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(int_part) || !all_digits(frac_part) {
            return Err(ParseError::invalid_amount(input));
        }
        if frac_part.len() > decimals as usize {
            return Err(ParseError::TooPrecise {
                input: input.to_string(),
                decimals,
            });
        }

        let scale = pow10(decimals);
        let whole = parse_digits(int_part).ok_or_else(|| ParseError::overflow(input))?;
        let frac = parse_digits(frac_part).ok_or_else(|| ParseError::overflow(input))?;
        let frac_scale = pow10(decimals - frac_part.len() as u8);

        whole
            .checked_mul(scale)
            .and_then(|w| w.checked_add(frac * frac_scale))
            .map(Amount)
            .ok_or_else(|| ParseError::overflow(input))
    }

    /// Shortest exact decimal rendering, e.g. `1.75`, `0.33`, `0`.
    pub fn format(&self, decimals: u8) -> String {
        let decimals = decimals.min(MAX_DECIMALS);
        let scale = pow10(decimals);
        let whole = self.0 / scale;
        let frac = self.0 % scale;
        if frac == 0 {
            return whole.to_string();
        }
        let padded = format!("{:0width$}", frac, width = decimals as usize);
        format!("{whole}.{}", padded.trim_end_matches('0'))
    }
}

fn pow10(exp: u8) -> u128 {
    10u128.pow(exp as u32)
}

fn parse_digits(digits: &str) -> Option<u128> {
    if digits.is_empty() {
        return Some(0);
    }
    digits.parse::<u128>().ok()
}

impl core::fmt::Display for Amount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<u128> for Amount {
    fn from(units: u128) -> Self {
        Self(units)
    }
}

impl From<u64> for Amount {
    fn from(units: u64) -> Self {
        Self(units as u128)
    }
}

/// Parses a plain integer count of base units.
impl FromStr for Amount {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Amount::parse(s, 0)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Unit in which amounts of one asset are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Denomination {
    pub decimals: u8,
    pub symbol: String,
}

impl Denomination {
    pub fn new(decimals: u8, symbol: impl Into<String>) -> Self {
        Self {
            decimals,
            symbol: symbol.into(),
        }
    }

    pub fn parse(&self, input: &str) -> Result<Amount, ParseError> {
        Amount::parse(input, self.decimals)
    }

    pub fn format(&self, amount: Amount) -> String {
        amount.format(self.decimals)
    }
}

impl Default for Denomination {
    fn default() -> Self {
        Self::new(18, "LYX")
    }
}
