//! 20-byte account addresses.

use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ParseError;
use crate::value_object::ValueObject;

/// A 20-byte account identifier.
///
/// Addresses are compared by their bytes, so two textual forms that differ only
/// in hex letter case are the same address.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; 20]);

impl ValueObject for Address {}

impl Address {
    /// The null address. Never a valid payment recipient.
    pub const ZERO: Address = Address([0u8; 20]);

    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Shortened form for display, e.g. `0x1234...5678`.
    pub fn truncated(&self) -> String {
        let full = self.to_string();
        format!("{}...{}", &full[..6], &full[full.len() - 4..])
    }

    /// First four hex characters without the `0x` prefix.
    pub fn short_tag(&self) -> String {
        hex::encode(&self.0[..2])
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl core::fmt::Display for Address {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| ParseError::invalid_address(s))?;

        if digits.len() != 40 {
            return Err(ParseError::invalid_address(s));
        }

        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes).map_err(|_| ParseError::invalid_address(s))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "0x1234567890abcdef1234567890abcdef12345678";

    #[test]
    fn parses_mixed_case_as_same_address() {
        let lower: Address = SAMPLE.parse().unwrap();
        let upper: Address = "0x1234567890ABCDEF1234567890ABCDEF12345678".parse().unwrap();
        assert_eq!(lower, upper);
        assert_eq!(upper.to_string(), SAMPLE);
    }

    #[test]
    fn rejects_malformed_input() {
        for bad in [
            "",
            "1234567890abcdef1234567890abcdef12345678",
            "0x1234",
            "0x1234567890abcdef1234567890abcdef1234567g",
            "0x1234567890abcdef1234567890abcdef123456789",
        ] {
            assert!(matches!(
                bad.parse::<Address>(),
                Err(ParseError::InvalidAddress(_))
            ));
        }
    }

    #[test]
    fn zero_address_is_detected() {
        let zero: Address = "0x0000000000000000000000000000000000000000".parse().unwrap();
        assert!(zero.is_zero());
        assert_eq!(zero, Address::ZERO);
    }

    #[test]
    fn display_helpers() {
        let addr: Address = SAMPLE.parse().unwrap();
        assert_eq!(addr.truncated(), "0x1234...5678");
        assert_eq!(addr.short_tag(), "1234");
    }

    #[test]
    fn serde_uses_hex_string() {
        let addr: Address = SAMPLE.parse().unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{SAMPLE}\""));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
