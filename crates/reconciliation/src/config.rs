//! Engine configuration.

use serde::{Deserialize, Serialize};

use dispas_core::{Address, Asset, Denomination, MAX_DECIMALS};

/// What a payment form settles in and how amounts are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Funding asset for every settlement from this engine.
    pub asset: Asset,
    /// Decimals and symbol of `asset`.
    pub denomination: Denomination,
    /// Secondary display currency (e.g. "USD").
    pub fiat_symbol: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            asset: Asset::Native,
            denomination: Denomination::default(),
            fiat_symbol: "USD".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load from `DISPAS_ASSET`, `DISPAS_DECIMALS`, `DISPAS_SYMBOL` and
    /// `DISPAS_FIAT_SYMBOL`, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`EngineConfig::from_env`] with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("DISPAS_ASSET") {
            match raw.trim() {
                "" | "native" => {}
                addr => match addr.parse::<Address>() {
                    Ok(token) => config.asset = Asset::Token(token),
                    Err(err) => tracing::warn!(value = %raw, error = %err, "DISPAS_ASSET invalid; using native"),
                },
            }
        }

        if let Some(raw) = lookup("DISPAS_DECIMALS") {
            match raw.trim().parse::<u8>() {
                Ok(d) if d <= MAX_DECIMALS => config.denomination.decimals = d,
                _ => tracing::warn!(
                    value = %raw,
                    default = config.denomination.decimals,
                    "DISPAS_DECIMALS invalid; using default"
                ),
            }
        }

        if let Some(symbol) = lookup("DISPAS_SYMBOL").filter(|s| !s.trim().is_empty()) {
            config.denomination.symbol = symbol.trim().to_string();
        }

        if let Some(symbol) = lookup("DISPAS_FIAT_SYMBOL").filter(|s| !s.trim().is_empty()) {
            config.fiat_symbol = symbol.trim().to_string();
        }

        config
    }

    pub fn decimals(&self) -> u8 {
        self.denomination.decimals
    }
}
