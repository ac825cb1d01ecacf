//! Risk-free rate lookup

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default continuously compounded rate for BRL underlyings
pub const DEFAULT_BRL_RATE: f64 = 0.1275;

/// Risk-free rates keyed by currency code, with a fallback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFreeRates {
    pub default: f64,
    #[serde(default)]
    pub by_currency: HashMap<String, f64>,
}

impl RiskFreeRates {
    pub fn new(default: f64) -> Self {
        Self {
            default,
            by_currency: HashMap::new(),
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>, rate: f64) -> Self {
        self.by_currency.insert(currency.into().to_uppercase(), rate);
        self
    }

    /// Rate for a currency hint, falling back to the default
    pub fn for_currency(&self, currency: &str) -> f64 {
        self.by_currency
            .get(&currency.to_uppercase())
            .copied()
            .unwrap_or(self.default)
    }
}

impl Default for RiskFreeRates {
    fn default() -> Self {
        Self::new(DEFAULT_BRL_RATE).with_currency("BRL", DEFAULT_BRL_RATE)
    }
}
