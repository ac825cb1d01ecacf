//! Runtime knobs for the orchestrator

use analytics::{GammaConfig, NormalizerConfig, ScreenerParams};
use pricing::RiskFreeRates;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub quote_timeout: Duration,
    pub chain_timeout: Duration,
    pub storage_timeout: Duration,
    /// Spot and chain memoization window
    pub cache_ttl: Duration,
    /// Tickers screened concurrently in a batch
    pub batch_parallelism: usize,
    /// Risk-free rate per quote currency
    pub rates: RiskFreeRates,
    pub normalizer: NormalizerConfig,
    pub gamma: GammaConfig,
    /// Defaults for screener fields a request leaves out
    pub screener: ScreenerParams,
    /// History window for realized volatility in gamma analysis
    pub default_days_back: u32,
    /// Named ticker lists for batch screening
    pub ticker_lists: HashMap<String, Vec<String>>,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            quote_timeout: Duration::from_secs(10),
            chain_timeout: Duration::from_secs(15),
            storage_timeout: Duration::from_secs(15),
            cache_ttl: Duration::from_secs(60),
            batch_parallelism: 5,
            rates: RiskFreeRates::default(),
            normalizer: NormalizerConfig::default(),
            gamma: GammaConfig::default(),
            screener: ScreenerParams::default(),
            default_days_back: 30,
            ticker_lists: HashMap::new(),
        }
    }
}

impl OrchestratorSettings {
    /// Normalizer settings with the rate for a quote currency
    pub fn normalizer_for(&self, currency: &str) -> NormalizerConfig {
        NormalizerConfig {
            risk_free_rate: self.rates.for_currency(currency),
            ..self.normalizer.clone()
        }
    }
}
