//! Configuration for Opflow
//!
//! A single YAML document describes the server, the upstream providers,
//! storage and the analytics knobs. Every section is optional; missing
//! fields take the defaults in [`defaults`].
//!
//! Loading goes file -> `${VAR}` substitution -> `serde_yaml` -> env overrides,
//! see [`load_config`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod defaults;
pub mod parser;
pub mod substitution;
pub mod validator;

pub use defaults::*;
pub use parser::*;
pub use substitution::*;
pub use validator::*;

/// Root configuration document
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct OpflowConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    /// Named symbol lists usable as `list_name` in batch screening
    #[serde(default)]
    pub ticker_lists: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Upstream market data providers
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProvidersConfig {
    /// Spot quotes and daily history
    #[serde(default = "default_quote_provider")]
    pub quote: ProviderConfig,
    /// Option chains
    #[serde(default = "default_chain_provider")]
    pub chain: ProviderConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            quote: default_quote_provider(),
            chain: default_chain_provider(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProviderConfig {
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub timeout_secs: u64,
    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Sleep before retry `n` is `backoff_factor * 2^(n-1)` seconds
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    #[serde(default = "default_status_forcelist")]
    pub status_forcelist: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_factor: default_backoff_factor(),
            status_forcelist: default_status_forcelist(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Postgres URL; snapshots stay in memory when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_storage_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_enabled")]
    pub run_migrations: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: default_max_connections(),
            timeout_secs: default_storage_timeout_secs(),
            run_migrations: default_enabled(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AnalyticsConfig {
    /// Annual rate used when a currency has no entry in `risk_free_rates`
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: f64,
    #[serde(default = "default_risk_free_rates")]
    pub risk_free_rates: HashMap<String, f64>,
    /// Monthly CDI in percent
    #[serde(default = "default_cdi_monthly")]
    pub cdi_monthly: f64,
    #[serde(default = "default_ir_rate")]
    pub ir_rate: f64,
    #[serde(default = "default_wall_band")]
    pub wall_band: f64,
    #[serde(default = "default_bucket_size")]
    pub bucket_size: f64,
    #[serde(default = "default_moneyness_band")]
    pub moneyness_band: f64,
    #[serde(default = "default_dealer_short_ratio")]
    pub dealer_short_ratio: f64,
    #[serde(default)]
    pub keep_for_flow: bool,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: default_risk_free_rate(),
            risk_free_rates: default_risk_free_rates(),
            cdi_monthly: default_cdi_monthly(),
            ir_rate: default_ir_rate(),
            wall_band: default_wall_band(),
            bucket_size: default_bucket_size(),
            moneyness_band: default_moneyness_band(),
            dealer_short_ratio: default_dealer_short_ratio(),
            keep_for_flow: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BatchConfig {
    /// Tickers screened concurrently
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            parallelism: default_parallelism(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// One of `pretty`, `json`, `compact`
    #[serde(default = "default_log_format")]
    pub log_format: String,
    /// Prometheus exporter port; no exporter when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_port: Option<u16>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: default_log_format(),
            metrics_port: None,
        }
    }
}
