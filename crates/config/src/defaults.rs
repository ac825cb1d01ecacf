use std::collections::HashMap;

use crate::ProviderConfig;

pub const DEFAULT_QUOTE_BASE_URL: &str = "https://brapi.dev";
pub const DEFAULT_CHAIN_BASE_URL: &str = "https://api.oplab.com.br";

pub fn default_enabled() -> bool {
    true
}

pub fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub fn default_http_port() -> u16 {
    8000
}

pub fn default_request_timeout_secs() -> u64 {
    35
}

pub fn default_quote_provider() -> ProviderConfig {
    ProviderConfig {
        base_url: DEFAULT_QUOTE_BASE_URL.to_string(),
        token: None,
        timeout_secs: 10,
        retry: Default::default(),
    }
}

pub fn default_chain_provider() -> ProviderConfig {
    ProviderConfig {
        base_url: DEFAULT_CHAIN_BASE_URL.to_string(),
        token: None,
        timeout_secs: 15,
        retry: Default::default(),
    }
}

pub fn default_max_retries() -> u32 {
    3
}

pub fn default_backoff_factor() -> f64 {
    1.0
}

pub fn default_status_forcelist() -> Vec<u16> {
    vec![429, 500, 502, 503, 504]
}

pub fn default_max_connections() -> u32 {
    20
}

pub fn default_storage_timeout_secs() -> u64 {
    15
}

pub fn default_risk_free_rate() -> f64 {
    0.1275
}

pub fn default_risk_free_rates() -> HashMap<String, f64> {
    HashMap::from([("BRL".to_string(), default_risk_free_rate())])
}

pub fn default_cdi_monthly() -> f64 {
    0.85
}

pub fn default_ir_rate() -> f64 {
    0.15
}

pub fn default_wall_band() -> f64 {
    0.15
}

pub fn default_bucket_size() -> f64 {
    0.5
}

pub fn default_moneyness_band() -> f64 {
    0.05
}

pub fn default_dealer_short_ratio() -> f64 {
    1.0
}

pub fn default_cache_ttl_secs() -> u64 {
    60
}

pub fn default_parallelism() -> usize {
    5
}

pub fn default_log_format() -> String {
    "pretty".to_string()
}
