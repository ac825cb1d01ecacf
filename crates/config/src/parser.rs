use crate::*;
use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::Path;
use tracing::{debug, info, instrument};

pub const ENV_QUOTE_TOKEN: &str = "OPFLOW_QUOTE_TOKEN";
pub const ENV_CHAIN_TOKEN: &str = "OPFLOW_CHAIN_TOKEN";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_RISK_FREE_RATE: &str = "OPFLOW_RISK_FREE_RATE";
pub const ENV_CDI_MONTHLY: &str = "OPFLOW_CDI_MONTHLY";
pub const ENV_WALL_BAND: &str = "OPFLOW_WALL_BAND";
pub const ENV_BUCKET_SIZE: &str = "OPFLOW_BUCKET_SIZE";
pub const ENV_MONEYNESS_BAND: &str = "OPFLOW_MONEYNESS_BAND";

#[instrument(skip(path))]
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<OpflowConfig> {
    let path = path.as_ref();
    info!("Loading configuration from: {:?}", path);

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    debug!("Config file content length: {} bytes", content.len());

    let substituted = substitution::substitute_env_vars(&content)?;
    debug!("Environment variable substitution completed");

    let mut config: OpflowConfig = serde_yaml::from_str(&substituted)
        .with_context(|| "Failed to parse YAML configuration")?;

    apply_env_overrides(&mut config)?;

    info!("Configuration loaded successfully");
    Ok(config)
}

/// Configuration from defaults plus environment, for running without a file
pub fn config_from_env() -> Result<OpflowConfig> {
    let mut config = generate_default_config();
    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Apply the `OPFLOW_*` and `DATABASE_URL` variables on top of the file
pub fn apply_env_overrides(config: &mut OpflowConfig) -> Result<()> {
    apply_overrides_with(config, |name| env::var(name).ok())
}

pub fn apply_overrides_with<F>(config: &mut OpflowConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let text = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
    let number = |name: &str| -> Result<Option<f64>> {
        text(name)
            .map(|raw| {
                raw.trim()
                    .parse::<f64>()
                    .with_context(|| format!("{} must be a number, got {:?}", name, raw))
            })
            .transpose()
    };

    if let Some(token) = text(ENV_QUOTE_TOKEN) {
        config.providers.quote.token = Some(token);
    }
    if let Some(token) = text(ENV_CHAIN_TOKEN) {
        config.providers.chain.token = Some(token);
    }
    if let Some(url) = text(ENV_DATABASE_URL) {
        config.storage.database_url = Some(url);
    }

    if let Some(rate) = number(ENV_RISK_FREE_RATE)? {
        debug!(rate, "Risk-free rate overridden from environment");
        config.analytics.risk_free_rate = rate;
        config.analytics.risk_free_rates.insert("BRL".to_string(), rate);
    }
    if let Some(cdi) = number(ENV_CDI_MONTHLY)? {
        config.analytics.cdi_monthly = cdi;
    }
    if let Some(band) = number(ENV_WALL_BAND)? {
        config.analytics.wall_band = band;
    }
    if let Some(size) = number(ENV_BUCKET_SIZE)? {
        config.analytics.bucket_size = size;
    }
    if let Some(band) = number(ENV_MONEYNESS_BAND)? {
        config.analytics.moneyness_band = band;
    }

    Ok(())
}

#[instrument]
pub fn generate_default_config() -> OpflowConfig {
    let mut config = OpflowConfig::default();
    config.ticker_lists.insert(
        "ibov_liquid".to_string(),
        ["PETR4", "VALE3", "ITUB4", "BBDC4", "BBAS3", "B3SA3", "ABEV3", "BOVA11"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    );
    config
}

#[instrument(skip(config))]
pub fn save_config<P: AsRef<Path> + std::fmt::Debug>(config: &OpflowConfig, path: P) -> Result<()> {
    let path = path.as_ref();
    info!("Saving configuration to: {:?}", path);

    let yaml = serde_yaml::to_string(config)
        .with_context(|| "Failed to serialize configuration to YAML")?;

    fs::write(path, yaml)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    info!("Configuration saved successfully");
    Ok(())
}
