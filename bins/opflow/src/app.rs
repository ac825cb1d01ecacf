//! Component wiring from an [`OpflowConfig`]

use analytics::{GammaConfig, NormalizerConfig, ScreenerParams};
use anyhow::{Context, Result};
use async_trait::async_trait;
use config::{OpflowConfig, ProviderConfig, StorageConfig};
use market_data::{
    BrapiQuoteSource, OplabChainSource, OptionChainSource, QuoteSource, RetryPolicy, UpstreamConfig,
};
use orchestrator::{Orchestrator, OrchestratorSettings};
use pricing::RiskFreeRates;
use server::HealthProbe;
use std::sync::Arc;
use std::time::Duration;
use storage::{InMemorySnapshotStore, SnapshotStore};
use tracing::info;

/// Map the file layout onto the orchestrator's runtime knobs
pub fn orchestrator_settings(config: &OpflowConfig) -> OrchestratorSettings {
    let analytics = &config.analytics;
    let rates = analytics
        .risk_free_rates
        .iter()
        .fold(RiskFreeRates::new(analytics.risk_free_rate), |rates, (currency, rate)| {
            rates.with_currency(currency.clone(), *rate)
        });

    OrchestratorSettings {
        quote_timeout: Duration::from_secs(config.providers.quote.timeout_secs),
        chain_timeout: Duration::from_secs(config.providers.chain.timeout_secs),
        storage_timeout: Duration::from_secs(config.storage.timeout_secs),
        cache_ttl: Duration::from_secs(config.cache.ttl_secs),
        batch_parallelism: config.batch.parallelism.max(1),
        rates,
        normalizer: NormalizerConfig {
            moneyness_band: analytics.moneyness_band,
            risk_free_rate: analytics.risk_free_rate,
            keep_for_flow: analytics.keep_for_flow,
        },
        gamma: GammaConfig {
            bucket_size: analytics.bucket_size,
            wall_band: analytics.wall_band,
            dealer_short_ratio: analytics.dealer_short_ratio,
            ..GammaConfig::default()
        },
        screener: ScreenerParams {
            cdi_monthly: analytics.cdi_monthly,
            ir_rate: analytics.ir_rate,
            ..ScreenerParams::default()
        },
        ticker_lists: config.ticker_lists.clone(),
        ..OrchestratorSettings::default()
    }
}

fn upstream(name: &str, provider: &ProviderConfig) -> UpstreamConfig {
    UpstreamConfig::new(name, provider.base_url.clone(), Duration::from_secs(provider.timeout_secs))
        .with_token(provider.token.clone())
        .with_retry(RetryPolicy {
            max_retries: provider.retry.max_retries,
            backoff_factor: provider.retry.backoff_factor,
            status_forcelist: provider.retry.status_forcelist.clone(),
        })
}

pub async fn build_store(config: &StorageConfig) -> Result<Arc<dyn SnapshotStore>> {
    match &config.database_url {
        #[cfg(feature = "postgres")]
        Some(url) => {
            let store = storage::PostgresSnapshotStore::new(url, config.max_connections)
                .await
                .context("Failed to open snapshot database")?;
            if config.run_migrations {
                store.run_migrations().await?;
            }
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "postgres"))]
        Some(_) => {
            tracing::warn!("Built without the postgres feature; keeping snapshots in memory");
            Ok(Arc::new(InMemorySnapshotStore::new()))
        }
        None => {
            info!("No database_url configured; keeping snapshots in memory");
            Ok(Arc::new(InMemorySnapshotStore::new()))
        }
    }
}

/// Sources, store and orchestrator for one process
pub struct App {
    pub orchestrator: Arc<Orchestrator>,
    pub store: Arc<dyn SnapshotStore>,
}

impl App {
    pub async fn build(config: &OpflowConfig) -> Result<Self> {
        let quotes: Arc<dyn QuoteSource> =
            Arc::new(BrapiQuoteSource::new(upstream("brapi", &config.providers.quote))?);
        let chains: Arc<dyn OptionChainSource> =
            Arc::new(OplabChainSource::new(upstream("oplab", &config.providers.chain))?);
        let store = build_store(&config.storage).await?;

        let orchestrator = Orchestrator::new(quotes, chains, store.clone(), orchestrator_settings(config));
        info!(store = store.name(), "Components ready");

        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            store,
        })
    }
}

/// Snapshot store reachability for `/health/detailed`
pub struct StoreProbe {
    store: Arc<dyn SnapshotStore>,
}

impl StoreProbe {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl HealthProbe for StoreProbe {
    fn name(&self) -> &str {
        self.store.name()
    }

    async fn check(&self) -> std::result::Result<(), String> {
        self.store.ping().await.map_err(|e| e.to_string())
    }
}
