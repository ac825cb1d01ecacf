//! Capture pipeline
//!
//! Spot and chain are fetched in parallel, then everything else runs
//! sequentially over that one fetch, so flow, gamma and the screener
//! always see the same chain.

use analytics::{
    aggregate_flow, analyze_gamma, normalize, screen, ArbitrageOpportunity, FlowMetrics,
    GammaProfile, NormalizationOutcome, NormalizationStats, ScreenerParams,
};
use chrono::{DateTime, Utc};
use common::{Moneyness, NormalizedContract, RawContract, SpotQuote, Ticker};
use market_data::bars::realized_volatility;
use market_data::{Interval, OptionChainSource, Period, QuoteSource};
use observability::{AnalyticsMetrics, CaptureOutcome};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use storage::{OptionDetail, Snapshot, SnapshotId, SnapshotRecord, SnapshotStore};
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::cache::TtlCache;
use crate::error::{CaptureError, Result};
use crate::settings::OrchestratorSettings;

/// Result of one capture
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureResult {
    pub ticker: Ticker,
    pub timestamp: DateTime<Utc>,
    pub spot: f64,
    pub flow_metrics: FlowMetrics,
    pub gamma: GammaProfile,
    pub options_count: usize,
    pub snapshot_id: SnapshotId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screener: Option<Vec<ArbitrageOpportunity>>,
    pub data_quality: NormalizationStats,
}

/// Stored snapshot, optionally with its contracts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentSnapshot {
    #[serde(flatten)]
    pub snapshot: Snapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<OptionDetail>>,
}

/// Gamma profile plus volatility context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GammaReport {
    pub ticker: Ticker,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_code: Option<String>,
    pub days_back: u32,
    pub options_count: usize,
    pub regime_description: String,
    /// Volume-weighted IV of the ATM contracts
    pub atm_iv: Option<f64>,
    /// Annualized close-to-close volatility over `days_back`
    pub realized_volatility: Option<f64>,
    #[serde(flatten)]
    pub profile: GammaProfile,
}

/// Spot and chain observed together, raw and normalized
#[derive(Debug, Clone)]
struct MarketView {
    spot: SpotQuote,
    chain: Vec<RawContract>,
    outcome: NormalizationOutcome,
}

/// Orchestrator - runs captures against injected sources and store
pub struct Orchestrator {
    quotes: Arc<dyn QuoteSource>,
    chains: Arc<dyn OptionChainSource>,
    store: Arc<dyn SnapshotStore>,
    settings: OrchestratorSettings,
    spot_cache: TtlCache<SpotQuote>,
    chain_cache: TtlCache<Vec<RawContract>>,
    metrics: AnalyticsMetrics,
}

impl Orchestrator {
    pub fn new(
        quotes: Arc<dyn QuoteSource>,
        chains: Arc<dyn OptionChainSource>,
        store: Arc<dyn SnapshotStore>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            spot_cache: TtlCache::new("spot", settings.cache_ttl),
            chain_cache: TtlCache::new("chain", settings.cache_ttl),
            quotes,
            chains,
            store,
            settings,
            metrics: AnalyticsMetrics::new(),
        }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<dyn SnapshotStore> {
        &self.store
    }

    /// Run the full pipeline for one ticker and persist the snapshot
    #[instrument(skip_all, fields(ticker = %ticker))]
    pub async fn capture(
        &self,
        ticker: &Ticker,
        screener: Option<&ScreenerParams>,
    ) -> Result<CaptureResult> {
        let started = Instant::now();
        let result = self.run_capture(ticker, screener).await;

        let outcome = match &result {
            Ok(_) => CaptureOutcome::Success,
            Err(CaptureError::UpstreamUnavailable { .. }) => CaptureOutcome::UpstreamUnavailable,
            Err(CaptureError::NoValidContracts { .. }) => CaptureOutcome::NoValidContracts,
            Err(CaptureError::PersistenceFailure(_)) | Err(CaptureError::Timeout { .. }) => {
                CaptureOutcome::PersistenceFailure
            }
            Err(_) => CaptureOutcome::Other,
        };
        self.metrics.record_capture(outcome, started.elapsed());

        match &result {
            Ok(r) => info!(
                snapshot_id = r.snapshot_id,
                options = r.options_count,
                sentiment = %r.flow_metrics.sentiment,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Capture complete"
            ),
            Err(e) => warn!(error = %e, code = e.code(), "Capture failed"),
        }
        result
    }

    async fn run_capture(
        &self,
        ticker: &Ticker,
        screener: Option<&ScreenerParams>,
    ) -> Result<CaptureResult> {
        let view = self.load_market(ticker).await?;
        let contracts = &view.outcome.contracts;
        let spot = view.spot.price;

        let flow_metrics = aggregate_flow(contracts);
        let gamma = analyze_gamma(contracts, spot, &self.settings.gamma);
        let screener =
            screener.map(|params| screen(ticker.as_str(), &view.chain, contracts, spot, params));

        let timestamp = Utc::now();
        let record = SnapshotRecord::new(ticker.clone(), timestamp, spot, flow_metrics.clone());
        let details: Vec<OptionDetail> = contracts.iter().map(OptionDetail::from).collect();

        let snapshot_id = self
            .with_store_timeout("save_capture", self.store.save_capture(&record, &details))
            .await
            .map_err(|e| match e {
                CaptureError::NotFound(what) => CaptureError::PersistenceFailure(what),
                other => other,
            })?;

        Ok(CaptureResult {
            ticker: ticker.clone(),
            timestamp,
            spot,
            flow_metrics,
            gamma,
            options_count: contracts.len(),
            snapshot_id,
            screener,
            data_quality: view.outcome.stats,
        })
    }

    /// Latest stored snapshot for a ticker
    pub async fn current(&self, ticker: &Ticker, include_details: bool) -> Result<CurrentSnapshot> {
        let snapshot = self
            .with_store_timeout("latest", self.store.latest(ticker))
            .await?
            .ok_or_else(|| CaptureError::NotFound(format!("no snapshot for {}", ticker)))?;

        let details = if include_details {
            Some(
                self.with_store_timeout("details", self.store.details(snapshot.id))
                    .await?,
            )
        } else {
            None
        };
        Ok(CurrentSnapshot { snapshot, details })
    }

    /// Stored snapshots within `days_back`, newest first
    pub async fn history(&self, ticker: &Ticker, days_back: u32, limit: usize) -> Result<Vec<Snapshot>> {
        self.with_store_timeout("history", self.store.history(ticker, days_back, limit))
            .await
    }

    /// Gamma profile without persisting anything
    #[instrument(skip_all, fields(ticker = %ticker))]
    pub async fn analyze_gamma(
        &self,
        ticker: &Ticker,
        days_back: Option<u32>,
        expiration_code: Option<&str>,
    ) -> Result<GammaReport> {
        if let Some(code) = expiration_code {
            analytics::series::parse_expiration_code(code)?;
        }
        let days_back = days_back.unwrap_or(self.settings.default_days_back);
        if days_back == 0 {
            return Err(CaptureError::validation("days_back must be positive"));
        }

        let (view, realized) = tokio::join!(self.load_market(ticker), self.realized_vol(ticker, days_back));
        let view = view?;

        let contracts = match expiration_code {
            Some(code) => analytics::series::filter_by_expiration(view.outcome.contracts, code)?,
            None => view.outcome.contracts,
        };
        if contracts.is_empty() {
            return Err(CaptureError::NoValidContracts {
                ticker: ticker.to_string(),
                raw: view.outcome.stats.raw_contracts,
            });
        }

        let atm: Vec<NormalizedContract> = contracts
            .iter()
            .filter(|c| c.moneyness == Moneyness::Atm)
            .cloned()
            .collect();
        let profile = analyze_gamma(&contracts, view.spot.price, &self.settings.gamma);

        Ok(GammaReport {
            ticker: ticker.clone(),
            timestamp: Utc::now(),
            expiration_code: expiration_code.map(|c| c.trim().to_uppercase()),
            days_back,
            options_count: contracts.len(),
            regime_description: profile.regime.description().to_string(),
            atm_iv: aggregate_flow(&atm).avg_iv,
            realized_volatility: realized,
            profile,
        })
    }

    /// Protected put screen for one ticker, without persisting anything
    pub async fn screen_ticker(
        &self,
        ticker: &Ticker,
        params: &ScreenerParams,
    ) -> Result<Vec<ArbitrageOpportunity>> {
        let view = self.load_market(ticker).await?;
        Ok(screen(
            ticker.as_str(),
            &view.chain,
            &view.outcome.contracts,
            view.spot.price,
            params,
        ))
    }

    async fn realized_vol(&self, ticker: &Ticker, days_back: u32) -> Option<f64> {
        let bars = timeout(
            self.settings.quote_timeout,
            self.quotes
                .history(ticker, Period::covering_days(days_back), Interval::OneDay),
        )
        .await
        .ok()
        .flatten()?;
        realized_volatility(&bars)
    }

    /// Fetch spot and chain in parallel and normalize the chain
    async fn load_market(&self, ticker: &Ticker) -> Result<MarketView> {
        let quote_timeout = self.settings.quote_timeout;
        let chain_timeout = self.settings.chain_timeout;
        let quotes = &self.quotes;
        let chains = &self.chains;

        let spot = self.spot_cache.get_or_fetch(ticker.as_str(), move || async move {
            match timeout(quote_timeout, quotes.spot(ticker)).await {
                Ok(quote) => quote,
                Err(_) => {
                    warn!(source = quotes.name(), %ticker, "Spot lookup timed out");
                    None
                }
            }
        });
        let chain = self.chain_cache.get_or_fetch(ticker.as_str(), move || async move {
            match timeout(chain_timeout, chains.chain(ticker)).await {
                Ok(chain) => chain,
                Err(_) => {
                    warn!(source = chains.name(), %ticker, "Chain lookup timed out");
                    None
                }
            }
        });
        let (spot, chain) = tokio::join!(spot, chain);

        let spot = spot.ok_or_else(|| CaptureError::upstream(self.quotes.name(), ticker))?;
        let chain = chain.ok_or_else(|| CaptureError::upstream(self.chains.name(), ticker))?;

        let outcome = normalize(&chain, spot.price, &self.settings.normalizer_for(&spot.currency));
        debug!(
            raw = outcome.stats.raw_contracts,
            kept = outcome.contracts.len(),
            filtered = outcome.stats.filtered_contracts,
            dropped = outcome.stats.dropped_contracts,
            degraded = outcome.stats.degraded_contracts,
            "Chain normalized"
        );
        self.metrics
            .record_contracts(outcome.contracts.len(), outcome.stats.dropped_contracts);

        if outcome.contracts.is_empty() {
            return Err(CaptureError::NoValidContracts {
                ticker: ticker.to_string(),
                raw: chain.len(),
            });
        }
        Ok(MarketView { spot, chain, outcome })
    }

    async fn with_store_timeout<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = storage::Result<T>>,
    ) -> Result<T> {
        match timeout(self.settings.storage_timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(CaptureError::Timeout {
                operation,
                secs: self.settings.storage_timeout.as_secs(),
            }),
        }
    }
}
