//! API request/response models.

use analytics::{
    ArbitrageOpportunity, FlowMetrics, GammaProfile, NormalizationStats, ScreenerFilters,
    ScreenerParams,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storage::SnapshotId;

use crate::orchestrator::CaptureResult;

/// Body for `POST /options/flow/capture`
#[derive(Debug, Deserialize)]
pub struct CaptureRequest {
    pub ticker: String,
    /// Run the protected put screen over the captured chain
    #[serde(default)]
    pub screen: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CaptureResponse {
    pub ticker: String,
    pub snapshot_id: SnapshotId,
    pub timestamp: DateTime<Utc>,
    pub spot: f64,
    pub options_processed: usize,
    pub metrics: FlowMetrics,
    pub gamma: GammaProfile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screener: Option<Vec<ArbitrageOpportunity>>,
    pub data_quality: NormalizationStats,
}

impl From<CaptureResult> for CaptureResponse {
    fn from(r: CaptureResult) -> Self {
        Self {
            ticker: r.ticker.to_string(),
            snapshot_id: r.snapshot_id,
            timestamp: r.timestamp,
            spot: r.spot,
            options_processed: r.options_count,
            metrics: r.flow_metrics,
            gamma: r.gamma,
            screener: r.screener,
            data_quality: r.data_quality,
        }
    }
}

/// Query for `GET /options/flow/current/:ticker`
#[derive(Debug, Default, Deserialize)]
pub struct CurrentParams {
    #[serde(default)]
    pub include_details: bool,
}

/// Query for `GET /options/flow/history/:ticker`
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    #[serde(default = "default_days_back")]
    pub days_back: u32,
    #[serde(default = "default_history_limit")]
    pub limit: usize,
}

fn default_days_back() -> u32 {
    30
}

fn default_history_limit() -> usize {
    100
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub ticker: String,
    pub days_back: u32,
    pub count: usize,
    pub snapshots: Vec<storage::Snapshot>,
}

/// Body for `POST /options/gamma/analyze`
#[derive(Debug, Deserialize)]
pub struct GammaRequest {
    pub ticker: String,
    pub days_back: Option<u32>,
    pub expiration_code: Option<String>,
}

/// Body for `POST /options/arbitrage/screen`
///
/// Numeric fields left out fall back to the configured screener defaults.
#[derive(Debug, Default, Deserialize)]
pub struct ScreenRequest {
    pub symbols: Option<Vec<String>>,
    pub list_name: Option<String>,
    /// Monthly CDI in percent
    pub taxa_cdi_mensal: Option<f64>,
    pub volume_min: Option<u64>,
    /// Minimum gross return in percent
    pub rentabilidade_min: Option<f64>,
    pub filters: Option<ScreenerFilters>,
}

impl ScreenRequest {
    /// Screener parameters on top of `defaults`
    pub fn params(&self, defaults: &ScreenerParams) -> Result<ScreenerParams, String> {
        let params = ScreenerParams {
            cdi_monthly: self.taxa_cdi_mensal.unwrap_or(defaults.cdi_monthly),
            volume_min: self.volume_min.unwrap_or(defaults.volume_min),
            min_return: self.rentabilidade_min.unwrap_or(defaults.min_return),
            filters: self.filters.clone().unwrap_or_else(|| defaults.filters.clone()),
            ..defaults.clone()
        };

        if !params.cdi_monthly.is_finite() || params.cdi_monthly < 0.0 {
            return Err(format!(
                "taxa_cdi_mensal must be a non-negative number, got {}",
                params.cdi_monthly
            ));
        }
        if !params.min_return.is_finite() {
            return Err("rentabilidade_min must be a finite number".to_string());
        }
        let f = &params.filters;
        for (name, min, max) in [
            ("delta", f.delta_min, f.delta_max),
            ("distance", f.distance_min, f.distance_max),
        ] {
            if let (Some(lo), Some(hi)) = (min, max) {
                if lo > hi {
                    return Err(format!("{name}_min must not exceed {name}_max"));
                }
            }
        }
        if let (Some(lo), Some(hi)) = (f.dte_min, f.dte_max) {
            if lo > hi {
                return Err("dte_min must not exceed dte_max".to_string());
            }
        }
        Ok(params)
    }
}

/// Error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub timestamp: DateTime<Utc>,
    /// Whether retrying the same request may succeed
    #[serde(default)]
    pub retriable: bool,
}
