//! Multi-ticker screening
//!
//! Tickers fan out with bounded parallelism. A ticker that fails is
//! reported in its own entry and never aborts the rest of the batch.

use analytics::{ArbitrageOpportunity, ScreenerParams};
use common::Ticker;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::{CaptureError, Result};
use crate::orchestrator::Orchestrator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TickerStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerError {
    pub code: String,
    pub message: String,
}

impl From<&CaptureError> for TickerError {
    fn from(e: &CaptureError) -> Self {
        Self {
            code: e.code().to_string(),
            message: e.to_string(),
        }
    }
}

/// Outcome for one ticker of a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerScreenResult {
    pub ticker: String,
    pub status: TickerStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opportunities: Option<Vec<ArbitrageOpportunity>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TickerError>,
}

impl TickerScreenResult {
    fn ok(ticker: String, opportunities: Vec<ArbitrageOpportunity>) -> Self {
        Self {
            ticker,
            status: TickerStatus::Ok,
            opportunities: Some(opportunities),
            error: None,
        }
    }

    fn failed(ticker: String, error: &CaptureError) -> Self {
        Self {
            ticker,
            status: TickerStatus::Error,
            opportunities: None,
            error: Some(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == TickerStatus::Ok
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub requested: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub opportunities: usize,
    pub beating_cdi: usize,
    /// Best gross return across all tickers
    pub best_gross_profit_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchScreenResult {
    /// One entry per requested ticker, in request order
    pub results: Vec<TickerScreenResult>,
    /// Every opportunity found, ranked across tickers
    pub opportunities: Vec<ArbitrageOpportunity>,
    pub summary: BatchSummary,
}

impl Orchestrator {
    /// Symbols to screen from an explicit list or a configured list name.
    ///
    /// Duplicates are dropped keeping the first occurrence.
    pub fn resolve_symbols(
        &self,
        symbols: Option<&[String]>,
        list_name: Option<&str>,
    ) -> Result<Vec<String>> {
        let requested: Vec<String> = match (symbols, list_name) {
            (Some(symbols), _) if !symbols.is_empty() => symbols.to_vec(),
            (_, Some(name)) => self
                .settings()
                .ticker_lists
                .get(name)
                .cloned()
                .ok_or_else(|| CaptureError::validation(format!("unknown list_name '{}'", name)))?,
            _ => {
                return Err(CaptureError::validation(
                    "either symbols or list_name is required",
                ))
            }
        };

        let mut seen = std::collections::HashSet::new();
        Ok(requested
            .into_iter()
            .map(|s| s.trim().to_uppercase())
            .filter(|s| seen.insert(s.clone()))
            .collect())
    }

    /// Screen every symbol, at most `batch_parallelism` at a time
    #[instrument(skip_all, fields(tickers = symbols.len()))]
    pub async fn screen_batch(&self, symbols: &[String], params: &ScreenerParams) -> BatchScreenResult {
        let parallelism = self.settings().batch_parallelism.max(1);

        let results: Vec<TickerScreenResult> = stream::iter(symbols.iter().cloned())
            .map(|symbol| async move {
                let outcome = match Ticker::parse(&symbol) {
                    Ok(ticker) => self.screen_ticker(&ticker, params).await,
                    Err(e) => Err(e.into()),
                };
                match outcome {
                    Ok(found) => TickerScreenResult::ok(symbol, found),
                    Err(e) => TickerScreenResult::failed(symbol, &e),
                }
            })
            .buffered(parallelism)
            .collect()
            .await;

        let mut opportunities: Vec<ArbitrageOpportunity> = results
            .iter()
            .filter_map(|r| r.opportunities.as_ref())
            .flatten()
            .cloned()
            .collect();
        opportunities.sort_by(|a, b| {
            b.gross_profit_pct
                .total_cmp(&a.gross_profit_pct)
                .then(b.volume.cmp(&a.volume))
        });

        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        let summary = BatchSummary {
            requested: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            opportunities: opportunities.len(),
            beating_cdi: opportunities.iter().filter(|o| o.beats_cdi).count(),
            best_gross_profit_pct: opportunities.first().map(|o| o.gross_profit_pct),
        };
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            opportunities = summary.opportunities,
            "Batch screen complete"
        );

        BatchScreenResult {
            results,
            opportunities,
            summary,
        }
    }
}
