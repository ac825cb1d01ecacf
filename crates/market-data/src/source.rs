//! Source traits
//!
//! Implementations are injected into the orchestrator; nothing else in the
//! workspace talks to an upstream provider.

use async_trait::async_trait;
use common::{Bar, RawContract, SpotQuote, Ticker};

use crate::bars::{normalize_bars, resample_4h, Interval, Period};

/// Underlying spot price and historical bars
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Short provider name used in logs and metrics
    fn name(&self) -> &str;

    /// Latest spot price, or `None` when the upstream has no data
    async fn spot(&self, ticker: &Ticker) -> Option<SpotQuote>;

    /// Raw bars exactly as the provider serves them for a native interval
    ///
    /// Callers should use [`QuoteSource::history`]; this is the provider hook.
    async fn fetch_bars(
        &self,
        ticker: &Ticker,
        period: Period,
        interval: Interval,
    ) -> Option<Vec<Bar>>;

    /// Sorted, de-duplicated bars. 4h bars are synthesized from hourly ones.
    async fn history(
        &self,
        ticker: &Ticker,
        period: Period,
        interval: Interval,
    ) -> Option<Vec<Bar>> {
        let bars = match interval {
            Interval::FourHours => self
                .fetch_bars(ticker, period, Interval::OneHour)
                .await
                .map(|hourly| resample_4h(&hourly))?,
            native => self.fetch_bars(ticker, period, native).await.map(normalize_bars)?,
        };
        if bars.is_empty() {
            None
        } else {
            Some(bars)
        }
    }
}

/// Live option chain for an underlying
#[async_trait]
pub trait OptionChainSource: Send + Sync {
    fn name(&self) -> &str;

    /// Contracts with a positive strike and some reported liquidity,
    /// or `None` when the upstream has nothing for the ticker
    async fn chain(&self, ticker: &Ticker) -> Option<Vec<RawContract>>;
}
