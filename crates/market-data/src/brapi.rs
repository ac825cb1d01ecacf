//! brapi.dev quote adapter
//!
//! `GET /api/quote/{ticker}?range=..&interval=..&token=..` returns
//! `{ "results": [ { regularMarketPrice, currency, historicalDataPrice: [...] } ] }`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{Bar, SpotQuote, Ticker};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::bars::{Interval, Period};
use crate::error::MarketDataError;
use crate::http::{UpstreamClient, UpstreamConfig};
use crate::source::QuoteSource;
use crate::Result;

pub const DEFAULT_BASE_URL: &str = "https://brapi.dev";

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[serde(default)]
    results: Vec<QuoteResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteResult {
    #[serde(default)]
    regular_market_price: Option<f64>,
    #[serde(default)]
    regular_market_time: Option<String>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    historical_data_price: Vec<HistoricalPoint>,
}

#[derive(Debug, Deserialize)]
struct HistoricalPoint {
    date: i64,
    #[serde(default)]
    open: Option<f64>,
    #[serde(default)]
    high: Option<f64>,
    #[serde(default)]
    low: Option<f64>,
    #[serde(default)]
    close: Option<f64>,
    #[serde(default)]
    volume: Option<f64>,
}

impl HistoricalPoint {
    fn into_bar(self) -> Option<Bar> {
        let close = self.close?;
        let timestamp = DateTime::from_timestamp(self.date, 0)?.naive_utc();
        Some(Bar {
            timestamp,
            open: self.open.unwrap_or(close),
            high: self.high.unwrap_or(close),
            low: self.low.unwrap_or(close),
            close,
            volume: self.volume.unwrap_or(0.0),
        })
    }
}

/// Spot and history from brapi.dev
pub struct BrapiQuoteSource {
    client: UpstreamClient,
}

impl BrapiQuoteSource {
    pub fn new(config: UpstreamConfig) -> Result<Self> {
        Ok(Self {
            client: UpstreamClient::new(config)?,
        })
    }

    async fn quote(&self, ticker: &Ticker, extra: &[(&str, String)]) -> Result<QuoteResult> {
        let mut query: Vec<(&str, String)> = extra.to_vec();
        if let Some(token) = self.client.token() {
            query.push(("token", token.to_string()));
        }

        let resp: QuoteResponse = self
            .client
            .get_json(&format!("/api/quote/{}", ticker), &query, &[])
            .await?;

        resp.results
            .into_iter()
            .next()
            .ok_or_else(|| MarketDataError::DataNotAvailable(ticker.to_string()))
    }
}

#[async_trait]
impl QuoteSource for BrapiQuoteSource {
    fn name(&self) -> &str {
        self.client.name()
    }

    async fn spot(&self, ticker: &Ticker) -> Option<SpotQuote> {
        let result = match self.quote(ticker, &[]).await {
            Ok(r) => r,
            Err(e) => {
                warn!(source = self.name(), %ticker, error = %e, "Spot lookup failed");
                return None;
            }
        };

        let price = result.regular_market_price.filter(|p| p.is_finite() && *p > 0.0);
        let Some(price) = price else {
            debug!(%ticker, "Upstream reported no usable spot price");
            return None;
        };

        let timestamp = result
            .regular_market_time
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        Some(SpotQuote {
            ticker: ticker.clone(),
            price,
            timestamp,
            currency: result.currency.unwrap_or_else(|| "BRL".to_string()),
        })
    }

    async fn fetch_bars(
        &self,
        ticker: &Ticker,
        period: Period,
        interval: Interval,
    ) -> Option<Vec<Bar>> {
        let query = [
            ("range", period.as_str().to_string()),
            ("interval", interval.as_str().to_string()),
        ];
        match self.quote(ticker, &query).await {
            Ok(result) => Some(
                result
                    .historical_data_price
                    .into_iter()
                    .filter_map(HistoricalPoint::into_bar)
                    .collect(),
            ),
            Err(e) => {
                warn!(source = self.name(), %ticker, error = %e, "History lookup failed");
                None
            }
        }
    }
}
