//! OpLab option chain adapter
//!
//! `GET /v3/market/options/{ticker}` with an `Access-Token` header returns a
//! flat array of series. Upstream keys are mapped here and nowhere else.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use common::{DefaultedFields, OptionSide, RawContract, Ticker};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::http::{UpstreamClient, UpstreamConfig};
use crate::source::OptionChainSource;
use crate::Result;

pub const DEFAULT_BASE_URL: &str = "https://api.oplab.com.br";

/// Volume assumed when the provider omits it, so the contract still carries weight
pub const DEFAULT_VOLUME: u64 = 100;

/// Open interest above which a contract with no traded volume is still kept
pub const MIN_OPEN_INTEREST: u64 = 10;

/// One series as served by the provider
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OplabSeries {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub strike: Option<f64>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub days_to_maturity: Option<i64>,
    /// Last trade
    #[serde(default)]
    pub close: Option<f64>,
    #[serde(default)]
    pub bid: Option<f64>,
    #[serde(default)]
    pub ask: Option<f64>,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub open_interest: Option<f64>,
    #[serde(default)]
    pub bid_volume: Option<f64>,
    #[serde(default)]
    pub ask_volume: Option<f64>,
    #[serde(default)]
    pub spot_price: Option<f64>,
    /// Provider implied volatility, in percent
    #[serde(default)]
    pub iv: Option<f64>,
}

fn non_negative(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite() && *x >= 0.0)
}

fn count(v: Option<f64>) -> Option<u64> {
    non_negative(v).map(|x| x.round() as u64)
}

/// Map one upstream series into a raw contract.
///
/// Returns `None` unless the series has a positive strike and either traded
/// volume or open interest above [`MIN_OPEN_INTEREST`]. Missing numeric fields
/// are defaulted and flagged.
pub fn map_series(series: OplabSeries, today: NaiveDate) -> Option<RawContract> {
    let strike = series.strike.filter(|k| k.is_finite() && *k > 0.0)?;
    let volume = count(series.volume);
    let open_interest = count(series.open_interest);

    let liquid = volume.is_some_and(|v| v > 0) || open_interest.is_some_and(|oi| oi > MIN_OPEN_INTEREST);
    if !liquid {
        return None;
    }

    let symbol = series.symbol.filter(|s| !s.is_empty())?;
    let side: OptionSide = series.category.as_deref()?.parse().ok()?;
    let expiry_date = NaiveDate::parse_from_str(series.due_date.as_deref()?, "%Y-%m-%d").ok()?;
    let days_to_expiry = series
        .days_to_maturity
        .unwrap_or_else(|| (expiry_date - today).num_days());

    let last = non_negative(series.close);
    let bid = non_negative(series.bid);
    let ask = non_negative(series.ask);
    let bid_volume = count(series.bid_volume);
    let ask_volume = count(series.ask_volume);

    if let (Some(b), Some(a)) = (bid, ask) {
        if a > 0.0 && a < b {
            debug!(%symbol, bid = b, ask = a, "Dropping crossed quote");
            return None;
        }
    }

    let defaulted = DefaultedFields {
        last_price: last.is_none(),
        bid: bid.is_none(),
        ask: ask.is_none(),
        volume: volume.is_none(),
        open_interest: open_interest.is_none(),
        bid_volume: bid_volume.is_none(),
        ask_volume: ask_volume.is_none(),
    };

    let implied_volatility = series
        .iv
        .filter(|v| v.is_finite() && *v > 0.0)
        .map(|v| v / 100.0);

    Some(RawContract {
        symbol,
        side,
        strike,
        expiry_date,
        days_to_expiry,
        last_trade_price: last.unwrap_or(0.0),
        bid: bid.unwrap_or(0.0),
        ask: ask.unwrap_or(0.0),
        volume: volume.unwrap_or(DEFAULT_VOLUME),
        open_interest: open_interest.unwrap_or(0),
        bid_volume: bid_volume.unwrap_or(0),
        ask_volume: ask_volume.unwrap_or(0),
        spot_at_observation: non_negative(series.spot_price).unwrap_or(0.0),
        implied_volatility,
        defaulted,
    })
}

/// Option chains from OpLab
pub struct OplabChainSource {
    client: UpstreamClient,
}

impl OplabChainSource {
    pub fn new(config: UpstreamConfig) -> Result<Self> {
        Ok(Self {
            client: UpstreamClient::new(config)?,
        })
    }

    async fn fetch(&self, ticker: &Ticker) -> Result<Vec<OplabSeries>> {
        let headers: Vec<(&'static str, String)> = self
            .client
            .token()
            .map(|t| vec![("access-token", t.to_string())])
            .unwrap_or_default();

        self.client
            .get_json(&format!("/v3/market/options/{}", ticker), &[], &headers)
            .await
    }
}

#[async_trait]
impl OptionChainSource for OplabChainSource {
    fn name(&self) -> &str {
        self.client.name()
    }

    async fn chain(&self, ticker: &Ticker) -> Option<Vec<RawContract>> {
        let series = match self.fetch(ticker).await {
            Ok(s) => s,
            Err(e) => {
                warn!(source = self.name(), %ticker, error = %e, "Chain lookup failed");
                return None;
            }
        };

        if series.is_empty() {
            debug!(%ticker, "Upstream returned an empty chain");
            return None;
        }

        let reported = series.len();
        let today = Utc::now().date_naive();
        let contracts: Vec<RawContract> = series
            .into_iter()
            .filter_map(|s| map_series(s, today))
            .collect();

        info!(
            %ticker,
            reported,
            kept = contracts.len(),
            "Option chain fetched"
        );
        Some(contracts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Path, http::HeaderMap, routing::get, Json, Router};
    use serde_json::{json, Value};
    use std::time::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn series() -> OplabSeries {
        OplabSeries {
            symbol: Some("PETRD400".into()),
            category: Some("CALL".into()),
            strike: Some(40.0),
            due_date: Some("2024-04-19".into()),
            days_to_maturity: Some(49),
            close: Some(1.25),
            bid: Some(1.20),
            ask: Some(1.30),
            volume: Some(300.0),
            open_interest: Some(1500.0),
            bid_volume: Some(100.0),
            ask_volume: Some(200.0),
            spot_price: Some(39.8),
            iv: Some(35.0),
        }
    }

    #[test]
    fn test_maps_complete_series() {
        let c = map_series(series(), today()).unwrap();
        assert_eq!(c.side, OptionSide::Call);
        assert_eq!(c.strike, 40.0);
        assert_eq!(c.days_to_expiry, 49);
        assert_eq!(c.volume, 300);
        assert_eq!(c.implied_volatility, Some(0.35));
        assert!(!c.defaulted.any());
    }

    #[test]
    fn test_inclusion_rule() {
        let no_strike = OplabSeries { strike: Some(0.0), ..series() };
        assert!(map_series(no_strike, today()).is_none());

        let illiquid = OplabSeries {
            volume: Some(0.0),
            open_interest: Some(10.0),
            ..series()
        };
        assert!(map_series(illiquid, today()).is_none());

        let oi_only = OplabSeries {
            volume: Some(0.0),
            open_interest: Some(11.0),
            ..series()
        };
        assert!(map_series(oi_only, today()).is_some());
    }

    #[test]
    fn test_defaults_are_flagged() {
        let sparse = OplabSeries {
            volume: None,
            bid: None,
            days_to_maturity: None,
            bid_volume: None,
            ..series()
        };
        let c = map_series(sparse, today()).unwrap();
        assert_eq!(c.volume, DEFAULT_VOLUME);
        assert!(c.defaulted.volume);
        assert_eq!(c.bid, 0.0);
        assert!(c.defaulted.bid);
        assert!(c.defaulted.bid_volume);
        assert!(!c.defaulted.ask);
        // 2024-03-01 to 2024-04-19
        assert_eq!(c.days_to_expiry, 49);
    }

    #[test]
    fn test_crossed_quote_dropped() {
        let crossed = OplabSeries {
            bid: Some(1.5),
            ask: Some(1.0),
            ..series()
        };
        assert!(map_series(crossed, today()).is_none());

        let no_offer = OplabSeries {
            bid: Some(1.5),
            ask: Some(0.0),
            ..series()
        };
        assert!(map_series(no_offer, today()).is_some());
    }

    #[tokio::test]
    async fn test_chain_over_http() {
        let app = Router::new().route(
            "/v3/market/options/:ticker",
            get(|Path(ticker): Path<String>, headers: HeaderMap| async move {
                let authorized = headers
                    .get("access-token")
                    .map(|v| v == "secret")
                    .unwrap_or(false);
                if !authorized || ticker != "PETR4" {
                    return Json(Value::Array(vec![]));
                }
                Json(json!([
                    {"symbol": "PETRD400", "category": "CALL", "strike": 40.0, "due_date": "2099-04-17",
                     "close": 1.2, "bid": 1.1, "ask": 1.3, "volume": 250, "open_interest": 800},
                    {"symbol": "PETRP380", "category": "PUT", "strike": 38.0, "due_date": "2099-04-17",
                     "close": 0.4, "bid": 0.35, "ask": 0.45, "volume": 0, "open_interest": 5},
                    {"symbol": "PETRX", "category": "FUTURE", "strike": 38.0, "due_date": "2099-04-17",
                     "volume": 10}
                ]))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let config = UpstreamConfig::new("oplab", format!("http://{}", addr), Duration::from_secs(5))
            .with_token(Some("secret".to_string()));
        let source = OplabChainSource::new(config).unwrap();

        let chain = source.chain(&Ticker::parse("PETR4").unwrap()).await.unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].symbol, "PETRD400");
        assert!(chain[0].days_to_expiry > 0);

        assert!(source.chain(&Ticker::parse("VALE3").unwrap()).await.is_none());
    }
}
