//! Persisted snapshot shapes

use analytics::FlowMetrics;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use common::{Moneyness, NormalizedContract, OptionSide, Ticker};
use serde::{Deserialize, Serialize};

/// Primary key of a stored snapshot
pub type SnapshotId = i64;

/// B3 trades on Brasilia time, UTC-3 with no daylight saving
pub const MARKET_UTC_OFFSET_HOURS: i64 = -3;

/// Trading date of `timestamp` on the B3 calendar
pub fn market_date(timestamp: DateTime<Utc>) -> NaiveDate {
    (timestamp + Duration::hours(MARKET_UTC_OFFSET_HOURS)).date_naive()
}

/// Snapshot contents before it is assigned an id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub ticker: Ticker,
    pub date: NaiveDate,
    pub timestamp: DateTime<Utc>,
    pub spot: f64,
    #[serde(flatten)]
    pub metrics: FlowMetrics,
}

impl SnapshotRecord {
    pub fn new(ticker: Ticker, timestamp: DateTime<Utc>, spot: f64, metrics: FlowMetrics) -> Self {
        Self {
            ticker,
            date: market_date(timestamp),
            timestamp,
            spot,
            metrics,
        }
    }
}

/// Stored flow summary for one (ticker, date)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: SnapshotId,
    #[serde(flatten)]
    pub record: SnapshotRecord,
}

/// One stored contract row of a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionDetail {
    pub option_symbol: String,
    pub strike: f64,
    pub side: OptionSide,
    pub expiry: NaiveDate,
    pub days_to_expiry: i64,
    pub last_price: f64,
    pub volume: u64,
    pub bid: f64,
    pub ask: f64,
    pub bid_volume: u64,
    pub ask_volume: u64,
    pub iv: Option<f64>,
    pub bs_theoretical: Option<f64>,
    pub moneyness: Moneyness,
    /// Flow weight: `iv * max(open_interest, volume)`
    pub weight: f64,
    pub spot_price: f64,
}

impl From<&NormalizedContract> for OptionDetail {
    fn from(c: &NormalizedContract) -> Self {
        let raw = &c.contract;
        let weight = c.implied_volatility.unwrap_or(0.0) * raw.open_interest.max(raw.volume) as f64;
        Self {
            option_symbol: raw.symbol.clone(),
            strike: raw.strike,
            side: raw.side,
            expiry: raw.expiry_date,
            days_to_expiry: raw.days_to_expiry,
            last_price: raw.last_trade_price,
            volume: raw.volume,
            bid: raw.bid,
            ask: raw.ask,
            bid_volume: raw.bid_volume,
            ask_volume: raw.ask_volume,
            iv: c.implied_volatility,
            bs_theoretical: c.bs_theoretical,
            moneyness: c.moneyness,
            weight,
            spot_price: c.spot,
        }
    }
}
