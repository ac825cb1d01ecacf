use chrono::{DateTime, NaiveDateTime};
use common::Bar;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// History lookback keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "5d")]
    FiveDays,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "max")]
    Max,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::OneDay => "1d",
            Period::FiveDays => "5d",
            Period::OneMonth => "1mo",
            Period::ThreeMonths => "3mo",
            Period::SixMonths => "6mo",
            Period::OneYear => "1y",
            Period::TwoYears => "2y",
            Period::Max => "max",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "1d" => Some(Period::OneDay),
            "5d" => Some(Period::FiveDays),
            "1mo" => Some(Period::OneMonth),
            "3mo" => Some(Period::ThreeMonths),
            "6mo" => Some(Period::SixMonths),
            "1y" => Some(Period::OneYear),
            "2y" => Some(Period::TwoYears),
            "max" => Some(Period::Max),
            _ => None,
        }
    }

    /// Smallest period covering `days` calendar days
    pub fn covering_days(days: u32) -> Self {
        match days {
            0..=1 => Period::OneDay,
            2..=5 => Period::FiveDays,
            6..=31 => Period::OneMonth,
            32..=92 => Period::ThreeMonths,
            93..=183 => Period::SixMonths,
            184..=366 => Period::OneYear,
            367..=731 => Period::TwoYears,
            _ => Period::Max,
        }
    }
}

/// Bar interval. `FourHours` is never requested upstream; it is built from hourly bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "4h")]
    FourHours,
    #[serde(rename = "1d")]
    OneDay,
}

impl Interval {
    pub fn as_seconds(&self) -> i64 {
        match self {
            Interval::OneMinute => 60,
            Interval::OneHour => 3600,
            Interval::FourHours => 14400,
            Interval::OneDay => 86400,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::OneMinute => "1m",
            Interval::OneHour => "1h",
            Interval::FourHours => "4h",
            Interval::OneDay => "1d",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "1m" => Some(Interval::OneMinute),
            "1h" => Some(Interval::OneHour),
            "4h" => Some(Interval::FourHours),
            "1d" => Some(Interval::OneDay),
            _ => None,
        }
    }
}

/// Sort by timestamp, keep the last bar per timestamp, drop bars with non-finite prices
pub fn normalize_bars(bars: Vec<Bar>) -> Vec<Bar> {
    let mut by_time: BTreeMap<NaiveDateTime, Bar> = BTreeMap::new();
    for bar in bars {
        let finite = [bar.open, bar.high, bar.low, bar.close, bar.volume]
            .iter()
            .all(|v| v.is_finite());
        if finite {
            by_time.insert(bar.timestamp, bar);
        }
    }
    by_time.into_values().collect()
}

/// End of the right-closed bucket `(end - width, end]` containing `ts`
fn bucket_end(ts: NaiveDateTime, width: i64) -> Option<NaiveDateTime> {
    let secs = ts.and_utc().timestamp();
    let end = (secs + width - 1).div_euclid(width) * width;
    DateTime::from_timestamp(end, 0).map(|dt| dt.naive_utc())
}

/// Aggregate hourly bars into 4h bars.
///
/// Buckets are right-closed and labelled by their right edge; empty buckets
/// are not emitted.
pub fn resample_4h(hourly: &[Bar]) -> Vec<Bar> {
    let width = Interval::FourHours.as_seconds();
    let mut buckets: BTreeMap<NaiveDateTime, Bar> = BTreeMap::new();

    for bar in normalize_bars(hourly.to_vec()) {
        let Some(end) = bucket_end(bar.timestamp, width) else {
            continue;
        };
        buckets
            .entry(end)
            .and_modify(|agg| {
                agg.high = agg.high.max(bar.high);
                agg.low = agg.low.min(bar.low);
                agg.close = bar.close;
                agg.volume += bar.volume;
            })
            .or_insert_with(|| Bar {
                timestamp: end,
                ..bar.clone()
            });
    }

    buckets.into_values().collect()
}

/// Annualized close-to-close volatility of daily bars
pub fn realized_volatility(bars: &[Bar]) -> Option<f64> {
    let returns: Vec<f64> = bars
        .windows(2)
        .filter(|w| w[0].close > 0.0 && w[1].close > 0.0)
        .map(|w| (w[1].close / w[0].close).ln())
        .collect();
    if returns.len() < 2 {
        return None;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some((var * 252.0).sqrt())
}
