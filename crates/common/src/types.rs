//! Common types used across Opflow
//!
//! This module provides the fundamental domain types that flow through
//! the analytics pipeline: tickers, option sides, upstream contracts as
//! reported by the chain provider, and their normalized form.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Underlying asset ticker (e.g., "PETR4", "VALE3")
///
/// Always stored uppercase with any exchange suffix (".SA") removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ticker(String);

impl Ticker {
    /// Maximum accepted length after normalization
    pub const MAX_LEN: usize = 12;

    /// Parse and normalize a ticker
    pub fn parse(s: &str) -> crate::Result<Self> {
        let upper = s.trim().to_uppercase();
        let stripped = upper.strip_suffix(".SA").unwrap_or(&upper);

        if stripped.is_empty() {
            return Err(Error::invalid_input("ticker must not be empty"));
        }
        if stripped.len() > Self::MAX_LEN {
            return Err(Error::invalid_input(format!(
                "ticker '{}' exceeds {} characters",
                stripped,
                Self::MAX_LEN
            )));
        }
        if !stripped.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::invalid_input(format!(
                "ticker '{}' must be alphanumeric",
                stripped
            )));
        }

        Ok(Self(stripped.to_string()))
    }

    /// Get the ticker as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Ticker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Ticker {
    type Error = Error;

    fn try_from(s: String) -> crate::Result<Self> {
        Self::parse(&s)
    }
}

impl From<Ticker> for String {
    fn from(t: Ticker) -> Self {
        t.0
    }
}

impl std::str::FromStr for Ticker {
    type Err = Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        Self::parse(s)
    }
}

/// Option side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OptionSide {
    Call,
    Put,
}

impl OptionSide {
    /// +1 for calls, -1 for puts
    pub fn sign(&self) -> f64 {
        match self {
            OptionSide::Call => 1.0,
            OptionSide::Put => -1.0,
        }
    }

    pub fn is_call(&self) -> bool {
        matches!(self, OptionSide::Call)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OptionSide::Call => "CALL",
            OptionSide::Put => "PUT",
        }
    }
}

impl std::fmt::Display for OptionSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OptionSide {
    type Err = Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "CALL" | "C" => Ok(OptionSide::Call),
            "PUT" | "P" => Ok(OptionSide::Put),
            other => Err(Error::invalid_input(format!("unknown option side: {}", other))),
        }
    }
}

/// Moneyness relative to spot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Moneyness {
    Itm,
    Atm,
    Otm,
}

impl Moneyness {
    /// Classify a strike against spot with a symmetric relative ATM band.
    ///
    /// A strike within `band` of spot (e.g. 0.05 for ±5%) is ATM regardless of side.
    pub fn classify(strike: f64, spot: f64, side: OptionSide, band: f64) -> Self {
        if ((strike - spot) / spot).abs() <= band {
            return Moneyness::Atm;
        }
        let in_the_money = match side {
            OptionSide::Call => spot > strike,
            OptionSide::Put => strike > spot,
        };
        if in_the_money {
            Moneyness::Itm
        } else {
            Moneyness::Otm
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Moneyness::Itm => "ITM",
            Moneyness::Atm => "ATM",
            Moneyness::Otm => "OTM",
        }
    }
}

impl std::fmt::Display for Moneyness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Moneyness {
    type Err = Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "ITM" => Ok(Moneyness::Itm),
            "ATM" => Ok(Moneyness::Atm),
            "OTM" => Ok(Moneyness::Otm),
            other => Err(Error::invalid_input(format!("unknown moneyness: {}", other))),
        }
    }
}

/// Spot price observation for an underlying
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotQuote {
    pub ticker: Ticker,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
    /// Currency hint from the provider (e.g. "BRL")
    pub currency: String,
}

/// Historical OHLCV bar, timezone-stripped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Fields the chain adapter filled with a default instead of an upstream value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultedFields {
    #[serde(default)]
    pub last_price: bool,
    #[serde(default)]
    pub bid: bool,
    #[serde(default)]
    pub ask: bool,
    #[serde(default)]
    pub volume: bool,
    #[serde(default)]
    pub open_interest: bool,
    #[serde(default)]
    pub bid_volume: bool,
    #[serde(default)]
    pub ask_volume: bool,
}

impl DefaultedFields {
    /// True if any field was substituted
    pub fn any(&self) -> bool {
        self.count() > 0
    }

    /// Number of substituted fields
    pub fn count(&self) -> usize {
        [
            self.last_price,
            self.bid,
            self.ask,
            self.volume,
            self.open_interest,
            self.bid_volume,
            self.ask_volume,
        ]
        .iter()
        .filter(|f| **f)
        .count()
    }
}

/// Option contract as reported by the chain provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawContract {
    pub symbol: String,
    pub side: OptionSide,
    pub strike: f64,
    pub expiry_date: NaiveDate,
    pub days_to_expiry: i64,
    pub last_trade_price: f64,
    pub bid: f64,
    pub ask: f64,
    pub volume: u64,
    pub open_interest: u64,
    #[serde(default)]
    pub bid_volume: u64,
    #[serde(default)]
    pub ask_volume: u64,
    pub spot_at_observation: f64,
    /// Provider-computed implied volatility, if reported
    #[serde(default)]
    pub implied_volatility: Option<f64>,
    #[serde(default)]
    pub defaulted: DefaultedFields,
}

impl RawContract {
    /// Liquidity weight: open interest when reported, otherwise volume
    pub fn weight_proxy(&self) -> f64 {
        if self.open_interest > 0 {
            self.open_interest as f64
        } else {
            self.volume as f64
        }
    }
}

/// How a contract's implied volatility was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IvSource {
    /// Reported by the provider and consistent with the market price
    Upstream,
    /// Root-found from the market price
    Solved,
    /// ATM approximation after the bracket failed
    Approximated,
    /// Flat fallback used only to keep the contract for flow weighting
    Fallback,
}

impl IvSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            IvSource::Upstream => "upstream",
            IvSource::Solved => "solved",
            IvSource::Approximated => "approximated",
            IvSource::Fallback => "fallback",
        }
    }
}

/// Contract after validation, enrichment and pricing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedContract {
    #[serde(flatten)]
    pub contract: RawContract,
    /// Spot used for every derived field below
    pub spot: f64,
    /// Stable identity for the contract across captures
    pub fingerprint: String,
    pub time_to_expiry_years: f64,
    pub moneyness: Moneyness,
    pub intrinsic: f64,
    pub extrinsic_bid: f64,
    pub extrinsic_ask: f64,
    pub implied_volatility: Option<f64>,
    pub iv_source: Option<IvSource>,
    pub gamma: Option<f64>,
    pub delta: Option<f64>,
    /// Model value at the contract's implied volatility
    pub bs_theoretical: Option<f64>,
    pub liquidity_score: f64,
    /// IV is a flat fallback rather than market-derived
    #[serde(default)]
    pub degraded: bool,
}

impl NormalizedContract {
    pub fn side(&self) -> OptionSide {
        self.contract.side
    }

    pub fn strike(&self) -> f64 {
        self.contract.strike
    }

    pub fn symbol(&self) -> &str {
        &self.contract.symbol
    }

    pub fn volume(&self) -> u64 {
        self.contract.volume
    }

    pub fn open_interest(&self) -> u64 {
        self.contract.open_interest
    }

    /// Negative extrinsic on the ask side: the option trades below intrinsic
    pub fn has_negative_extrinsic(&self) -> bool {
        self.extrinsic_ask < 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticker_normalization() {
        let t = Ticker::parse(" petr4.sa ").unwrap();
        assert_eq!(t.as_str(), "PETR4");
        assert_eq!(t.to_string(), "PETR4");

        assert!(Ticker::parse("").is_err());
        assert!(Ticker::parse("PETR-4").is_err());
        assert!(Ticker::parse("ABCDEFGHIJKLMN").is_err());
    }

    #[test]
    fn test_ticker_serde() {
        let t: Ticker = serde_json::from_str("\"vale3\"").unwrap();
        assert_eq!(t.as_str(), "VALE3");
        assert_eq!(serde_json::to_string(&t).unwrap(), "\"VALE3\"");
        assert!(serde_json::from_str::<Ticker>("\"$$\"").is_err());
    }

    #[test]
    fn test_option_side() {
        assert_eq!(OptionSide::Call.sign(), 1.0);
        assert_eq!(OptionSide::Put.sign(), -1.0);
        assert_eq!("put".parse::<OptionSide>().unwrap(), OptionSide::Put);
        assert_eq!(serde_json::to_string(&OptionSide::Call).unwrap(), "\"CALL\"");
    }

    #[test]
    fn test_moneyness_band() {
        // Within ±5% of spot is ATM for both sides
        assert_eq!(Moneyness::classify(41.0, 40.0, OptionSide::Call, 0.05), Moneyness::Atm);
        assert_eq!(Moneyness::classify(39.0, 40.0, OptionSide::Put, 0.05), Moneyness::Atm);

        assert_eq!(Moneyness::classify(35.0, 40.0, OptionSide::Call, 0.05), Moneyness::Itm);
        assert_eq!(Moneyness::classify(35.0, 40.0, OptionSide::Put, 0.05), Moneyness::Otm);
        assert_eq!(Moneyness::classify(45.0, 40.0, OptionSide::Call, 0.05), Moneyness::Otm);
        assert_eq!(Moneyness::classify(45.0, 40.0, OptionSide::Put, 0.05), Moneyness::Itm);
    }

    #[test]
    fn test_defaulted_fields() {
        let mut d = DefaultedFields::default();
        assert!(!d.any());
        d.volume = true;
        d.bid = true;
        assert!(d.any());
        assert_eq!(d.count(), 2);
    }
}
