//! Protected put screen against CDI
//!
//! Buying the underlying together with an in-the-money put locks in the
//! strike at expiry. When `spot + ask < strike` the package returns a fixed
//! gain, which is then compared with what CDI pays over the same period
//! after income tax.

use chrono::NaiveDate;
use common::{NormalizedContract, OptionSide, RawContract};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Average days per calendar month
pub const DAYS_PER_MONTH: f64 = 30.44;
pub const MIN_MONTHS: f64 = 0.1;
/// Income tax on equity derivative gains
pub const DEFAULT_IR_RATE: f64 = 0.15;

/// Income tax on fixed income, by holding period in calendar days
pub fn fixed_income_tax_rate(days: i64) -> f64 {
    match days {
        d if d <= 180 => 0.225,
        d if d <= 360 => 0.20,
        d if d <= 720 => 0.175,
        _ => 0.15,
    }
}

/// Net CDI return in percent over `months`, compounding `cdi_monthly` (percent)
pub fn cdi_net(cdi_monthly: f64, months: f64) -> f64 {
    let gross = ((1.0 + cdi_monthly / 100.0).powf(months) - 1.0) * 100.0;
    let days = (months * DAYS_PER_MONTH).round() as i64;
    gross * (1.0 - fixed_income_tax_rate(days))
}

/// Optional bands an opportunity must fall in
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenerFilters {
    /// Bounds on |delta|
    pub delta_min: Option<f64>,
    pub delta_max: Option<f64>,
    /// Bounds on `(strike - spot) / spot` in percent
    pub distance_min: Option<f64>,
    pub distance_max: Option<f64>,
    pub dte_min: Option<i64>,
    pub dte_max: Option<i64>,
}

fn within<T: PartialOrd>(value: T, min: Option<T>, max: Option<T>) -> bool {
    min.map_or(true, |m| value >= m) && max.map_or(true, |m| value <= m)
}

impl ScreenerFilters {
    fn accepts(&self, delta: Option<f64>, distance_pct: f64, dte: i64) -> bool {
        let delta_ok = match (delta, self.delta_min.is_some() || self.delta_max.is_some()) {
            (_, false) => true,
            (Some(d), true) => within(d.abs(), self.delta_min, self.delta_max),
            (None, true) => false,
        };
        delta_ok
            && within(distance_pct, self.distance_min, self.distance_max)
            && within(dte, self.dte_min, self.dte_max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenerParams {
    /// Monthly CDI in percent (0.85 means 0.85% a month)
    pub cdi_monthly: f64,
    pub volume_min: u64,
    /// Minimum gross return in percent
    pub min_return: f64,
    pub ir_rate: f64,
    #[serde(default)]
    pub filters: ScreenerFilters,
}

impl Default for ScreenerParams {
    fn default() -> Self {
        Self {
            cdi_monthly: 0.85,
            volume_min: 100,
            min_return: 1.0,
            ir_rate: DEFAULT_IR_RATE,
            filters: ScreenerFilters::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbitrageOpportunity {
    pub ticker: String,
    pub symbol: String,
    pub strike: f64,
    pub spot: f64,
    pub bid: f64,
    pub ask: f64,
    pub volume: u64,
    pub expiry_date: NaiveDate,
    pub days_to_expiry: i64,
    pub delta: Option<f64>,
    pub implied_volatility: Option<f64>,
    pub op_cost: f64,
    pub redemption: f64,
    pub gross_profit_pct: f64,
    pub net_profit_pct: f64,
    pub months: f64,
    pub monthly_net_pct: f64,
    pub cdi_net_period_pct: f64,
    pub excess_over_cdi: f64,
    pub beats_cdi: bool,
    pub distance_pct: f64,
}

fn evaluate(
    ticker: &str,
    raw: &RawContract,
    priced: Option<&NormalizedContract>,
    spot: f64,
    params: &ScreenerParams,
) -> Option<ArbitrageOpportunity> {
    let eligible = raw.side == OptionSide::Put
        && raw.strike > spot
        && raw.volume >= params.volume_min
        && raw.bid > 0.0
        && raw.ask > 0.0;
    if !eligible {
        return None;
    }

    let op_cost = spot + raw.ask;
    let redemption = raw.strike;
    let gross_profit_pct = (redemption - op_cost) / op_cost * 100.0;
    if gross_profit_pct < params.min_return {
        return None;
    }

    let delta = priced.and_then(|c| c.delta);
    let distance_pct = (raw.strike - spot) / spot * 100.0;
    if !params.filters.accepts(delta, distance_pct, raw.days_to_expiry) {
        return None;
    }

    let net_profit_pct = gross_profit_pct * (1.0 - params.ir_rate);
    let months = (raw.days_to_expiry as f64 / DAYS_PER_MONTH).max(MIN_MONTHS);
    let cdi_net_period_pct = cdi_net(params.cdi_monthly, months);
    let excess_over_cdi = net_profit_pct - cdi_net_period_pct;

    Some(ArbitrageOpportunity {
        ticker: ticker.to_string(),
        symbol: raw.symbol.clone(),
        strike: raw.strike,
        spot,
        bid: raw.bid,
        ask: raw.ask,
        volume: raw.volume,
        expiry_date: raw.expiry_date,
        days_to_expiry: raw.days_to_expiry,
        delta,
        implied_volatility: priced.and_then(|c| c.implied_volatility),
        op_cost,
        redemption,
        gross_profit_pct,
        net_profit_pct,
        months,
        monthly_net_pct: net_profit_pct / months,
        cdi_net_period_pct,
        excess_over_cdi,
        beats_cdi: excess_over_cdi > 0.0,
        distance_pct,
    })
}

/// Rank protected put opportunities for one underlying.
///
/// Scans the raw `chain`, so a put with quotes but no last trade is still
/// screened. Delta and IV come from `priced` when the contract survived
/// normalization; a contract without a delta fails any delta band.
///
/// Sorted by gross return, then volume, both descending.
pub fn screen(
    ticker: &str,
    chain: &[RawContract],
    priced: &[NormalizedContract],
    spot: f64,
    params: &ScreenerParams,
) -> Vec<ArbitrageOpportunity> {
    if spot <= 0.0 {
        return Vec::new();
    }
    let by_symbol: HashMap<&str, &NormalizedContract> = priced
        .iter()
        .map(|c| (c.contract.symbol.as_str(), c))
        .collect();
    let mut found: Vec<ArbitrageOpportunity> = chain
        .iter()
        .filter_map(|raw| evaluate(ticker, raw, by_symbol.get(raw.symbol.as_str()).copied(), spot, params))
        .collect();
    found.sort_by(|a, b| {
        b.gross_profit_pct
            .total_cmp(&a.gross_profit_pct)
            .then(b.volume.cmp(&a.volume))
    });
    found
}
