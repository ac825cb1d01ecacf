//! Contract normalization
//!
//! Turns the raw chain into priced contracts: reject unusable rows, derive
//! moneyness and intrinsic/extrinsic value, fill implied volatility and Greeks.

use common::{IvSource, Moneyness, NormalizedContract, RawContract};
use pricing::{greeks, intrinsic_value, price, solve_implied_vol, IvMethod};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// IV assigned to unpriceable contracts kept for flow weighting
pub const FALLBACK_IV: f64 = 0.20;
pub const MIN_IV: f64 = 0.01;
pub const MAX_IV: f64 = 3.0;

/// Relative tolerance for accepting a provider-reported IV
pub const UPSTREAM_IV_TOLERANCE: f64 = 0.01;

pub const DAYS_PER_YEAR: f64 = 365.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Half-width of the ATM band relative to spot
    pub moneyness_band: f64,
    pub risk_free_rate: f64,
    /// Keep contracts whose IV cannot be solved, at a flat fallback IV
    pub keep_for_flow: bool,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            moneyness_band: 0.05,
            risk_free_rate: pricing::rates::DEFAULT_BRL_RATE,
            keep_for_flow: false,
        }
    }
}

/// Row counts for one normalization pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationStats {
    pub raw_contracts: usize,
    /// Rejected before pricing (non-positive price/strike/spot, negative dte)
    pub filtered_contracts: usize,
    /// Rejected because no implied volatility could be obtained
    pub dropped_contracts: usize,
    /// Kept with the fallback IV
    pub degraded_contracts: usize,
    /// Kept contracts carrying at least one defaulted upstream field
    pub defaulted_contracts: usize,
}

#[derive(Debug, Clone)]
pub struct NormalizationOutcome {
    pub contracts: Vec<NormalizedContract>,
    pub stats: NormalizationStats,
}

fn passes_filters(c: &RawContract, spot: f64) -> bool {
    c.last_trade_price > 0.0 && spot > 0.0 && c.strike > 0.0 && c.days_to_expiry >= 0
}

/// Upstream IV is trusted only if in range and it reprices the last trade
fn accepted_upstream_iv(c: &RawContract, spot: f64, t: f64, r: f64) -> Option<f64> {
    let iv = c.implied_volatility.filter(|v| (MIN_IV..=MAX_IV).contains(v))?;
    if t <= 0.0 {
        return None;
    }
    let model = price(spot, c.strike, t, r, iv, c.side);
    let err = (model - c.last_trade_price).abs() / c.last_trade_price;
    (err <= UPSTREAM_IV_TOLERANCE).then_some(iv)
}

fn resolve_iv(c: &RawContract, spot: f64, t: f64, config: &NormalizerConfig) -> Option<(f64, IvSource)> {
    let r = config.risk_free_rate;
    if let Some(iv) = accepted_upstream_iv(c, spot, t, r) {
        return Some((iv, IvSource::Upstream));
    }
    let solved = solve_implied_vol(c.last_trade_price, spot, c.strike, t, r, c.side)
        .filter(|s| (MIN_IV..=MAX_IV).contains(&s.sigma));
    match solved {
        Some(s) if s.method == IvMethod::Brent => Some((s.sigma, IvSource::Solved)),
        Some(s) => Some((s.sigma, IvSource::Approximated)),
        None if config.keep_for_flow => Some((FALLBACK_IV, IvSource::Fallback)),
        None => None,
    }
}

/// Normalize a raw chain against a spot price.
///
/// Output order follows input order.
pub fn normalize(raw: &[RawContract], spot: f64, config: &NormalizerConfig) -> NormalizationOutcome {
    let mut stats = NormalizationStats {
        raw_contracts: raw.len(),
        ..Default::default()
    };
    let r = config.risk_free_rate;
    let mut contracts = Vec::with_capacity(raw.len());

    for c in raw {
        if !passes_filters(c, spot) {
            stats.filtered_contracts += 1;
            continue;
        }

        let t = c.days_to_expiry as f64 / DAYS_PER_YEAR;
        let Some((iv, iv_source)) = resolve_iv(c, spot, t, config) else {
            debug!(symbol = %c.symbol, days = c.days_to_expiry, "No implied volatility, dropping contract");
            stats.dropped_contracts += 1;
            continue;
        };

        let degraded = iv_source == IvSource::Fallback;
        if degraded {
            stats.degraded_contracts += 1;
        }
        if c.defaulted.any() {
            stats.defaulted_contracts += 1;
        }

        let intrinsic = intrinsic_value(spot, c.strike, c.side);
        let g = greeks(spot, c.strike, t, r, iv, c.side);

        contracts.push(NormalizedContract {
            fingerprint: format!("{}|{}|{:.2}|{}", c.symbol, c.side, c.strike, c.expiry_date),
            spot,
            time_to_expiry_years: t,
            moneyness: Moneyness::classify(c.strike, spot, c.side, config.moneyness_band),
            intrinsic,
            extrinsic_bid: c.bid - intrinsic,
            extrinsic_ask: c.ask - intrinsic,
            implied_volatility: Some(iv),
            iv_source: Some(iv_source),
            gamma: Some(g.gamma),
            delta: Some(g.delta),
            bs_theoretical: Some(price(spot, c.strike, t, r, iv, c.side)),
            liquidity_score: c.volume as f64 + 0.5 * c.open_interest as f64,
            degraded,
            contract: c.clone(),
        });
    }

    NormalizationOutcome { contracts, stats }
}
