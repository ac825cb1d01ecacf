//! Dealer gamma exposure
//!
//! Contracts are bucketed by strike and weighted from the dealer's side of
//! the trade. The resulting grid gives the regime, the flip strike and the
//! gamma walls around spot.
//!
//! Sign convention: a positive bucket means dealers are long gamma there and
//! hedge against the move (support); a negative bucket means they chase it
//! (resistance).

use common::NormalizedContract;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GammaConfig {
    /// Strike grid step
    pub bucket_size: f64,
    /// Half-width of the wall search band relative to spot
    pub wall_band: f64,
    /// Fraction of open interest held short by dealers, in [0, 1]
    pub dealer_short_ratio: f64,
    /// Buckets with |net_gamma| below this are dropped
    pub min_net_gamma: f64,
    pub max_walls: usize,
}

impl Default for GammaConfig {
    fn default() -> Self {
        Self {
            bucket_size: 0.5,
            wall_band: 0.15,
            dealer_short_ratio: 1.0,
            min_net_gamma: 1e-3,
            max_walls: 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GammaBucket {
    pub strike: f64,
    pub net_gamma: f64,
    pub abs_gamma: f64,
    /// Unsigned gamma-weight from calls
    pub call_gamma: f64,
    /// Unsigned gamma-weight from puts
    pub put_gamma: f64,
    pub total_volume: u64,
    pub contracts: usize,
}

impl GammaBucket {
    fn empty(strike: f64) -> Self {
        Self {
            strike,
            net_gamma: 0.0,
            abs_gamma: 0.0,
            call_gamma: 0.0,
            put_gamma: 0.0,
            total_volume: 0,
            contracts: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GammaRegime {
    LongGamma,
    ShortGamma,
}

impl GammaRegime {
    pub fn from_net_exposure(net: f64) -> Self {
        if net > 0.0 {
            GammaRegime::LongGamma
        } else {
            GammaRegime::ShortGamma
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            GammaRegime::LongGamma => "Long Gamma: low realized volatility, mean-reverting",
            GammaRegime::ShortGamma => "Short Gamma: high realized volatility, momentum",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WallType {
    Support,
    Resistance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GammaWall {
    pub strike: f64,
    pub net_gamma: f64,
    /// |net_gamma| relative to the largest |net_gamma| in the band
    pub intensity: f64,
    #[serde(rename = "type")]
    pub wall_type: WallType,
    pub distance_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GammaProfile {
    pub spot: f64,
    pub buckets: Vec<GammaBucket>,
    pub strikes: Vec<f64>,
    pub net_gamma: Vec<f64>,
    pub net_exposure: f64,
    pub regime: GammaRegime,
    pub flip_strike: Option<f64>,
    pub walls: Vec<GammaWall>,
    pub call_gamma: f64,
    pub put_gamma: f64,
    pub skew: f64,
}

/// Dealer-side gamma of one contract: `-sign * gamma * weight * (2r - 1)`
pub fn dealer_gamma_contribution(c: &NormalizedContract, dealer_short_ratio: f64) -> Option<f64> {
    let gamma = c.gamma?;
    let positioning = 2.0 * dealer_short_ratio - 1.0;
    Some(-c.side().sign() * gamma * c.contract.weight_proxy() * positioning)
}

fn bucket_key(strike: f64, step: f64) -> f64 {
    (strike / step).round() * step
}

/// Group contracts on the strike grid, ascending, dropping near-zero buckets
pub fn build_buckets(contracts: &[NormalizedContract], config: &GammaConfig) -> Vec<GammaBucket> {
    let mut grid: BTreeMap<OrderedFloat<f64>, GammaBucket> = BTreeMap::new();

    for c in contracts {
        let Some(contribution) = dealer_gamma_contribution(c, config.dealer_short_ratio) else {
            continue;
        };
        if !contribution.is_finite() {
            continue;
        }
        let strike = bucket_key(c.strike(), config.bucket_size);
        let bucket = grid
            .entry(OrderedFloat(strike))
            .or_insert_with(|| GammaBucket::empty(strike));

        bucket.net_gamma += contribution;
        bucket.abs_gamma += contribution.abs();
        let exposure = c.gamma.unwrap_or(0.0) * c.contract.weight_proxy();
        if c.side().is_call() {
            bucket.call_gamma += exposure;
        } else {
            bucket.put_gamma += exposure;
        }
        bucket.total_volume += c.volume();
        bucket.contracts += 1;
    }

    grid.into_values()
        .filter(|b| b.net_gamma.abs() >= config.min_net_gamma)
        .collect()
}

fn sign(x: f64) -> i8 {
    if x > 0.0 {
        1
    } else if x < 0.0 {
        -1
    } else {
        0
    }
}

/// Strike where the cumulative net gamma, summed from the lowest strike up,
/// changes sign.
///
/// The reported strike is the start of the run of same-signed buckets that
/// carried the cumulative sum across zero.
pub fn find_flip_strike(buckets: &[GammaBucket]) -> Option<f64> {
    let mut cumulative = 0.0;
    let mut cumulative_sign = 0i8;
    let mut run_start: Option<f64> = None;
    let mut prev_sign = 0i8;

    for b in buckets {
        let s = sign(b.net_gamma);
        if run_start.is_none() || s != prev_sign {
            run_start = Some(b.strike);
        }
        prev_sign = s;

        cumulative += b.net_gamma;
        let cs = sign(cumulative);
        if cs == 0 {
            continue;
        }
        if cumulative_sign != 0 && cs != cumulative_sign {
            return run_start;
        }
        cumulative_sign = cs;
    }
    None
}

/// Indices of local maxima at least `min_height` tall and at least
/// `distance` apart, taller peaks winning.
pub fn find_peaks(values: &[f64], min_height: f64, distance: usize) -> Vec<usize> {
    if values.len() < 3 {
        return Vec::new();
    }
    let mut candidates: Vec<usize> = (1..values.len() - 1)
        .filter(|&i| values[i] > values[i - 1] && values[i] >= values[i + 1] && values[i] >= min_height)
        .collect();

    candidates.sort_by(|a, b| values[*b].total_cmp(&values[*a]));
    let mut kept: Vec<usize> = Vec::new();
    for i in candidates {
        if kept.iter().all(|k| k.abs_diff(i) >= distance) {
            kept.push(i);
        }
    }
    kept.sort_unstable();
    kept
}

/// Linear-interpolated percentile, `q` in [0, 1]
fn percentile(values: &[f64], q: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = q * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

/// Gamma walls inside `band` of spot, strongest first
pub fn detect_walls(buckets: &[GammaBucket], spot: f64, band: f64, max_walls: usize) -> Vec<GammaWall> {
    if spot <= 0.0 {
        return Vec::new();
    }
    let in_band: Vec<&GammaBucket> = buckets
        .iter()
        .filter(|b| ((b.strike - spot) / spot).abs() <= band)
        .collect();
    let max_abs = in_band
        .iter()
        .map(|b| b.net_gamma.abs())
        .fold(0.0_f64, f64::max);
    if in_band.is_empty() || max_abs <= 0.0 {
        return Vec::new();
    }

    let wall = |b: &GammaBucket, wall_type: WallType| GammaWall {
        strike: b.strike,
        net_gamma: b.net_gamma,
        intensity: b.net_gamma.abs() / max_abs,
        wall_type,
        distance_pct: (b.strike - spot) / spot * 100.0,
    };

    let net: Vec<f64> = in_band.iter().map(|b| b.net_gamma).collect();
    let mirrored: Vec<f64> = net.iter().map(|v| -v).collect();
    let distance = (in_band.len() / 8).max(2);
    let min_height = 0.3 * max_abs;

    let mut walls: Vec<GammaWall> = find_peaks(&net, min_height, distance)
        .into_iter()
        .map(|i| wall(in_band[i], WallType::Support))
        .chain(
            find_peaks(&mirrored, min_height, distance)
                .into_iter()
                .map(|i| wall(in_band[i], WallType::Resistance)),
        )
        .collect();

    if walls.is_empty() {
        let intensities: Vec<f64> = in_band.iter().map(|b| b.net_gamma.abs() / max_abs).collect();
        let cutoff = percentile(&intensities, 0.7);
        trace!(cutoff, buckets = in_band.len(), "No gamma peaks, using intensity percentile");
        walls = in_band
            .iter()
            .filter(|b| b.net_gamma.abs() / max_abs >= cutoff)
            .map(|b| {
                let wall_type = if b.net_gamma > 0.0 {
                    WallType::Support
                } else {
                    WallType::Resistance
                };
                wall(b, wall_type)
            })
            .collect();
    }

    walls.sort_by(|a, b| b.intensity.total_cmp(&a.intensity));
    walls.truncate(max_walls);
    walls
}

/// Full dealer gamma profile for one chain snapshot
pub fn analyze_gamma(contracts: &[NormalizedContract], spot: f64, config: &GammaConfig) -> GammaProfile {
    let buckets = build_buckets(contracts, config);

    let net_exposure: f64 = buckets.iter().map(|b| b.net_gamma).sum();
    let call_gamma: f64 = buckets.iter().map(|b| b.call_gamma).sum();
    let put_gamma: f64 = buckets.iter().map(|b| b.put_gamma).sum();
    let denom = call_gamma.abs() + put_gamma.abs();
    let skew = if denom > 0.0 {
        (call_gamma - put_gamma) / denom
    } else {
        0.0
    };

    GammaProfile {
        spot,
        strikes: buckets.iter().map(|b| b.strike).collect(),
        net_gamma: buckets.iter().map(|b| b.net_gamma).collect(),
        net_exposure,
        regime: GammaRegime::from_net_exposure(net_exposure),
        flip_strike: find_flip_strike(&buckets),
        walls: detect_walls(&buckets, spot, config.wall_band, config.max_walls),
        call_gamma,
        put_gamma,
        skew,
        buckets,
    }
}
