//! Implied volatility from a market premium
//!
//! Brent's method over a fixed volatility bracket. When the premium is
//! outside what the bracket can produce (deep OTM lottery tickets, stale
//! prints below intrinsic) an at-the-money approximation is returned instead.

use common::OptionSide;
use roots::{find_root_brent, SimpleConvergency};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::black_scholes::price;

/// Lower edge of the search bracket
pub const IV_LOWER: f64 = 0.01;
/// Upper edge of the search bracket
pub const IV_UPPER: f64 = 3.0;
pub const MAX_ITERATIONS: usize = 100;
pub const TOLERANCE: f64 = 1e-8;

/// Clamp range for the ATM approximation
pub const APPROX_MIN: f64 = 0.05;
pub const APPROX_MAX: f64 = 2.0;

/// Which path produced the volatility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IvMethod {
    Brent,
    AtmApprox,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IvSolution {
    pub sigma: f64,
    pub method: IvMethod,
}

/// `market_price / (0.4 * spot * sqrt(t))`, clamped to [0.05, 2.0]
pub fn atm_approx(market_price: f64, spot: f64, t: f64) -> f64 {
    let raw = market_price / (0.4 * spot * t.sqrt());
    if raw.is_finite() {
        raw.clamp(APPROX_MIN, APPROX_MAX)
    } else {
        APPROX_MAX
    }
}

/// Solve for volatility and report how it was obtained.
///
/// Returns `None` iff `market_price <= 0` or `t <= 0`.
pub fn solve_implied_vol(
    market_price: f64,
    spot: f64,
    strike: f64,
    t: f64,
    r: f64,
    side: OptionSide,
) -> Option<IvSolution> {
    if market_price <= 0.0 || t <= 0.0 || !market_price.is_finite() || !t.is_finite() {
        return None;
    }

    let objective = |sigma: f64| price(spot, strike, t, r, sigma, side) - market_price;

    let lo = objective(IV_LOWER);
    let hi = objective(IV_UPPER);

    if lo * hi <= 0.0 {
        let mut convergency = SimpleConvergency {
            eps: TOLERANCE,
            max_iter: MAX_ITERATIONS,
        };
        match find_root_brent(IV_LOWER, IV_UPPER, &objective, &mut convergency) {
            Ok(sigma) => {
                return Some(IvSolution {
                    sigma: sigma.clamp(IV_LOWER, IV_UPPER),
                    method: IvMethod::Brent,
                })
            }
            Err(e) => trace!(?e, market_price, strike, "brent did not converge"),
        }
    } else {
        trace!(market_price, strike, t, "premium outside volatility bracket");
    }

    Some(IvSolution {
        sigma: atm_approx(market_price, spot, t),
        method: IvMethod::AtmApprox,
    })
}

/// Implied volatility, or `None` when the premium or time to expiry is not positive.
pub fn implied_vol(
    market_price: f64,
    spot: f64,
    strike: f64,
    t: f64,
    r: f64,
    side: OptionSide,
) -> Option<f64> {
    solve_implied_vol(market_price, spot, strike, t, r, side).map(|s| s.sigma)
}
