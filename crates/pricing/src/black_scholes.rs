use common::OptionSide;
use std::f64::consts::PI;

use crate::types::{BsInputs, Greeks};

pub const MIN_VOL: f64 = 0.01;
pub const MAX_VOL: f64 = 5.0;

pub fn norm_pdf(x: f64) -> f64 {
    (1.0 / (2.0 * PI).sqrt()) * (-0.5 * x * x).exp()
}

/// Standard normal CDF (Abramowitz-Stegun 26.2.17, |error| < 7.5e-8)
pub fn norm_cdf(x: f64) -> f64 {
    let k = 1.0 / (1.0 + 0.2316419 * x.abs());
    let poly = k * (0.319381530
        + k * (-0.356563782
        + k * (1.781477937
        + k * (-1.821255978
        + k * 1.330274429))));

    let approx = 1.0 - norm_pdf(x) * poly;

    if x >= 0.0 {
        approx
    } else {
        1.0 - approx
    }
}

pub fn d1_d2(input: &BsInputs) -> (f64, f64) {
    let s = input.spot;
    let k = input.strike;
    let t = input.time;
    let v = input.vol;
    let r = input.rate;

    let d1 = ((s / k).ln() + (r + 0.5 * v * v) * t) / (v * t.sqrt());
    let d2 = d1 - v * t.sqrt();

    (d1, d2)
}

pub fn intrinsic_value(spot: f64, strike: f64, side: OptionSide) -> f64 {
    match side {
        OptionSide::Call => (spot - strike).max(0.0),
        OptionSide::Put => (strike - spot).max(0.0),
    }
}

pub fn black_scholes_price(mut input: BsInputs) -> f64 {
    if input.is_expired() {
        return intrinsic_value(input.spot, input.strike, input.side);
    }
    input.validate();

    let (d1, d2) = d1_d2(&input);
    let s = input.spot;
    let k = input.strike;
    let t = input.time;
    let r = input.rate;

    let value = match input.side {
        OptionSide::Call => s * norm_cdf(d1) - k * (-r * t).exp() * norm_cdf(d2),
        OptionSide::Put => k * (-r * t).exp() * norm_cdf(-d2) - s * norm_cdf(-d1),
    };

    value.max(0.0)
}

/// Black-Scholes value of a European option.
///
/// Returns intrinsic value when `t <= 0`.
pub fn price(spot: f64, strike: f64, t: f64, r: f64, sigma: f64, side: OptionSide) -> f64 {
    black_scholes_price(BsInputs::new(spot, strike, t, r, sigma, side))
}

pub fn black_scholes_greeks(mut input: BsInputs) -> Greeks {
    if input.is_expired() {
        return expired_greeks(input.spot, input.strike, input.side);
    }
    input.validate();

    let (d1, d2) = d1_d2(&input);
    let s = input.spot;
    let k = input.strike;
    let t = input.time;
    let v = input.vol;
    let r = input.rate;

    let pdf = norm_pdf(d1);
    let sqrt_t = t.sqrt();
    let discount = (-r * t).exp();

    let delta = match input.side {
        OptionSide::Call => norm_cdf(d1).clamp(0.0, 1.0),
        OptionSide::Put => (norm_cdf(d1) - 1.0).clamp(-1.0, 0.0),
    };

    let gamma = pdf / (s * v * sqrt_t);

    let vega = s * pdf * sqrt_t;

    let theta = match input.side {
        OptionSide::Call => -(s * pdf * v) / (2.0 * sqrt_t) - r * k * discount * norm_cdf(d2),
        OptionSide::Put => -(s * pdf * v) / (2.0 * sqrt_t) + r * k * discount * norm_cdf(-d2),
    };

    let rho = match input.side {
        OptionSide::Call => k * t * discount * norm_cdf(d2),
        OptionSide::Put => -k * t * discount * norm_cdf(-d2),
    };

    Greeks {
        delta,
        gamma: gamma.max(0.0),
        vega,
        theta,
        rho,
    }
}

/// Analytic Greeks at volatility `sigma`.
pub fn greeks(spot: f64, strike: f64, t: f64, r: f64, sigma: f64, side: OptionSide) -> Greeks {
    black_scholes_greeks(BsInputs::new(spot, strike, t, r, sigma, side))
}

/// At expiry delta is a step on moneyness and every other sensitivity vanishes
fn expired_greeks(spot: f64, strike: f64, side: OptionSide) -> Greeks {
    let delta = match side {
        OptionSide::Call if spot > strike => 1.0,
        OptionSide::Put if spot < strike => -1.0,
        _ => 0.0,
    };
    Greeks {
        delta,
        ..Greeks::zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T30: f64 = 30.0 / 365.0;

    #[test]
    fn test_call_price_itm() {
        let value = price(60.0, 50.0, T30, 0.1275, 0.5, OptionSide::Call);
        assert!(value >= 10.0);
    }

    #[test]
    fn test_put_price_otm() {
        let value = price(60.0, 50.0, T30, 0.1275, 0.5, OptionSide::Put);
        assert!(value > 0.0 && value < 1.0);
    }

    #[test]
    fn test_expired_returns_intrinsic() {
        assert_eq!(price(45.0, 40.0, 0.0, 0.1275, 0.3, OptionSide::Call), 5.0);
        assert_eq!(price(45.0, 40.0, -0.01, 0.1275, 0.3, OptionSide::Put), 0.0);
        assert_eq!(price(35.0, 40.0, 0.0, 0.1275, 0.3, OptionSide::Put), 5.0);
    }

    #[test]
    fn test_put_call_parity() {
        let (spot, strike, rate, vol) = (50.0, 52.0, 0.1275, 0.35);

        let call = price(spot, strike, T30, rate, vol, OptionSide::Call);
        let put = price(spot, strike, T30, rate, vol, OptionSide::Put);

        let parity_lhs = call - put;
        let parity_rhs = spot - strike * (-rate * T30).exp();

        assert!((parity_lhs - parity_rhs).abs() < 1e-4);
    }

    #[test]
    fn test_call_delta_atm() {
        let g = greeks(50.0, 50.0, T30, 0.0, 0.5, OptionSide::Call);
        assert!(g.delta > 0.4 && g.delta < 0.6);
    }

    #[test]
    fn test_delta_bounds() {
        for strike in [10.0, 40.0, 50.0, 60.0, 500.0] {
            let call = greeks(50.0, strike, T30, 0.1275, 0.4, OptionSide::Call);
            let put = greeks(50.0, strike, T30, 0.1275, 0.4, OptionSide::Put);
            assert!((0.0..=1.0).contains(&call.delta));
            assert!((-1.0..=0.0).contains(&put.delta));
            assert!(call.gamma >= 0.0 && put.gamma >= 0.0);
        }
    }

    #[test]
    fn test_expired_greeks() {
        let itm_call = greeks(45.0, 40.0, 0.0, 0.1275, 0.3, OptionSide::Call);
        assert_eq!(itm_call.delta, 1.0);
        assert_eq!(itm_call.gamma, 0.0);

        let otm_put = greeks(45.0, 40.0, 0.0, 0.1275, 0.3, OptionSide::Put);
        assert_eq!(otm_put.delta, 0.0);

        let itm_put = greeks(35.0, 40.0, 0.0, 0.1275, 0.3, OptionSide::Put);
        assert_eq!(itm_put.delta, -1.0);
    }

    #[test]
    fn test_gamma_matches_finite_difference() {
        let (s, k, r, v) = (40.0, 40.0, 0.1275, 0.35);
        let h = 0.5;
        let up = price(s + h, k, T30, r, v, OptionSide::Call);
        let mid = price(s, k, T30, r, v, OptionSide::Call);
        let down = price(s - h, k, T30, r, v, OptionSide::Call);
        let fd_gamma = (up - 2.0 * mid + down) / (h * h);

        let g = greeks(s, k, T30, r, v, OptionSide::Call);
        assert!((g.gamma - fd_gamma).abs() / g.gamma < 0.05);
    }

    #[test]
    fn test_intrinsic_value() {
        assert!((intrinsic_value(60.0, 50.0, OptionSide::Call) - 10.0).abs() < 1e-12);
        assert!((intrinsic_value(40.0, 50.0, OptionSide::Put) - 10.0).abs() < 1e-12);
        assert_eq!(intrinsic_value(40.0, 50.0, OptionSide::Call), 0.0);
        assert_eq!(intrinsic_value(60.0, 50.0, OptionSide::Put), 0.0);
    }

    #[test]
    fn test_norm_cdf_symmetry() {
        assert!((norm_cdf(0.5) + norm_cdf(-0.5) - 1.0).abs() < 1e-10);
        assert!((norm_cdf(10.0) - 1.0).abs() < 1e-10);
        assert!(norm_cdf(-10.0).abs() < 1e-10);
    }

    #[test]
    fn test_theta_negative_long_call() {
        let g = greeks(50.0, 50.0, T30, 0.0, 0.5, OptionSide::Call);
        assert!(g.theta < 0.0);
        assert!(g.vega > 0.0);
    }
}
