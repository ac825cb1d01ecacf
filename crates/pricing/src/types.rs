//! Shared types for the pricing kernel

use common::OptionSide;
use serde::{Deserialize, Serialize};

/// Inputs for Black-Scholes pricing
#[derive(Debug, Clone, Copy)]
pub struct BsInputs {
    /// Spot price of the underlying
    pub spot: f64,
    /// Strike price
    pub strike: f64,
    /// Time to expiry in years
    pub time: f64,
    /// Volatility as a decimal (0.35 = 35%)
    pub vol: f64,
    /// Continuously compounded risk-free rate
    pub rate: f64,
    pub side: OptionSide,
}

impl BsInputs {
    pub fn new(spot: f64, strike: f64, time: f64, rate: f64, vol: f64, side: OptionSide) -> Self {
        Self {
            spot,
            strike,
            time,
            vol,
            rate,
            side,
        }
    }

    /// Clamp inputs to ranges where the closed form is well defined
    pub fn validate(&mut self) {
        self.vol = self.vol.clamp(crate::black_scholes::MIN_VOL, crate::black_scholes::MAX_VOL);
        self.spot = self.spot.max(1e-6);
        self.strike = self.strike.max(1e-6);
    }

    /// True once the option has expired
    pub fn is_expired(&self) -> bool {
        self.time <= 0.0
    }
}

/// Option Greeks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    /// Delta: ∂V/∂S
    pub delta: f64,
    /// Gamma: ∂²V/∂S²
    pub gamma: f64,
    /// Vega: ∂V/∂σ
    pub vega: f64,
    /// Theta: ∂V/∂t (per year)
    pub theta: f64,
    /// Rho: ∂V/∂r
    pub rho: f64,
}

impl Greeks {
    pub fn zero() -> Self {
        Self {
            delta: 0.0,
            gamma: 0.0,
            vega: 0.0,
            theta: 0.0,
            rho: 0.0,
        }
    }
}
