//! Pricing kernel for Opflow
//!
//! Closed-form Black-Scholes valuation with a continuous risk-free rate,
//! implied volatility by bracketed root finding, and analytic Greeks.
//!
//! # Core Components
//!
//! - [`black_scholes`] - Option value and Greeks
//! - [`implied_vol`] - Brent implied volatility with ATM approximation fallback
//! - [`rates`] - Risk-free rate lookup by currency
//!
//! # Key Invariants
//!
//! - Everything here is pure: no I/O, no global state
//! - Option values are never negative
//! - At or past expiry the value is intrinsic and gamma is zero
//! - No dividend yield term is modeled

pub mod black_scholes;
pub mod implied_vol;
pub mod rates;
pub mod types;

pub use black_scholes::{greeks, intrinsic_value, price};
pub use implied_vol::{implied_vol, solve_implied_vol, IvMethod, IvSolution};
pub use rates::RiskFreeRates;
pub use types::{BsInputs, Greeks};
