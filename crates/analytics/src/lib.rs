//! Options analytics for Opflow
//!
//! Pure transformations over a single chain snapshot. Nothing in this crate
//! performs I/O or keeps state between calls; every function takes its batch
//! by reference and returns a fresh value.
//!
//! # Core Components
//!
//! - [`normalizer`] - Validation, moneyness, intrinsic/extrinsic, IV and Greeks
//! - [`flow`] - Weighted call/put flow and the 9-tier sentiment ladder
//! - [`gamma`] - Dealer gamma buckets, regime, flip strike and walls
//! - [`arbitrage`] - Synthetic short put screen against CDI
//! - [`series`] - B3 expiration series letters
//!
//! # Key Invariants
//!
//! - Normalized contracts keep the input order
//! - A normalized IV is always within [0.01, 3.0]
//! - For every gamma bucket, `abs_gamma >= |net_gamma|`
//! - Every gamma wall lies inside the configured band around spot

pub mod arbitrage;
pub mod flow;
pub mod gamma;
pub mod normalizer;
pub mod series;

pub use arbitrage::{screen, ArbitrageOpportunity, ScreenerFilters, ScreenerParams};
pub use flow::{aggregate_flow, classify_sentiment, FlowMetrics, Sentiment, WeightingMode};
pub use gamma::{
    analyze_gamma, GammaBucket, GammaConfig, GammaProfile, GammaRegime, GammaWall, WallType,
};
pub use normalizer::{normalize, NormalizationOutcome, NormalizationStats, NormalizerConfig};

#[cfg(test)]
mod test_support;
