//! Market data sources for Opflow
//!
//! This crate is the only place upstream payloads are seen. Everything it
//! returns is already mapped into the shared value types of `common`.
//!
//! # Core Components
//!
//! - [`source`] - `QuoteSource` and `OptionChainSource` traits
//! - [`http`] - Shared upstream client with timeouts and retry/backoff
//! - [`brapi`] - HTTP quote provider (spot and historical bars)
//! - [`oplab`] - HTTP option chain provider
//! - [`bars`] - Period/interval keywords, bar cleanup and 4h resampling
//! - [`mock`] - In-memory sources for tests
//!
//! # Key Invariants
//!
//! - Sources fail softly: missing data is `None`, never a panic or raw error
//! - Bars are chronologically sorted with unique timestamps
//! - The chain source never estimates a quote; every default it
//!   substitutes is recorded in `RawContract::defaulted`

pub mod bars;
pub mod brapi;
pub mod error;
pub mod http;
pub mod mock;
pub mod oplab;
pub mod source;

pub use bars::{Interval, Period};
pub use brapi::BrapiQuoteSource;
pub use error::MarketDataError;
pub use http::{RetryPolicy, UpstreamClient, UpstreamConfig};
pub use mock::{MockChainSource, MockQuoteSource};
pub use oplab::OplabChainSource;
pub use source::{OptionChainSource, QuoteSource};

pub type Result<T> = std::result::Result<T, MarketDataError>;
