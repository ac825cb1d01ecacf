//! Capture orchestration for Opflow
//!
//! Wires the quote and chain sources, the analytics pipeline and the
//! snapshot store into request-level operations, and exposes them over HTTP.
//!
//! # Core Components
//!
//! - [`Orchestrator`] - capture, current, history, gamma analysis, screening
//! - [`TtlCache`] - per-ticker, per-minute memoization of upstream lookups
//! - [`batch`] - multi-ticker screening with bounded parallelism
//! - [`CaptureError`] - request-level error taxonomy
//! - `api` - axum routes (feature `api`)
//!
//! # Example
//!
//! ```ignore
//! use orchestrator::{Orchestrator, OrchestratorSettings};
//!
//! let orchestrator = Orchestrator::new(quotes, chains, store, OrchestratorSettings::default());
//! let result = orchestrator.capture(&Ticker::parse("PETR4")?, None).await?;
//! println!("{} -> {}", result.ticker, result.flow_metrics.sentiment);
//! ```

pub mod batch;
pub mod cache;
pub mod error;
pub mod orchestrator;
pub mod settings;

#[cfg(feature = "api")]
pub mod api;

pub use batch::{BatchScreenResult, BatchSummary, TickerScreenResult, TickerStatus};
pub use cache::TtlCache;
pub use error::{CaptureError, Result};
pub use orchestrator::{CaptureResult, CurrentSnapshot, GammaReport, Orchestrator};
pub use settings::OrchestratorSettings;

#[cfg(feature = "api")]
pub use api::analytics_routes;
