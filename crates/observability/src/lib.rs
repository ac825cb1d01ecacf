//! Observability for Opflow
//!
//! - Structured logging via tracing
//! - Prometheus metrics for the capture pipeline and the HTTP server
//!
//! ```ignore
//! use observability::{init_logging, LogFormat};
//!
//! init_logging("opflow", LogFormat::Pretty)?;
//! observability::metrics::init_metrics(9090)?;
//! ```

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogFormat};
pub use metrics::{init_metrics, AnalyticsMetrics, CaptureOutcome, ServerMetrics};
