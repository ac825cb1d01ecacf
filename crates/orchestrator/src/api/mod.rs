//! HTTP API for the analytics pipeline.
//!
//! ## Modules
//!
//! - `handlers` - Axum handlers mapping requests onto the orchestrator
//! - `routes` - Router wiring
//! - `models` - Request/response types

pub mod handlers;
pub mod models;
pub mod routes;

pub use models::ErrorResponse;
pub use routes::analytics_routes;
