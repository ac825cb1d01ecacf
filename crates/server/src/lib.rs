//! HTTP server infrastructure for Opflow
//!
//! Lifecycle, middleware and health endpoints around an axum router. The
//! analytics routes themselves live in the orchestrator crate.
//!
//! # Architecture
//!
//! [`HttpServer`] implements the [`Server`] trait; [`ServerExt`] adds
//! `spawn()` and `run_until_signal()`. Shutdown is coordinated through a
//! `CancellationToken`, so cancelling a parent token stops every child.
//!
//! # Quick Start
//!
//! ```ignore
//! use server::{HealthState, HttpServer, ServerConfig, ServerExt};
//!
//! let router = orchestrator::analytics_routes(orchestrator)
//!     .merge(server::health_routes(Arc::new(HealthState::new("opflow"))));
//! HttpServer::new(ServerConfig::default(), router)
//!     .run_until_signal()
//!     .await?;
//! ```
//!
//! # Modules
//!
//! - [`config`] - Bind address and request timeout
//! - [`traits`] - `Server` and `ServerExt` traits
//! - [`http`] - Axum server and middleware stack
//! - [`health`] - Liveness and dependency probes
//! - [`shutdown`] - Signal handling

pub mod config;
pub mod error;
pub mod health;
pub mod http;
pub mod port_validator;
pub mod shutdown;
pub mod traits;

pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use health::{health_routes, ConnectionStatus, HealthProbe, HealthState};
pub use http::HttpServer;
pub use port_validator::{validate_port_available, validate_port_range};
pub use shutdown::{shutdown_signal, ShutdownController};
pub use traits::{Server, ServerExt};
