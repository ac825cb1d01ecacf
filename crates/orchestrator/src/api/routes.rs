//! Axum route definitions for the analytics API.

use crate::api::handlers;
use crate::orchestrator::Orchestrator;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

/// Create all analytics routes.
///
/// # Routes
///
/// - `POST /options/flow/capture` - Capture and persist a flow snapshot
/// - `GET /options/flow/current/:ticker` - Latest stored snapshot
/// - `GET /options/flow/history/:ticker` - Stored snapshots, newest first
/// - `POST /options/gamma/analyze` - Gamma profile without persisting
/// - `POST /options/arbitrage/screen` - Protected put screen across tickers
pub fn analytics_routes(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        .route("/options/flow/capture", post(handlers::capture))
        .route("/options/flow/current/:ticker", get(handlers::current))
        .route("/options/flow/history/:ticker", get(handlers::history))
        .route("/options/gamma/analyze", post(handlers::analyze_gamma))
        .route("/options/arbitrage/screen", post(handlers::screen))
        .with_state(orchestrator)
}
