//! Health endpoints
//!
//! `/health` is a liveness check and never touches dependencies.
//! `/health/detailed` runs every registered [`HealthProbe`] concurrently.

use async_trait::async_trait;
use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Reachability of one dependency
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub service: String,
    pub connected: bool,
    pub latency_ms: Option<u64>,
    pub error: Option<String>,
}

/// A dependency the detailed health check should reach
#[async_trait]
pub trait HealthProbe: Send + Sync {
    fn name(&self) -> &str;

    /// `Err` carries a human-readable reason
    async fn check(&self) -> Result<(), String>;
}

/// Shared state for health checks
pub struct HealthState {
    pub service_name: String,
    pub start_time: Instant,
    probes: Vec<Arc<dyn HealthProbe>>,
    probe_timeout: Duration,
}

impl HealthState {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            start_time: Instant::now(),
            probes: Vec::new(),
            probe_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_probe(mut self, probe: Arc<dyn HealthProbe>) -> Self {
        self.probes.push(probe);
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    async fn run_probe(&self, probe: &dyn HealthProbe) -> ConnectionStatus {
        let start = Instant::now();
        let outcome = tokio::time::timeout(self.probe_timeout, probe.check()).await;
        let latency_ms = Some(start.elapsed().as_millis() as u64);

        let error = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(reason)) => Some(reason),
            Err(_) => Some("Probe timed out".to_string()),
        };
        ConnectionStatus {
            service: probe.name().to_string(),
            connected: error.is_none(),
            latency_ms,
            error,
        }
    }

    /// Run every probe concurrently
    pub async fn check_all(&self) -> Vec<ConnectionStatus> {
        futures::future::join_all(self.probes.iter().map(|p| self.run_probe(p.as_ref()))).await
    }
}

/// Liveness
pub async fn health_handler(State(state): State<Arc<HealthState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": state.service_name,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
        "uptime_seconds": state.uptime_seconds(),
    }))
}

/// Dependency reachability; 503 when any probe fails
pub async fn detailed_health_handler(
    State(state): State<Arc<HealthState>>,
) -> (StatusCode, Json<Value>) {
    let connections = state.check_all().await;
    let all_healthy = connections.iter().all(|c| c.connected);
    let status_code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let health = json!({
        "status": if all_healthy { "healthy" } else { "degraded" },
        "service": state.service_name,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
        "uptime_seconds": state.uptime_seconds(),
        "connections": connections,
        "healthy": all_healthy,
    });

    (status_code, Json(health))
}

/// Create health check router
pub fn health_routes(state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/health/detailed", get(detailed_health_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    struct FixedProbe {
        name: &'static str,
        result: Result<(), String>,
        delay: Duration,
    }

    #[async_trait]
    impl HealthProbe for FixedProbe {
        fn name(&self) -> &str {
            self.name
        }

        async fn check(&self) -> Result<(), String> {
            tokio::time::sleep(self.delay).await;
            self.result.clone()
        }
    }

    fn probe(name: &'static str, result: Result<(), String>) -> Arc<dyn HealthProbe> {
        Arc::new(FixedProbe {
            name,
            result,
            delay: Duration::ZERO,
        })
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_liveness_ignores_probes() {
        let state = HealthState::new("opflow").with_probe(probe("store", Err("down".into())));
        let (status, body) = get_json(health_routes(Arc::new(state)), "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "opflow");
    }

    #[tokio::test]
    async fn test_detailed_reports_each_probe() {
        let healthy = HealthState::new("opflow").with_probe(probe("store", Ok(())));
        let (status, body) = get_json(health_routes(Arc::new(healthy)), "/health/detailed").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["healthy"], true);
        assert_eq!(body["connections"][0]["service"], "store");

        let degraded = HealthState::new("opflow")
            .with_probe(probe("store", Ok(())))
            .with_probe(probe("postgres", Err("connection refused".into())));
        let (status, body) = get_json(health_routes(Arc::new(degraded)), "/health/detailed").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["connections"][1]["error"], "connection refused");
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_probe_times_out() {
        let state = HealthState::new("opflow")
            .with_probe(Arc::new(FixedProbe {
                name: "store",
                result: Ok(()),
                delay: Duration::from_secs(60),
            }))
            .with_probe_timeout(Duration::from_millis(50));

        let statuses = state.check_all().await;
        assert!(!statuses[0].connected);
        assert_eq!(statuses[0].error.as_deref(), Some("Probe timed out"));
    }
}
