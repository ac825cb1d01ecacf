//! Prometheus metrics
//!
//! [`init_metrics`] installs the global recorder; the helper structs below
//! only emit through the `metrics` facade, so they are no-ops when no
//! recorder is installed (tests, one-shot CLI runs).

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Initialize the Prometheus metrics exporter
///
/// Starts an HTTP listener exposing `/metrics` on the given port.
///
/// ```ignore
/// observability::metrics::init_metrics(9090)?;
/// ```
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    tracing::info!(%addr, "Metrics server listening");
    Ok(())
}

/// Outcome label for a capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    Success,
    UpstreamUnavailable,
    NoValidContracts,
    PersistenceFailure,
    Other,
}

impl CaptureOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureOutcome::Success => "success",
            CaptureOutcome::UpstreamUnavailable => "upstream_unavailable",
            CaptureOutcome::NoValidContracts => "no_valid_contracts",
            CaptureOutcome::PersistenceFailure => "persistence_failure",
            CaptureOutcome::Other => "other",
        }
    }
}

/// Pipeline metrics
///
/// * `opflow_captures_total{outcome}`
/// * `opflow_capture_duration_seconds`
/// * `opflow_contracts_processed_total`
/// * `opflow_contracts_dropped_total`
/// * `opflow_cache_hits_total` / `opflow_cache_misses_total`
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyticsMetrics;

impl AnalyticsMetrics {
    pub fn new() -> Self {
        Self
    }

    pub fn record_capture(&self, outcome: CaptureOutcome, duration: Duration) {
        counter!("opflow_captures_total", "outcome" => outcome.as_str()).increment(1);
        histogram!("opflow_capture_duration_seconds").record(duration.as_secs_f64());
    }

    pub fn record_contracts(&self, processed: usize, dropped: usize) {
        counter!("opflow_contracts_processed_total").increment(processed as u64);
        counter!("opflow_contracts_dropped_total").increment(dropped as u64);
    }

    pub fn cache_hit(&self) {
        counter!("opflow_cache_hits_total").increment(1);
    }

    pub fn cache_miss(&self) {
        counter!("opflow_cache_misses_total").increment(1);
    }
}

/// HTTP server metrics
///
/// * `opflow_http_requests_total{method, status}`
/// * `opflow_http_request_duration_seconds{method}`
#[derive(Debug, Clone)]
pub struct ServerMetrics {
    server_name: String,
}

impl ServerMetrics {
    pub fn new(server_name: &str) -> Self {
        Self {
            server_name: server_name.to_string(),
        }
    }

    /// Record a completed request
    pub fn record_request(&self, method: &str, status_code: u16, duration: Duration) {
        counter!(
            "opflow_http_requests_total",
            "server" => self.server_name.clone(),
            "method" => method.to_string(),
            "status" => status_code.to_string()
        )
        .increment(1);
        histogram!(
            "opflow_http_request_duration_seconds",
            "server" => self.server_name.clone(),
            "method" => method.to_string()
        )
        .record(duration.as_secs_f64());
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_without_recorder() {
        let metrics = ServerMetrics::new("http");
        assert_eq!(metrics.server_name(), "http");
        metrics.record_request("GET", 200, Duration::from_millis(5));

        let analytics = AnalyticsMetrics::new();
        analytics.record_capture(CaptureOutcome::Success, Duration::from_millis(120));
        analytics.record_contracts(10, 2);
        analytics.cache_hit();
        analytics.cache_miss();
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(CaptureOutcome::Success.as_str(), "success");
        assert_eq!(CaptureOutcome::NoValidContracts.as_str(), "no_valid_contracts");
    }
}
