//! HTTP server implementation using Axum
//!
//! Every router served here is wrapped in request tracing, a request
//! timeout and per-request metrics. Dropping a request future (client gone,
//! timeout) drops the handler with it, so in-flight upstream calls abort.

use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use observability::ServerMetrics;
use parking_lot::RwLock;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};
use crate::traits::Server;

/// Records method, status and latency of every request
async fn track_requests(
    State(metrics): State<Arc<ServerMetrics>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let started = Instant::now();
    let response = next.run(request).await;
    metrics.record_request(&method, response.status().as_u16(), started.elapsed());
    response
}

/// Apply the standard middleware stack to a router
pub fn with_middleware(router: Router, config: &ServerConfig, metrics: Arc<ServerMetrics>) -> Router {
    router
        .layer(middleware::from_fn_with_state(metrics, track_requests))
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(TraceLayer::new_for_http())
}

/// HTTP server implementation using Axum
///
/// # Example
///
/// ```ignore
/// use server::{HttpServer, ServerConfig, ServerExt};
///
/// let router = orchestrator::analytics_routes(orchestrator)
///     .merge(server::health::health_routes(health));
/// HttpServer::new(ServerConfig::new("0.0.0.0", 8000), router)
///     .run_until_signal()
///     .await?;
/// ```
#[derive(Clone)]
pub struct HttpServer {
    config: ServerConfig,
    router: Router,
    running: Arc<AtomicBool>,
    bound_addr: Arc<RwLock<Option<SocketAddr>>>,
}

impl HttpServer {
    /// Create a new HTTP server serving `router` behind the middleware stack
    pub fn new(config: ServerConfig, router: Router) -> Self {
        let metrics = Arc::new(ServerMetrics::new("http"));
        let router = with_middleware(router, &config, metrics);
        Self {
            config,
            router,
            running: Arc::new(AtomicBool::new(false)),
            bound_addr: Arc::new(RwLock::new(None)),
        }
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the router (for testing or inspection)
    pub fn router(&self) -> &Router {
        &self.router
    }
}

#[async_trait]
impl Server for HttpServer {
    fn name(&self) -> &str {
        "http"
    }

    fn address(&self) -> Option<SocketAddr> {
        *self.bound_addr.read()
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn run(&self, shutdown_token: CancellationToken) -> Result<()> {
        let addr = self.config.http_addr()?;

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ServerError::bind(addr.to_string(), e))?;
        let local_addr = listener.local_addr().map_err(ServerError::Io)?;
        *self.bound_addr.write() = Some(local_addr);

        info!(%local_addr, "HTTP server listening");
        self.running.store(true, Ordering::SeqCst);

        let result = axum::serve(listener, self.router.clone())
            .with_graceful_shutdown(async move {
                shutdown_token.cancelled().await;
                info!("HTTP server received shutdown signal");
            })
            .await;

        self.running.store(false, Ordering::SeqCst);
        *self.bound_addr.write() = None;

        match result {
            Ok(()) => {
                info!("HTTP server shutdown complete");
                Ok(())
            }
            Err(e) => {
                error!(%e, "HTTP server error");
                Err(ServerError::Io(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ServerExt;
    use axum::body::Body;
    use axum::http::{self, StatusCode};
    use axum::routing::get;
    use std::time::Duration;
    use tower::ServiceExt;

    fn ephemeral() -> ServerConfig {
        ServerConfig::new("127.0.0.1", 0)
    }

    #[tokio::test]
    async fn test_http_server_shutdown() {
        let server = HttpServer::new(ephemeral(), Router::new().route("/", get(|| async { "ok" })));
        let probe = server.clone();
        let (handle, token) = server.spawn();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(probe.is_running());
        assert!(probe.address().is_some());

        token.cancel();
        let result = tokio::time::timeout(Duration::from_secs(5), handle).await;
        assert!(result.is_ok(), "Server should shutdown within timeout");
        assert!(!probe.is_running());
    }

    #[tokio::test]
    async fn test_slow_requests_time_out() {
        let config = ephemeral().with_request_timeout(Duration::from_millis(20));
        let router = Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        );
        let server = HttpServer::new(config, router);

        let response = server
            .router()
            .clone()
            .oneshot(http::Request::builder().uri("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }

    #[test]
    fn test_http_server_name() {
        let server = HttpServer::new(ephemeral(), Router::new());
        assert_eq!(server.name(), "http");
        assert!(!server.is_running());
    }
}
