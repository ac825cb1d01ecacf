//! Server configuration

use crate::error::{Result, ServerError};
use std::net::SocketAddr;
use std::time::Duration;

/// Default HTTP port
pub const DEFAULT_HTTP_PORT: u16 = 8000;

/// Default upper bound on a single request
///
/// Covers the slowest upstream call (15s) plus the store write (15s).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(35);

/// HTTP server configuration
///
/// # Example
///
/// ```
/// use server::config::ServerConfig;
///
/// let config = ServerConfig::new("127.0.0.1", 8000);
/// assert_eq!(config.http_addr().unwrap().port(), 8000);
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// HTTP port; 0 binds an ephemeral port
    pub http_port: u16,
    /// Requests running longer than this get a 408
    pub request_timeout: Duration,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, http_port: u16) -> Self {
        Self {
            host: host.into(),
            http_port,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Socket address to bind
    pub fn http_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.http_port)
            .parse()
            .map_err(|_| ServerError::InvalidAddress(format!("{}:{}", self.host, self.http_port)))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new("0.0.0.0", DEFAULT_HTTP_PORT)
    }
}
