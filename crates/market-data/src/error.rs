//! Market data error types

use thiserror::Error;

/// Errors raised inside the upstream adapters.
///
/// These never cross the source traits; adapters log them and return `None`.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// Network, TLS or timeout failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Payload did not match the expected shape
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Upstream has nothing for this request
    #[error("Data not available: {0}")]
    DataNotAvailable(String),

    /// Client could not be configured
    #[error("Configuration error: {0}")]
    Config(String),
}

impl MarketDataError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            MarketDataError::Status { status, .. } => Some(*status),
            MarketDataError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
