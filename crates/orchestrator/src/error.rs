//! Capture error types

use storage::StorageError;
use thiserror::Error;

/// Errors surfaced by the capture pipeline
///
/// Adapter failures never escape raw; they become `UpstreamUnavailable`.
/// Per-contract pricing failures are not errors at all.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// Quote or chain provider returned nothing
    #[error("{provider} has no data for {ticker}")]
    UpstreamUnavailable { provider: String, ticker: String },

    /// Chain present but every contract was filtered out
    #[error("No valid contracts for {ticker} ({raw} raw contracts)")]
    NoValidContracts { ticker: String, raw: usize },

    /// Store rolled back
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    /// Malformed request input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Store call exceeded its deadline
    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: &'static str, secs: u64 },

    /// Nothing stored for the request
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CaptureError {
    pub fn upstream(provider: impl Into<String>, ticker: impl std::fmt::Display) -> Self {
        CaptureError::UpstreamUnavailable {
            provider: provider.into(),
            ticker: ticker.to_string(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        CaptureError::Validation(msg.into())
    }

    /// HTTP status for this error
    pub fn status_code(&self) -> u16 {
        match self {
            CaptureError::UpstreamUnavailable { .. }
            | CaptureError::NoValidContracts { .. }
            | CaptureError::NotFound(_) => 404,
            CaptureError::Validation(_) => 400,
            CaptureError::PersistenceFailure(_)
            | CaptureError::Timeout { .. }
            | CaptureError::Internal(_) => 500,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            CaptureError::UpstreamUnavailable { .. } => "UPSTREAM_UNAVAILABLE",
            CaptureError::NoValidContracts { .. } => "NO_VALID_CONTRACTS",
            CaptureError::PersistenceFailure(_) => "PERSISTENCE_FAILURE",
            CaptureError::Validation(_) => "VALIDATION_ERROR",
            CaptureError::Timeout { .. } => "TIMEOUT",
            CaptureError::NotFound(_) => "NOT_FOUND",
            CaptureError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the same request may succeed later
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            CaptureError::UpstreamUnavailable { .. } | CaptureError::Timeout { .. }
        )
    }
}

impl From<StorageError> for CaptureError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(what) => CaptureError::NotFound(what),
            other => CaptureError::PersistenceFailure(other.to_string()),
        }
    }
}

impl From<common::Error> for CaptureError {
    fn from(e: common::Error) -> Self {
        match e {
            common::Error::InvalidInput(msg) => CaptureError::Validation(msg),
            common::Error::NotFound(msg) => CaptureError::NotFound(msg),
            other => CaptureError::Internal(other.to_string()),
        }
    }
}

/// Result type for capture operations
pub type Result<T> = std::result::Result<T, CaptureError>;
