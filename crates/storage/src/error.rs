//! Storage error types

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query error
    #[error("Query error: {0}")]
    Query(String),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Transaction error; nothing from the unit of work was kept
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// A stored row could not be mapped back to a domain value
    #[error("Decode error: {0}")]
    Decode(String),
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for StorageError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => StorageError::NotFound(e.to_string()),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StorageError::Connection(e.to_string())
            }
            other => StorageError::Query(other.to_string()),
        }
    }
}
