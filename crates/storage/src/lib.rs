//! Flow snapshot persistence for Opflow
//!
//! A snapshot is the flow summary of one capture, keyed by (ticker, date)
//! with the date taken on the B3 calendar (UTC-3),
//! plus the normalized contracts it was computed from. Stores only ever
//! write a snapshot together with its details: either both land or neither
//! does.
//!
//! # Backends
//!
//! - [`InMemorySnapshotStore`] - process-local, used in tests and when no
//!   database is configured
//! - [`PostgresSnapshotStore`] - PostgreSQL via sqlx (feature `postgres`)

pub mod error;
pub mod store;
pub mod types;

pub use error::StorageError;
pub use store::memory::InMemorySnapshotStore;
#[cfg(feature = "postgres")]
pub use store::postgres::PostgresSnapshotStore;
pub use store::traits::SnapshotStore;
pub use types::{market_date, OptionDetail, Snapshot, SnapshotId, SnapshotRecord};

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;
