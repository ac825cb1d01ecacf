//! SnapshotStore trait definition

use async_trait::async_trait;
use common::Ticker;

use crate::types::{OptionDetail, Snapshot, SnapshotId, SnapshotRecord};
use crate::Result;

/// SnapshotStore trait - defines the interface for snapshot storage
///
/// Implementations must serialize concurrent writes to the same
/// (ticker, date) and never expose a snapshot with a partial detail set.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Backend name for logs and health checks
    fn name(&self) -> &str;

    /// Insert or overwrite the snapshot for (ticker, date)
    ///
    /// # Returns
    /// The id of the stored row; a collision keeps the existing id
    async fn upsert_snapshot(&self, record: &SnapshotRecord) -> Result<SnapshotId>;

    /// Replace every detail row of a snapshot
    ///
    /// On failure the snapshot is left with zero details, never stale or
    /// partial ones.
    async fn replace_details(&self, id: SnapshotId, details: &[OptionDetail]) -> Result<usize>;

    /// Upsert the snapshot and replace its details in one transaction
    ///
    /// If any step fails nothing is persisted.
    async fn save_capture(&self, record: &SnapshotRecord, details: &[OptionDetail]) -> Result<SnapshotId>;

    /// Most recent snapshot for a ticker
    async fn latest(&self, ticker: &Ticker) -> Result<Option<Snapshot>>;

    /// Snapshots dated within the last `window_days`, newest first
    async fn history(&self, ticker: &Ticker, window_days: u32, limit: usize) -> Result<Vec<Snapshot>>;

    /// Detail rows of a snapshot
    async fn details(&self, id: SnapshotId) -> Result<Vec<OptionDetail>>;

    /// Cheap connectivity probe
    async fn ping(&self) -> Result<()>;
}
