//! In-memory snapshot store implementation

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use common::Ticker;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::store::traits::SnapshotStore;
use crate::types::{market_date, OptionDetail, Snapshot, SnapshotId, SnapshotRecord};
use crate::Result;

#[derive(Debug, Clone, Default)]
struct State {
    next_id: SnapshotId,
    snapshots: BTreeMap<SnapshotId, Snapshot>,
    keys: HashMap<(Ticker, NaiveDate), SnapshotId>,
    details: HashMap<SnapshotId, Vec<OptionDetail>>,
}

impl State {
    fn upsert(&mut self, record: &SnapshotRecord) -> SnapshotId {
        let key = (record.ticker.clone(), record.date);
        let id = match self.keys.get(&key) {
            Some(id) => *id,
            None => {
                self.next_id += 1;
                self.keys.insert(key, self.next_id);
                self.next_id
            }
        };
        self.snapshots.insert(
            id,
            Snapshot {
                id,
                record: record.clone(),
            },
        );
        id
    }
}

/// In-memory snapshot store for testing and development
///
/// Writes are staged on a copy of the state and swapped in on success,
/// which gives the same all-or-nothing behavior as a database transaction.
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    state: Mutex<State>,
    /// 1-based detail row whose insert fails
    fail_on_detail: Option<usize>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the n-th detail insert of every write fail
    pub fn with_failing_detail(mut self, row: usize) -> Self {
        self.fail_on_detail = Some(row);
        self
    }

    /// Number of stored snapshot rows
    pub fn snapshot_count(&self) -> usize {
        self.state.lock().snapshots.len()
    }

    /// Number of stored detail rows across all snapshots
    pub fn detail_count(&self) -> usize {
        self.state.lock().details.values().map(Vec::len).sum()
    }

    fn insert_details(&self, staged: &mut State, id: SnapshotId, details: &[OptionDetail]) -> Result<usize> {
        let rows = staged.details.entry(id).or_default();
        rows.clear();
        for (i, detail) in details.iter().enumerate() {
            if self.fail_on_detail == Some(i + 1) {
                return Err(StorageError::Query(format!(
                    "insert of detail row {} for snapshot {} failed",
                    i + 1,
                    id
                )));
            }
            rows.push(detail.clone());
        }
        Ok(rows.len())
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn upsert_snapshot(&self, record: &SnapshotRecord) -> Result<SnapshotId> {
        Ok(self.state.lock().upsert(record))
    }

    async fn replace_details(&self, id: SnapshotId, details: &[OptionDetail]) -> Result<usize> {
        let mut state = self.state.lock();
        if !state.snapshots.contains_key(&id) {
            return Err(StorageError::NotFound(format!("snapshot {}", id)));
        }

        let mut staged = state.clone();
        match self.insert_details(&mut staged, id, details) {
            Ok(n) => {
                *state = staged;
                Ok(n)
            }
            Err(e) => {
                warn!(snapshot_id = id, error = %e, "Detail replacement failed, clearing details");
                state.details.remove(&id);
                Err(e)
            }
        }
    }

    async fn save_capture(&self, record: &SnapshotRecord, details: &[OptionDetail]) -> Result<SnapshotId> {
        let mut state = self.state.lock();
        let mut staged = state.clone();

        let id = staged.upsert(record);
        self.insert_details(&mut staged, id, details)
            .map_err(|e| StorageError::Transaction(e.to_string()))?;

        *state = staged;
        debug!(ticker = %record.ticker, snapshot_id = id, details = details.len(), "Capture saved");
        Ok(id)
    }

    async fn latest(&self, ticker: &Ticker) -> Result<Option<Snapshot>> {
        let state = self.state.lock();
        Ok(state
            .snapshots
            .values()
            .filter(|s| &s.record.ticker == ticker)
            .max_by_key(|s| (s.record.date, s.record.timestamp))
            .cloned())
    }

    async fn history(&self, ticker: &Ticker, window_days: u32, limit: usize) -> Result<Vec<Snapshot>> {
        let cutoff = market_date(Utc::now()) - Duration::days(i64::from(window_days));
        let state = self.state.lock();
        let mut found: Vec<Snapshot> = state
            .snapshots
            .values()
            .filter(|s| &s.record.ticker == ticker && s.record.date >= cutoff)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.record.date.cmp(&a.record.date));
        found.truncate(limit);
        Ok(found)
    }

    async fn details(&self, id: SnapshotId) -> Result<Vec<OptionDetail>> {
        let state = self.state.lock();
        if !state.snapshots.contains_key(&id) {
            return Err(StorageError::NotFound(format!("snapshot {}", id)));
        }
        Ok(state.details.get(&id).cloned().unwrap_or_default())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analytics::{FlowMetrics, Sentiment, WeightingMode};
    use chrono::{DateTime, TimeZone};
    use common::{Moneyness, OptionSide};

    fn metrics(call_flow: f64) -> FlowMetrics {
        FlowMetrics {
            call_flow,
            put_flow: 40.0,
            net_flow: call_flow - 40.0,
            call_put_ratio: call_flow / 41.0,
            total_volume: 250,
            call_volume: 200,
            put_volume: 50,
            total_options: 2,
            call_options: 1,
            put_options: 1,
            avg_iv: Some(0.36),
            sentiment: Sentiment::Bullish,
            weighting_mode: WeightingMode::OpenInterest,
        }
    }

    fn record(ticker: &str, at: DateTime<Utc>, call_flow: f64) -> SnapshotRecord {
        SnapshotRecord::new(Ticker::parse(ticker).unwrap(), at, 40.0, metrics(call_flow))
    }

    fn detail(symbol: &str) -> OptionDetail {
        OptionDetail {
            option_symbol: symbol.to_string(),
            strike: 40.0,
            side: OptionSide::Call,
            expiry: NaiveDate::from_ymd_opt(2024, 4, 19).unwrap(),
            days_to_expiry: 30,
            last_price: 1.0,
            volume: 100,
            bid: 0.95,
            ask: 1.05,
            bid_volume: 10,
            ask_volume: 10,
            iv: Some(0.3),
            bs_theoretical: Some(1.01),
            moneyness: Moneyness::Atm,
            weight: 150.0,
            spot_price: 40.0,
        }
    }

    fn details(n: usize) -> Vec<OptionDetail> {
        (0..n).map(|i| detail(&format!("OPT{}", i))).collect()
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent_per_day() {
        let store = InMemorySnapshotStore::new();
        let now = Utc::now();

        let first = store.save_capture(&record("PETR4", now, 100.0), &details(5)).await.unwrap();
        let second = store
            .save_capture(&record("PETR4", now + Duration::seconds(30), 175.0), &details(3))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(store.snapshot_count(), 1);
        assert_eq!(store.detail_count(), 3);
        let latest = store.latest(&Ticker::parse("PETR4").unwrap()).await.unwrap().unwrap();
        assert_eq!(latest.record.metrics.call_flow, 175.0);
    }

    #[tokio::test]
    async fn test_failed_capture_persists_nothing() {
        let store = InMemorySnapshotStore::new().with_failing_detail(3);
        let err = store
            .save_capture(&record("PETR4", Utc::now(), 100.0), &details(5))
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::Transaction(_)));
        assert_eq!(store.snapshot_count(), 0);
        assert_eq!(store.detail_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_replace_leaves_zero_details() {
        let store = InMemorySnapshotStore::new().with_failing_detail(3);
        let id = store.upsert_snapshot(&record("VALE3", Utc::now(), 80.0)).await.unwrap();
        store.replace_details(id, &details(2)).await.unwrap();
        assert_eq!(store.details(id).await.unwrap().len(), 2);

        assert!(store.replace_details(id, &details(5)).await.is_err());
        assert!(store.details(id).await.unwrap().is_empty());
        assert_eq!(store.snapshot_count(), 1);
    }

    #[tokio::test]
    async fn test_history_newest_first() {
        let store = InMemorySnapshotStore::new();
        let now = Utc::now();
        for days_ago in [0i64, 3, 1, 40] {
            store
                .save_capture(&record("PETR4", now - Duration::days(days_ago), 100.0 + days_ago as f64), &[])
                .await
                .unwrap();
        }
        store.save_capture(&record("VALE3", now, 1.0), &[]).await.unwrap();

        let petr4 = Ticker::parse("PETR4").unwrap();
        let recent = store.history(&petr4, 30, 10).await.unwrap();
        let ages: Vec<f64> = recent.iter().map(|s| s.record.metrics.call_flow - 100.0).collect();
        assert_eq!(ages, vec![0.0, 1.0, 3.0]);

        assert_eq!(store.history(&petr4, 30, 2).await.unwrap().len(), 2);
        assert_eq!(store.history(&petr4, 365, 10).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_unknown_snapshot() {
        let store = InMemorySnapshotStore::new();
        assert!(store.latest(&Ticker::parse("ITUB4").unwrap()).await.unwrap().is_none());
        assert!(matches!(store.details(42).await, Err(StorageError::NotFound(_))));
        assert!(store.replace_details(42, &details(1)).await.is_err());
    }

    #[tokio::test]
    async fn test_latest_picks_most_recent_date() {
        let store = InMemorySnapshotStore::new();
        let day = |d: u32| Utc.with_ymd_and_hms(2024, 3, d, 18, 0, 0).unwrap();
        store.save_capture(&record("BBAS3", day(4), 1.0), &[]).await.unwrap();
        store.save_capture(&record("BBAS3", day(6), 3.0), &[]).await.unwrap();
        store.save_capture(&record("BBAS3", day(5), 2.0), &[]).await.unwrap();

        let latest = store.latest(&Ticker::parse("BBAS3").unwrap()).await.unwrap().unwrap();
        assert_eq!(latest.record.metrics.call_flow, 3.0);
        assert_eq!(latest.record.date, NaiveDate::from_ymd_opt(2024, 3, 6).unwrap());
    }
}
