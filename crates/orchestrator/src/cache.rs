//! Per-key time-bucketed memoization
//!
//! Values are cached under `(key, unix_secs / ttl)`: an entry is reused
//! only while the clock stays inside the bucket it was fetched in. Each key
//! has its own async lock, so concurrent requests for one ticker share a
//! single upstream call while other tickers proceed independently.

use chrono::Utc;
use observability::AnalyticsMetrics;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::trace;

struct Entry<V> {
    bucket: i64,
    value: V,
}

type Slot<V> = Arc<Mutex<Option<Entry<V>>>>;

pub struct TtlCache<V> {
    name: &'static str,
    ttl_secs: i64,
    slots: RwLock<HashMap<String, Slot<V>>>,
    metrics: AnalyticsMetrics,
}

impl<V: Clone + Send> TtlCache<V> {
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl_secs: (ttl.as_secs() as i64).max(1),
            slots: RwLock::new(HashMap::new()),
            metrics: AnalyticsMetrics::new(),
        }
    }

    fn slot(&self, key: &str) -> Slot<V> {
        if let Some(slot) = self.slots.read().get(key) {
            return slot.clone();
        }
        self.slots
            .write()
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone()
    }

    /// Cached value for the current bucket, or the result of `fetch`.
    ///
    /// `None` results are not cached.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> Option<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<V>>,
    {
        self.get_or_fetch_at(key, Utc::now().timestamp(), fetch).await
    }

    /// Same as [`get_or_fetch`](Self::get_or_fetch) with an explicit clock
    pub async fn get_or_fetch_at<F, Fut>(&self, key: &str, now_secs: i64, fetch: F) -> Option<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<V>>,
    {
        let bucket = now_secs.div_euclid(self.ttl_secs);
        let slot = self.slot(key);
        let mut guard = slot.lock().await;

        if let Some(entry) = guard.as_ref() {
            if entry.bucket == bucket {
                trace!(cache = self.name, key, "hit");
                self.metrics.cache_hit();
                return Some(entry.value.clone());
            }
        }

        self.metrics.cache_miss();
        let value = fetch().await;
        match &value {
            Some(v) => {
                *guard = Some(Entry {
                    bucket,
                    value: v.clone(),
                })
            }
            None => *guard = None,
        }
        value
    }

    /// Number of keys ever seen
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
