//! In-memory sources
//!
//! Stand-ins for the HTTP providers. Each source counts its upstream calls
//! so caching behavior can be asserted.

use async_trait::async_trait;
use chrono::Utc;
use common::{Bar, RawContract, SpotQuote, Ticker};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::bars::{Interval, Period};
use crate::source::{OptionChainSource, QuoteSource};

/// Quote source backed by fixed spot prices and bar series
#[derive(Default)]
pub struct MockQuoteSource {
    spots: RwLock<HashMap<String, f64>>,
    bars: RwLock<HashMap<(String, Interval), Vec<Bar>>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockQuoteSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_spot(self, ticker: &str, price: f64) -> Self {
        self.spots.write().insert(ticker.to_uppercase(), price);
        self
    }

    pub fn with_bars(self, ticker: &str, interval: Interval, bars: Vec<Bar>) -> Self {
        self.bars.write().insert((ticker.to_uppercase(), interval), bars);
        self
    }

    /// Sleep before answering, to exercise timeouts
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_spot(&self, ticker: &str, price: f64) {
        self.spots.write().insert(ticker.to_uppercase(), price);
    }

    /// Number of spot lookups served
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuoteSource for MockQuoteSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn spot(&self, ticker: &Ticker) -> Option<SpotQuote> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let price = self.spots.read().get(ticker.as_str()).copied()?;
        Some(SpotQuote {
            ticker: ticker.clone(),
            price,
            timestamp: Utc::now(),
            currency: "BRL".to_string(),
        })
    }

    async fn fetch_bars(
        &self,
        ticker: &Ticker,
        _period: Period,
        interval: Interval,
    ) -> Option<Vec<Bar>> {
        self.bars
            .read()
            .get(&(ticker.as_str().to_string(), interval))
            .cloned()
    }
}

/// Chain source backed by fixed contract lists
#[derive(Default)]
pub struct MockChainSource {
    chains: RwLock<HashMap<String, Vec<RawContract>>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockChainSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chain(self, ticker: &str, contracts: Vec<RawContract>) -> Self {
        self.chains.write().insert(ticker.to_uppercase(), contracts);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_chain(&self, ticker: &str, contracts: Vec<RawContract>) {
        self.chains.write().insert(ticker.to_uppercase(), contracts);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OptionChainSource for MockChainSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn chain(&self, ticker: &Ticker) -> Option<Vec<RawContract>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.chains.read().get(ticker.as_str()).cloned()
    }
}
