#![allow(dead_code)]

use chrono::{Duration, Utc};
use common::{DefaultedFields, OptionSide, RawContract, Ticker};
use market_data::{MockChainSource, MockQuoteSource};
use orchestrator::{Orchestrator, OrchestratorSettings};
use pricing::rates::DEFAULT_BRL_RATE;
use std::sync::Arc;
use storage::InMemorySnapshotStore;

pub fn ticker(s: &str) -> Ticker {
    Ticker::parse(s).unwrap()
}

/// Contract whose last trade is the model price at `sigma`, with a 2% spread
pub fn contract(
    root: &str,
    side: OptionSide,
    strike: f64,
    spot: f64,
    sigma: f64,
    dte: i64,
    open_interest: u64,
) -> RawContract {
    let t = dte as f64 / 365.0;
    let last = pricing::price(spot, strike, t, DEFAULT_BRL_RATE, sigma, side);
    RawContract {
        symbol: format!("{}{}{:.0}", root, side.as_str().chars().next().unwrap_or('X'), strike * 10.0),
        side,
        strike,
        expiry_date: Utc::now().date_naive() + Duration::days(dte),
        days_to_expiry: dte,
        last_trade_price: last,
        bid: last * 0.99,
        ask: last * 1.01,
        volume: 300,
        open_interest,
        bid_volume: 20,
        ask_volume: 20,
        spot_at_observation: spot,
        implied_volatility: None,
        defaulted: DefaultedFields::default(),
    }
}

/// Call-heavy chain around `spot`
pub fn bullish_chain(root: &str, spot: f64) -> Vec<RawContract> {
    let mut chain = Vec::new();
    for offset in [-2.0, -1.0, 0.0, 1.0, 2.0] {
        let strike = spot + offset;
        chain.push(contract(root, OptionSide::Call, strike, spot, 0.35, 30, 5_000));
        chain.push(contract(root, OptionSide::Put, strike, spot, 0.40, 30, 400));
    }
    chain
}

/// Chain holding one protected put that beats CDI (spot 50, K 55, ask 4.00)
pub fn arbitrage_chain(root: &str) -> Vec<RawContract> {
    let mut put = contract(root, OptionSide::Put, 55.0, 50.0, 0.45, 60, 1_000);
    put.bid = 3.80;
    put.ask = 4.00;
    put.volume = 500;
    let mut chain = bullish_chain(root, 50.0);
    chain.push(put);
    chain
}

pub struct Harness {
    pub quotes: Arc<MockQuoteSource>,
    pub chains: Arc<MockChainSource>,
    pub store: Arc<InMemorySnapshotStore>,
    pub orchestrator: Arc<Orchestrator>,
}

impl Harness {
    pub fn new(quotes: MockQuoteSource, chains: MockChainSource) -> Self {
        Self::with_store(quotes, chains, InMemorySnapshotStore::new(), OrchestratorSettings::default())
    }

    pub fn with_store(
        quotes: MockQuoteSource,
        chains: MockChainSource,
        store: InMemorySnapshotStore,
        settings: OrchestratorSettings,
    ) -> Self {
        let quotes = Arc::new(quotes);
        let chains = Arc::new(chains);
        let store = Arc::new(store);
        let orchestrator = Arc::new(Orchestrator::new(
            quotes.clone(),
            chains.clone(),
            store.clone(),
            settings,
        ));
        Self {
            quotes,
            chains,
            store,
            orchestrator,
        }
    }

    /// PETR4 at 40 and VALE3 at 50, both with liquid chains
    pub fn standard() -> Self {
        Self::new(
            MockQuoteSource::new()
                .with_spot("PETR4", 40.0)
                .with_spot("VALE3", 50.0),
            MockChainSource::new()
                .with_chain("PETR4", bullish_chain("PETR", 40.0))
                .with_chain("VALE3", arbitrage_chain("VALE")),
        )
    }
}
