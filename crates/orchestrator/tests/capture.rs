mod support;

use analytics::ScreenerParams;
use common::{IvSource, OptionSide};
use market_data::{MockChainSource, MockQuoteSource};
use orchestrator::{CaptureError, OrchestratorSettings, TickerStatus};
use std::time::Duration;
use storage::InMemorySnapshotStore;
use support::{arbitrage_chain, bullish_chain, contract, ticker, Harness};

#[tokio::test]
async fn test_bullish_capture_is_persisted() {
    let h = Harness::standard();
    let result = h.orchestrator.capture(&ticker("petr4"), None).await.unwrap();

    assert_eq!(result.ticker.as_str(), "PETR4");
    assert_eq!(result.spot, 40.0);
    assert_eq!(result.options_count, 10);
    assert!(result.flow_metrics.call_flow > result.flow_metrics.put_flow);
    assert!(result.flow_metrics.net_flow > 0.0);
    assert!(result.flow_metrics.sentiment.is_bullish());
    assert!(result.screener.is_none());

    assert_eq!(result.data_quality.raw_contracts, 10);
    assert_eq!(result.data_quality.dropped_contracts, 0);
    assert_eq!(h.store.snapshot_count(), 1);
    assert_eq!(h.store.detail_count(), 10);

    let current = h.orchestrator.current(&ticker("PETR4"), true).await.unwrap();
    assert_eq!(current.snapshot.id, result.snapshot_id);
    assert_eq!(current.snapshot.record.metrics, result.flow_metrics);
    assert_eq!(current.details.map(|d| d.len()), Some(10));
}

#[tokio::test]
async fn test_stored_ivs_reprice_market() {
    let h = Harness::standard();
    let result = h.orchestrator.capture(&ticker("PETR4"), None).await.unwrap();
    let current = h.orchestrator.current(&ticker("PETR4"), true).await.unwrap();

    for detail in current.details.unwrap() {
        let model = detail.bs_theoretical.unwrap();
        let err = (model - detail.last_price).abs() / detail.last_price;
        assert!(err <= 0.01, "{} reprices at {} vs {}", detail.option_symbol, model, detail.last_price);
    }
    assert!(result.gamma.buckets.iter().all(|b| b.abs_gamma >= b.net_gamma.abs()));
    assert!(result
        .gamma
        .walls
        .iter()
        .all(|w| (w.strike - 40.0).abs() / 40.0 <= 0.15));
}

#[tokio::test]
async fn test_recapture_same_day_is_idempotent() {
    let h = Harness::standard();
    let first = h.orchestrator.capture(&ticker("PETR4"), None).await.unwrap();
    let second = h.orchestrator.capture(&ticker("PETR4"), None).await.unwrap();

    assert_eq!(first.snapshot_id, second.snapshot_id);
    assert_eq!(h.store.snapshot_count(), 1);
    assert_eq!(h.store.detail_count(), second.options_count);
}

#[tokio::test]
async fn test_failed_detail_insert_leaves_nothing() {
    let h = Harness::with_store(
        MockQuoteSource::new().with_spot("PETR4", 40.0),
        MockChainSource::new().with_chain("PETR4", bullish_chain("PETR", 40.0)),
        InMemorySnapshotStore::new().with_failing_detail(1),
        OrchestratorSettings::default(),
    );

    let err = h.orchestrator.capture(&ticker("PETR4"), None).await.unwrap_err();
    assert!(matches!(err, CaptureError::PersistenceFailure(_)));
    assert_eq!(err.status_code(), 500);
    assert_eq!(h.store.snapshot_count(), 0);
    assert_eq!(h.store.detail_count(), 0);

    let missing = h.orchestrator.current(&ticker("PETR4"), false).await.unwrap_err();
    assert_eq!(missing.code(), "NOT_FOUND");
}

#[tokio::test]
async fn test_unknown_ticker_is_upstream_unavailable() {
    let h = Harness::standard();
    let err = h.orchestrator.capture(&ticker("ZZZZ3"), None).await.unwrap_err();

    assert_eq!(err.code(), "UPSTREAM_UNAVAILABLE");
    assert_eq!(err.status_code(), 404);
    assert!(err.is_retriable());
    assert_eq!(h.store.snapshot_count(), 0);
}

#[tokio::test]
async fn test_fully_filtered_chain() {
    let mut chain = bullish_chain("PETR", 40.0);
    for c in &mut chain {
        c.last_trade_price = 0.0;
    }
    let h = Harness::new(
        MockQuoteSource::new().with_spot("PETR4", 40.0),
        MockChainSource::new().with_chain("PETR4", chain),
    );

    let err = h.orchestrator.capture(&ticker("PETR4"), None).await.unwrap_err();
    assert!(matches!(err, CaptureError::NoValidContracts { raw: 10, .. }));
    assert_eq!(err.status_code(), 404);
}

#[tokio::test]
async fn test_far_otm_contract_stays_finite() {
    let mut far = contract("PETR", OptionSide::Call, 1000.0, 100.0, 0.3, 4, 100);
    far.last_trade_price = 0.01;
    far.bid = 0.01;
    far.ask = 0.02;
    let mut chain = bullish_chain("PETR", 100.0);
    chain.push(far);

    let h = Harness::new(
        MockQuoteSource::new().with_spot("PETR4", 100.0),
        MockChainSource::new().with_chain("PETR4", chain),
    );
    let result = h.orchestrator.capture(&ticker("PETR4"), None).await.unwrap();

    assert!(result.flow_metrics.call_flow.is_finite());
    assert!(result.gamma.net_gamma.is_finite());
    let details = h
        .orchestrator
        .current(&ticker("PETR4"), true)
        .await
        .unwrap()
        .details
        .unwrap();
    assert!(details.iter().all(|d| d.weight.is_finite()));
    if let Some(d) = details.iter().find(|d| d.strike == 1000.0) {
        assert!(d.iv.unwrap() <= 2.0);
    }
}

#[tokio::test]
async fn test_upstream_iv_is_kept_when_consistent() {
    let mut chain = bullish_chain("PETR", 40.0);
    chain[0].implied_volatility = Some(0.35);
    let h = Harness::new(
        MockQuoteSource::new().with_spot("PETR4", 40.0),
        MockChainSource::new().with_chain("PETR4", chain),
    );

    let result = h.orchestrator.capture(&ticker("PETR4"), None).await.unwrap();
    assert_eq!(result.options_count, 10);
    assert_eq!(result.data_quality.degraded_contracts, 0);

    let raw = bullish_chain("PETR", 40.0);
    let outcome = analytics::normalize(
        &[{
            let mut c = raw[0].clone();
            c.implied_volatility = Some(0.35);
            c
        }],
        40.0,
        &h.orchestrator.settings().normalizer_for("BRL"),
    );
    assert_eq!(outcome.contracts[0].iv_source, Some(IvSource::Upstream));
}

#[tokio::test]
async fn test_upstream_calls_are_cached() {
    let settings = OrchestratorSettings {
        cache_ttl: Duration::from_secs(3600),
        ..Default::default()
    };
    let h = Harness::with_store(
        MockQuoteSource::new().with_spot("PETR4", 40.0),
        MockChainSource::new().with_chain("PETR4", bullish_chain("PETR", 40.0)),
        InMemorySnapshotStore::new(),
        settings,
    );

    h.orchestrator.capture(&ticker("PETR4"), None).await.unwrap();
    h.orchestrator.capture(&ticker("PETR4"), None).await.unwrap();
    h.orchestrator
        .screen_ticker(&ticker("PETR4"), &ScreenerParams::default())
        .await
        .unwrap();

    assert_eq!(h.quotes.calls(), 1);
    assert_eq!(h.chains.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_slow_chain_times_out_as_upstream_unavailable() {
    let settings = OrchestratorSettings {
        chain_timeout: Duration::from_millis(100),
        ..Default::default()
    };
    let h = Harness::with_store(
        MockQuoteSource::new().with_spot("PETR4", 40.0),
        MockChainSource::new()
            .with_chain("PETR4", bullish_chain("PETR", 40.0))
            .with_delay(Duration::from_secs(30)),
        InMemorySnapshotStore::new(),
        settings,
    );

    let err = h.orchestrator.capture(&ticker("PETR4"), None).await.unwrap_err();
    assert_eq!(err.code(), "UPSTREAM_UNAVAILABLE");
    assert_eq!(h.store.snapshot_count(), 0);
}

#[tokio::test]
async fn test_capture_with_screener() {
    let h = Harness::standard();
    let result = h
        .orchestrator
        .capture(&ticker("VALE3"), Some(&ScreenerParams::default()))
        .await
        .unwrap();

    let found = result.screener.unwrap();
    let best = &found[0];
    assert_eq!(best.symbol, "VALEP550");
    assert_eq!(best.op_cost, 54.0);
    assert!((best.gross_profit_pct - 100.0 / 54.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_screen_threshold() {
    let h = Harness::standard();
    let strict = ScreenerParams {
        min_return: 2.0,
        ..Default::default()
    };
    let lenient = ScreenerParams {
        min_return: 1.2,
        ..Default::default()
    };

    let kept = h.orchestrator.screen_ticker(&ticker("VALE3"), &lenient).await.unwrap();
    assert!(kept.iter().any(|o| o.symbol == "VALEP550"));

    let suppressed = h.orchestrator.screen_ticker(&ticker("VALE3"), &strict).await.unwrap();
    assert!(suppressed.iter().all(|o| o.symbol != "VALEP550"));
    assert_eq!(h.store.snapshot_count(), 0);
}

#[tokio::test]
async fn test_screen_includes_puts_without_last_trade() {
    let mut chain = arbitrage_chain("VALE");
    if let Some(put) = chain.iter_mut().find(|c| c.symbol == "VALEP550") {
        put.last_trade_price = 0.0;
    }
    let h = Harness::new(
        MockQuoteSource::new().with_spot("VALE3", 50.0),
        MockChainSource::new().with_chain("VALE3", chain),
    );

    let found = h
        .orchestrator
        .screen_ticker(&ticker("VALE3"), &ScreenerParams::default())
        .await
        .unwrap();

    let put = found.iter().find(|o| o.symbol == "VALEP550").unwrap();
    assert_eq!(put.op_cost, 54.0);
    assert!(put.delta.is_none());
}

#[tokio::test]
async fn test_batch_isolates_failures() {
    let h = Harness::standard();
    let symbols = vec!["PETR4".to_string(), "ZZZZ3".to_string(), "VALE3".to_string()];
    let batch = h
        .orchestrator
        .screen_batch(&symbols, &ScreenerParams::default())
        .await;

    let statuses: Vec<TickerStatus> = batch.results.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![TickerStatus::Ok, TickerStatus::Error, TickerStatus::Ok]
    );
    let failed = &batch.results[1];
    assert_eq!(failed.ticker, "ZZZZ3");
    assert_eq!(failed.error.as_ref().unwrap().code, "UPSTREAM_UNAVAILABLE");

    assert_eq!(batch.summary.requested, 3);
    assert_eq!(batch.summary.succeeded, 2);
    assert_eq!(batch.summary.failed, 1);
    assert!(batch.opportunities.iter().any(|o| o.ticker == "VALE3"));
    assert!(batch
        .opportunities
        .windows(2)
        .all(|w| w[0].gross_profit_pct >= w[1].gross_profit_pct));
}

#[tokio::test]
async fn test_batch_reports_malformed_symbols() {
    let h = Harness::standard();
    let symbols = vec!["VALE3".to_string(), "BAD-TICKER!".to_string()];
    let batch = h
        .orchestrator
        .screen_batch(&symbols, &ScreenerParams::default())
        .await;

    assert!(batch.results[0].is_ok());
    assert_eq!(
        batch.results[1].error.as_ref().unwrap().code,
        "VALIDATION_ERROR"
    );
}

#[tokio::test]
async fn test_resolve_symbols() {
    let mut settings = OrchestratorSettings::default();
    settings
        .ticker_lists
        .insert("ibov_top".to_string(), vec!["PETR4".into(), "VALE3".into()]);
    let h = Harness::with_store(
        MockQuoteSource::new(),
        MockChainSource::new(),
        InMemorySnapshotStore::new(),
        settings,
    );

    let explicit = vec!["petr4".to_string(), "PETR4".to_string(), "itub4".to_string()];
    assert_eq!(
        h.orchestrator.resolve_symbols(Some(explicit.as_slice()), None).unwrap(),
        vec!["PETR4", "ITUB4"]
    );
    assert_eq!(
        h.orchestrator.resolve_symbols(None, Some("ibov_top")).unwrap(),
        vec!["PETR4", "VALE3"]
    );
    assert_eq!(
        h.orchestrator
            .resolve_symbols(None, Some("missing"))
            .unwrap_err()
            .status_code(),
        400
    );
    assert!(h.orchestrator.resolve_symbols(None, None).is_err());
}

#[tokio::test]
async fn test_gamma_analysis_by_expiration() {
    let h = Harness::standard();
    let expiry = arbitrage_chain("VALE")[0].expiry_date;
    let letter = analytics::series::series_letter(OptionSide::Call, chrono::Datelike::month(&expiry))
        .unwrap()
        .to_string();

    let all = h
        .orchestrator
        .analyze_gamma(&ticker("VALE3"), None, None)
        .await
        .unwrap();
    let one_month = h
        .orchestrator
        .analyze_gamma(&ticker("VALE3"), Some(10), Some(&letter))
        .await
        .unwrap();

    assert_eq!(all.days_back, 30);
    assert_eq!(all.options_count, 11);
    assert!(one_month.options_count >= 10);
    assert_eq!(one_month.expiration_code.as_deref(), Some(letter.as_str()));
    assert_eq!(one_month.regime_description, one_month.profile.regime.description());
    assert!(all.atm_iv.is_some());
    // no bars configured
    assert!(all.realized_volatility.is_none());
    assert_eq!(h.store.snapshot_count(), 0);

    let err = h
        .orchestrator
        .analyze_gamma(&ticker("VALE3"), None, Some("Z"))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 400);
}

#[tokio::test]
async fn test_history_is_newest_first() {
    let h = Harness::standard();
    h.orchestrator.capture(&ticker("PETR4"), None).await.unwrap();
    h.orchestrator.capture(&ticker("VALE3"), None).await.unwrap();

    let history = h.orchestrator.history(&ticker("PETR4"), 30, 10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].record.ticker.as_str(), "PETR4");

    let empty = h.orchestrator.history(&ticker("ITUB4"), 30, 10).await.unwrap();
    assert!(empty.is_empty());
}
