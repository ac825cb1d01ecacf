use chrono::{Duration, NaiveDate};
use common::{DefaultedFields, NormalizedContract, OptionSide, RawContract};

pub fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

/// Raw contract with a one-tick spread around `last`
pub fn raw(symbol: &str, side: OptionSide, strike: f64, last: f64, dte: i64) -> RawContract {
    RawContract {
        symbol: symbol.to_string(),
        side,
        strike,
        expiry_date: base_date() + Duration::days(dte),
        days_to_expiry: dte,
        last_trade_price: last,
        bid: (last - 0.01).max(0.0),
        ask: last + 0.01,
        volume: 100,
        open_interest: 500,
        bid_volume: 10,
        ask_volume: 10,
        spot_at_observation: 40.0,
        implied_volatility: None,
        defaulted: DefaultedFields::default(),
    }
}

/// Normalized contract with explicit analytics fields, bypassing the solver
pub fn priced(
    side: OptionSide,
    strike: f64,
    iv: f64,
    gamma: f64,
    volume: u64,
    open_interest: u64,
) -> NormalizedContract {
    let mut contract = raw("T", side, strike, 1.0, 30);
    contract.volume = volume;
    contract.open_interest = open_interest;
    NormalizedContract {
        fingerprint: format!("T|{}|{:.2}", side, strike),
        spot: 40.0,
        time_to_expiry_years: 30.0 / 365.0,
        moneyness: common::Moneyness::Atm,
        intrinsic: 0.0,
        extrinsic_bid: contract.bid,
        extrinsic_ask: contract.ask,
        implied_volatility: Some(iv),
        iv_source: Some(common::IvSource::Solved),
        gamma: Some(gamma),
        delta: Some(if side.is_call() { 0.5 } else { -0.5 }),
        bs_theoretical: Some(1.0),
        liquidity_score: volume as f64 + 0.5 * open_interest as f64,
        degraded: false,
        contract,
    }
}
