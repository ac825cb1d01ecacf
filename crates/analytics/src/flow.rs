//! IV-weighted call/put flow and sentiment

use common::{NormalizedContract, OptionSide};
use serde::{Deserialize, Serialize};

/// Upper bounds of the sentiment tiers below the top one, ascending
pub const SENTIMENT_THRESHOLDS: [f64; 8] = [0.2, 0.33, 0.5, 0.8, 1.2, 1.5, 2.0, 3.0];

/// Nine-tier sentiment ladder, ordered bearish to bullish
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sentiment {
    ExtremelyBearish,
    StronglyBearish,
    Bearish,
    MildlyBearish,
    Neutral,
    MildlyBullish,
    Bullish,
    StronglyBullish,
    ExtremelyBullish,
}

impl Sentiment {
    const LADDER: [Sentiment; 9] = [
        Sentiment::ExtremelyBearish,
        Sentiment::StronglyBearish,
        Sentiment::Bearish,
        Sentiment::MildlyBearish,
        Sentiment::Neutral,
        Sentiment::MildlyBullish,
        Sentiment::Bullish,
        Sentiment::StronglyBullish,
        Sentiment::ExtremelyBullish,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::ExtremelyBearish => "EXTREMELY_BEARISH",
            Sentiment::StronglyBearish => "STRONGLY_BEARISH",
            Sentiment::Bearish => "BEARISH",
            Sentiment::MildlyBearish => "MILDLY_BEARISH",
            Sentiment::Neutral => "NEUTRAL",
            Sentiment::MildlyBullish => "MILDLY_BULLISH",
            Sentiment::Bullish => "BULLISH",
            Sentiment::StronglyBullish => "STRONGLY_BULLISH",
            Sentiment::ExtremelyBullish => "EXTREMELY_BULLISH",
        }
    }

    pub fn is_bullish(&self) -> bool {
        *self > Sentiment::Neutral
    }

    pub fn is_bearish(&self) -> bool {
        *self < Sentiment::Neutral
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Sentiment {
    type Err = common::Error;

    fn from_str(s: &str) -> common::Result<Self> {
        Sentiment::LADDER
            .iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| common::Error::invalid_input(format!("unknown sentiment: {}", s)))
    }
}

/// Which liquidity measure weighted the flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightingMode {
    OpenInterest,
    Volume,
    /// Some contracts weighted by open interest, others by volume
    Mixed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowMetrics {
    pub call_flow: f64,
    pub put_flow: f64,
    pub net_flow: f64,
    pub call_put_ratio: f64,
    pub total_volume: u64,
    pub call_volume: u64,
    pub put_volume: u64,
    pub total_options: usize,
    pub call_options: usize,
    pub put_options: usize,
    pub avg_iv: Option<f64>,
    pub sentiment: Sentiment,
    pub weighting_mode: WeightingMode,
}

/// Map a call/put ratio to its tier.
///
/// A ratio sitting exactly on a threshold goes to the upper tier when
/// `net_flow` is positive and to the lower tier otherwise.
pub fn classify_sentiment(call_put_ratio: f64, net_flow: f64) -> Sentiment {
    let below = SENTIMENT_THRESHOLDS
        .iter()
        .filter(|t| **t < call_put_ratio)
        .count();
    let on_threshold = SENTIMENT_THRESHOLDS.iter().any(|t| *t == call_put_ratio);
    let tier = if on_threshold && net_flow > 0.0 {
        below + 1
    } else {
        below
    };
    Sentiment::LADDER[tier.min(Sentiment::LADDER.len() - 1)]
}

fn contract_weight(c: &NormalizedContract) -> (f64, WeightingMode) {
    let oi = c.open_interest();
    let vol = c.volume();
    let mode = if oi > 0 && oi >= vol {
        WeightingMode::OpenInterest
    } else {
        WeightingMode::Volume
    };
    let iv = c.implied_volatility.unwrap_or(0.0);
    (iv * oi.max(vol) as f64, mode)
}

fn volume_weighted_iv(contracts: &[NormalizedContract]) -> Option<f64> {
    let priced: Vec<(f64, f64)> = contracts
        .iter()
        .filter_map(|c| c.implied_volatility.map(|iv| (iv, c.volume() as f64)))
        .collect();
    if priced.is_empty() {
        return None;
    }

    let total_volume: f64 = priced.iter().map(|(_, v)| v).sum();
    if total_volume > 0.0 {
        Some(priced.iter().map(|(iv, v)| iv * v).sum::<f64>() / total_volume)
    } else {
        Some(priced.iter().map(|(iv, _)| iv).sum::<f64>() / priced.len() as f64)
    }
}

/// Reduce a normalized batch to its flow metrics
pub fn aggregate_flow(contracts: &[NormalizedContract]) -> FlowMetrics {
    let mut call_flow = 0.0;
    let mut put_flow = 0.0;
    let (mut call_volume, mut put_volume) = (0u64, 0u64);
    let (mut call_options, mut put_options) = (0usize, 0usize);
    let (mut by_oi, mut by_volume) = (false, false);

    for c in contracts {
        let (weight, mode) = contract_weight(c);
        match mode {
            WeightingMode::OpenInterest => by_oi = true,
            _ => by_volume = true,
        }
        match c.side() {
            OptionSide::Call => {
                call_flow += weight;
                call_volume += c.volume();
                call_options += 1;
            }
            OptionSide::Put => {
                put_flow += weight;
                put_volume += c.volume();
                put_options += 1;
            }
        }
    }

    let net_flow = call_flow - put_flow;
    let call_put_ratio = call_flow / (put_flow + 1.0);
    let weighting_mode = match (by_oi, by_volume) {
        (true, true) => WeightingMode::Mixed,
        (false, true) => WeightingMode::Volume,
        _ => WeightingMode::OpenInterest,
    };

    FlowMetrics {
        call_flow,
        put_flow,
        net_flow,
        call_put_ratio,
        total_volume: call_volume + put_volume,
        call_volume,
        put_volume,
        total_options: call_options + put_options,
        call_options,
        put_options,
        avg_iv: volume_weighted_iv(contracts),
        sentiment: classify_sentiment(call_put_ratio, net_flow),
        weighting_mode,
    }
}
