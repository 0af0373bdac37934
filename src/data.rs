use chrono::NaiveDateTime;
use serde::Serialize;

/// Single OHLC bar; volume and timestamp are optional in the input files.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub timestamp: Option<NaiveDateTime>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<f64>,
}

impl Bar {
    pub fn new(open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            timestamp: None,
            open,
            high,
            low,
            close,
            volume: None,
        }
    }
}

/// Ordered bars for one timeframe label ("1D", "4H", ...).
#[derive(Debug, Clone, Serialize)]
pub struct PriceSeries {
    pub timeframe: String,
    pub bars: Vec<Bar>,
}

impl PriceSeries {
    pub fn new(timeframe: impl Into<String>, bars: Vec<Bar>) -> Self {
        Self {
            timeframe: timeframe.into(),
            bars,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|bar| bar.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|bar| bar.low).collect()
    }

    /// Prices feeding levels of the given kind.
    pub fn observations(&self, kind: LevelKind) -> Vec<f64> {
        match kind {
            LevelKind::Support => self.lows(),
            LevelKind::Resistance => self.highs(),
        }
    }

    pub fn last_close(&self) -> Option<f64> {
        self.bars.last().map(|bar| bar.close)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LevelKind {
    Support,
    Resistance,
}

impl LevelKind {
    pub const ALL: [LevelKind; 2] = [LevelKind::Resistance, LevelKind::Support];

    pub fn label(self) -> &'static str {
        match self {
            LevelKind::Support => "Support",
            LevelKind::Resistance => "Resistance",
        }
    }
}

/// Cluster of same-kind observations from a single timeframe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawLevel {
    pub price: f64,
    pub kind: LevelKind,
    pub touch_count: usize,
    pub timeframe: String,
    pub weight: u32,
    pub weighted_touches: usize,
    pub member_prices: Vec<f64>,
}

/// Final level produced by merging raw levels across timeframes.
#[derive(Debug, Clone, Serialize)]
pub struct CombinedLevel {
    pub price: f64,
    pub kind: LevelKind,
    pub total_touches: usize,
    pub total_weighted_touches: usize,
    pub timeframes_involved: Vec<String>,
    pub timeframe_count: usize,
    #[serde(skip)]
    pub members: Vec<RawLevel>,
}

/// A single high or low that fell inside a diagnosed range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceObservation {
    pub timeframe: String,
    pub kind: LevelKind,
    pub price: f64,
}
