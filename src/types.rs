//! Core types and constants

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp type used throughout the library
pub type Timestamp = DateTime<Utc>;

/// Ticker symbol identifying one equity
pub type Symbol = String;

/// Price type (using f64 for precision)
pub type Price = f64;

/// Quantity/volume type
pub type Quantity = f64;

/// Relative expected move, `(predicted - current) / current`
pub type Potential = f64;

/// OHLCV bar data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: Timestamp,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    pub volume: Quantity,
}

impl Bar {
    /// Create a new bar
    pub fn new(
        timestamp: Timestamp,
        open: Price,
        high: Price,
        low: Price,
        close: Price,
        volume: Quantity,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Feature row in the fixed column order open, high, low, close, volume
    pub fn features(&self) -> [f64; 5] {
        [self.open, self.high, self.low, self.close, self.volume]
    }
}

/// Time-ordered bars for one ticker.
///
/// Timestamps are strictly increasing: construction sorts the input and
/// drops later duplicates of an already-seen timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarSeries {
    ticker: Symbol,
    bars: Vec<Bar>,
}

impl BarSeries {
    /// Create a series, normalising order and duplicate timestamps
    pub fn new(ticker: impl Into<Symbol>, mut bars: Vec<Bar>) -> Self {
        bars.sort_by_key(|b| b.timestamp);
        bars.dedup_by_key(|b| b.timestamp);
        Self {
            ticker: ticker.into(),
            bars,
        }
    }

    /// Series with no bars, the "fetch failed" result
    pub fn empty(ticker: impl Into<Symbol>) -> Self {
        Self {
            ticker: ticker.into(),
            bars: Vec::new(),
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Close of the most recent bar
    pub fn last_close(&self) -> Option<Price> {
        self.bars.last().map(|b| b.close)
    }

    /// Timestamp of the most recent bar
    pub fn last_timestamp(&self) -> Option<Timestamp> {
        self.bars.last().map(|b| b.timestamp)
    }
}

/// Forecasting strategy variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyKind {
    Recurrent,
    Attention,
    Decomposable,
}

impl StrategyKind {
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::Recurrent => "Recurrent",
            StrategyKind::Attention => "Attention",
            StrategyKind::Decomposable => "Decomposable",
        }
    }

    /// Label of the descending ranking, e.g. `Recurrent-top`
    pub fn top_label(&self) -> String {
        format!("{}-top", self.name())
    }

    /// Label of the ascending ranking, e.g. `Recurrent-bottom`
    pub fn bottom_label(&self) -> String {
        format!("{}-bottom", self.name())
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One scored prediction for a ticker under one strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub ticker: Symbol,
    pub potential: Potential,
    pub current_price: Price,
    pub predicted_price: Price,
}

impl Forecast {
    pub fn new(
        ticker: impl Into<Symbol>,
        potential: Potential,
        current_price: Price,
        predicted_price: Price,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            potential,
            current_price,
            predicted_price,
        }
    }
}
