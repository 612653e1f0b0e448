//! In-memory bar store

use super::{MarketDataProvider, Period};
use crate::error::{PotentialError, Result};
use crate::types::{Bar, Symbol};
use hashbrown::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Serves preloaded bars. The lookback period is ignored: stored bars are
/// returned as they are.
#[derive(Debug, Default)]
pub struct InMemoryProvider {
    bars: HashMap<Symbol, Vec<Bar>>,
    fetches: AtomicUsize,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register bars for a ticker, replacing any previous ones
    pub fn insert(&mut self, ticker: impl Into<Symbol>, bars: Vec<Bar>) {
        self.bars.insert(ticker.into(), bars);
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with_series(mut self, ticker: impl Into<Symbol>, bars: Vec<Bar>) -> Self {
        self.insert(ticker, bars);
        self
    }

    /// Number of fetch calls served so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

impl MarketDataProvider for InMemoryProvider {
    fn fetch_bars(&self, ticker: &str, _period: &Period) -> Result<Vec<Bar>> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        self.bars
            .get(ticker)
            .cloned()
            .ok_or_else(|| PotentialError::DataUnavailable {
                ticker: ticker.to_string(),
                reason: "no bars loaded".to_string(),
            })
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_memory_provider() {
        let provider = InMemoryProvider::new()
            .with_series("AAPL", vec![Bar::new(Utc::now(), 1.0, 2.0, 0.5, 1.5, 100.0)]);

        assert_eq!(provider.fetch("AAPL", &Period::Months(3)).len(), 1);
        assert!(provider.fetch("MSFT", &Period::Months(3)).is_empty());
        assert_eq!(provider.fetch_count(), 2);
    }
}
