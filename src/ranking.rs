//! Top/bottom ranking of scored forecasts

use crate::types::{Forecast, StrategyKind, Timestamp};
use chrono::Utc;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Default top/bottom list size
pub const DEFAULT_TOP_N: usize = 10;

/// Strategy label (e.g. `Recurrent-top`) to its ordered forecasts
pub type StrategyResult = IndexMap<String, Vec<Forecast>>;

/// Highest and lowest potentials of one strategy
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Ranking {
    /// Descending by potential
    pub top: Vec<Forecast>,
    /// Ascending by potential
    pub bottom: Vec<Forecast>,
}

/// Sorts forecasts into top-n and bottom-n lists.
///
/// Both lists come from independent stable sorts of the same input, so
/// ties keep input order and the lists overlap whenever there are fewer
/// than `2n` forecasts.
#[derive(Debug, Clone, Copy)]
pub struct RankingAggregator {
    n: usize,
}

impl Default for RankingAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_N)
    }
}

impl RankingAggregator {
    pub fn new(n: usize) -> Self {
        Self { n }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn rank(&self, forecasts: &[Forecast]) -> Ranking {
        let mut top = forecasts.to_vec();
        top.sort_by(|a, b| b.potential.total_cmp(&a.potential));
        top.truncate(self.n);

        let mut bottom = forecasts.to_vec();
        bottom.sort_by(|a, b| a.potential.total_cmp(&b.potential));
        bottom.truncate(self.n);

        Ranking { top, bottom }
    }
}

/// Ranked output of one index: every surviving strategy's top and bottom
/// lists, in strategy order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexResult {
    pub computed_at: Timestamp,
    pub strategies: StrategyResult,
}

impl IndexResult {
    pub fn new() -> Self {
        Self {
            computed_at: Utc::now(),
            strategies: IndexMap::new(),
        }
    }

    /// Add both lists of a strategy; an empty ranking adds nothing
    pub fn insert(&mut self, kind: StrategyKind, ranking: Ranking) {
        if ranking.top.is_empty() && ranking.bottom.is_empty() {
            return;
        }
        self.strategies.insert(kind.top_label(), ranking.top);
        self.strategies.insert(kind.bottom_label(), ranking.bottom);
    }

    pub fn get(&self, label: &str) -> Option<&[Forecast]> {
        self.strategies.get(label).map(|v| v.as_slice())
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.strategies.keys().map(|k| k.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl Default for IndexResult {
    fn default() -> Self {
        Self::new()
    }
}
