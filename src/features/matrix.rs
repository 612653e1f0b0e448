//! Feature matrix derived from a bar series

use crate::types::{BarSeries, Symbol};
use ndarray::{Array2, ArrayView1};

/// Column names in their fixed order
pub const FEATURE_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "volume"];

/// Number of feature columns
pub const N_FEATURES: usize = FEATURE_COLUMNS.len();

/// Index of the close column, the prediction target
pub const CLOSE_INDEX: usize = 3;

/// Rows = bars (same order as the series), columns = [`FEATURE_COLUMNS`]
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    ticker: Symbol,
    values: Array2<f64>,
}

impl FeatureMatrix {
    /// Build the matrix from a series
    pub fn from_series(series: &BarSeries) -> Self {
        let bars = series.bars();
        let values = Array2::from_shape_fn((bars.len(), N_FEATURES), |(row, col)| {
            bars[row].features()[col]
        });

        Self {
            ticker: series.ticker().to_string(),
            values,
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.values.nrows() == 0
    }

    /// One feature column
    pub fn column(&self, col: usize) -> ArrayView1<'_, f64> {
        self.values.column(col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Bar;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_matrix_follows_series_order() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let bars = vec![
            Bar::new(start + Duration::days(1), 2.0, 3.0, 1.0, 2.5, 20.0),
            Bar::new(start, 1.0, 2.0, 0.5, 1.5, 10.0),
        ];
        let series = BarSeries::new("TSM", bars);
        let matrix = FeatureMatrix::from_series(&series);

        assert_eq!(matrix.nrows(), 2);
        assert_eq!(matrix.ticker(), "TSM");
        assert_eq!(matrix.column(CLOSE_INDEX).to_vec(), vec![1.5, 2.5]);
        assert_eq!(matrix.values()[[1, 4]], 20.0);
    }
}
