//! Per-column min-max scaler

use super::matrix::{FeatureMatrix, CLOSE_INDEX, N_FEATURES};
use crate::error::{PotentialError, Result};
use crate::types::{Price, Symbol};
use ndarray::Array2;

/// Affine (min-max) transform fit jointly over all feature columns of one
/// ticker, mapping each column into `[0, 1]`.
///
/// A scaler remembers the ticker it was fit for and refuses to encode any
/// other ticker's data.
#[derive(Debug, Clone, PartialEq)]
pub struct Scaler {
    ticker: Symbol,
    min: [f64; N_FEATURES],
    range: [f64; N_FEATURES],
}

impl Scaler {
    /// Learn per-column minimum and range from a matrix
    pub fn fit(matrix: &FeatureMatrix) -> Result<Self> {
        if matrix.is_empty() {
            return Err(PotentialError::InsufficientData {
                ticker: matrix.ticker().to_string(),
                required: 1,
                available: 0,
            });
        }

        let mut min = [0.0; N_FEATURES];
        let mut range = [1.0; N_FEATURES];
        for col in 0..N_FEATURES {
            let column = matrix.column(col);
            let lo = column.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = column.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            min[col] = lo;
            // Constant columns map to 0 rather than dividing by zero
            let span = hi - lo;
            range[col] = if span.abs() > f64::EPSILON { span } else { 1.0 };
        }

        Ok(Self {
            ticker: matrix.ticker().to_string(),
            min,
            range,
        })
    }

    /// Ticker this scaler was fit for
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    /// Scale every cell of a matrix belonging to the same ticker
    pub fn transform(&self, matrix: &FeatureMatrix) -> Result<Array2<f64>> {
        self.ensure_owner(matrix.ticker())?;

        let values = matrix.values();
        Ok(Array2::from_shape_fn(values.dim(), |(row, col)| {
            (values[[row, col]] - self.min[col]) / self.range[col]
        }))
    }

    /// Scale a single value of a known column
    pub fn encode(&self, col: usize, value: f64) -> f64 {
        (value - self.min[col]) / self.range[col]
    }

    /// Scale a raw close price
    pub fn encode_close(&self, price: Price) -> f64 {
        self.encode(CLOSE_INDEX, price)
    }

    /// Invert the transform for a full-width row
    pub fn inverse_row(&self, row: &[f64; N_FEATURES]) -> [f64; N_FEATURES] {
        let mut out = [0.0; N_FEATURES];
        for col in 0..N_FEATURES {
            out[col] = row[col] * self.range[col] + self.min[col];
        }
        out
    }

    /// Decode a scaled close back into a price.
    ///
    /// The scaled close is placed in the close slot of an otherwise
    /// zero-filled row, the whole row is inverted, and only the close slot
    /// of the result is kept.
    pub fn inverse_close(&self, scaled: f64) -> Price {
        let mut row = [0.0; N_FEATURES];
        row[CLOSE_INDEX] = scaled;
        self.inverse_row(&row)[CLOSE_INDEX]
    }

    pub(crate) fn ensure_owner(&self, ticker: &str) -> Result<()> {
        if self.ticker != ticker {
            return Err(PotentialError::ScalerMismatch {
                expected: self.ticker.clone(),
                actual: ticker.to_string(),
            });
        }
        Ok(())
    }
}
