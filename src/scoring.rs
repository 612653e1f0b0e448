//! Potential scoring

use crate::error::{PotentialError, Result};
use crate::types::{Forecast, Potential, Price};

/// Relative expected move of a forecast against the last observed price
#[derive(Debug, Clone, Copy, Default)]
pub struct PotentialScorer;

impl PotentialScorer {
    /// `(predicted - current) / current`
    pub fn score(current: Price, predicted: Price) -> Result<Potential> {
        if current == 0.0 {
            return Err(PotentialError::DivisionByZero);
        }
        Ok((predicted - current) / current)
    }

    /// Score and package a forecast for `ticker`
    pub fn forecast(ticker: &str, current: Price, predicted: Price) -> Result<Forecast> {
        let potential = Self::score(current, predicted)?;
        Ok(Forecast::new(ticker, potential, current, predicted))
    }
}
