//! Sliding-window preparation for window-based models

use super::matrix::{FeatureMatrix, CLOSE_INDEX, N_FEATURES};
use super::scaler::Scaler;
use crate::error::{PotentialError, Result};
use crate::types::BarSeries;
use ndarray::{Array1, Array2, Array3};

/// Default window length in bars
pub const DEFAULT_TIME_STEP: usize = 60;

/// Scaled windows and their targets, the input of window-based models
#[derive(Debug, Clone)]
pub struct TrainingSamples {
    /// `[n_windows, time_step, N_FEATURES]`
    pub windows: Array3<f64>,
    /// Scaled close of the row following each window, `[n_windows]`
    pub targets: Array1<f64>,
}

impl TrainingSamples {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Training samples for one ticker together with the scaler that produced
/// them. The scaler must travel with the trained model for decoding.
#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub samples: TrainingSamples,
    pub scaler: Scaler,
}

/// Converts bar series into fixed-length windows over the scaled feature
/// space
#[derive(Debug, Clone, Copy)]
pub struct FeatureWindower {
    time_step: usize,
}

impl Default for FeatureWindower {
    fn default() -> Self {
        Self::new(DEFAULT_TIME_STEP)
    }
}

impl FeatureWindower {
    pub fn new(time_step: usize) -> Self {
        Self { time_step }
    }

    pub fn time_step(&self) -> usize {
        self.time_step
    }

    /// Minimum series length for windowing (`time_step + 1`)
    pub fn required_len(&self) -> usize {
        self.time_step + 1
    }

    /// Fit a fresh scaler on the whole series and produce every training
    /// window with its target.
    ///
    /// A series of length `L` yields `L - time_step` windows.
    pub fn prepare_training(&self, series: &BarSeries) -> Result<TrainingSet> {
        self.ensure_len(series)?;

        let matrix = FeatureMatrix::from_series(series);
        let scaler = Scaler::fit(&matrix)?;
        let scaled = scaler.transform(&matrix)?;

        let n_windows = scaled.nrows() - self.time_step;
        let windows = self.slice(&scaled, n_windows);
        let targets = Array1::from_shape_fn(n_windows, |i| scaled[[i + self.time_step, CLOSE_INDEX]]);

        log::debug!(
            "{}: prepared {} training windows of {} steps",
            series.ticker(),
            n_windows,
            self.time_step
        );

        Ok(TrainingSet {
            samples: TrainingSamples { windows, targets },
            scaler,
        })
    }

    /// Scale `series` with an already-fit scaler and slice it exactly like
    /// training, plus the trailing window that ends on the last bar.
    ///
    /// A series of length `L` yields `L - time_step + 1` windows; the last
    /// one is the input for the next-period forecast. The scaler is never
    /// refit here.
    pub fn prepare_inference(&self, series: &BarSeries, scaler: &Scaler) -> Result<Array3<f64>> {
        self.ensure_len(series)?;
        scaler.ensure_owner(series.ticker())?;

        let matrix = FeatureMatrix::from_series(series);
        let scaled = scaler.transform(&matrix)?;
        let n_windows = scaled.nrows() - self.time_step + 1;

        Ok(self.slice(&scaled, n_windows))
    }

    fn slice(&self, scaled: &Array2<f64>, n_windows: usize) -> Array3<f64> {
        Array3::from_shape_fn((n_windows, self.time_step, N_FEATURES), |(w, t, f)| {
            scaled[[w + t, f]]
        })
    }

    fn ensure_len(&self, series: &BarSeries) -> Result<()> {
        if series.len() < self.required_len() {
            return Err(PotentialError::InsufficientData {
                ticker: series.ticker().to_string(),
                required: self.required_len(),
                available: series.len(),
            });
        }
        Ok(())
    }
}
