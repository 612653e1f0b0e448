//! Forecasting strategies
//!
//! A strategy bundles a [`ForecastModel`] with the data preparation it needs
//! and turns one ticker's bar series into a scored [`Forecast`]. The
//! orchestrator only sees `dyn ForecastStrategy`.

use crate::data::Period;
use crate::error::{PotentialError, Result};
use crate::features::{FeatureWindower, TrainingSamples};
use crate::models::{
    normalize_prediction, AttentionModel, DecomposableModel, ForecastModel, RecurrentModel,
};
use crate::scoring::PotentialScorer;
use crate::types::{BarSeries, Forecast, Price, StrategyKind};
use ndarray::Array3;

/// Minimum bars a window-based strategy needs before it tries windowing
pub const DEFAULT_MIN_WINDOW_BARS: usize = 60;

/// One forecasting strategy, evaluated independently per ticker
pub trait ForecastStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Lookback of the series this strategy consumes
    fn period(&self) -> &Period;

    /// Train on `series` and score the next-period forecast
    fn evaluate(&self, series: &BarSeries) -> Result<Forecast>;
}

/// Window-based strategy: scale, window, train, predict, decode
#[derive(Debug, Clone)]
pub struct WindowedStrategy<M> {
    model: M,
    windower: FeatureWindower,
    min_bars: usize,
    period: Period,
}

pub type RecurrentStrategy = WindowedStrategy<RecurrentModel>;
pub type AttentionStrategy = WindowedStrategy<AttentionModel>;

impl<M> WindowedStrategy<M>
where
    M: ForecastModel<TrainInput = TrainingSamples, PredictInput = Array3<f64>>,
{
    pub fn new(model: M, windower: FeatureWindower, period: Period) -> Self {
        Self {
            model,
            windower,
            min_bars: DEFAULT_MIN_WINDOW_BARS,
            period,
        }
    }

    pub fn with_min_bars(mut self, min_bars: usize) -> Self {
        self.min_bars = min_bars;
        self
    }

    pub fn model(&self) -> &M {
        &self.model
    }
}

impl<M> ForecastStrategy for WindowedStrategy<M>
where
    M: ForecastModel<TrainInput = TrainingSamples, PredictInput = Array3<f64>>,
{
    fn kind(&self) -> StrategyKind {
        self.model.kind()
    }

    fn period(&self) -> &Period {
        &self.period
    }

    fn evaluate(&self, series: &BarSeries) -> Result<Forecast> {
        let current = current_price(series)?;
        if series.len() < self.min_bars {
            return Err(PotentialError::InsufficientData {
                ticker: series.ticker().to_string(),
                required: self.min_bars,
                available: series.len(),
            });
        }

        let set = self.windower.prepare_training(series)?;
        let handle = self.model.train(&set.samples)?;

        let windows = self.windower.prepare_inference(series, &set.scaler)?;
        let scaled = normalize_prediction(self.model.predict_next(&handle, &windows)?)?;
        let next = last_value(&scaled.to_vec(), self.kind())?;
        let predicted = set.scaler.inverse_close(next);

        finish(series.ticker(), self.kind(), current, predicted)
    }
}

/// Trend + seasonality strategy on the raw close series
#[derive(Debug, Clone, Default)]
pub struct DecomposableStrategy {
    model: DecomposableModel,
    period: Period,
}

impl DecomposableStrategy {
    pub fn new(model: DecomposableModel, period: Period) -> Self {
        Self { model, period }
    }
}

impl ForecastStrategy for DecomposableStrategy {
    fn kind(&self) -> StrategyKind {
        self.model.kind()
    }

    fn period(&self) -> &Period {
        &self.period
    }

    fn evaluate(&self, series: &BarSeries) -> Result<Forecast> {
        let current = current_price(series)?;
        let fit = self.model.train(series)?;
        let horizon = normalize_prediction(self.model.predict_next(&fit, series)?)?;
        let predicted = last_value(&horizon.to_vec(), self.kind())?;

        finish(series.ticker(), self.kind(), current, predicted)
    }
}

fn current_price(series: &BarSeries) -> Result<Price> {
    series.last_close().ok_or_else(|| PotentialError::DataUnavailable {
        ticker: series.ticker().to_string(),
        reason: "empty series".to_string(),
    })
}

fn last_value(values: &[f64], kind: StrategyKind) -> Result<f64> {
    values.last().copied().ok_or_else(|| PotentialError::PredictionShape {
        expected: format!("{} output with at least one value", kind),
        actual: vec![0],
    })
}

fn finish(ticker: &str, kind: StrategyKind, current: Price, predicted: Price) -> Result<Forecast> {
    if !predicted.is_finite() {
        return Err(PotentialError::model_fit(kind.name(), "non-finite prediction"));
    }
    let forecast = PotentialScorer::forecast(ticker, current, predicted)?;
    log::debug!(
        "{} {}: current {:.2}, predicted {:.2}, potential {:.4}",
        kind,
        ticker,
        current,
        predicted,
        forecast.potential
    );
    Ok(forecast)
}
