//! Decomposable forecaster: additive trend + seasonality on the close series
//!
//! `y(t) = trend(t) + weekly(t) + yearly(t)`, where the trend is piecewise
//! linear with changepoints spread over the first part of the history and
//! each seasonality is a truncated Fourier series. All coefficients are fit
//! jointly by penalised least squares: changepoint deltas shrink with the
//! changepoint prior scale, seasonal coefficients with the seasonality prior
//! scale.

use super::linalg::ridge_fit;
use super::ForecastModel;
use crate::error::{PotentialError, Result};
use crate::types::{BarSeries, Price, StrategyKind, Timestamp};
use chrono::Duration;
use ndarray::{Array1, Array2, ArrayD};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use std::f64::consts::PI;

const SECONDS_PER_DAY: f64 = 86_400.0;
const WEEK_DAYS: f64 = 7.0;
const YEAR_DAYS: f64 = 365.25;

/// Decomposable model hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecomposableConfig {
    /// Minimum number of finite observations
    pub min_observations: usize,
    pub n_changepoints: usize,
    /// Share of the history in which changepoints are placed
    pub changepoint_range: f64,
    pub changepoint_prior_scale: f64,
    pub seasonality_prior_scale: f64,
    /// Fourier order of the weekly component; 0 disables it
    pub weekly_order: usize,
    /// Fourier order of the yearly component; 0 disables it
    pub yearly_order: usize,
    /// Calendar days forecast past the last observation
    pub horizon_days: i64,
    /// Coverage of the uncertainty interval
    pub interval_width: f64,
    /// Forecasts are clamped into `[clamp_low, clamp_high] * last close`
    pub clamp_low: f64,
    pub clamp_high: f64,
}

impl Default for DecomposableConfig {
    fn default() -> Self {
        Self {
            min_observations: 30,
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_prior_scale: 0.1,
            seasonality_prior_scale: 10.0,
            weekly_order: 3,
            yearly_order: 10,
            horizon_days: 3,
            interval_width: 0.8,
            clamp_low: 0.8,
            clamp_high: 1.2,
        }
    }
}

/// One forecast day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub ds: Timestamp,
    /// Point forecast, clamped around the last close
    pub yhat: Price,
    pub lower: Price,
    pub upper: Price,
}

/// Fitted trend and seasonality coefficients
#[derive(Debug, Clone)]
pub struct DecomposableFit {
    config: DecomposableConfig,
    first_day: f64,
    span_days: f64,
    y_scale: f64,
    /// Changepoint locations on the scaled time axis
    changepoints: Vec<f64>,
    weights: Array1<f64>,
    /// Residual standard deviation on the scaled axis
    sigma: f64,
    last_ds: Timestamp,
}

impl DecomposableFit {
    fn width(config: &DecomposableConfig, n_changepoints: usize) -> usize {
        2 + n_changepoints + 2 * (config.weekly_order + config.yearly_order)
    }

    fn design_row(&self, ds: Timestamp) -> Array1<f64> {
        let day = epoch_days(ds);
        let t = (day - self.first_day) / self.span_days;

        let mut row = Vec::with_capacity(Self::width(&self.config, self.changepoints.len()));
        row.push(1.0);
        row.push(t);
        row.extend(self.changepoints.iter().map(|&cp| (t - cp).max(0.0)));
        fourier(&mut row, day, WEEK_DAYS, self.config.weekly_order);
        fourier(&mut row, day, YEAR_DAYS, self.config.yearly_order);
        Array1::from(row)
    }

    /// Unclamped point forecast in price units
    pub fn predict_raw(&self, ds: Timestamp) -> Price {
        self.design_row(ds).dot(&self.weights) * self.y_scale
    }

    /// Timestamp of the last training observation
    pub fn last_ds(&self) -> Timestamp {
        self.last_ds
    }
}

/// Trend + seasonality forecaster working directly on (date, close)
#[derive(Debug, Clone, Default)]
pub struct DecomposableModel {
    config: DecomposableConfig,
}

impl DecomposableModel {
    pub fn new(config: DecomposableConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecomposableConfig {
        &self.config
    }

    /// Forecast the configured horizon past the last observation.
    ///
    /// Every `yhat` is clamped into the band around `last_close`; the
    /// interval bounds are left as fitted.
    pub fn forecast(&self, fit: &DecomposableFit, last_close: Price) -> Result<Vec<ForecastRow>> {
        let z = Normal::new(0.0, 1.0)
            .map(|n| n.inverse_cdf(0.5 + self.config.interval_width / 2.0))
            .map_err(|e| PotentialError::model_fit(self.kind().name(), e.to_string()))?;
        let half_width = z * fit.sigma * fit.y_scale;

        Ok((1..=self.config.horizon_days)
            .map(|h| {
                let ds = fit.last_ds + Duration::days(h);
                let raw = fit.predict_raw(ds);
                ForecastRow {
                    ds,
                    yhat: clamp_to_band(raw, last_close, self.config.clamp_low, self.config.clamp_high),
                    lower: raw - half_width,
                    upper: raw + half_width,
                }
            })
            .collect())
    }

    fn changepoints(&self, t: &[f64]) -> Vec<f64> {
        let hist_size = (t.len() as f64 * self.config.changepoint_range).floor() as usize;
        let n_cps = self.config.n_changepoints.min(hist_size.saturating_sub(1));
        if n_cps == 0 {
            return Vec::new();
        }

        // Evenly spaced rows of the leading history, first row excluded
        (1..=n_cps)
            .map(|i| {
                let idx = (i as f64 * (hist_size - 1) as f64 / n_cps as f64).round() as usize;
                t[idx]
            })
            .collect()
    }
}

impl ForecastModel for DecomposableModel {
    type TrainInput = BarSeries;
    type PredictInput = BarSeries;
    type Handle = DecomposableFit;

    fn kind(&self) -> StrategyKind {
        StrategyKind::Decomposable
    }

    fn train(&self, series: &BarSeries) -> Result<DecomposableFit> {
        let name = self.kind().name();
        let observations: Vec<(Timestamp, f64)> = series
            .bars()
            .iter()
            .filter(|b| b.close.is_finite())
            .map(|b| (b.timestamp, b.close))
            .collect();

        if observations.iter().any(|&(_, y)| y < 0.0) {
            return Err(PotentialError::model_fit(name, "negative close values"));
        }
        if observations.len() < self.config.min_observations {
            return Err(PotentialError::model_fit(
                name,
                format!(
                    "need at least {} observations, got {}",
                    self.config.min_observations,
                    observations.len()
                ),
            ));
        }

        let (first, last) = match (observations.first(), observations.last()) {
            (Some(first), Some(last)) => (first.0, last.0),
            _ => return Err(PotentialError::model_fit(name, "empty series")),
        };
        let first_day = epoch_days(first);
        let span_days = epoch_days(last) - first_day;
        if span_days <= 0.0 {
            return Err(PotentialError::model_fit(name, "series spans no time"));
        }

        let y_max = observations.iter().map(|&(_, y)| y.abs()).fold(0.0, f64::max);
        let y_scale = if y_max > 0.0 { y_max } else { 1.0 };

        let t: Vec<f64> = observations
            .iter()
            .map(|&(ds, _)| (epoch_days(ds) - first_day) / span_days)
            .collect();
        let changepoints = self.changepoints(&t);

        let mut fit = DecomposableFit {
            config: self.config.clone(),
            first_day,
            span_days,
            y_scale,
            changepoints,
            weights: Array1::zeros(0),
            sigma: 0.0,
            last_ds: last,
        };

        let n = observations.len();
        let width = DecomposableFit::width(&self.config, fit.changepoints.len());
        let mut design = Array2::zeros((n, width));
        for (i, &(ds, _)) in observations.iter().enumerate() {
            design.row_mut(i).assign(&fit.design_row(ds));
        }
        let y = Array1::from_iter(observations.iter().map(|&(_, v)| v / y_scale));

        let delta_penalty = 1.0 / self.config.changepoint_prior_scale.powi(2);
        let season_penalty = 1.0 / self.config.seasonality_prior_scale.powi(2);
        let n_cps = fit.changepoints.len();
        let penalty = Array1::from_shape_fn(width, |j| match j {
            0 | 1 => 0.0,
            j if j < 2 + n_cps => delta_penalty,
            _ => season_penalty,
        });

        fit.weights = ridge_fit(&design, &y, &penalty)
            .ok_or_else(|| PotentialError::model_fit(name, "least squares system is singular"))?;

        let residuals = &y - &design.dot(&fit.weights);
        fit.sigma = (residuals.mapv(|r| r * r).sum() / (n.max(2) - 1) as f64).sqrt();

        log::debug!(
            "{}: decomposable fit on {} observations, {} changepoints, sigma {:.5}",
            series.ticker(),
            n,
            n_cps,
            fit.sigma
        );
        Ok(fit)
    }

    /// Clamped `yhat` of every horizon day, shape `[horizon]`
    fn predict_next(&self, fit: &DecomposableFit, series: &BarSeries) -> Result<ArrayD<f64>> {
        let last_close = series
            .last_close()
            .ok_or_else(|| PotentialError::model_fit(self.kind().name(), "no last close to anchor forecast"))?;

        let rows = self.forecast(fit, last_close)?;
        Ok(Array1::from_iter(rows.iter().map(|r| r.yhat)).into_dyn())
    }
}

/// Clamp `value` into `[low * anchor, high * anchor]`
pub fn clamp_to_band(value: Price, anchor: Price, low: f64, high: f64) -> Price {
    let (lo, hi) = (anchor * low, anchor * high);
    value.max(lo).min(hi)
}

fn epoch_days(ds: Timestamp) -> f64 {
    ds.timestamp() as f64 / SECONDS_PER_DAY
}

fn fourier(row: &mut Vec<f64>, day: f64, period: f64, order: usize) {
    for k in 1..=order {
        let angle = 2.0 * PI * k as f64 * day / period;
        row.push(angle.sin());
        row.push(angle.cos());
    }
}
