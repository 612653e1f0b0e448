//! Attention forecaster: one multi-head self-attention block
//!
//! Block layout per window `X` of shape `[T, D]`:
//! multi-head scaled dot-product self-attention (key dim = D), residual add,
//! layer norm, ReLU feed-forward, then a linear output per time step. The
//! block weights are drawn from a seeded RNG; training fits the per-step
//! linear output by ridge regression against the window target.

use super::linalg::ridge_fit;
use super::ForecastModel;
use crate::error::{PotentialError, Result};
use crate::features::TrainingSamples;
use crate::types::StrategyKind;
use ndarray::{concatenate, s, Array1, Array2, Array3, ArrayD, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

/// Attention model hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttentionConfig {
    pub num_heads: usize,
    /// Width of the ReLU feed-forward layer
    pub ff_dim: usize,
    /// Layer norm epsilon
    pub epsilon: f64,
    /// Ridge penalty on the output weights
    pub regularization: f64,
    pub seed: u64,
}

impl Default for AttentionConfig {
    fn default() -> Self {
        Self {
            num_heads: 4,
            ff_dim: 64,
            epsilon: 1e-6,
            regularization: 1e-4,
            seed: 7,
        }
    }
}

#[derive(Debug, Clone)]
struct Head {
    /// `[D, D]` each
    w_q: Array2<f64>,
    w_k: Array2<f64>,
    w_v: Array2<f64>,
}

impl Head {
    fn forward(&self, x: &ArrayView2<'_, f64>) -> Array2<f64> {
        let q = x.dot(&self.w_q.t());
        let k = x.dot(&self.w_k.t());
        let v = x.dot(&self.w_v.t());

        let scale = (self.w_k.nrows() as f64).sqrt();
        let scores = q.dot(&k.t()) / scale;
        softmax_rows(scores).dot(&v)
    }
}

#[derive(Debug, Clone)]
struct AttentionBlock {
    heads: Vec<Head>,
    /// `[D, heads * D]`
    w_o: Array2<f64>,
    /// `[ff, D]`
    ff_w: Array2<f64>,
    ff_b: Array1<f64>,
    epsilon: f64,
}

impl AttentionBlock {
    fn new(input_dim: usize, config: &AttentionConfig) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let heads = config.num_heads.max(1);
        let mut glorot = |rows: usize, cols: usize| -> Result<Array2<f64>> {
            let std = (2.0 / (rows + cols) as f64).sqrt();
            let dist = Normal::new(0.0, std)
                .map_err(|e| PotentialError::model_fit(StrategyKind::Attention.name(), e.to_string()))?;
            Ok(Array2::from_shape_fn((rows, cols), |_| rng.sample(dist)))
        };

        let mut head_weights = Vec::with_capacity(heads);
        for _ in 0..heads {
            head_weights.push(Head {
                w_q: glorot(input_dim, input_dim)?,
                w_k: glorot(input_dim, input_dim)?,
                w_v: glorot(input_dim, input_dim)?,
            });
        }
        let w_o = glorot(input_dim, heads * input_dim)?;
        let ff_w = glorot(config.ff_dim, input_dim)?;

        Ok(Self {
            heads: head_weights,
            w_o,
            ff_w,
            ff_b: Array1::zeros(config.ff_dim),
            epsilon: config.epsilon,
        })
    }

    /// Per-step output features `[T, ff + 2D + 1]` for one window `[T, D]`:
    /// feed-forward activations, normalised block state, raw input, bias.
    fn encode(&self, x: ArrayView2<'_, f64>) -> Array2<f64> {
        let head_outputs: Vec<Array2<f64>> = self.heads.iter().map(|h| h.forward(&x)).collect();
        let views: Vec<ArrayView2<'_, f64>> = head_outputs.iter().map(|h| h.view()).collect();
        let attended = match ndarray::concatenate(Axis(1), &views) {
            Ok(joined) => joined.dot(&self.w_o.t()),
            Err(_) => Array2::zeros(x.dim()),
        };

        let normed = layer_norm(&(&x + &attended), self.epsilon);
        let ff = (normed.dot(&self.ff_w.t()) + &self.ff_b).mapv(|v| v.max(0.0));

        concatenate![Axis(1), ff, normed, x, Array2::ones((x.nrows(), 1))]
    }
}

/// Trained attention model
#[derive(Debug, Clone)]
pub struct AttentionHandle {
    block: AttentionBlock,
    readout: Array1<f64>,
}

/// Self-attention forecaster
#[derive(Debug, Clone, Default)]
pub struct AttentionModel {
    config: AttentionConfig,
}

impl AttentionModel {
    pub fn new(config: AttentionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AttentionConfig {
        &self.config
    }
}

impl ForecastModel for AttentionModel {
    type TrainInput = TrainingSamples;
    type PredictInput = Array3<f64>;
    type Handle = AttentionHandle;

    fn kind(&self) -> StrategyKind {
        StrategyKind::Attention
    }

    fn train(&self, samples: &TrainingSamples) -> Result<AttentionHandle> {
        let (n, time_step, n_features) = samples.windows.dim();
        if n == 0 || time_step == 0 {
            return Err(PotentialError::model_fit(self.kind().name(), "no training windows"));
        }

        let block = AttentionBlock::new(n_features, &self.config)?;
        let width = self.config.ff_dim + 2 * n_features + 1;

        // Every time step of a window is trained towards that window's target
        let mut design = Array2::zeros((n * time_step, width));
        for (i, window) in samples.windows.outer_iter().enumerate() {
            design
                .slice_mut(s![i * time_step..(i + 1) * time_step, ..])
                .assign(&block.encode(window));
        }
        let targets = Array1::from_shape_fn(n * time_step, |r| samples.targets[r / time_step]);

        let penalty = Array1::from_shape_fn(width, |j| {
            if j + 1 == width {
                0.0
            } else {
                self.config.regularization
            }
        });
        let readout = ridge_fit(&design, &targets, &penalty).ok_or_else(|| {
            PotentialError::model_fit(self.kind().name(), "output system is singular")
        })?;

        log::debug!(
            "Attention: fit {} heads, output width {} on {} windows x {} steps",
            block.heads.len(),
            width,
            n,
            time_step
        );
        Ok(AttentionHandle { block, readout })
    }

    fn predict_next(&self, handle: &AttentionHandle, windows: &Array3<f64>) -> Result<ArrayD<f64>> {
        let (n, time_step, _) = windows.dim();
        if n == 0 {
            return Err(PotentialError::PredictionShape {
                expected: "at least one window".to_string(),
                actual: windows.shape().to_vec(),
            });
        }

        let mut out = Array3::zeros((n, time_step, 1));
        for (i, window) in windows.outer_iter().enumerate() {
            let steps = handle.block.encode(window).dot(&handle.readout);
            out.slice_mut(s![i, .., 0]).assign(&steps);
        }
        Ok(out.into_dyn())
    }
}

fn softmax_rows(mut scores: Array2<f64>) -> Array2<f64> {
    for mut row in scores.rows_mut() {
        let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row /= sum;
    }
    scores
}

fn layer_norm(x: &Array2<f64>, epsilon: f64) -> Array2<f64> {
    let mut out = x.clone();
    for mut row in out.rows_mut() {
        let mean = row.mean().unwrap_or(0.0);
        let var = row.mapv(|v| (v - mean).powi(2)).mean().unwrap_or(0.0);
        let denom = (var + epsilon).sqrt();
        row.mapv_inplace(|v| (v - mean) / denom);
    }
    out
}
