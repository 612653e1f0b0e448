//! Recurrent forecaster: stacked LSTM encoder with a ridge readout
//!
//! The LSTM weights are drawn once from a seeded RNG; training fits the
//! linear readout over the final hidden state (plus the window's last
//! scaled row) in a single closed-form pass.

use super::linalg::ridge_fit;
use super::ForecastModel;
use crate::error::{PotentialError, Result};
use crate::features::TrainingSamples;
use crate::types::StrategyKind;
use ndarray::{concatenate, s, Array1, Array2, Array3, ArrayD, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

/// Recurrent model hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecurrentConfig {
    pub hidden_size: usize,
    pub num_layers: usize,
    /// Ridge penalty on the readout weights
    pub regularization: f64,
    pub seed: u64,
}

impl Default for RecurrentConfig {
    fn default() -> Self {
        Self {
            hidden_size: 32,
            num_layers: 2,
            regularization: 1e-4,
            seed: 42,
        }
    }
}

/// One LSTM layer; gate blocks are stacked as input, forget, cell, output
#[derive(Debug, Clone)]
struct LstmCell {
    hidden_size: usize,
    /// `[4h, input]`
    w_x: Array2<f64>,
    /// `[4h, h]`
    w_h: Array2<f64>,
    /// `[4h]`
    bias: Array1<f64>,
}

impl LstmCell {
    fn new(input_size: usize, hidden_size: usize, rng: &mut StdRng) -> Self {
        let limit = (1.0 / hidden_size as f64).sqrt();
        let dist = Uniform::new(-limit, limit);

        let w_x = Array2::from_shape_fn((4 * hidden_size, input_size), |_| dist.sample(&mut *rng));
        let w_h = Array2::from_shape_fn((4 * hidden_size, hidden_size), |_| dist.sample(&mut *rng));
        // Forget gate starts open
        let bias = Array1::from_shape_fn(4 * hidden_size, |i| {
            if (hidden_size..2 * hidden_size).contains(&i) {
                1.0
            } else {
                0.0
            }
        });

        Self {
            hidden_size,
            w_x,
            w_h,
            bias,
        }
    }

    fn step(&self, x: &Array1<f64>, h: &Array1<f64>, c: &Array1<f64>) -> (Array1<f64>, Array1<f64>) {
        let z = self.w_x.dot(x) + self.w_h.dot(h) + &self.bias;
        let n = self.hidden_size;

        let i_gate = z.slice(s![0..n]).mapv(sigmoid);
        let f_gate = z.slice(s![n..2 * n]).mapv(sigmoid);
        let g = z.slice(s![2 * n..3 * n]).mapv(f64::tanh);
        let o_gate = z.slice(s![3 * n..4 * n]).mapv(sigmoid);

        let c_next = &f_gate * c + &i_gate * &g;
        let h_next = &o_gate * &c_next.mapv(f64::tanh);
        (h_next, c_next)
    }
}

/// Trained recurrent model
#[derive(Debug, Clone)]
pub struct RecurrentHandle {
    cells: Vec<LstmCell>,
    readout: Array1<f64>,
}

impl RecurrentHandle {
    /// Readout features for one window `[t, features]`
    fn features(&self, window: ArrayView2<'_, f64>) -> Array1<f64> {
        let mut states: Vec<(Array1<f64>, Array1<f64>)> = self
            .cells
            .iter()
            .map(|cell| (Array1::zeros(cell.hidden_size), Array1::zeros(cell.hidden_size)))
            .collect();

        for row in window.rows() {
            let mut layer_input = row.to_owned();
            for (cell, state) in self.cells.iter().zip(states.iter_mut()) {
                let (h, c) = cell.step(&layer_input, &state.0, &state.1);
                layer_input = h.clone();
                *state = (h, c);
            }
        }

        let hidden = states
            .last()
            .map(|(h, _)| h.clone())
            .unwrap_or_else(|| Array1::zeros(0));
        let last_row = window.row(window.nrows() - 1).to_owned();
        concatenate![Axis(0), hidden, last_row, Array1::ones(1)]
    }

    fn design(&self, windows: &Array3<f64>) -> Array2<f64> {
        let rows: Vec<Array1<f64>> = windows
            .outer_iter()
            .map(|window| self.features(window))
            .collect();
        let width = rows.first().map(|r| r.len()).unwrap_or(0);
        Array2::from_shape_fn((rows.len(), width), |(i, j)| rows[i][j])
    }
}

/// Stacked LSTM forecaster
#[derive(Debug, Clone, Default)]
pub struct RecurrentModel {
    config: RecurrentConfig,
}

impl RecurrentModel {
    pub fn new(config: RecurrentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RecurrentConfig {
        &self.config
    }

    fn init_cells(&self, input_size: usize) -> Vec<LstmCell> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let layers = self.config.num_layers.max(1);

        let mut cells = Vec::with_capacity(layers);
        cells.push(LstmCell::new(input_size, self.config.hidden_size, &mut rng));
        for _ in 1..layers {
            cells.push(LstmCell::new(self.config.hidden_size, self.config.hidden_size, &mut rng));
        }
        cells
    }
}

impl ForecastModel for RecurrentModel {
    type TrainInput = TrainingSamples;
    type PredictInput = Array3<f64>;
    type Handle = RecurrentHandle;

    fn kind(&self) -> StrategyKind {
        StrategyKind::Recurrent
    }

    fn train(&self, samples: &TrainingSamples) -> Result<RecurrentHandle> {
        let (n, time_step, n_features) = samples.windows.dim();
        if n == 0 || time_step == 0 {
            return Err(PotentialError::model_fit(self.kind().name(), "no training windows"));
        }

        let mut handle = RecurrentHandle {
            cells: self.init_cells(n_features),
            readout: Array1::zeros(0),
        };

        let design = handle.design(&samples.windows);
        let width = design.ncols();
        // Bias column is left unpenalised
        let penalty = Array1::from_shape_fn(width, |j| {
            if j + 1 == width {
                0.0
            } else {
                self.config.regularization
            }
        });

        handle.readout = ridge_fit(&design, &samples.targets, &penalty).ok_or_else(|| {
            PotentialError::model_fit(self.kind().name(), "readout system is singular")
        })?;

        log::debug!(
            "Recurrent: fit readout of width {} on {} windows x {} steps",
            width,
            n,
            time_step
        );
        Ok(handle)
    }

    fn predict_next(&self, handle: &RecurrentHandle, windows: &Array3<f64>) -> Result<ArrayD<f64>> {
        if windows.dim().0 == 0 {
            return Err(PotentialError::PredictionShape {
                expected: "at least one window".to_string(),
                actual: windows.shape().to_vec(),
            });
        }

        let out = handle.design(windows).dot(&handle.readout);
        Ok(out.insert_axis(Axis(1)).into_dyn())
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::normalize_prediction;
    use approx::assert_abs_diff_eq;

    fn samples(n: usize, t: usize, value: f64) -> TrainingSamples {
        TrainingSamples {
            windows: Array3::from_elem((n, t, 5), value),
            targets: Array1::from_elem(n, value),
        }
    }

    #[test]
    fn test_lstm_step_shapes() {
        let mut rng = StdRng::seed_from_u64(1);
        let cell = LstmCell::new(5, 8, &mut rng);
        let (h, c) = cell.step(&Array1::zeros(5), &Array1::zeros(8), &Array1::zeros(8));
        assert_eq!(h.len(), 8);
        assert_eq!(c.len(), 8);
    }

    #[test]
    fn test_prediction_shape() {
        let model = RecurrentModel::default();
        let handle = model.train(&samples(6, 10, 0.5)).unwrap();
        let out = model.predict_next(&handle, &Array3::from_elem((3, 10, 5), 0.5)).unwrap();
        assert_eq!(out.shape(), &[3, 1]);
    }

    #[test]
    fn test_constant_series_predicts_constant() {
        let model = RecurrentModel::default();
        let handle = model.train(&samples(8, 12, 0.0)).unwrap();
        let out = model
            .predict_next(&handle, &Array3::zeros((2, 12, 5)))
            .and_then(normalize_prediction)
            .unwrap();

        for v in out.iter() {
            assert_abs_diff_eq!(*v, 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_same_seed_is_reproducible() {
        let model = RecurrentModel::default();
        let data = samples(5, 6, 0.3);
        let a = model.train(&data).unwrap();
        let b = model.train(&data).unwrap();
        assert_eq!(a.readout, b.readout);
    }

    #[test]
    fn test_rejects_empty_training_set() {
        let model = RecurrentModel::default();
        assert!(model.train(&samples(0, 10, 0.0)).is_err());
    }
}
