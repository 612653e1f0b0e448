//! Forecasting models
//!
//! All variants implement [`ForecastModel`]: an expensive `train` that
//! produces a handle, and a pure `predict_next` over that handle.
//!
//! - [`RecurrentModel`]: stacked LSTM encoder over scaled windows
//! - [`AttentionModel`]: one self-attention block over scaled windows
//! - [`DecomposableModel`]: trend + seasonality fit on the raw close series

pub mod attention;
pub mod decomposable;
pub mod linalg;
pub mod recurrent;

pub use attention::{AttentionConfig, AttentionHandle, AttentionModel};
pub use decomposable::{clamp_to_band, DecomposableConfig, DecomposableFit, DecomposableModel, ForecastRow};
pub use recurrent::{RecurrentConfig, RecurrentHandle, RecurrentModel};

use crate::error::{PotentialError, Result};
use crate::types::StrategyKind;
use ndarray::{s, Array1, ArrayD, Ix1, Ix2, Ix3};

/// Train/predict capability shared by every forecasting variant
pub trait ForecastModel: Send + Sync {
    /// What `train` consumes
    type TrainInput: ?Sized;
    /// What `predict_next` consumes
    type PredictInput: ?Sized;
    /// Trained state
    type Handle: Send;

    fn kind(&self) -> StrategyKind;

    /// Fit the model. Called at most once per ticker.
    fn train(&self, input: &Self::TrainInput) -> Result<Self::Handle>;

    /// Predict with a trained handle. The output may carry extra trailing
    /// dimensions; see [`normalize_prediction`].
    fn predict_next(&self, handle: &Self::Handle, input: &Self::PredictInput) -> Result<ArrayD<f64>>;
}

/// Collapse a raw model output to one value per sample.
///
/// Accepted shapes are `[n]`, `[n, 1]` and `[n, t, 1]`; for the 3-D case
/// the last time step is kept.
pub fn normalize_prediction(raw: ArrayD<f64>) -> Result<Array1<f64>> {
    let shape = raw.shape().to_vec();
    let shape_error = || PotentialError::PredictionShape {
        expected: "[n], [n, 1] or [n, t, 1]".to_string(),
        actual: shape.clone(),
    };

    if shape.first().copied().unwrap_or(0) == 0 {
        return Err(shape_error());
    }

    match shape.len() {
        1 => raw.into_dimensionality::<Ix1>().map_err(|_| shape_error()),
        2 if shape[1] == 1 => {
            let arr = raw.into_dimensionality::<Ix2>().map_err(|_| shape_error())?;
            Ok(arr.column(0).to_owned())
        }
        3 if shape[1] > 0 && shape[2] == 1 => {
            let arr = raw.into_dimensionality::<Ix3>().map_err(|_| shape_error())?;
            let last = shape[1] - 1;
            Ok(arr.slice(s![.., last, 0]).to_owned())
        }
        _ => Err(shape_error()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3};

    #[test]
    fn test_normalize_flat() {
        let raw = Array1::from(vec![0.1, 0.2]).into_dyn();
        assert_eq!(normalize_prediction(raw).unwrap().to_vec(), vec![0.1, 0.2]);
    }

    #[test]
    fn test_normalize_column() {
        let raw = Array2::from_shape_vec((3, 1), vec![0.1, 0.2, 0.3]).unwrap().into_dyn();
        assert_eq!(normalize_prediction(raw).unwrap().to_vec(), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_normalize_takes_last_time_step() {
        let raw = Array3::from_shape_fn((2, 4, 1), |(n, t, _)| (n * 10 + t) as f64).into_dyn();
        assert_eq!(normalize_prediction(raw).unwrap().to_vec(), vec![3.0, 13.0]);
    }

    #[test]
    fn test_normalize_rejects_wide_outputs() {
        let raw = Array2::<f64>::zeros((3, 2)).into_dyn();
        assert!(matches!(
            normalize_prediction(raw),
            Err(PotentialError::PredictionShape { .. })
        ));

        let empty = Array1::<f64>::zeros(0).into_dyn();
        assert!(normalize_prediction(empty).is_err());
    }
}
