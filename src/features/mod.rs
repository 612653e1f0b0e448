//! Feature preparation: OHLCV matrices, min-max scaling and sliding windows
//!
//! Every ticker gets its own [`Scaler`], fit once on the ticker's full
//! feature matrix and then used both to encode windows and to decode the
//! model's scaled close predictions back into prices.

pub mod matrix;
pub mod scaler;
pub mod window;

pub use matrix::{FeatureMatrix, CLOSE_INDEX, FEATURE_COLUMNS, N_FEATURES};
pub use scaler::Scaler;
pub use window::{FeatureWindower, TrainingSamples, TrainingSet, DEFAULT_TIME_STEP};
