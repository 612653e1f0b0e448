//! Error types for rusty-potential

use thiserror::Error;

/// Main error type for rusty-potential
#[derive(Error, Debug)]
pub enum PotentialError {
    #[error("Data unavailable for {ticker}: {reason}")]
    DataUnavailable { ticker: String, reason: String },

    #[error("Insufficient data for {ticker}: need at least {required} bars, got {available}")]
    InsufficientData {
        ticker: String,
        required: usize,
        available: usize,
    },

    #[error("Model fit failed ({strategy}): {reason}")]
    ModelFit { strategy: String, reason: String },

    #[error("Unexpected prediction shape: expected {expected}, got {actual:?}")]
    PredictionShape { expected: String, actual: Vec<usize> },

    #[error("Division by zero: current price is 0")]
    DivisionByZero,

    #[error("Scaler mismatch: scaler fit for {expected}, used for {actual}")]
    ScalerMismatch { expected: String, actual: String },

    #[error("Publish error: {0}")]
    Publish(String),

    #[error("Market data provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Fatal configuration error: {0}")]
    FatalConfiguration(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[cfg(feature = "rusqlite-support")]
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl PotentialError {
    /// Shorthand for a fit failure attributed to a strategy
    pub fn model_fit(strategy: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ModelFit {
            strategy: strategy.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error is local to one (ticker, strategy) evaluation.
    ///
    /// Recoverable errors drop that evaluation from ranking; anything else
    /// fails the whole run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::DataUnavailable { .. }
                | Self::InsufficientData { .. }
                | Self::ModelFit { .. }
                | Self::PredictionShape { .. }
                | Self::DivisionByZero
                | Self::ScalerMismatch { .. }
                | Self::Publish(_)
        )
    }
}

/// Result type alias for rusty-potential operations
pub type Result<T> = std::result::Result<T, PotentialError>;
