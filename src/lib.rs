//! # Rusty-Potential
//!
//! Next-period price forecasting and "potential" ranking across equity
//! index universes.
//!
//! For every ticker of an index, each enabled strategy (recurrent network,
//! self-attention, trend + seasonality decomposition) predicts the next close.
//! The relative gap between predicted and current price is the ticker's
//! potential; per strategy the highest and lowest potentials of the index are
//! kept and published.
//!
//! ## Example
//!
//! ```rust,no_run
//! use rusty_potential::prelude::*;
//! use std::sync::Arc;
//!
//! # fn main() -> rusty_potential::error::Result<()> {
//! let config = PipelineConfig::default().with_decomposable(true);
//! let provider = Arc::new(CsvDirectoryProvider::new("data/bars")?);
//! let orchestrator = PipelineOrchestrator::from_config(&config, provider)?;
//!
//! let indices: Vec<IndexUniverse> = config
//!     .selected_indices()?
//!     .iter()
//!     .map(|index| index.universe())
//!     .collect();
//! let report = orchestrator.run_and_publish(&indices, &Broadcaster::new().with_channel(Box::new(LogChannel)))?;
//! println!("{}", report.to_json_pretty()?);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod models;
pub mod pipeline;
pub mod publish;
pub mod ranking;
pub mod scoring;
pub mod strategy;
pub mod types;
pub mod universe;

pub mod prelude {
    //! Commonly used types and traits
    pub use crate::config::PipelineConfig;
    pub use crate::data::{CsvDirectoryProvider, InMemoryProvider, MarketDataProvider, Period};
    pub use crate::error::{PotentialError, Result};
    pub use crate::features::{FeatureWindower, Scaler};
    pub use crate::models::ForecastModel;
    pub use crate::pipeline::{PipelineOrchestrator, RunReport, RunStatus};
    pub use crate::publish::{Broadcaster, LogChannel, NotificationChannel, ResultPublisher};
    pub use crate::ranking::{IndexResult, Ranking, RankingAggregator};
    pub use crate::scoring::PotentialScorer;
    pub use crate::strategy::ForecastStrategy;
    pub use crate::types::*;
    pub use crate::universe::{IndexUniverse, MarketIndex};
}
