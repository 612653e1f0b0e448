//! Market data access
//!
//! Providers turn a ticker and a lookback [`Period`] into a [`BarSeries`]:
//! - [`YahooChartProvider`]: daily bars from the Yahoo Finance chart API
//! - [`CsvDirectoryProvider`]: one CSV file per ticker on disk
//! - [`InMemoryProvider`]: preloaded bars, for tests and benchmarks
//!
//! A failed fetch is never fatal for the pipeline: [`MarketDataProvider::fetch`]
//! logs the failure and hands back an empty series.

pub mod csv_dir;
pub mod memory;
pub mod period;
#[cfg(feature = "http")]
pub mod yahoo;

pub use csv_dir::CsvDirectoryProvider;
pub use memory::InMemoryProvider;
pub use period::Period;
#[cfg(feature = "http")]
pub use yahoo::YahooChartProvider;

use crate::error::Result;
use crate::types::{Bar, BarSeries};

/// Source of historical daily bars
pub trait MarketDataProvider: Send + Sync {
    /// Fetch raw bars for `ticker` over the lookback `period`
    fn fetch_bars(&self, ticker: &str, period: &Period) -> Result<Vec<Bar>>;

    /// Get the source name
    fn name(&self) -> &str;

    /// Run-level reachability check, called once before a pipeline run
    fn check_available(&self) -> Result<()> {
        Ok(())
    }

    /// Fetch a normalised series; any failure yields an empty series
    fn fetch(&self, ticker: &str, period: &Period) -> BarSeries {
        log::debug!("Fetching {} ({}) from {}", ticker, period, self.name());
        match self.fetch_bars(ticker, period) {
            Ok(bars) => {
                let series = BarSeries::new(ticker, bars);
                log::debug!("{}: {} bars", ticker, series.len());
                series
            }
            Err(e) => {
                log::warn!("Failed to fetch data for {}: {}", ticker, e);
                BarSeries::empty(ticker)
            }
        }
    }
}
