//! Per-ticker CSV files on disk
//!
//! Each ticker lives in `<dir>/<TICKER>.csv` with a header row containing
//! at least `Date,Open,High,Low,Close,Volume`. Extra columns are ignored.

use super::{MarketDataProvider, Period};
use crate::error::{PotentialError, Result};
use crate::types::Bar;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Open")]
    open: f64,
    #[serde(rename = "High")]
    high: f64,
    #[serde(rename = "Low")]
    low: f64,
    #[serde(rename = "Close")]
    close: f64,
    #[serde(rename = "Volume")]
    volume: f64,
}

/// Reads daily bars from a directory of CSV files
#[derive(Debug, Clone)]
pub struct CsvDirectoryProvider {
    dir: PathBuf,
}

impl CsvDirectoryProvider {
    /// Create a provider over an existing directory
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(PotentialError::FatalConfiguration(format!(
                "CSV data directory not found: {}",
                dir.display()
            )));
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{ticker}.csv"))
    }
}

/// Parse CSV text into bars in file order
pub fn parse_csv_bars(csv_text: &str) -> Result<Vec<Bar>> {
    let mut reader = csv::Reader::from_reader(csv_text.as_bytes());
    let mut bars = Vec::new();

    for result in reader.deserialize() {
        let row: CsvRow = result?;
        bars.push(Bar::new(
            parse_timestamp(&row.date)?,
            row.open,
            row.high,
            row.low,
            row.close,
            row.volume,
        ));
    }

    Ok(bars)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| PotentialError::Parse(format!("Date parse error for {raw}: {e}")))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| PotentialError::Parse(format!("Invalid time for {raw}")))?;
    Ok(DateTime::from_naive_utc_and_offset(midnight, Utc))
}

impl MarketDataProvider for CsvDirectoryProvider {
    fn fetch_bars(&self, ticker: &str, period: &Period) -> Result<Vec<Bar>> {
        let path = self.path_for(ticker);
        if !path.exists() {
            return Err(PotentialError::DataUnavailable {
                ticker: ticker.to_string(),
                reason: format!("{} does not exist", path.display()),
            });
        }

        let text = std::fs::read_to_string(&path)?;
        let bars = parse_csv_bars(&text)?;

        // Lookback is measured back from the newest bar in the file
        let Some(end) = bars.iter().map(|b| b.timestamp).max() else {
            return Ok(bars);
        };
        Ok(match period.start_from(end) {
            Some(start) => bars.into_iter().filter(|b| b.timestamp >= start).collect(),
            None => bars,
        })
    }

    fn name(&self) -> &str {
        "csv"
    }

    fn check_available(&self) -> Result<()> {
        if self.dir.is_dir() {
            Ok(())
        } else {
            Err(PotentialError::DataUnavailable {
                ticker: "*".to_string(),
                reason: format!("{} is not readable", self.dir.display()),
            })
        }
    }
}
