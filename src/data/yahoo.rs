//! Yahoo Finance chart API integration
//!
//! Provides free access to daily OHLCV history, no API key required.

use super::{MarketDataProvider, Period};
use crate::error::{PotentialError, Result};
use crate::types::Bar;
use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;

const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Symbol fetched to check reachability before a run
const HEARTBEAT_SYMBOL: &str = "SPY";

/// Yahoo Finance chart source
pub struct YahooChartProvider {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

impl YahooChartProvider {
    /// Create a new Yahoo Finance data source
    pub fn new() -> Result<Self> {
        Self::with_base_url(YAHOO_CHART_URL)
    }

    /// Create a source against a different chart endpoint
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| PotentialError::FatalConfiguration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn chart_url(&self, ticker: &str, period: &Period) -> String {
        format!(
            "{}/{}?range={}&interval=1d&events=history",
            self.base_url,
            yahoo_symbol(ticker),
            period.as_token()
        )
    }

    fn get(&self, ticker: &str, period: &Period) -> Result<String> {
        let url = self.chart_url(ticker, period);
        let response = self.client.get(&url).send()?;

        if !response.status().is_success() {
            return Err(PotentialError::DataUnavailable {
                ticker: ticker.to_string(),
                reason: format!("Yahoo Finance returned error: {}", response.status()),
            });
        }

        Ok(response.text()?)
    }
}

/// Yahoo spells share classes with a dash (`BRK.B` -> `BRK-B`) but keeps
/// exchange suffixes such as `.HK` or `.TW`.
pub fn yahoo_symbol(ticker: &str) -> String {
    match ticker.rsplit_once('.') {
        Some((base, class)) if class.len() == 1 => format!("{base}-{class}"),
        _ => ticker.to_string(),
    }
}

/// Decode a chart response body into bars. Rows with any missing field are
/// skipped.
pub fn parse_chart(ticker: &str, body: &str) -> Result<Vec<Bar>> {
    let envelope: ChartEnvelope = serde_json::from_str(body)?;

    if let Some(err) = envelope.chart.error {
        return Err(PotentialError::DataUnavailable {
            ticker: ticker.to_string(),
            reason: format!("{}: {}", err.code, err.description),
        });
    }

    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

    let mut bars = Vec::with_capacity(result.timestamp.len());
    for (i, &secs) in result.timestamp.iter().enumerate() {
        let field = |values: &Vec<Option<f64>>| values.get(i).copied().flatten();
        let (Some(open), Some(high), Some(low), Some(close), Some(volume)) = (
            field(&quote.open),
            field(&quote.high),
            field(&quote.low),
            field(&quote.close),
            field(&quote.volume),
        ) else {
            continue;
        };
        let Some(timestamp) = DateTime::<Utc>::from_timestamp(secs, 0) else {
            continue;
        };
        bars.push(Bar::new(timestamp, open, high, low, close, volume));
    }

    Ok(bars)
}

impl MarketDataProvider for YahooChartProvider {
    fn fetch_bars(&self, ticker: &str, period: &Period) -> Result<Vec<Bar>> {
        let body = self.get(ticker, period)?;
        parse_chart(ticker, &body)
    }

    fn name(&self) -> &str {
        "yahoo"
    }

    fn check_available(&self) -> Result<()> {
        let body = self.get(HEARTBEAT_SYMBOL, &Period::Days(5))?;
        parse_chart(HEARTBEAT_SYMBOL, &body).map(|_| ())
    }
}
