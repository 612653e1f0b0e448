//! End-to-end runs of the pipeline over in-memory and on-disk data

use chrono::{Duration, TimeZone, Utc};
use rusty_potential::config::PipelineConfig;
use rusty_potential::data::{CsvDirectoryProvider, InMemoryProvider};
use rusty_potential::pipeline::{PipelineOrchestrator, RunStatus};
use rusty_potential::types::{Bar, StrategyKind};
use rusty_potential::universe::IndexUniverse;
use std::fmt::Write as _;
use std::sync::Arc;

/// Daily bars whose close moves linearly from `from` to `to`
fn ramp(from: f64, to: f64, len: usize) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    let step = if len > 1 { (to - from) / (len - 1) as f64 } else { 0.0 };
    (0..len)
        .map(|i| {
            let close = from + step * i as f64;
            Bar::new(
                start + Duration::days(i as i64),
                close - 0.3,
                close + 1.0,
                close - 1.0,
                close,
                1_000_000.0 + i as f64 * 500.0,
            )
        })
        .collect()
}

fn universe(name: &str, tickers: &[&str]) -> IndexUniverse {
    IndexUniverse::new(name, tickers.iter().map(|t| t.to_string()).collect())
}

fn tickers_of(result: &[rusty_potential::types::Forecast]) -> Vec<&str> {
    result.iter().map(|f| f.ticker.as_str()).collect()
}

#[test]
fn test_rising_ticker_ranks_on_top() {
    let provider = InMemoryProvider::new()
        .with_series("X", ramp(100.0, 190.0, 90))
        .with_series("F1", ramp(190.0, 100.0, 90))
        .with_series("F2", ramp(150.0, 120.0, 90))
        .with_series("F3", ramp(80.0, 60.0, 90))
        .with_series("F4", ramp(50.0, 45.0, 90));
    let config = PipelineConfig::default().with_top_n(2).with_decomposable(true);
    let orchestrator = PipelineOrchestrator::from_config(&config, Arc::new(provider)).unwrap();

    let report = orchestrator
        .run(&[universe("Synthetic", &["X", "F1", "F2", "F3", "F4"])])
        .unwrap();
    let result = &report.results["Synthetic"];

    let top = result.get("Decomposable-top").unwrap();
    let bottom = result.get("Decomposable-bottom").unwrap();
    assert_eq!(top[0].ticker, "X");
    assert!(top[0].potential > 0.0);
    assert!(!tickers_of(bottom).contains(&"X"));
    assert_eq!(top.len(), 2);
    assert_eq!(bottom.len(), 2);

    let recurrent_top = result.get("Recurrent-top").unwrap();
    let recurrent_bottom = result.get("Recurrent-bottom").unwrap();
    let x = recurrent_top.iter().find(|f| f.ticker == "X").unwrap();
    assert!(x.potential > 0.0);
    assert!(!tickers_of(recurrent_bottom).contains(&"X"));

    // Recurrent is always evaluated and listed first
    let labels: Vec<&str> = result.labels().collect();
    assert_eq!(
        labels,
        vec!["Recurrent-top", "Recurrent-bottom", "Decomposable-top", "Decomposable-bottom"]
    );
}

#[test]
fn test_small_index_appears_in_both_lists() {
    let provider = InMemoryProvider::new()
        .with_series("A", ramp(100.0, 120.0, 80))
        .with_series("B", ramp(100.0, 90.0, 80))
        .with_series("C", ramp(40.0, 41.0, 80));
    let config = PipelineConfig::default().with_decomposable(true);
    let orchestrator = PipelineOrchestrator::from_config(&config, Arc::new(provider)).unwrap();

    let report = orchestrator.run(&[universe("Three", &["A", "B", "C"])]).unwrap();
    let result = &report.results["Three"];

    for kind in [StrategyKind::Recurrent, StrategyKind::Decomposable] {
        let mut top = tickers_of(result.get(&kind.top_label()).unwrap());
        let mut bottom = tickers_of(result.get(&kind.bottom_label()).unwrap());
        top.sort_unstable();
        bottom.sort_unstable();
        assert_eq!(top, vec!["A", "B", "C"]);
        assert_eq!(bottom, vec!["A", "B", "C"]);
    }
    assert_eq!(report.status, RunStatus::Completed);
}

#[test]
fn test_unavailable_tickers_produce_no_results() {
    let orchestrator =
        PipelineOrchestrator::from_config(&PipelineConfig::default(), Arc::new(InMemoryProvider::new())).unwrap();

    let report = orchestrator.run(&[universe("Ghost", &["NOPE1", "NOPE2"])]).unwrap();

    assert!(report.results.is_empty());
    assert_eq!(report.failures.len(), 2);
    assert_eq!(report.status, RunStatus::PartialFailure);
    assert_eq!(report.forecast_count(), 0);
}

#[test]
fn test_short_history_only_skips_windowed_strategy() {
    let provider = InMemoryProvider::new()
        .with_series("LONG", ramp(100.0, 130.0, 90))
        .with_series("SHORT", ramp(100.0, 110.0, 45));
    let config = PipelineConfig::default().with_decomposable(true);
    let orchestrator = PipelineOrchestrator::from_config(&config, Arc::new(provider)).unwrap();

    let report = orchestrator.run(&[universe("Mixed", &["LONG", "SHORT"])]).unwrap();
    let result = &report.results["Mixed"];

    assert!(!tickers_of(result.get("Recurrent-top").unwrap()).contains(&"SHORT"));
    assert!(tickers_of(result.get("Decomposable-top").unwrap()).contains(&"SHORT"));

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].ticker, "SHORT");
    assert_eq!(report.failures[0].strategy, StrategyKind::Recurrent);
}

#[test]
fn test_short_history_skips_every_windowed_strategy() {
    let provider = InMemoryProvider::new()
        .with_series("LONG", ramp(100.0, 130.0, 90))
        .with_series("SHORT", ramp(100.0, 110.0, 45));
    let config = PipelineConfig::default().with_decomposable(true).with_attention(true);
    let orchestrator = PipelineOrchestrator::from_config(&config, Arc::new(provider)).unwrap();

    let report = orchestrator.run(&[universe("Mixed", &["LONG", "SHORT"])]).unwrap();
    let result = &report.results["Mixed"];

    assert_eq!(tickers_of(result.get("Recurrent-top").unwrap()), vec!["LONG"]);
    assert_eq!(tickers_of(result.get("Attention-top").unwrap()), vec!["LONG"]);
    assert!(tickers_of(result.get("Decomposable-top").unwrap()).contains(&"SHORT"));

    let mut skipped: Vec<(&str, StrategyKind)> = report
        .failures
        .iter()
        .map(|f| (f.ticker.as_str(), f.strategy))
        .collect();
    skipped.sort_by_key(|(_, kind)| kind.to_string());
    assert_eq!(
        skipped,
        vec![("SHORT", StrategyKind::Attention), ("SHORT", StrategyKind::Recurrent)]
    );
    assert_eq!(report.status, RunStatus::PartialFailure);
}

#[test]
fn test_csv_directory_run() {
    let dir = tempfile::tempdir().unwrap();
    for (ticker, from, to) in [("AAA", 20.0, 30.0), ("BBB", 30.0, 25.0)] {
        let mut csv = String::from("Date,Open,High,Low,Close,Volume\n");
        for bar in ramp(from, to, 70) {
            writeln!(
                csv,
                "{},{},{},{},{},{}",
                bar.timestamp.format("%Y-%m-%d"),
                bar.open,
                bar.high,
                bar.low,
                bar.close,
                bar.volume
            )
            .unwrap();
        }
        std::fs::write(dir.path().join(format!("{ticker}.csv")), csv).unwrap();
    }

    let config = PipelineConfig::default()
        .with_csv_dir(dir.path())
        .with_period("max".parse().unwrap());
    let provider = Arc::new(CsvDirectoryProvider::new(dir.path()).unwrap());
    let orchestrator = PipelineOrchestrator::from_config(&config, provider).unwrap();

    let report = orchestrator.run(&[universe("Files", &["AAA", "BBB"])]).unwrap();
    let top = report.results["Files"].get("Recurrent-top").unwrap();

    assert_eq!(top.len(), 2);
    assert!(top.iter().all(|f| f.predicted_price.is_finite()));
    let last_close = ramp(20.0, 30.0, 70).last().unwrap().close;
    assert_eq!(top.iter().find(|f| f.ticker == "AAA").unwrap().current_price, last_close);
}

#[cfg(feature = "rusqlite-support")]
#[test]
fn test_published_results_are_stored() {
    use rusty_potential::publish::{Broadcaster, SqliteResultStore};

    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("predictions.db");

    let provider = InMemoryProvider::new()
        .with_series("A", ramp(10.0, 12.0, 40))
        .with_series("B", ramp(10.0, 9.0, 40));
    let config = PipelineConfig::default().with_decomposable(true);
    let orchestrator = PipelineOrchestrator::from_config(&config, Arc::new(provider)).unwrap();
    let publisher = Broadcaster::new().with_store(Box::new(SqliteResultStore::open(&db).unwrap()));

    let report = orchestrator
        .run_and_publish(&[universe("Stored", &["A", "B"])], &publisher)
        .unwrap();

    let publication = &report.publications["Stored"];
    assert!(publication.is_clean());
    assert!(publication.stored.is_some());

    let reopened = SqliteResultStore::open(&db).unwrap();
    assert_eq!(reopened.count("Stored").unwrap(), 1);
    let stored = reopened.latest("Stored").unwrap().unwrap();
    let labels: Vec<&str> = stored.labels().collect();
    assert_eq!(labels, vec!["Decomposable-top", "Decomposable-bottom"]);
}
