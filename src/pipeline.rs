//! Pipeline orchestration
//!
//! For each index the orchestrator evaluates every ticker on a bounded
//! worker pool (fetch, then every enabled strategy), waits for the whole
//! index, then ranks each strategy's surviving forecasts. A failure of one
//! (ticker, strategy) pair is logged and excluded; it never affects other
//! strategies or tickers.

use crate::config::{PipelineConfig, ProviderKind};
use crate::data::{CsvDirectoryProvider, MarketDataProvider, Period};
use crate::error::{PotentialError, Result};
use crate::features::FeatureWindower;
use crate::models::{AttentionModel, DecomposableModel, RecurrentModel};
use crate::publish::{PublishReport, ResultPublisher};
use crate::ranking::{IndexResult, RankingAggregator};
use crate::strategy::{DecomposableStrategy, ForecastStrategy, WindowedStrategy};
use crate::types::{BarSeries, Forecast, StrategyKind, Symbol, Timestamp};
use crate::universe::IndexUniverse;
use chrono::Utc;
use hashbrown::HashMap;
use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use uuid::Uuid;

/// Where the orchestrator is in a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    /// Tickers of this index are being evaluated
    Running { index: String },
}

/// Overall outcome of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    /// Every (ticker, strategy) evaluation produced a forecast
    Completed,
    /// At least one evaluation was skipped
    PartialFailure,
}

/// A skipped (ticker, strategy) evaluation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerFailure {
    pub index: String,
    pub ticker: Symbol,
    pub strategy: StrategyKind,
    pub message: String,
}

/// Success/failure counts of one strategy over one index
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyStats {
    pub index: String,
    pub strategy: StrategyKind,
    pub succeeded: usize,
    pub failed: usize,
}

/// Everything a run produced
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: Timestamp,
    pub finished_at: Timestamp,
    pub status: RunStatus,
    /// Index name to its result; indices without any forecast are absent
    pub results: IndexMap<String, IndexResult>,
    pub stats: Vec<StrategyStats>,
    pub failures: Vec<TickerFailure>,
    /// Publication outcome per index, when published
    pub publications: IndexMap<String, PublishReport>,
}

impl RunReport {
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Number of forecasts produced across all indices and strategies
    pub fn forecast_count(&self) -> usize {
        self.stats.iter().map(|s| s.succeeded).sum()
    }
}

struct IndexOutcome {
    result: IndexResult,
    stats: Vec<StrategyStats>,
    failures: Vec<TickerFailure>,
}

/// Drives indices -> tickers -> strategies
pub struct PipelineOrchestrator {
    provider: Arc<dyn MarketDataProvider>,
    strategies: Vec<Box<dyn ForecastStrategy>>,
    aggregator: RankingAggregator,
    pool: rayon::ThreadPool,
    phase: Mutex<RunPhase>,
}

impl PipelineOrchestrator {
    /// Create an orchestrator running at most `max_concurrency` tickers at
    /// once
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        strategies: Vec<Box<dyn ForecastStrategy>>,
        top_n: usize,
        max_concurrency: usize,
    ) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(max_concurrency.max(1))
            .thread_name(|i| format!("potential-worker-{}", i))
            .build()
            .map_err(|e| PotentialError::FatalConfiguration(format!("Failed to build worker pool: {}", e)))?;

        Ok(Self {
            provider,
            strategies,
            aggregator: RankingAggregator::new(top_n),
            pool,
            phase: Mutex::new(RunPhase::Idle),
        })
    }

    /// Build the strategies a configuration enables: Recurrent always, then
    /// Decomposable and Attention when flagged
    pub fn from_config(config: &PipelineConfig, provider: Arc<dyn MarketDataProvider>) -> Result<Self> {
        Self::new(
            provider,
            strategies_from_config(config),
            config.top_n,
            config.max_concurrency,
        )
    }

    pub fn strategy_kinds(&self) -> Vec<StrategyKind> {
        self.strategies.iter().map(|s| s.kind()).collect()
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
            .lock()
            .map(|p| p.clone())
            .unwrap_or(RunPhase::Idle)
    }

    fn set_phase(&self, phase: RunPhase) {
        if let Ok(mut current) = self.phase.lock() {
            *current = phase;
        }
    }

    /// Evaluate every index and rank the results
    pub fn run(&self, indices: &[IndexUniverse]) -> Result<RunReport> {
        self.run_with(indices, |_, _| None)
    }

    /// Like [`run`](Self::run), publishing each index as soon as it is
    /// ranked. A run-level failure is broadcast through
    /// [`ResultPublisher::notify_error`] before being returned.
    pub fn run_and_publish(&self, indices: &[IndexUniverse], publisher: &dyn ResultPublisher) -> Result<RunReport> {
        let outcome = self.run_with(indices, |name, result| Some(publisher.publish(name, result)));
        if let Err(e) = &outcome {
            publisher.notify_error(&e.to_string());
        }
        outcome
    }

    fn run_with<F>(&self, indices: &[IndexUniverse], mut on_index: F) -> Result<RunReport>
    where
        F: FnMut(&str, &IndexResult) -> Option<PublishReport>,
    {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        log::info!(
            "Run {}: {} indices, strategies {:?}, provider {}",
            run_id,
            indices.len(),
            self.strategy_kinds(),
            self.provider.name()
        );

        self.provider
            .check_available()
            .map_err(|e| PotentialError::ProviderUnavailable(format!("{}: {}", self.provider.name(), e)))?;

        let mut results = IndexMap::new();
        let mut publications = IndexMap::new();
        let mut stats = Vec::new();
        let mut failures = Vec::new();

        for universe in indices {
            self.set_phase(RunPhase::Running {
                index: universe.name.clone(),
            });
            let outcome = self.evaluate_index(universe);
            stats.extend(outcome.stats);
            failures.extend(outcome.failures);

            if outcome.result.is_empty() {
                log::info!("{}: no forecasts survived, omitting index", universe.name);
                continue;
            }
            if let Some(report) = on_index(&universe.name, &outcome.result) {
                publications.insert(universe.name.clone(), report);
            }
            results.insert(universe.name.clone(), outcome.result);
        }
        self.set_phase(RunPhase::Idle);

        let status = if failures.is_empty() {
            RunStatus::Completed
        } else {
            RunStatus::PartialFailure
        };
        log::info!(
            "Run {} finished: {:?}, {} indices with results, {} skipped evaluations",
            run_id,
            status,
            results.len(),
            failures.len()
        );

        Ok(RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            status,
            results,
            stats,
            failures,
            publications,
        })
    }

    fn evaluate_index(&self, universe: &IndexUniverse) -> IndexOutcome {
        log::info!("Processing index {} ({} tickers)", universe.name, universe.tickers.len());

        // Join barrier: every ticker finishes before ranking
        let per_ticker: Vec<Vec<Result<Forecast>>> = self.pool.install(|| {
            universe
                .tickers
                .par_iter()
                .map(|ticker| self.evaluate_ticker(ticker))
                .collect()
        });

        let mut result = IndexResult::new();
        let mut stats = Vec::with_capacity(self.strategies.len());
        let mut failures = Vec::new();

        for (s, strategy) in self.strategies.iter().enumerate() {
            let kind = strategy.kind();
            let mut forecasts = Vec::new();
            let mut failed = 0;

            for (ticker, outcomes) in universe.tickers.iter().zip(&per_ticker) {
                match &outcomes[s] {
                    Ok(forecast) => forecasts.push(forecast.clone()),
                    Err(e) => {
                        failed += 1;
                        failures.push(TickerFailure {
                            index: universe.name.clone(),
                            ticker: ticker.clone(),
                            strategy: kind,
                            message: e.to_string(),
                        });
                    }
                }
            }

            log::info!(
                "{} {}: {} forecasts, {} skipped",
                universe.name,
                kind,
                forecasts.len(),
                failed
            );
            stats.push(StrategyStats {
                index: universe.name.clone(),
                strategy: kind,
                succeeded: forecasts.len(),
                failed,
            });
            result.insert(kind, self.aggregator.rank(&forecasts));
        }

        IndexOutcome {
            result,
            stats,
            failures,
        }
    }

    /// All strategy outcomes of one ticker, in strategy order. Series are
    /// fetched once per distinct period.
    fn evaluate_ticker(&self, ticker: &str) -> Vec<Result<Forecast>> {
        let started = Instant::now();
        let mut cache: HashMap<Period, BarSeries> = HashMap::new();

        let outcomes = self
            .strategies
            .iter()
            .map(|strategy| {
                let period = *strategy.period();
                let series = cache
                    .entry(period)
                    .or_insert_with(|| self.provider.fetch(ticker, &period));

                let outcome = strategy.evaluate(series);
                if let Err(e) = &outcome {
                    log::warn!("{} prediction failed for {}: {}", strategy.kind(), ticker, e);
                }
                outcome
            })
            .collect();

        log::debug!("{}: evaluated in {:?}", ticker, started.elapsed());
        outcomes
    }
}

/// Enabled strategies in evaluation order
pub fn strategies_from_config(config: &PipelineConfig) -> Vec<Box<dyn ForecastStrategy>> {
    let windower = FeatureWindower::new(config.time_step);
    let mut strategies: Vec<Box<dyn ForecastStrategy>> = vec![Box::new(
        WindowedStrategy::new(
            RecurrentModel::new(config.models.recurrent.clone()),
            windower,
            config.period,
        )
        .with_min_bars(config.min_window_bars),
    )];

    if config.strategies.decomposable {
        strategies.push(Box::new(DecomposableStrategy::new(
            DecomposableModel::new(config.models.decomposable.clone()),
            config.period,
        )));
    }
    if config.strategies.attention {
        strategies.push(Box::new(
            WindowedStrategy::new(
                AttentionModel::new(config.models.attention.clone()),
                windower,
                config.strategies.attention_period,
            )
            .with_min_bars(config.min_window_bars),
        ));
    }
    strategies
}

/// A validated run, ready to start
pub struct PreparedRun {
    pub orchestrator: PipelineOrchestrator,
    pub universes: Vec<IndexUniverse>,
}

/// Validate `config` and build its provider and orchestrator. Any failure is
/// broadcast through [`ResultPublisher::notify_error`] before being returned.
pub fn prepare_run(config: &PipelineConfig, publisher: &dyn ResultPublisher) -> Result<PreparedRun> {
    let prepared = config.validate().and_then(|()| {
        let universes = config
            .selected_indices()?
            .iter()
            .map(|index| index.universe())
            .collect();
        let orchestrator = PipelineOrchestrator::from_config(config, provider_from_config(config)?)?;
        Ok(PreparedRun {
            orchestrator,
            universes,
        })
    });
    if let Err(e) = &prepared {
        publisher.notify_error(&e.to_string());
    }
    prepared
}

/// Market data provider selected by a configuration
pub fn provider_from_config(config: &PipelineConfig) -> Result<Arc<dyn MarketDataProvider>> {
    match config.data.provider {
        ProviderKind::Csv => {
            let dir = config.data.csv_dir.as_ref().ok_or_else(|| {
                PotentialError::FatalConfiguration("csv provider requires data.csv_dir".to_string())
            })?;
            Ok(Arc::new(CsvDirectoryProvider::new(dir)?))
        }
        #[cfg(feature = "http")]
        ProviderKind::Yahoo => Ok(Arc::new(crate::data::YahooChartProvider::new()?)),
        #[cfg(not(feature = "http"))]
        ProviderKind::Yahoo => Err(PotentialError::FatalConfiguration(
            "yahoo provider requires the http feature".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::InMemoryProvider;
    use crate::types::Bar;
    use chrono::{Duration, TimeZone};

    /// Potential read off the last close: `close / 100 - 1`
    struct Echo {
        kind: StrategyKind,
        period: Period,
    }

    impl ForecastStrategy for Echo {
        fn kind(&self) -> StrategyKind {
            self.kind
        }

        fn period(&self) -> &Period {
            &self.period
        }

        fn evaluate(&self, series: &BarSeries) -> Result<Forecast> {
            let close = series.last_close().ok_or_else(|| PotentialError::DataUnavailable {
                ticker: series.ticker().to_string(),
                reason: "empty".to_string(),
            })?;
            Ok(Forecast::new(series.ticker(), close / 100.0 - 1.0, 100.0, close))
        }
    }

    /// Fails for one ticker only
    struct FailsFor(&'static str);

    impl ForecastStrategy for FailsFor {
        fn kind(&self) -> StrategyKind {
            StrategyKind::Attention
        }

        fn period(&self) -> &Period {
            &Period::Max
        }

        fn evaluate(&self, series: &BarSeries) -> Result<Forecast> {
            if series.ticker() == self.0 {
                return Err(PotentialError::model_fit("Attention", "diverged"));
            }
            Ok(Forecast::new(series.ticker(), 0.0, 1.0, 1.0))
        }
    }

    struct Unreachable;

    impl MarketDataProvider for Unreachable {
        fn fetch_bars(&self, ticker: &str, _period: &Period) -> Result<Vec<Bar>> {
            Err(PotentialError::DataUnavailable {
                ticker: ticker.to_string(),
                reason: "offline".to_string(),
            })
        }

        fn name(&self) -> &str {
            "unreachable"
        }

        fn check_available(&self) -> Result<()> {
            Err(PotentialError::Publish("connection refused".to_string()))
        }
    }

    fn bars(close: f64) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        (0..3)
            .map(|i| Bar::new(start + Duration::days(i), close, close, close, close, 10.0))
            .collect()
    }

    fn provider() -> Arc<InMemoryProvider> {
        Arc::new(
            InMemoryProvider::new()
                .with_series("A", bars(110.0))
                .with_series("B", bars(90.0))
                .with_series("C", bars(130.0)),
        )
    }

    fn echo(kind: StrategyKind) -> Box<dyn ForecastStrategy> {
        Box::new(Echo {
            kind,
            period: Period::Months(3),
        })
    }

    fn universe(tickers: &[&str]) -> IndexUniverse {
        IndexUniverse::new("Test", tickers.iter().map(|t| t.to_string()).collect())
    }

    #[test]
    fn test_ranks_each_index() {
        let orchestrator =
            PipelineOrchestrator::new(provider(), vec![echo(StrategyKind::Recurrent)], 10, 2).unwrap();
        let report = orchestrator.run(&[universe(&["A", "B", "C"])]).unwrap();

        assert_eq!(report.status, RunStatus::Completed);
        let result = &report.results["Test"];
        let top: Vec<&str> = result.get("Recurrent-top").unwrap().iter().map(|f| f.ticker.as_str()).collect();
        let bottom: Vec<&str> = result
            .get("Recurrent-bottom")
            .unwrap()
            .iter()
            .map(|f| f.ticker.as_str())
            .collect();
        assert_eq!(top, vec!["C", "A", "B"]);
        assert_eq!(bottom, vec!["B", "A", "C"]);
        assert_eq!(orchestrator.phase(), RunPhase::Idle);
    }

    #[test]
    fn test_failures_are_isolated_per_strategy() {
        let orchestrator = PipelineOrchestrator::new(
            provider(),
            vec![echo(StrategyKind::Recurrent), Box::new(FailsFor("B"))],
            10,
            4,
        )
        .unwrap();
        let report = orchestrator.run(&[universe(&["A", "B", "C"])]).unwrap();

        assert_eq!(report.status, RunStatus::PartialFailure);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].ticker, "B");
        assert_eq!(report.failures[0].strategy, StrategyKind::Attention);

        let result = &report.results["Test"];
        assert_eq!(result.get("Recurrent-top").unwrap().len(), 3);
        assert_eq!(result.get("Attention-top").unwrap().len(), 2);
        assert_eq!(report.forecast_count(), 5);
    }

    #[test]
    fn test_index_without_forecasts_is_omitted() {
        let orchestrator =
            PipelineOrchestrator::new(provider(), vec![echo(StrategyKind::Recurrent)], 10, 1).unwrap();
        let report = orchestrator
            .run(&[universe(&["MISSING"]), universe(&["A"])])
            .unwrap();

        // Both universes share a name; only the one with a forecast is kept
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(report.status, RunStatus::PartialFailure));
    }

    #[test]
    fn test_fetch_once_per_period() {
        let provider = provider();
        let strategies = vec![
            echo(StrategyKind::Recurrent),
            echo(StrategyKind::Decomposable),
            Box::new(FailsFor("none")) as Box<dyn ForecastStrategy>,
        ];
        let orchestrator = PipelineOrchestrator::new(provider.clone(), strategies, 10, 2).unwrap();
        orchestrator.run(&[universe(&["A", "B"])]).unwrap();

        // Two tickers, two distinct periods
        assert_eq!(provider.fetch_count(), 4);
    }

    #[test]
    fn test_unreachable_provider_fails_run() {
        let orchestrator =
            PipelineOrchestrator::new(Arc::new(Unreachable), vec![echo(StrategyKind::Recurrent)], 10, 1).unwrap();
        let err = orchestrator.run(&[universe(&["A"])]).unwrap_err();

        assert!(matches!(err, PotentialError::ProviderUnavailable(_)));
        assert!(!err.is_recoverable());
    }

    /// Keeps every error notice
    #[derive(Default)]
    struct ErrorLog {
        errors: Mutex<Vec<String>>,
    }

    impl ResultPublisher for ErrorLog {
        fn publish(&self, _index_name: &str, _result: &IndexResult) -> PublishReport {
            PublishReport::default()
        }

        fn notify_error(&self, message: &str) -> PublishReport {
            self.errors.lock().unwrap().push(message.to_string());
            PublishReport::default()
        }
    }

    #[test]
    fn test_configuration_errors_are_broadcast() {
        let config = PipelineConfig {
            indices: vec!["ftse".to_string()],
            ..PipelineConfig::default()
        };
        let publisher = ErrorLog::default();

        let err = prepare_run(&config, &publisher).err().unwrap();

        assert!(matches!(err, PotentialError::FatalConfiguration(_)));
        let errors = publisher.errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Fatal configuration error"));
        assert!(errors[0].contains("ftse"));
    }

    #[test]
    fn test_prepare_resolves_universes() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::default()
            .with_indices(&[crate::universe::MarketIndex::Dji])
            .with_csv_dir(dir.path());
        let publisher = ErrorLog::default();

        let prepared = prepare_run(&config, &publisher).unwrap();

        assert_eq!(prepared.universes.len(), 1);
        assert_eq!(prepared.universes[0].name, "Dow Jones");
        assert_eq!(prepared.orchestrator.strategy_kinds(), vec![StrategyKind::Recurrent]);
        assert!(publisher.errors.lock().unwrap().is_empty());
    }

    #[test]
    fn test_strategies_from_config_order() {
        let config = PipelineConfig::default().with_attention(true).with_decomposable(true);
        let kinds: Vec<StrategyKind> = strategies_from_config(&config).iter().map(|s| s.kind()).collect();
        assert_eq!(
            kinds,
            vec![StrategyKind::Recurrent, StrategyKind::Decomposable, StrategyKind::Attention]
        );

        let attention_period = strategies_from_config(&config)[2].period().to_owned();
        assert_eq!(attention_period, Period::Years(1));
        assert_eq!(strategies_from_config(&PipelineConfig::default()).len(), 1);
    }
}
