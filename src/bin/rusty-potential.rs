//! rusty-potential CLI - Command-line interface for the forecasting pipeline
//!
//! ## Example Usage
//!
//! ```bash
//! # Rank the default indices with the recurrent strategy
//! rusty-potential run
//!
//! # Add the decomposition and attention strategies for two indices
//! rusty-potential run --indices sp500,nasdaq --decomposable --attention
//!
//! # Use local CSV files and save the report
//! rusty-potential run --csv-dir ./bars --output report.json --no-publish
//!
//! # List the built-in indices
//! rusty-potential indices --tickers
//! ```

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use rusty_potential::config::PipelineConfig;
use rusty_potential::data::Period;
use rusty_potential::pipeline::{prepare_run, PreparedRun, RunReport, RunStatus};
use rusty_potential::publish::{forecast_line, Broadcaster, ResultPublisher};
use rusty_potential::universe::MarketIndex;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::time::{Duration, Instant};

/// rusty-potential: Next-period potential ranking for equity indices
#[derive(Parser)]
#[command(name = "rusty-potential")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "Robert Fall")]
#[command(about = "Next-period potential ranking for equity indices", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Forecast, rank and publish the selected indices
    Run {
        /// Comma separated index keys (tw50, tw_mid100, sp500, nasdaq, sox, dji)
        #[arg(short = 'i', long, value_delimiter = ',')]
        indices: Vec<MarketIndex>,

        /// Lookback period for the recurrent and decomposition strategies
        #[arg(short = 'p', long)]
        period: Option<Period>,

        /// Enable the attention strategy
        #[arg(long)]
        attention: bool,

        /// Enable the trend + seasonality strategy
        #[arg(long)]
        decomposable: bool,

        /// Number of tickers kept at each end of a ranking
        #[arg(short = 'n', long)]
        top_n: Option<usize>,

        /// Read bars from `<TICKER>.csv` files in this directory
        #[arg(long)]
        csv_dir: Option<PathBuf>,

        /// Write the run report as JSON
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Skip the result store and notification channels
        #[arg(long)]
        no_publish: bool,
    },

    /// List the built-in indices
    Indices {
        /// Print every ticker
        #[arg(short = 't', long)]
        tickers: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}

struct RunOptions {
    indices: Vec<MarketIndex>,
    period: Option<Period>,
    attention: bool,
    decomposable: bool,
    top_n: Option<usize>,
    csv_dir: Option<PathBuf>,
    output: Option<PathBuf>,
    no_publish: bool,
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config_path = cli.config.as_deref();
    let result = match cli.command {
        Commands::Run {
            indices,
            period,
            attention,
            decomposable,
            top_n,
            csv_dir,
            output,
            no_publish,
        } => run_pipeline(
            config_path,
            RunOptions {
                indices,
                period,
                attention,
                decomposable,
                top_n,
                csv_dir,
                output,
                no_publish,
                verbose: cli.verbose,
            },
        ),
        Commands::Indices { tickers } => {
            list_indices(tickers);
            Ok(())
        }
        Commands::Config => load_config(config_path).and_then(|config| show_config(&config)),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".rusty-potential").join("config.toml"))
}

/// Explicit file, else `~/.rusty-potential/config.toml` when present, else
/// defaults; environment overrides are applied last
fn load_config(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    let mut config = match path {
        Some(path) => PipelineConfig::load_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => match default_config_path().filter(|p| p.exists()) {
            Some(path) => {
                log::debug!("Using config {}", path.display());
                PipelineConfig::load_file(&path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?
            }
            None => PipelineConfig::default(),
        },
    };
    config.apply_process_env()?;
    Ok(config)
}

/// Report a failure that happened before the configured publisher existed,
/// through whatever channels the environment alone can build
fn notify_startup_failure(error: &anyhow::Error) {
    let mut config = PipelineConfig::default();
    if let Err(e) = config.apply_process_env() {
        log::debug!("Ignoring environment while reporting startup failure: {}", e);
    }
    Broadcaster::best_effort(&config.publish).notify_error(&format!("{:#}", error));
}

fn run_pipeline(config_path: Option<&Path>, opts: RunOptions) -> anyhow::Result<()> {
    let mut config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            notify_startup_failure(&e);
            return Err(e);
        }
    };

    if !opts.indices.is_empty() {
        config = config.with_indices(&opts.indices);
    }
    if let Some(period) = opts.period {
        config = config.with_period(period);
    }
    if opts.attention {
        config = config.with_attention(true);
    }
    if opts.decomposable {
        config = config.with_decomposable(true);
    }
    if let Some(n) = opts.top_n {
        config = config.with_top_n(n);
    }
    if let Some(dir) = opts.csv_dir {
        config = config.with_csv_dir(dir);
    }
    if opts.no_publish {
        config.publish.store_path = None;
        config.publish.telegram.enabled = false;
        config.publish.discord.enabled = false;
        config.publish.email.enabled = false;
    }

    let publisher = match Broadcaster::from_config(&config.publish) {
        Ok(publisher) => publisher,
        Err(e) => {
            Broadcaster::best_effort(&config.publish).notify_error(&e.to_string());
            return Err(e.into());
        }
    };
    let PreparedRun {
        orchestrator,
        universes,
    } = prepare_run(&config, &publisher)?;

    if opts.verbose {
        println!("{}", "Run Configuration".cyan().bold());
        println!("{}", "=================".cyan());
        println!("  {} {}", "Indices:".bold(), config.indices.join(", "));
        println!("  {} {}", "Period:".bold(), config.period);
        println!("  {} {:?}", "Strategies:".bold(), orchestrator.strategy_kinds());
        println!("  {} {:?}", "Channels:".bold(), publisher.channel_names());
        println!();
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")?
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    let total: usize = universes.iter().map(|u| u.tickers.len()).sum();
    pb.set_message(format!("Evaluating {} tickers across {} indices...", total, universes.len()));

    let started = Instant::now();
    let report = orchestrator.run_and_publish(&universes, &publisher);
    pb.finish_and_clear();
    let report = report?;

    print_report(&report, started.elapsed());

    if let Some(path) = opts.output {
        fs::write(&path, report.to_json_pretty()?)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        println!("{} Report saved to {}", "✓".green().bold(), path.display());
    }
    Ok(())
}

fn print_report(report: &RunReport, elapsed: Duration) {
    println!("{}", "Run Summary".green().bold());
    println!("{}", "===========".green());
    println!("  {} {}", "Run:".bold(), report.run_id.to_string().dimmed());
    let status = match report.status {
        RunStatus::Completed => "completed".bright_green(),
        RunStatus::PartialFailure => "partial failure".yellow(),
    };
    println!("  {} {}", "Status:".bold(), status);
    println!("  {} {}", "Forecasts:".bold(), report.forecast_count());
    println!("  {} {}", "Skipped:".bold(), report.failures.len());
    println!("  {} {:.2}s", "Elapsed:".bold(), elapsed.as_secs_f64());
    println!();

    for (index, result) in &report.results {
        println!("{}", index.cyan().bold());
        for (label, forecasts) in &result.strategies {
            println!("  {}", label.bold());
            for forecast in forecasts {
                let line = forecast_line(forecast);
                if forecast.potential >= 0.0 {
                    println!("    {}", line.bright_green());
                } else {
                    println!("    {}", line.red());
                }
            }
        }
        if let Some(publication) = report.publications.get(index) {
            for (target, message) in &publication.failed {
                println!("  {} {}: {}", "Publish failed:".yellow(), target, message);
            }
        }
        println!();
    }
}

fn list_indices(show_tickers: bool) {
    println!("{}", "Indices".green().bold());
    println!("{}", "=======".green());
    for index in MarketIndex::ALL {
        println!(
            "  {:<10} {:<20} {}",
            index.key().bright_green(),
            index.display_name(),
            format!("{} tickers", index.tickers().len()).dimmed()
        );
        if show_tickers {
            println!("    {}", index.tickers().join(" "));
        }
    }
}

fn show_config(config: &PipelineConfig) -> anyhow::Result<()> {
    print!("{}", config.to_toml_string()?);
    Ok(())
}
