//! smacross CLI: SMA-crossover backtest and single-ticker trade commands.
//!
//! Commands:
//! - `backtest`: fetch history, run the crossover, print metrics + today's recommendation
//! - `trade`: backtest, then read the account, place at most one order

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use smacross_core::data::{CsvProvider, HistoryProvider, YahooProvider};
use smacross_runner::{
    history_window, run_backtest, run_pipeline, AlpacaBroker, DispatchMode, SmacrossConfig,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "smacross",
    about = "SMA-crossover signal, backtest report, and order dispatch"
)]
struct Cli {
    /// Emit logs as JSON lines instead of human-readable text.
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the crossover over a date range and print the performance report.
    Backtest {
        #[command(flatten)]
        common: CommonArgs,

        /// Start date (YYYY-MM-DD). Defaults to `lookback_years` before today.
        #[arg(long)]
        start: Option<String>,

        /// End date, exclusive (YYYY-MM-DD). Defaults to tomorrow.
        #[arg(long)]
        end: Option<String>,
    },
    /// Compute today's recommendation and place at most one order.
    Trade {
        #[command(flatten)]
        common: CommonArgs,

        /// Compute the order decision without sending it.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Ticker symbol (e.g., SPY).
    #[arg(long, env = "SMACROSS_TICKER")]
    ticker: String,

    /// Path to a TOML config file. Defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Read `<TICKER>.csv` from this directory instead of Yahoo Finance.
    #[arg(long)]
    csv_dir: Option<PathBuf>,

    /// Override `strategy.sma_early_window`.
    #[arg(long)]
    sma_early: Option<usize>,

    /// Override `strategy.sma_late_window`.
    #[arg(long)]
    sma_late: Option<usize>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    match cli.command {
        Commands::Backtest { common, start, end } => run_backtest_cmd(&common, start, end),
        Commands::Trade { common, dry_run } => run_trade_cmd(&common, dry_run),
    }
}

fn init_logging(json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    // stdout carries the report; logs go to stderr
    if json {
        registry
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}

fn load_config(common: &CommonArgs) -> Result<SmacrossConfig> {
    let mut config = match &common.config {
        Some(path) => SmacrossConfig::from_file(path)?,
        None => SmacrossConfig::default(),
    };
    if let Some(early) = common.sma_early {
        config.strategy.sma_early_window = early;
    }
    if let Some(late) = common.sma_late {
        config.strategy.sma_late_window = late;
    }
    config.validate()?;
    Ok(config)
}

fn build_provider(common: &CommonArgs) -> Result<Box<dyn HistoryProvider>> {
    let provider: Box<dyn HistoryProvider> = match &common.csv_dir {
        Some(dir) => {
            if !dir.is_dir() {
                bail!("--csv-dir is not a directory: {}", dir.display());
            }
            Box::new(CsvProvider::new(dir))
        }
        None => Box::new(YahooProvider::new()?),
    };
    Ok(provider)
}

fn parse_date(flag: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("--{flag} must be YYYY-MM-DD, got '{value}'"))
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn run_backtest_cmd(common: &CommonArgs, start: Option<String>, end: Option<String>) -> Result<()> {
    let config = load_config(common)?;
    let provider = build_provider(common)?;
    let today = today();

    let (default_start, default_end) = history_window(today, config.data.lookback_years)?;
    let start_date = start
        .as_deref()
        .map(|s| parse_date("start", s))
        .transpose()?
        .unwrap_or(default_start);
    let end_date = end
        .as_deref()
        .map(|s| parse_date("end", s))
        .transpose()?
        .unwrap_or(default_end);
    if start_date >= end_date {
        bail!("--start ({start_date}) must be before --end ({end_date})");
    }

    let report = run_backtest(
        provider.as_ref(),
        &config,
        &common.ticker,
        start_date,
        end_date,
        today,
    )?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_trade_cmd(common: &CommonArgs, dry_run: bool) -> Result<()> {
    let config = load_config(common)?;
    let provider = build_provider(common)?;
    let credentials = config.broker.credentials()?;
    let broker = AlpacaBroker::new(config.broker.base_url.clone(), credentials)?;

    let mode = if dry_run {
        DispatchMode::DryRun
    } else {
        DispatchMode::Live
    };
    info!(ticker = %common.ticker, ?mode, broker = %config.broker.base_url, "starting trade run");

    let report = run_pipeline(
        provider.as_ref(),
        &broker,
        &config,
        &common.ticker,
        today(),
        mode,
    )?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
