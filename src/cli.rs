//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::{CsvReportAdapter, ReportTarget};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::universe_adapter::{FileUniverseAdapter, StaticUniverse};
use crate::domain::config::ScreenerConfig;
use crate::domain::error::ScreenerError;
use crate::domain::runner::RunContext;
use crate::domain::screener::RunStatus;
use crate::domain::universe::parse_tickers;
use crate::ports::report_port::ReportPort;
use crate::ports::universe_port::UniversePort;

#[derive(Parser, Debug)]
#[command(
    name = "contscreen",
    about = "Trend-continuation screener and pullback backtester"
)]
pub struct Cli {
    /// INI configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    /// Directory of `{TICKER}_{interval}.csv` bar files, overrides [data] path
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
    /// Ticker list file, overrides [data] universe
    #[arg(long, global = true)]
    pub universe: Option<PathBuf>,
    /// Directory for result tables; stdout when omitted
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Rank the universe as of one date
    Screen {
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Screen every trading day in a date range
    ScreenHistory {
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
    },
    /// Screen a range, simulate each candidate, and summarize the trades
    Backtest {
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
    },
    /// Check a configuration file without reading any data
    Validate,
}

pub fn run(cli: Cli) -> ExitCode {
    match execute(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            (&e).into()
        }
    }
}

fn execute(cli: &Cli) -> Result<(), ScreenerError> {
    let config = load_config(cli)?;
    match &cli.command {
        Command::Validate => run_validate(cli, &config),
        Command::Screen { as_of } => {
            let (data, universe) = build_sources(&config)?;
            let context = RunContext::new(&data, universe.as_ref(), &config);
            let report = context.run_screener(as_of.or(config.as_of_date))?;
            log_status(report.status);

            let reporter = build_reporter(cli.output.as_deref())?;
            reporter.write_candidates(&report.candidates)
        }
        Command::ScreenHistory { start, end } => {
            let (data, universe) = build_sources(&config)?;
            let context = RunContext::new(&data, universe.as_ref(), &config);
            let panel = context.run_screener_backtest(*start, *end)?;
            log_status(panel.status);

            let reporter = build_reporter(cli.output.as_deref())?;
            reporter.write_candidates(&panel.candidates)
        }
        Command::Backtest { start, end } => {
            let (data, universe) = build_sources(&config)?;
            let context = RunContext::new(&data, universe.as_ref(), &config);
            let report = context.run_backtester(
                start.or(config.backtest.start_date),
                end.or(config.backtest.end_date),
            )?;
            log_status(report.status);
            tracing::info!(
                simulated = report.stats.simulated,
                skipped_same_day = report.stats.skipped_same_day,
                duplicate_trades = report.stats.duplicate_trades,
                "aggregation"
            );

            let reporter = build_reporter(cli.output.as_deref())?;
            reporter.write_candidates(&report.panel.candidates)?;
            reporter.write_trades(&report.trades, &report.summary.params)?;
            reporter.write_summary(&report.summary.rows())
        }
    }
}

/// Reads the INI file if one was given and applies the command-line overrides.
pub fn load_config(cli: &Cli) -> Result<ScreenerConfig, ScreenerError> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading config");
            ScreenerConfig::from_port(&FileConfigAdapter::from_file(path)?)?
        }
        None => ScreenerConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data.path = Some(dir.display().to_string());
    }
    if let Some(file) = &cli.universe {
        config.data.universe = Some(file.display().to_string());
    }
    Ok(config)
}

fn build_sources(
    config: &ScreenerConfig,
) -> Result<(CsvAdapter, Box<dyn UniversePort>), ScreenerError> {
    let path = config
        .data
        .path
        .as_ref()
        .ok_or_else(|| ScreenerError::ConfigMissing {
            section: "data".into(),
            key: "path".into(),
        })?;
    let data = CsvAdapter::new(PathBuf::from(path));

    let universe: Box<dyn UniversePort> = match (&config.data.universe, &config.data.tickers) {
        (Some(file), _) => Box::new(FileUniverseAdapter::new(PathBuf::from(file))),
        (None, Some(list)) => Box::new(StaticUniverse::new(parse_tickers(list))),
        (None, None) => {
            return Err(ScreenerError::ConfigMissing {
                section: "data".into(),
                key: "universe".into(),
            });
        }
    };
    Ok((data, universe))
}

fn build_reporter(output: Option<&Path>) -> Result<CsvReportAdapter, ScreenerError> {
    match output {
        Some(dir) => CsvReportAdapter::to_directory(dir.to_path_buf()),
        None => Ok(CsvReportAdapter::new(ReportTarget::Stdout)),
    }
}

fn log_status(status: RunStatus) {
    match status {
        RunStatus::Completed => {}
        RunStatus::RegimeClosed => tracing::warn!("market regime closed, no candidates produced"),
        RunStatus::EmptyUniverse => tracing::warn!("universe empty, no candidates produced"),
    }
}

fn run_validate(cli: &Cli, config: &ScreenerConfig) -> Result<(), ScreenerError> {
    let path = cli.config.as_ref().ok_or_else(|| ScreenerError::ConfigMissing {
        section: "cli".into(),
        key: "config".into(),
    })?;
    let pipeline = &config.pipeline;
    tracing::info!(
        path = %path.display(),
        index = %config.data.index,
        window = config.screen.window,
        min_bars = config.screen.min_bars,
        rsi_band = ?(pipeline.rsi_band.low, pipeline.rsi_band.high),
        atr_band = ?(pipeline.atr_band.low, pipeline.atr_band.high),
        max_hold_days = config.backtest.simulation.max_hold_days,
        "configuration valid"
    );
    Ok(())
}
