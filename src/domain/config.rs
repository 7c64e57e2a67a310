//! Typed run settings read from a [`ConfigPort`].
//!
//! Every numeric key is optional and falls back to the built-in default.
//! Values are checked by [`config_validation`](super::config_validation)
//! before they are read here.

use crate::domain::config_validation::validate_config;
use crate::domain::error::ScreenerError;
use crate::domain::filter::{
    AtrBandFilter, BounceScorer, LiquidityFilter, RsiBandFilter, StackedEmaFilter,
};
use crate::domain::pipeline::TrendPipeline;
use crate::domain::screener::ScreenSettings;
use crate::domain::share_class::ShareClassMap;
use crate::domain::simulator::SimulationParams;
use crate::domain::summary::SummaryParams;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const DEFAULT_INDEX: &str = "SPY";

#[derive(Debug, Clone, PartialEq)]
pub struct DataSettings {
    /// Directory holding `{TICKER}_{interval}.csv` files.
    pub path: Option<String>,
    /// Ticker list file.
    pub universe: Option<String>,
    /// Inline comma-separated tickers, used when no universe file is set.
    pub tickers: Option<String>,
    pub index: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestSettings {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub simulation: SimulationParams,
    pub summary: SummaryParams,
    /// Calendar days kept free after the last screened day for exits.
    pub exit_lookahead_days: i64,
    pub daily_lookback_days: i64,
    pub intraday_preload_days: i64,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            start_date: None,
            end_date: None,
            simulation: SimulationParams::default(),
            summary: SummaryParams::default(),
            exit_lookahead_days: 11,
            daily_lookback_days: 60,
            intraday_preload_days: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScreenerConfig {
    pub data: DataSettings,
    pub screen: ScreenSettings,
    pub as_of_date: Option<NaiveDate>,
    pub pipeline: TrendPipeline,
    pub backtest: BacktestSettings,
    pub share_classes: ShareClassMap,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            data: DataSettings {
                path: None,
                universe: None,
                tickers: None,
                index: DEFAULT_INDEX.to_string(),
            },
            screen: ScreenSettings::default(),
            as_of_date: None,
            pipeline: TrendPipeline::default(),
            backtest: BacktestSettings::default(),
            share_classes: ShareClassMap::default(),
        }
    }
}

pub(crate) fn parse_optional_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<NaiveDate>, ScreenerError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                ScreenerError::invalid(section, key, format!("invalid {key} format, expected YYYY-MM-DD"))
            }),
    }
}

fn non_empty(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn count(config: &dyn ConfigPort, section: &str, key: &str, default: usize) -> Result<usize, ScreenerError> {
    let value = config.get_int(section, key, default as i64);
    usize::try_from(value).map_err(|_| ScreenerError::invalid(section, key, format!("{key} must be non-negative")))
}

fn pipeline_from(config: &dyn ConfigPort) -> Result<TrendPipeline, ScreenerError> {
    let f = "filters";
    let liquidity = LiquidityFilter::default();
    let stacked = StackedEmaFilter::default();
    let atr = AtrBandFilter::default();
    let rsi = RsiBandFilter::default();
    let bounce = BounceScorer::default();
    let min_bounces = count(config, f, "min_bounces", bounce.min_bounces as usize)?;

    Ok(TrendPipeline {
        liquidity: LiquidityFilter {
            min_price: config.get_double(f, "min_price", liquidity.min_price),
            min_avg_volume: config.get_double(f, "min_avg_volume", liquidity.min_avg_volume),
            rvol_multiple: config.get_double(f, "rvol_multiple", liquidity.rvol_multiple),
            ..liquidity
        },
        stacked_ema: StackedEmaFilter {
            min_bars: count(config, "screener", "min_bars", stacked.min_bars)?,
            slope_threshold: config.get_double(f, "slope_threshold", stacked.slope_threshold),
            distance_threshold: config.get_double(f, "distance_threshold", stacked.distance_threshold),
            depth_threshold: config.get_double(f, "depth_threshold", stacked.depth_threshold),
            respect_fraction: config.get_double(f, "respect_fraction", stacked.respect_fraction),
            ..stacked
        },
        atr_band: AtrBandFilter {
            low: config.get_double(f, "atr_pct_low", atr.low),
            high: config.get_double(f, "atr_pct_high", atr.high),
            ..atr
        },
        rsi_band: RsiBandFilter {
            low: config.get_double(f, "rsi_low", rsi.low),
            high: config.get_double(f, "rsi_high", rsi.high),
            ..rsi
        },
        bounce: BounceScorer {
            cushion: config.get_double(f, "bounce_cushion", bounce.cushion),
            min_bounces: u32::try_from(min_bounces)
                .map_err(|_| ScreenerError::invalid(f, "min_bounces", "min_bounces is too large"))?,
            ..bounce
        },
    })
}

fn backtest_from(config: &dyn ConfigPort) -> Result<BacktestSettings, ScreenerError> {
    let b = "backtest";
    let defaults = BacktestSettings::default();
    let sim = defaults.simulation.clone();
    let summary = defaults.summary;
    let max_hold = count(config, b, "max_hold_days", sim.max_hold_days as usize)?;

    Ok(BacktestSettings {
        start_date: parse_optional_date(config, b, "start_date")?,
        end_date: parse_optional_date(config, b, "end_date")?,
        simulation: SimulationParams {
            touch_cushion_atr: config.get_double(b, "touch_cushion_atr", sim.touch_cushion_atr),
            stop_atr_multiple: config.get_double(b, "stop_atr_multiple", sim.stop_atr_multiple),
            take_profit_pct: config.get_double(b, "take_profit_pct", sim.take_profit_pct),
            max_hold_days: u32::try_from(max_hold)
                .map_err(|_| ScreenerError::invalid(b, "max_hold_days", "max_hold_days is too large"))?,
            ..sim
        },
        summary: SummaryParams {
            risk_free_rate: config.get_double(b, "risk_free_rate", summary.risk_free_rate),
            option_leverage: config.get_double(b, "option_leverage", summary.option_leverage),
            option_notional: config.get_double(b, "option_notional", summary.option_notional),
        },
        exit_lookahead_days: count(config, b, "exit_lookahead_days", defaults.exit_lookahead_days as usize)? as i64,
        daily_lookback_days: count(config, b, "daily_lookback_days", defaults.daily_lookback_days as usize)? as i64,
        intraday_preload_days: count(config, b, "intraday_preload_days", defaults.intraday_preload_days as usize)?
            as i64,
    })
}

impl ScreenerConfig {
    /// Validate then read every section.
    pub fn from_port(config: &dyn ConfigPort) -> Result<Self, ScreenerError> {
        validate_config(config)?;

        let data = DataSettings {
            path: non_empty(config, "data", "path"),
            universe: non_empty(config, "data", "universe"),
            tickers: non_empty(config, "data", "tickers"),
            index: non_empty(config, "data", "index")
                .map(|s| s.to_uppercase())
                .unwrap_or_else(|| DEFAULT_INDEX.to_string()),
        };
        let pipeline = pipeline_from(config)?;
        let screen = ScreenSettings {
            window: count(config, "screener", "window", ScreenSettings::default().window)?,
            min_bars: pipeline.stacked_ema.min_bars,
        };

        Ok(Self {
            data,
            screen,
            as_of_date: parse_optional_date(config, "screener", "as_of_date")?,
            pipeline,
            backtest: backtest_from(config)?,
            share_classes: ShareClassMap::with_overrides(config.section_entries("share_classes")),
        })
    }
}
