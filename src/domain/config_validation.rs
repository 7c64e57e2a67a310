//! Configuration validation.
//!
//! Rejects nonsensical values before any data is read.

use crate::domain::config::parse_optional_date;
use crate::domain::error::ScreenerError;
use crate::domain::filter::MIN_TREND_BARS;
use crate::ports::config_port::ConfigPort;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    validate_screener(config)?;
    validate_filters(config)?;
    validate_backtest(config)?;
    Ok(())
}

fn require(condition: bool, section: &str, key: &str, reason: &str) -> Result<(), ScreenerError> {
    if condition {
        Ok(())
    } else {
        Err(ScreenerError::invalid(section, key, reason))
    }
}

fn validate_screener(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    let window = config.get_int("screener", "window", 300);
    let floor = MIN_TREND_BARS as i64;
    let min_bars = config.get_int("screener", "min_bars", floor);
    require(
        min_bars >= floor,
        "screener",
        "min_bars",
        &format!("min_bars must be at least {floor}"),
    )?;
    require(window >= min_bars, "screener", "window", "window must be at least min_bars")?;
    parse_optional_date(config, "screener", "as_of_date")?;
    Ok(())
}

fn validate_band(config: &dyn ConfigPort, low_key: &str, high_key: &str, low: f64, high: f64) -> Result<(), ScreenerError> {
    let lo = config.get_double("filters", low_key, low);
    let hi = config.get_double("filters", high_key, high);
    require(lo >= 0.0, "filters", low_key, "band bounds must be non-negative")?;
    require(lo <= hi, "filters", low_key, &format!("{low_key} must not exceed {high_key}"))
}

fn validate_filters(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    let f = "filters";
    for (key, default) in [
        ("slope_threshold", 0.012),
        ("distance_threshold", 0.75),
        ("min_price", 20.0),
        ("min_avg_volume", 1_000_000.0),
        ("rvol_multiple", 1.05),
        ("bounce_cushion", 0.005),
    ] {
        require(config.get_double(f, key, default) >= 0.0, f, key, &format!("{key} must be non-negative"))?;
    }

    let depth = config.get_double(f, "depth_threshold", -0.8);
    require(depth <= 0.0, f, "depth_threshold", "depth_threshold must not be positive")?;

    let respect = config.get_double(f, "respect_fraction", 1.0);
    require(
        respect > 0.0 && respect <= 1.0,
        f,
        "respect_fraction",
        "respect_fraction must be in (0, 1]",
    )?;

    validate_band(config, "atr_pct_low", "atr_pct_high", 0.009, 0.047)?;
    validate_band(config, "rsi_low", "rsi_high", 50.0, 78.0)?;
    let rsi_high = config.get_double(f, "rsi_high", 78.0);
    require(rsi_high <= 100.0, f, "rsi_high", "rsi_high must not exceed 100")?;

    let min_bounces = config.get_int(f, "min_bounces", 2);
    require(min_bounces >= 0, f, "min_bounces", "min_bounces must be non-negative")?;
    Ok(())
}

fn validate_backtest(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    let b = "backtest";
    let rate = config.get_double(b, "risk_free_rate", 0.05);
    require((0.0..1.0).contains(&rate), b, "risk_free_rate", "risk_free_rate must be between 0 and 1")?;

    let start = parse_optional_date(config, b, "start_date")?;
    let end = parse_optional_date(config, b, "end_date")?;
    if let (Some(start), Some(end)) = (start, end) {
        require(start < end, b, "start_date", "start_date must be before end_date")?;
    }

    require(config.get_int(b, "max_hold_days", 8) >= 1, b, "max_hold_days", "max_hold_days must be at least 1")?;
    require(
        config.get_double(b, "take_profit_pct", 0.04) > 0.0,
        b,
        "take_profit_pct",
        "take_profit_pct must be positive",
    )?;
    for (key, default) in [
        ("stop_atr_multiple", 1.5),
        ("touch_cushion_atr", 0.2),
        ("option_leverage", 10.0),
        ("option_notional", 1000.0),
    ] {
        require(config.get_double(b, key, default) >= 0.0, b, key, &format!("{key} must be non-negative"))?;
    }
    for (key, default) in [
        ("exit_lookahead_days", 11),
        ("daily_lookback_days", 60),
        ("intraday_preload_days", 5),
    ] {
        require(config.get_int(b, key, default) >= 0, b, key, &format!("{key} must be non-negative"))?;
    }
    Ok(())
}
