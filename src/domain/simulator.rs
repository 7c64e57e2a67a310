//! Intraday entry/exit state machine for one (ticker, candidate day).
//!
//! Entry: on the candidate session, a close below the daily EMA 9 followed by
//! a close back at or above it (a reclaim). A touch-and-hold of the EMA before
//! any break rejects the day outright.
//!
//! Exit, checked bar by bar after entry in this order: stop below the daily
//! EMA 9 less a multiple of intraday ATR, fixed take-profit, last bar of the
//! max-hold day. If the data runs out first, the last bar closes the trade.

use crate::domain::calendar::add_business_days;
use crate::domain::indicator::IndicatorSeries;
use crate::domain::indicator::atr::{DEFAULT_ATR_PERIOD, calculate_atr};
use crate::domain::indicator::ema::calculate_ema;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::trade::{EntryMethod, ExitMethod, Trade};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParams {
    /// Touch tolerance around the daily EMA 9, in intraday ATRs.
    pub touch_cushion_atr: f64,
    pub stop_atr_multiple: f64,
    pub take_profit_pct: f64,
    /// Business days after the entry day on which the trade is closed.
    pub max_hold_days: u32,
    pub atr_period: usize,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            touch_cushion_atr: 0.2,
            stop_atr_multiple: 1.5,
            take_profit_pct: 0.04,
            max_hold_days: 8,
            atr_period: DEFAULT_ATR_PERIOD,
        }
    }
}

/// Daily EMA 9 by calendar day.
#[derive(Debug, Clone, Default)]
pub struct DailyLevels {
    ema9: HashMap<NaiveDate, f64>,
}

impl DailyLevels {
    pub fn from_bars(daily: &[OhlcvBar]) -> Self {
        let ema = calculate_ema(daily, 9);
        let ema9 = ema
            .values
            .iter()
            .map(|p| (p.timestamp.date(), if p.valid { p.value } else { f64::NAN }))
            .collect();
        Self { ema9 }
    }

    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        Self {
            ema9: values.into_iter().collect(),
        }
    }

    /// `None` when the day has no daily bar. A present day may still carry
    /// `NaN`.
    pub fn ema9(&self, day: NaiveDate) -> Option<f64> {
        self.ema9.get(&day).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    NoIntradayData,
    NoDailyData,
    MissingDailyEma,
    MissingSessionValues,
    BounceTouch,
    NoReclaim,
    DataUnavailable,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RejectReason::NoIntradayData => "no intraday session on or after candidate day",
            RejectReason::NoDailyData => "no daily bars",
            RejectReason::MissingDailyEma => "daily EMA 9 missing for session day",
            RejectReason::MissingSessionValues => "missing intraday low/close/ATR in session",
            RejectReason::BounceTouch => "EMA touch before break",
            RejectReason::NoReclaim => "no reclaim in session",
            RejectReason::DataUnavailable => "bar data unavailable",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entry {
    pub index: usize,
    pub time: NaiveDateTime,
    pub price: f64,
    pub method: EntryMethod,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Exit {
    pub index: usize,
    pub time: NaiveDateTime,
    pub price: f64,
    pub method: ExitMethod,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimulationOutcome {
    Traded(Trade),
    NoTrade(RejectReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryState {
    Searching,
    Broken,
}

/// Index range of the first session dated on or after `day`.
fn session_range(intraday: &[OhlcvBar], day: NaiveDate) -> Option<(NaiveDate, usize, usize)> {
    let start = intraday.iter().position(|b| b.date() >= day)?;
    let session_day = intraday[start].date();
    let len = intraday[start..]
        .iter()
        .take_while(|b| b.date() == session_day)
        .count();
    Some((session_day, start, start + len))
}

pub fn find_entry(
    intraday: &[OhlcvBar],
    atr: &IndicatorSeries,
    levels: &DailyLevels,
    candidate_day: NaiveDate,
    params: &SimulationParams,
) -> Result<Entry, RejectReason> {
    let (session_day, start, end) =
        session_range(intraday, candidate_day).ok_or(RejectReason::NoIntradayData)?;
    let ema9 = levels
        .ema9(session_day)
        .filter(|v| v.is_finite())
        .ok_or(RejectReason::MissingDailyEma)?;

    let mut session_atr = Vec::with_capacity(end - start);
    for i in start..end {
        let bar = &intraday[i];
        match atr.value_at(i) {
            Some(a) if bar.low.is_finite() && bar.close.is_finite() => session_atr.push(a),
            _ => return Err(RejectReason::MissingSessionValues),
        }
    }

    let mut state = EntryState::Searching;
    for (i, bar_atr) in (start..end).zip(session_atr) {
        let bar = &intraday[i];
        match state {
            EntryState::Searching => {
                let cushion = params.touch_cushion_atr * bar_atr;
                let touch = (bar.low - ema9).abs() <= cushion;
                if touch && bar.close > ema9 {
                    return Err(RejectReason::BounceTouch);
                }
                if bar.close < ema9 {
                    state = EntryState::Broken;
                }
            }
            EntryState::Broken => {
                if bar.close >= ema9 {
                    return Ok(Entry {
                        index: i,
                        time: bar.timestamp,
                        price: bar.close,
                        method: EntryMethod::Reclaim,
                    });
                }
            }
        }
    }
    Err(RejectReason::NoReclaim)
}

/// Every entered trade gets an exit; the last available bar is the fallback.
pub fn find_exit(
    intraday: &[OhlcvBar],
    atr: &IndicatorSeries,
    levels: &DailyLevels,
    entry: &Entry,
    params: &SimulationParams,
) -> Exit {
    let max_exit_day = add_business_days(entry.time.date(), params.max_hold_days);
    let boundary_last = intraday.iter().rposition(|b| b.date() == max_exit_day);
    let take_profit = entry.price * (1.0 + params.take_profit_pct);

    let exit_at = |index: usize, method: ExitMethod| Exit {
        index,
        time: intraday[index].timestamp,
        price: intraday[index].close,
        method,
    };

    for i in entry.index + 1..intraday.len() {
        let bar = &intraday[i];
        let Some(ema9) = levels.ema9(bar.date()) else {
            continue;
        };
        if let Some(bar_atr) = atr.value_at(i) {
            if bar.close < ema9 - params.stop_atr_multiple * bar_atr {
                return exit_at(i, ExitMethod::Stop);
            }
        }
        if bar.close >= take_profit {
            return exit_at(i, ExitMethod::TakeProfit);
        }
        if boundary_last == Some(i) {
            return exit_at(i, ExitMethod::MaxHoldExit);
        }
    }

    let last = intraday.len().saturating_sub(1).max(entry.index);
    exit_at(last, ExitMethod::MaxHoldExit)
}

/// Runs entry then exit on one candidate.
///
/// `intraday` may start before the candidate day; the earlier bars only warm
/// up the intraday ATR.
pub fn simulate_trade(
    ticker: &str,
    candidate_day: NaiveDate,
    intraday: &[OhlcvBar],
    daily: &[OhlcvBar],
    params: &SimulationParams,
) -> SimulationOutcome {
    if intraday.is_empty() {
        return SimulationOutcome::NoTrade(RejectReason::NoIntradayData);
    }
    if daily.is_empty() {
        return SimulationOutcome::NoTrade(RejectReason::NoDailyData);
    }

    let atr = calculate_atr(intraday, params.atr_period);
    let levels = DailyLevels::from_bars(daily);

    let entry = match find_entry(intraday, &atr, &levels, candidate_day, params) {
        Ok(entry) => entry,
        Err(reason) => return SimulationOutcome::NoTrade(reason),
    };
    let exit = find_exit(intraday, &atr, &levels, &entry, params);

    tracing::debug!(
        ticker,
        entry = %entry.time,
        exit = %exit.time,
        method = %exit.method,
        "trade simulated"
    );
    SimulationOutcome::Traded(Trade::new(
        ticker,
        entry.time,
        entry.price,
        entry.method,
        exit.time,
        exit.price,
        exit.method,
    ))
}
