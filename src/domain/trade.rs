//! Completed round-trip trade records.

use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryMethod {
    Reclaim,
}

impl fmt::Display for EntryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryMethod::Reclaim => f.write_str("reclaim"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitMethod {
    Stop,
    TakeProfit,
    MaxHoldExit,
}

impl fmt::Display for ExitMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExitMethod::Stop => "stop",
            ExitMethod::TakeProfit => "take_profit",
            ExitMethod::MaxHoldExit => "max_hold_exit",
        };
        f.write_str(name)
    }
}

pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One simulated long trade of a single share.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub ticker: String,
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,
    pub entry_method: EntryMethod,
    pub exit_time: NaiveDateTime,
    pub exit_price: f64,
    pub exit_method: ExitMethod,
    pub net: f64,
    pub return_pct: f64,
}

impl Trade {
    /// Builds a trade from raw fill prices. Prices and net are rounded to
    /// cents; the return is taken on the rounded prices.
    pub fn new(
        ticker: impl Into<String>,
        entry_time: NaiveDateTime,
        raw_entry: f64,
        entry_method: EntryMethod,
        exit_time: NaiveDateTime,
        raw_exit: f64,
        exit_method: ExitMethod,
    ) -> Self {
        let entry_price = round_cents(raw_entry);
        let exit_price = round_cents(raw_exit);
        Self {
            ticker: ticker.into(),
            entry_time,
            entry_price,
            entry_method,
            exit_time,
            exit_price,
            exit_method,
            net: round_cents(raw_exit - raw_entry),
            return_pct: exit_price / entry_price - 1.0,
        }
    }

    pub fn entry_day(&self) -> NaiveDate {
        self.entry_time.date()
    }

    pub fn is_win(&self) -> bool {
        self.return_pct > 0.0
    }

    /// Illustrative leveraged option P&L on a fixed notional.
    pub fn option_net(&self, notional: f64, leverage: f64) -> f64 {
        notional * leverage * self.return_pct
    }
}
