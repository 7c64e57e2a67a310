//! OHLCV bar representation.
//!
//! Missing values are carried as `NaN` so that a provider row with a blank
//! field still occupies its slot in the series; completeness checks reject
//! such windows before any filter sees them.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl OhlcvBar {
    /// Daily bar stamped at midnight of `date`.
    pub fn daily(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        OhlcvBar {
            timestamp: date.and_time(NaiveTime::MIN),
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Calendar day of the bar.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    /// True when every price and the volume are finite.
    pub fn is_complete(&self) -> bool {
        [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Bar timeframe requested from a data provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interval {
    Daily,
    Minutes(u32),
}

impl Interval {
    pub const FIFTEEN_MINUTES: Interval = Interval::Minutes(15);
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interval::Daily => write!(f, "1d"),
            Interval::Minutes(m) => write!(f, "{}m", m),
        }
    }
}
