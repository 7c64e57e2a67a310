#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveTime};
use contscreen::domain::error::ScreenerError;
pub use contscreen::domain::ohlcv::{Interval, OhlcvBar};
use contscreen::domain::pipeline::TrendPipeline;
use contscreen::ports::data_port::DataPort;
use contscreen::ports::universe_port::UniversePort;
use std::collections::HashMap;

/// In-memory bars keyed by (ticker, interval). Unknown tickers are `NoData`.
pub struct MockDataPort {
    pub data: HashMap<(String, Interval), Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_daily(mut self, ticker: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert((ticker.to_string(), Interval::Daily), bars);
        self
    }

    pub fn with_intraday(mut self, ticker: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data
            .insert((ticker.to_string(), Interval::FIFTEEN_MINUTES), bars);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: Interval,
    ) -> Result<Vec<OhlcvBar>, ScreenerError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(ScreenerError::DataSource {
                reason: reason.clone(),
            });
        }
        let bars = self
            .data
            .get(&(ticker.to_string(), interval))
            .ok_or_else(|| ScreenerError::NoData {
                ticker: ticker.to_string(),
            })?;
        Ok(bars
            .iter()
            .filter(|b| b.date() >= start && b.date() <= end)
            .cloned()
            .collect())
    }
}

pub struct MockUniverse(pub Vec<String>);

impl MockUniverse {
    pub fn of(tickers: &[&str]) -> Self {
        Self(tickers.iter().map(|t| t.to_string()).collect())
    }
}

impl UniversePort for MockUniverse {
    fn list_tickers(&self) -> Result<Vec<String>, ScreenerError> {
        Ok(self.0.clone())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// `n` calendar-day bars growing geometrically from 100 by `growth` overall,
/// ending on `last`. Volume is 1M; the final bar optionally doubles it.
pub fn geometric_daily(last: NaiveDate, n: usize, growth: f64, spike_last: bool) -> Vec<OhlcvBar> {
    let first = last - Duration::days(n as i64 - 1);
    let ratio = growth.powf(1.0 / (n as f64 - 1.0));
    let mut bars: Vec<OhlcvBar> = (0..n)
        .map(|i| {
            let c = 100.0 * ratio.powi(i as i32);
            OhlcvBar::daily(
                first + Duration::days(i as i64),
                c * 0.99,
                c * 1.02,
                c * 0.98,
                c,
                1_000_000.0,
            )
        })
        .collect();
    if spike_last {
        if let Some(bar) = bars.last_mut() {
            bar.volume = 2_000_000.0;
        }
    }
    bars
}

/// Rising index history ending on `last`.
pub fn bullish_index(last: NaiveDate) -> Vec<OhlcvBar> {
    geometric_daily(last, 600, 1.5, false)
}

/// Falling index history ending on `last`.
pub fn bearish_index(last: NaiveDate) -> Vec<OhlcvBar> {
    geometric_daily(last, 600, 0.6, false)
}

/// 15-minute bars from 09:30 given (low, close, high) triples.
pub fn session(day: NaiveDate, rows: &[(f64, f64, f64)]) -> Vec<OhlcvBar> {
    let open_time = NaiveTime::from_hms_opt(9, 30, 0).unwrap();
    rows.iter()
        .enumerate()
        .map(|(k, &(low, close, high))| OhlcvBar {
            timestamp: day.and_time(open_time) + Duration::minutes(15 * k as i64),
            open: close,
            high,
            low,
            close,
            volume: 10_000.0,
        })
        .collect()
}

/// Default pipeline with the RSI ceiling lifted and no bounce minimum, so a
/// clean geometric uptrend passes.
pub fn relaxed_pipeline() -> TrendPipeline {
    let mut pipeline = TrendPipeline::default();
    pipeline.rsi_band.high = 100.0;
    pipeline.bounce.min_bounces = 0;
    pipeline
}
