//! Historical bar provider port.
//!
//! Providers own any retry policy. The domain only sees a complete series or
//! an error.

use crate::domain::bar_series::{BarSeries, MIN_COMPLETE_ROWS};
use crate::domain::error::ScreenerError;
use crate::domain::ohlcv::{Interval, OhlcvBar};
use crate::domain::universe::FetchReport;
use chrono::NaiveDate;

pub trait DataPort {
    /// Bars dated within `[start, end]` inclusive, in any order.
    fn fetch_bars(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: Interval,
    ) -> Result<Vec<OhlcvBar>, ScreenerError>;

    fn fetch_daily(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BarSeries, ScreenerError> {
        let bars = self.fetch_bars(ticker, start, end, Interval::Daily)?;
        Ok(BarSeries::new(ticker, bars))
    }

    fn fetch_intraday(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: Interval,
    ) -> Result<BarSeries, ScreenerError> {
        let bars = self.fetch_bars(ticker, start, end, interval)?;
        if bars.is_empty() {
            return Err(ScreenerError::NoData {
                ticker: ticker.to_string(),
            });
        }
        Ok(BarSeries::new(ticker, bars))
    }

    /// Daily bars for many tickers. A series is kept only when it has at
    /// least [`MIN_COMPLETE_ROWS`] bars and no missing value; everything else
    /// is reported as failed.
    fn fetch_daily_batch(&self, tickers: &[String], start: NaiveDate, end: NaiveDate) -> FetchReport {
        let mut report = FetchReport::default();
        for ticker in tickers {
            match self.fetch_daily(ticker, start, end) {
                Ok(series) if series.is_complete(MIN_COMPLETE_ROWS) => {
                    report.series.insert(ticker.clone(), series);
                }
                Ok(series) if series.bar_count() < MIN_COMPLETE_ROWS => {
                    report.fail(
                        ticker,
                        ScreenerError::InsufficientData {
                            ticker: ticker.clone(),
                            bars: series.bar_count(),
                            minimum: MIN_COMPLETE_ROWS,
                        },
                    );
                }
                Ok(_) => report.fail(
                    ticker,
                    ScreenerError::DataSource {
                        reason: format!("{ticker}: missing values in daily bars"),
                    },
                ),
                Err(e) => report.fail(ticker, e),
            }
        }
        report
    }
}
