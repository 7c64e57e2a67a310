//! CSV file data adapter.
//!
//! One file per ticker and interval: `{TICKER}_{interval}.csv`, e.g.
//! `AAPL_1d.csv` or `AAPL_15m.csv`, with a header row and the columns
//! `timestamp,open,high,low,close,volume`. Timestamps are `YYYY-MM-DD` or
//! `YYYY-MM-DD HH:MM[:SS]`. A blank field is read as a missing value.

use crate::domain::error::ScreenerError;
use crate::domain::ohlcv::{Interval, OhlcvBar};
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str, interval: Interval) -> PathBuf {
        self.base_path.join(format!("{}_{}.csv", ticker, interval))
    }
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M"))
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

fn parse_field(record: &csv::StringRecord, index: usize, name: &str, row: usize) -> Result<f64, ScreenerError> {
    let raw = record.get(index).unwrap_or("").trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return Ok(f64::NAN);
    }
    raw.parse::<f64>().map_err(|e| ScreenerError::DataSource {
        reason: format!("row {}: invalid {} value {:?}: {}", row, name, raw, e),
    })
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: Interval,
    ) -> Result<Vec<OhlcvBar>, ScreenerError> {
        let path = self.csv_path(ticker, interval);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ScreenerError::NoData {
                    ticker: ticker.to_string(),
                });
            }
            Err(e) => {
                return Err(ScreenerError::DataSource {
                    reason: format!("failed to read {}: {}", path.display(), e),
                });
            }
        };

        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for (row, result) in rdr.records().enumerate() {
            let record = result?;
            let raw_ts = record.get(0).unwrap_or("");
            let timestamp = parse_timestamp(raw_ts).ok_or_else(|| ScreenerError::DataSource {
                reason: format!("{}: row {}: invalid timestamp {:?}", path.display(), row + 1, raw_ts),
            })?;

            let date = timestamp.date();
            if date < start || date > end {
                continue;
            }

            bars.push(OhlcvBar {
                timestamp,
                open: parse_field(&record, 1, "open", row + 1)?,
                high: parse_field(&record, 2, "high", row + 1)?,
                low: parse_field(&record, 3, "low", row + 1)?,
                close: parse_field(&record, 4, "close", row + 1)?,
                volume: parse_field(&record, 5, "volume", row + 1)?,
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        tracing::trace!(ticker, %interval, bars = bars.len(), "loaded csv bars");
        Ok(bars)
    }
}
