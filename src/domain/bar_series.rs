//! Per-ticker bar series and the unified trading timeline.

use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

/// Minimum rows for a fetched daily series to count as complete.
pub const MIN_COMPLETE_ROWS: usize = 15;

/// Ordered bars for one ticker and one timeframe.
///
/// Timestamps are strictly increasing: construction sorts the input and keeps
/// the last bar for any repeated timestamp.
#[derive(Debug, Clone)]
pub struct BarSeries {
    pub ticker: String,
    pub bars: Vec<OhlcvBar>,
    /// Calendar day → index of the last bar on that day.
    pub date_index: HashMap<NaiveDate, usize>,
}

impl BarSeries {
    pub fn new(ticker: impl Into<String>, mut bars: Vec<OhlcvBar>) -> Self {
        bars.sort_by_key(|b| b.timestamp);
        let mut deduped: Vec<OhlcvBar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match deduped.last_mut() {
                Some(prev) if prev.timestamp == bar.timestamp => *prev = bar,
                _ => deduped.push(bar),
            }
        }
        let date_index = deduped
            .iter()
            .enumerate()
            .map(|(i, bar)| (bar.date(), i))
            .collect();
        Self {
            ticker: ticker.into(),
            bars: deduped,
            date_index,
        }
    }

    pub fn bar_count(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn get_bar(&self, date: NaiveDate) -> Option<&OhlcvBar> {
        self.date_index.get(&date).map(|&i| &self.bars[i])
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date())
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date())
    }

    pub fn has_missing_values(&self) -> bool {
        self.bars.iter().any(|b| !b.is_complete())
    }

    /// At least `min_rows` bars and no missing value anywhere.
    pub fn is_complete(&self, min_rows: usize) -> bool {
        self.bars.len() >= min_rows && !self.has_missing_values()
    }

    /// All bars dated on or before `date`.
    pub fn up_to(&self, date: NaiveDate) -> &[OhlcvBar] {
        let end = self.bars.partition_point(|b| b.date() <= date);
        &self.bars[..end]
    }

    /// The trailing `max_len` bars dated on or before `date`.
    pub fn window_ending(&self, date: NaiveDate, max_len: usize) -> &[OhlcvBar] {
        let upto = self.up_to(date);
        &upto[upto.len().saturating_sub(max_len)..]
    }
}

/// Sorted, de-duplicated calendar days present in any of the series.
pub fn build_unified_timeline<'a, I>(series: I) -> Vec<NaiveDate>
where
    I: IntoIterator<Item = &'a BarSeries>,
{
    let unique_dates: BTreeSet<NaiveDate> = series
        .into_iter()
        .flat_map(|s| s.bars.iter().map(|bar| bar.date()))
        .collect();
    unique_dates.into_iter().collect()
}
