//! A bar window plus the indicator columns the trend filters read.

use crate::domain::indicator::{IndicatorSeries, IndicatorType, compute_indicators};
use crate::domain::ohlcv::OhlcvBar;
use std::collections::HashMap;

pub const EMA_9: IndicatorType = IndicatorType::Ema(9);
pub const EMA_20: IndicatorType = IndicatorType::Ema(20);
pub const EMA_50: IndicatorType = IndicatorType::Ema(50);
pub const EMA_200: IndicatorType = IndicatorType::Ema(200);
pub const ATR_14: IndicatorType = IndicatorType::Atr(14);
pub const RSI_14: IndicatorType = IndicatorType::Rsi(14);

/// Columns added to a daily window before the trend filters run.
pub const TREND_INDICATORS: [IndicatorType; 6] = [EMA_9, EMA_20, EMA_50, EMA_200, ATR_14, RSI_14];

/// Borrowed bar window with owned indicator columns.
///
/// Indicators are re-derived for every frame; nothing is carried between
/// windows.
#[derive(Debug, Clone)]
pub struct TrendFrame<'a> {
    pub bars: &'a [OhlcvBar],
    pub indicators: HashMap<IndicatorType, IndicatorSeries>,
}

impl<'a> TrendFrame<'a> {
    /// Frame without indicator columns.
    pub fn new(bars: &'a [OhlcvBar]) -> Self {
        Self {
            bars,
            indicators: HashMap::new(),
        }
    }

    /// Frame with every column in [`TREND_INDICATORS`].
    pub fn with_trend_indicators(bars: &'a [OhlcvBar]) -> Self {
        let mut frame = Self::new(bars);
        frame.add_trend_indicators();
        frame
    }

    /// Compute any missing trend column. Columns already present are kept.
    pub fn add_trend_indicators(&mut self) {
        let missing: Vec<IndicatorType> = TREND_INDICATORS
            .iter()
            .copied()
            .filter(|t| !self.indicators.contains_key(t))
            .collect();
        self.indicators
            .extend(compute_indicators(self.bars, &missing));
    }

    /// Insert or replace one indicator column.
    pub fn with_series(mut self, series: IndicatorSeries) -> Self {
        self.indicators.insert(series.indicator_type, series);
        self
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Indicator value at bar `index`; `None` when the column is absent or
    /// the point is invalid.
    pub fn value(&self, indicator: IndicatorType, index: usize) -> Option<f64> {
        self.indicators.get(&indicator)?.value_at(index)
    }

    /// Index of the first bar of the trailing `n`-bar tail.
    pub fn tail_start(&self, n: usize) -> usize {
        self.len().saturating_sub(n)
    }
}
