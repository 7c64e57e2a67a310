//! Trend filters over an indicator-augmented daily window.
//!
//! Each filter is a pure whole-window test. [`TrendFilter::apply`] runs it in
//! one of two modes:
//! - `Screen`: pass yields the frame (and a score for scoring filters), fail
//!   yields nothing.
//! - `Diagnostic`: always yields the frame plus a per-bar fail marker, constant
//!   across the window.
//!
//! Any missing indicator value inside a filter's lookback is a fail. Both
//! modes fail a window shorter than [`TrendFilter::min_bars`] without
//! evaluating it; `evaluate` itself only tests the condition.

use crate::domain::trend_frame::{ATR_14, EMA_9, EMA_20, EMA_50, EMA_200, RSI_14, TrendFrame};
use std::fmt;

/// Bars a window needs before the stacked-EMA test is meaningful.
pub const MIN_TREND_BARS: usize = 210;
pub const LOOKBACK_BARS: usize = 14;
pub const TAIL_BARS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    Screen,
    Diagnostic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterKind {
    Liquidity,
    StackedEma,
    AtrBand,
    RsiBand,
    Bounce,
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FilterKind::Liquidity => "liquidity",
            FilterKind::StackedEma => "stacked_ema",
            FilterKind::AtrBand => "atr_band",
            FilterKind::RsiBand => "rsi_band",
            FilterKind::Bounce => "bounce",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass { score: Option<u32> },
    Fail,
}

impl Verdict {
    fn from_bool(passes: bool) -> Self {
        if passes {
            Verdict::Pass { score: None }
        } else {
            Verdict::Fail
        }
    }

    pub fn passed(&self) -> bool {
        matches!(self, Verdict::Pass { .. })
    }
}

#[derive(Debug, Clone)]
pub enum FilterResult<'f, 'a> {
    Passed {
        frame: &'f TrendFrame<'a>,
        score: Option<u32>,
    },
    Rejected,
    Marked {
        frame: &'f TrendFrame<'a>,
        failed: Vec<bool>,
    },
}

impl FilterResult<'_, '_> {
    pub fn is_rejected(&self) -> bool {
        match self {
            FilterResult::Passed { .. } => false,
            FilterResult::Rejected => true,
            FilterResult::Marked { failed, .. } => failed.first().copied().unwrap_or(true),
        }
    }
}

pub trait TrendFilter {
    fn kind(&self) -> FilterKind;

    fn evaluate(&self, frame: &TrendFrame) -> Verdict;

    /// Shortest window `apply` will evaluate.
    fn min_bars(&self) -> usize {
        MIN_TREND_BARS
    }

    fn apply<'f, 'a>(&self, frame: &'f TrendFrame<'a>, mode: FilterMode) -> FilterResult<'f, 'a> {
        let verdict = if frame.len() < self.min_bars() {
            Verdict::Fail
        } else {
            self.evaluate(frame)
        };
        match (mode, verdict) {
            (FilterMode::Screen, Verdict::Pass { score }) => FilterResult::Passed { frame, score },
            (FilterMode::Screen, Verdict::Fail) => FilterResult::Rejected,
            (FilterMode::Diagnostic, v) => FilterResult::Marked {
                frame,
                failed: vec![!v.passed(); frame.len()],
            },
        }
    }
}

/// Price floor, 20-bar average volume floor, and a relative-volume spike on
/// the last bar.
#[derive(Debug, Clone, PartialEq)]
pub struct LiquidityFilter {
    pub min_price: f64,
    pub min_avg_volume: f64,
    pub rvol_multiple: f64,
    pub volume_window: usize,
}

impl Default for LiquidityFilter {
    fn default() -> Self {
        Self {
            min_price: 20.0,
            min_avg_volume: 1_000_000.0,
            rvol_multiple: 1.05,
            volume_window: 20,
        }
    }
}

impl TrendFilter for LiquidityFilter {
    fn kind(&self) -> FilterKind {
        FilterKind::Liquidity
    }

    fn evaluate(&self, frame: &TrendFrame) -> Verdict {
        let Some(last) = frame.bars.last() else {
            return Verdict::Fail;
        };
        let tail = &frame.bars[frame.tail_start(self.volume_window)..];
        let avg_volume = tail.iter().map(|b| b.volume).sum::<f64>() / tail.len() as f64;

        let price_ok = last.close >= self.min_price;
        let liquid = avg_volume >= self.min_avg_volume;
        let spike = last.volume >= avg_volume * self.rvol_multiple;
        Verdict::from_bool(price_ok && liquid && spike)
    }
}

/// Individual conditions of the stacked-EMA test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackedEmaChecks {
    pub macro_trend: bool,
    pub slope: bool,
    pub stacked: bool,
    pub respect: bool,
    pub depth: bool,
    pub distance: bool,
}

impl StackedEmaChecks {
    pub fn all(&self) -> bool {
        self.macro_trend && self.slope && self.stacked && self.respect && self.depth && self.distance
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StackedEmaFilter {
    pub min_bars: usize,
    pub lookback: usize,
    pub slope_threshold: f64,
    pub distance_threshold: f64,
    pub depth_threshold: f64,
    /// Fraction of lookback closes that must sit above EMA 9. 1.0 means all.
    pub respect_fraction: f64,
}

impl Default for StackedEmaFilter {
    fn default() -> Self {
        Self {
            min_bars: MIN_TREND_BARS,
            lookback: LOOKBACK_BARS,
            slope_threshold: 0.012,
            distance_threshold: 0.75,
            depth_threshold: -0.8,
            respect_fraction: 1.0,
        }
    }
}

impl StackedEmaFilter {
    /// `None` when the window is too short or an indicator value is missing.
    pub fn checks(&self, frame: &TrendFrame) -> Option<StackedEmaChecks> {
        if frame.len() < self.min_bars.max(self.lookback) || self.lookback == 0 {
            return None;
        }
        let last = frame.len() - 1;
        let first = frame.tail_start(self.lookback);

        let close_last = frame.bars[last].close;
        let ema9_last = frame.value(EMA_9, last)?;
        let ema9_first = frame.value(EMA_9, first)?;
        let atr_last = frame.value(ATR_14, last)?;

        let macro_trend = close_last > frame.value(EMA_200, last)?;
        let slope = (ema9_last - ema9_first) / ema9_first >= self.slope_threshold;
        let distance = (close_last - ema9_last) / atr_last <= self.distance_threshold;

        let mut stacked = true;
        let mut above = 0usize;
        let mut depth = f64::INFINITY;
        for i in first..=last {
            let bar = &frame.bars[i];
            let ema9 = frame.value(EMA_9, i)?;
            let ema20 = frame.value(EMA_20, i)?;
            let ema50 = frame.value(EMA_50, i)?;
            let atr = frame.value(ATR_14, i)?;

            stacked &= ema9 > ema20 && ema20 > ema50;
            if bar.close > ema9 {
                above += 1;
            }
            depth = depth.min((bar.low - ema9) / atr);
        }
        let respect = above as f64 / (last - first + 1) as f64 >= self.respect_fraction;

        Some(StackedEmaChecks {
            macro_trend,
            slope,
            stacked,
            respect,
            depth: depth >= self.depth_threshold,
            distance,
        })
    }
}

impl TrendFilter for StackedEmaFilter {
    fn kind(&self) -> FilterKind {
        FilterKind::StackedEma
    }

    fn min_bars(&self) -> usize {
        self.min_bars.max(MIN_TREND_BARS)
    }

    fn evaluate(&self, frame: &TrendFrame) -> Verdict {
        Verdict::from_bool(self.checks(frame).is_some_and(|c| c.all()))
    }
}

/// Mean of `f(i)` over the last `tail` bars of a `lookback` window.
fn tail_mean<F>(frame: &TrendFrame, lookback: usize, tail: usize, f: F) -> Option<f64>
where
    F: Fn(usize) -> Option<f64>,
{
    if frame.len() < lookback || tail == 0 || tail > lookback {
        return None;
    }
    let start = frame.tail_start(tail);
    let mut sum = 0.0;
    for i in start..frame.len() {
        sum += f(i)?;
    }
    Some(sum / (frame.len() - start) as f64)
}

/// Average ATR as a fraction of close must sit inside a band.
#[derive(Debug, Clone, PartialEq)]
pub struct AtrBandFilter {
    pub lookback: usize,
    pub tail: usize,
    pub low: f64,
    pub high: f64,
}

impl Default for AtrBandFilter {
    fn default() -> Self {
        Self {
            lookback: LOOKBACK_BARS,
            tail: TAIL_BARS,
            low: 0.009,
            high: 0.047,
        }
    }
}

impl AtrBandFilter {
    pub fn average_atr_pct(&self, frame: &TrendFrame) -> Option<f64> {
        tail_mean(frame, self.lookback, self.tail, |i| {
            Some(frame.value(ATR_14, i)? / frame.bars[i].close)
        })
    }
}

impl TrendFilter for AtrBandFilter {
    fn kind(&self) -> FilterKind {
        FilterKind::AtrBand
    }

    fn evaluate(&self, frame: &TrendFrame) -> Verdict {
        Verdict::from_bool(
            self.average_atr_pct(frame)
                .is_some_and(|avg| avg >= self.low && avg <= self.high),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RsiBandFilter {
    pub lookback: usize,
    pub tail: usize,
    pub low: f64,
    pub high: f64,
}

impl Default for RsiBandFilter {
    fn default() -> Self {
        Self {
            lookback: LOOKBACK_BARS,
            tail: TAIL_BARS,
            low: 50.0,
            high: 78.0,
        }
    }
}

impl RsiBandFilter {
    pub fn average_rsi(&self, frame: &TrendFrame) -> Option<f64> {
        tail_mean(frame, self.lookback, self.tail, |i| frame.value(RSI_14, i))
    }
}

impl TrendFilter for RsiBandFilter {
    fn kind(&self) -> FilterKind {
        FilterKind::RsiBand
    }

    fn evaluate(&self, frame: &TrendFrame) -> Verdict {
        Verdict::from_bool(
            self.average_rsi(frame)
                .is_some_and(|avg| avg >= self.low && avg <= self.high),
        )
    }
}

/// Counts EMA 9 touch-and-hold bars: low within `cushion` of EMA 9, close
/// above EMA 9, close above open. The newest `excluded_tail` bars are not
/// counted.
#[derive(Debug, Clone, PartialEq)]
pub struct BounceScorer {
    pub lookback: usize,
    pub excluded_tail: usize,
    pub cushion: f64,
    pub min_bounces: u32,
}

impl Default for BounceScorer {
    fn default() -> Self {
        Self {
            lookback: LOOKBACK_BARS,
            excluded_tail: 2,
            cushion: 0.005,
            min_bounces: 2,
        }
    }
}

impl BounceScorer {
    pub fn count(&self, frame: &TrendFrame) -> Option<u32> {
        if frame.is_empty() || frame.len() < self.lookback {
            return None;
        }
        let start = frame.tail_start(self.lookback);
        let end = frame.len().saturating_sub(self.excluded_tail).max(start);

        let mut count = 0;
        for i in start..end {
            let bar = &frame.bars[i];
            let Some(ema9) = frame.value(EMA_9, i) else {
                continue;
            };
            let touch = bar.low >= ema9 * (1.0 - self.cushion) && bar.low <= ema9 * (1.0 + self.cushion);
            if touch && bar.close > ema9 && bar.close > bar.open {
                count += 1;
            }
        }
        Some(count)
    }

    /// The bounce count when it reaches `min_bounces`.
    pub fn score(&self, frame: &TrendFrame) -> Option<u32> {
        self.count(frame).filter(|&c| c >= self.min_bounces)
    }
}

impl TrendFilter for BounceScorer {
    fn kind(&self) -> FilterKind {
        FilterKind::Bounce
    }

    fn evaluate(&self, frame: &TrendFrame) -> Verdict {
        match self.score(frame) {
            Some(score) => Verdict::Pass { score: Some(score) },
            None => Verdict::Fail,
        }
    }
}
