//! The ordered filter chain: liquidity → stacked EMA → ATR band → RSI band →
//! bounce score, short-circuiting on the first failure.

use crate::domain::filter::{
    AtrBandFilter, BounceScorer, FilterKind, FilterMode, FilterResult, LiquidityFilter,
    RsiBandFilter, StackedEmaFilter, TrendFilter,
};
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::trend_frame::TrendFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOutcome {
    Passed { score: u32 },
    Rejected(FilterKind),
}

impl PipelineOutcome {
    pub fn score(&self) -> Option<u32> {
        match self {
            PipelineOutcome::Passed { score } => Some(*score),
            PipelineOutcome::Rejected(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrendPipeline {
    pub liquidity: LiquidityFilter,
    pub stacked_ema: StackedEmaFilter,
    pub atr_band: AtrBandFilter,
    pub rsi_band: RsiBandFilter,
    pub bounce: BounceScorer,
}

impl TrendPipeline {
    /// Filters after liquidity, in evaluation order.
    fn trend_filters(&self) -> [&dyn TrendFilter; 4] {
        [&self.stacked_ema, &self.atr_band, &self.rsi_band, &self.bounce]
    }

    /// Run the chain in screen mode over a daily window.
    ///
    /// Liquidity only reads bars, so it runs before any indicator is
    /// computed.
    pub fn screen_window(&self, bars: &[OhlcvBar]) -> PipelineOutcome {
        let bare = TrendFrame::new(bars);
        if let FilterResult::Rejected = self.liquidity.apply(&bare, FilterMode::Screen) {
            return PipelineOutcome::Rejected(FilterKind::Liquidity);
        }
        self.screen_frame(&TrendFrame::with_trend_indicators(bars))
    }

    /// Run the post-liquidity filters on a frame that already carries its
    /// indicator columns.
    pub fn screen_frame(&self, frame: &TrendFrame) -> PipelineOutcome {
        let mut score = 0;
        for filter in self.trend_filters() {
            match filter.apply(frame, FilterMode::Screen) {
                FilterResult::Passed { score: Some(s), .. } => score = s,
                FilterResult::Passed { score: None, .. } => {}
                FilterResult::Rejected | FilterResult::Marked { .. } => {
                    return PipelineOutcome::Rejected(filter.kind());
                }
            }
        }
        PipelineOutcome::Passed { score }
    }

    /// Every filter in diagnostic mode, without short-circuiting.
    pub fn diagnose(&self, frame: &TrendFrame) -> Vec<(FilterKind, Vec<bool>)> {
        std::iter::once(&self.liquidity as &dyn TrendFilter)
            .chain(self.trend_filters())
            .map(|filter| match filter.apply(frame, FilterMode::Diagnostic) {
                FilterResult::Marked { failed, .. } => (filter.kind(), failed),
                FilterResult::Passed { .. } => (filter.kind(), vec![false; frame.len()]),
                FilterResult::Rejected => (filter.kind(), vec![true; frame.len()]),
            })
            .collect()
    }
}
