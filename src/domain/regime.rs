//! Market regime gate: the index close against its 200-day SMA.

use crate::domain::indicator::sma::calculate_sma;
use crate::domain::ohlcv::OhlcvBar;

pub const REGIME_SMA_PERIOD: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegimeVerdict {
    Bullish { close: f64, sma: f64 },
    Bearish { close: f64, sma: f64 },
    Insufficient { bars: usize },
}

impl RegimeVerdict {
    /// Trading is allowed only in a confirmed bullish regime.
    pub fn allows_trading(&self) -> bool {
        matches!(self, RegimeVerdict::Bullish { .. })
    }
}

/// Judge the regime on the last bar of `bars`. A close equal to the SMA
/// counts as bullish.
pub fn evaluate_regime(bars: &[OhlcvBar], period: usize) -> RegimeVerdict {
    let sma = calculate_sma(bars, period);
    match (bars.last(), sma.last_value()) {
        (Some(last), Some(sma)) if last.close.is_finite() => {
            if last.close < sma {
                RegimeVerdict::Bearish {
                    close: last.close,
                    sma,
                }
            } else {
                RegimeVerdict::Bullish {
                    close: last.close,
                    sma,
                }
            }
        }
        _ => RegimeVerdict::Insufficient { bars: bars.len() },
    }
}
