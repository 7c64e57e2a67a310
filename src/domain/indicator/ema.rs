//! Exponential Moving Average indicator.
//!
//! k = 2/(n+1), seeded with the first close (no warm-up, no bias
//! correction): EMA[0] = C[0], EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! Series shorter than 2 bars come back with every point invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_ema(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let Some(values) = ema_values(&closes, period) else {
        return IndicatorSeries::invalid(IndicatorType::Ema(period), bars);
    };

    IndicatorSeries {
        indicator_type: IndicatorType::Ema(period),
        values: bars
            .iter()
            .zip(values)
            .map(|(bar, value)| IndicatorPoint {
                timestamp: bar.timestamp,
                valid: value.is_finite(),
                value,
            })
            .collect(),
    }
}

/// Recursive exponential smoothing with span `period`, seeded by the first
/// input. Shared with ATR, which smooths true range the same way.
pub(crate) fn ema_values(inputs: &[f64], period: usize) -> Option<Vec<f64>> {
    if period == 0 || inputs.len() < 2 {
        return None;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut values = Vec::with_capacity(inputs.len());
    let mut ema = inputs[0];
    values.push(ema);
    for &x in &inputs[1..] {
        ema = x * k + ema * (1.0 - k);
        values.push(ema);
    }
    Some(values)
}
