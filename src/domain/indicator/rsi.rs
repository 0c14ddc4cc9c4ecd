//! RSI (Relative Strength Index), simple-average form.
//!
//! Over the trailing n close-to-close changes:
//! avg_gain = mean(max(change, 0)), avg_loss = mean(max(-change, 0))
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! avg_loss == 0: RSI = 100 if avg_gain > 0, else 50 (no movement at all).
//!
//! Warmup: the first n bars are undefined (n changes need n + 1 bars).

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::Bar;

pub const DEFAULT_PERIOD: usize = 14;

pub fn calculate_rsi(bars: &[Bar], period: usize) -> IndicatorSeries {
    let changes: Vec<f64> = bars.windows(2).map(|w| w[1].close - w[0].close).collect();

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let value = if period > 0 && i >= period {
                // changes[k] is the move into bar k + 1
                Some(IndicatorValue::Simple(rsi_from_changes(
                    &changes[i - period..i],
                )))
            } else {
                None
            };
            IndicatorPoint {
                date: bar.date,
                value,
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}

fn rsi_from_changes(window: &[f64]) -> f64 {
    let n = window.len() as f64;
    let avg_gain = window.iter().map(|c| c.max(0.0)).sum::<f64>() / n;
    let avg_loss = window.iter().map(|c| (-c).max(0.0)).sum::<f64>() / n;

    if avg_loss == 0.0 {
        return if avg_gain > 0.0 { 100.0 } else { 50.0 };
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}
