//! Point-in-time technical snapshot: RSI, MACD, support/resistance and a
//! one-step linear extrapolation of the close.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::indicator::macd::{self, stable_after};
use crate::domain::indicator::rsi::DEFAULT_PERIOD as RSI_PERIOD;
use crate::domain::indicator::trend::{detect_trend, TrendFit, DEFAULT_WINDOW};
use crate::domain::indicator::{calculate_macd, calculate_rsi, IndicatorValue};
use crate::domain::ohlcv::Bar;

pub const SUPPORT_RESISTANCE_WINDOW: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdSnapshot {
    pub macd_line: f64,
    pub signal_line: f64,
    pub histogram: f64,
    /// False until enough bars exist for the signal EMA to settle.
    pub signal_stable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupportResistance {
    pub support: f64,
    pub resistance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalSnapshot {
    pub symbol: String,
    pub as_of: NaiveDate,
    pub current_price: f64,
    pub rsi: Option<f64>,
    pub macd: Option<MacdSnapshot>,
    pub support_resistance: Option<SupportResistance>,
    pub trend: Option<TrendFit>,
    /// last close + trend slope. A naive heuristic, not a forecast.
    pub predicted_next_price: Option<f64>,
}

impl TechnicalSnapshot {
    pub fn compute(symbol: &str, bars: &[Bar]) -> Option<Self> {
        let last = bars.last()?;
        let trend = detect_trend(bars, DEFAULT_WINDOW);

        Some(TechnicalSnapshot {
            symbol: symbol.to_string(),
            as_of: last.date,
            current_price: last.close,
            rsi: calculate_rsi(bars, RSI_PERIOD)
                .latest()
                .and_then(IndicatorValue::as_simple),
            macd: macd_snapshot(bars),
            support_resistance: support_resistance(bars, SUPPORT_RESISTANCE_WINDOW),
            predicted_next_price: trend.map(|t| last.close + t.slope),
            trend,
        })
    }
}

fn macd_snapshot(bars: &[Bar]) -> Option<MacdSnapshot> {
    let series = calculate_macd(
        bars,
        macd::DEFAULT_FAST,
        macd::DEFAULT_SLOW,
        macd::DEFAULT_SIGNAL,
    );
    match series.latest()? {
        IndicatorValue::Macd {
            line,
            signal,
            histogram,
        } => Some(MacdSnapshot {
            macd_line: *line,
            signal_line: *signal,
            histogram: *histogram,
            signal_stable: bars.len() >= stable_after(macd::DEFAULT_SLOW, macd::DEFAULT_SIGNAL),
        }),
        IndicatorValue::Simple(_) => None,
    }
}

/// min(low) / max(high) over the trailing `window` bars.
pub fn support_resistance(bars: &[Bar], window: usize) -> Option<SupportResistance> {
    if window == 0 || bars.len() < window {
        return None;
    }
    let tail = &bars[bars.len() - window..];
    Some(SupportResistance {
        support: tail.iter().map(|b| b.low).fold(f64::INFINITY, f64::min),
        resistance: tail.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::Duration;

    fn make_bars(closes: &[f64]) -> Vec<Bar> {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                symbol: "TEST".into(),
                date: start + Duration::days(i as i64),
                open: close,
                high: close + 2.0,
                low: close - 2.0,
                close,
                volume: 500,
            })
            .collect()
    }

    #[test]
    fn empty_has_no_snapshot() {
        assert!(TechnicalSnapshot::compute("X", &[]).is_none());
    }

    #[test]
    fn short_history_degrades_per_field() {
        let snap = TechnicalSnapshot::compute("X", &make_bars(&[10.0, 11.0, 12.0])).unwrap();
        assert_eq!(snap.current_price, 12.0);
        assert!(snap.rsi.is_none());
        assert!(snap.macd.is_none());
        assert!(snap.support_resistance.is_none());
        assert!(snap.trend.is_some());
        assert_relative_eq!(snap.predicted_next_price.unwrap(), 13.0, epsilon = 1e-9);
    }

    #[test]
    fn single_bar_has_no_prediction() {
        let snap = TechnicalSnapshot::compute("X", &make_bars(&[10.0])).unwrap();
        assert!(snap.trend.is_none());
        assert!(snap.predicted_next_price.is_none());
    }

    #[test]
    fn rising_fifteen_bars_rsi_is_100() {
        let closes: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        let snap = TechnicalSnapshot::compute("X", &make_bars(&closes)).unwrap();
        assert_relative_eq!(snap.rsi.unwrap(), 100.0);
    }

    #[test]
    fn macd_stability_flag() {
        let closes: Vec<f64> = (0..30).map(|i| 50.0 + (i % 4) as f64).collect();
        let snap = TechnicalSnapshot::compute("X", &make_bars(&closes)).unwrap();
        assert!(!snap.macd.unwrap().signal_stable);

        let closes: Vec<f64> = (0..35).map(|i| 50.0 + (i % 4) as f64).collect();
        let snap = TechnicalSnapshot::compute("X", &make_bars(&closes)).unwrap();
        let macd = snap.macd.unwrap();
        assert!(macd.signal_stable);
        assert_relative_eq!(macd.histogram, macd.macd_line - macd.signal_line, epsilon = 1e-12);
    }

    #[test]
    fn support_resistance_uses_last_twenty() {
        let mut closes = vec![1.0, 500.0];
        closes.extend((0..20).map(|i| 100.0 + i as f64));
        let sr = support_resistance(&make_bars(&closes), 20).unwrap();
        assert_eq!(sr.support, 98.0);
        assert_eq!(sr.resistance, 121.0);
    }

    #[test]
    fn support_resistance_needs_full_window() {
        assert!(support_resistance(&make_bars(&[10.0; 19]), 20).is_none());
        assert!(support_resistance(&make_bars(&[10.0; 20]), 20).is_some());
    }
}
