//! Linear trend detection.
//!
//! Ordinary least squares of close against bar index over the trailing
//! window (or every bar when fewer exist, minimum 2).
//! Classification: r² > 0.5 with positive slope is bullish, with negative
//! slope bearish, anything else neutral.

use serde::{Deserialize, Serialize};

use crate::domain::ohlcv::Bar;

pub const DEFAULT_WINDOW: usize = 20;
pub const MIN_R_SQUARED: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Bullish,
    Bearish,
    Neutral,
}

impl TrendDirection {
    pub fn classify(slope: f64, r_squared: f64) -> Self {
        if r_squared > MIN_R_SQUARED && slope > 0.0 {
            TrendDirection::Bullish
        } else if r_squared > MIN_R_SQUARED && slope < 0.0 {
            TrendDirection::Bearish
        } else {
            TrendDirection::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Bullish => "bullish",
            TrendDirection::Bearish => "bearish",
            TrendDirection::Neutral => "neutral",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendFit {
    pub slope: f64,
    pub r_squared: f64,
    pub direction: TrendDirection,
    /// Number of bars the fit used.
    pub bars: usize,
}

/// OLS fit of `ys` against 0, 1, 2, ...; None with fewer than two points.
///
/// A series with no variance fits perfectly flat; its r² is reported as 0
/// so it never classifies as a trend.
pub fn linear_fit(ys: &[f64]) -> Option<LinearFit> {
    let n = ys.len();
    if n < 2 {
        return None;
    }

    let nf = n as f64;
    let mean_x = (nf - 1.0) / 2.0;
    let mean_y = ys.iter().sum::<f64>() / nf;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (i, y) in ys.iter().enumerate() {
        let dx = i as f64 - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    let r_squared = if syy == 0.0 {
        0.0
    } else {
        (sxy * sxy / (sxx * syy)).clamp(0.0, 1.0)
    };

    Some(LinearFit {
        slope,
        intercept,
        r_squared,
    })
}

pub fn detect_trend(bars: &[Bar], window: usize) -> Option<TrendFit> {
    let take = window.min(bars.len());
    let closes: Vec<f64> = bars[bars.len() - take..].iter().map(|b| b.close).collect();
    let fit = linear_fit(&closes)?;

    Some(TrendFit {
        slope: fit.slope,
        r_squared: fit.r_squared,
        direction: TrendDirection::classify(fit.slope, fit.r_squared),
        bars: take,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};

    fn make_bars(prices: &[f64]) -> Vec<Bar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                symbol: "TEST".into(),
                date: start + Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000,
            })
            .collect()
    }

    #[test]
    fn perfect_line() {
        let fit = linear_fit(&[1.0, 3.0, 5.0, 7.0]).unwrap();
        assert_relative_eq!(fit.slope, 2.0);
        assert_relative_eq!(fit.intercept, 1.0);
        assert_relative_eq!(fit.r_squared, 1.0);
    }

    #[test]
    fn single_point_has_no_fit() {
        assert!(linear_fit(&[5.0]).is_none());
        assert!(detect_trend(&make_bars(&[5.0]), DEFAULT_WINDOW).is_none());
        assert!(detect_trend(&[], DEFAULT_WINDOW).is_none());
    }

    #[test]
    fn flat_series_is_neutral() {
        let trend = detect_trend(&make_bars(&[10.0; 30]), DEFAULT_WINDOW).unwrap();
        assert_relative_eq!(trend.slope, 0.0);
        assert_eq!(trend.r_squared, 0.0);
        assert_eq!(trend.direction, TrendDirection::Neutral);
    }

    #[test]
    fn rising_series_is_bullish() {
        let prices: Vec<f64> = (0..25).map(|i| 100.0 + i as f64).collect();
        let trend = detect_trend(&make_bars(&prices), DEFAULT_WINDOW).unwrap();
        assert_eq!(trend.direction, TrendDirection::Bullish);
        assert_eq!(trend.bars, 20);
        assert_relative_eq!(trend.slope, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn falling_series_is_bearish() {
        let prices: Vec<f64> = (0..10).map(|i| 50.0 - 2.0 * i as f64).collect();
        let trend = detect_trend(&make_bars(&prices), DEFAULT_WINDOW).unwrap();
        assert_eq!(trend.direction, TrendDirection::Bearish);
        assert_eq!(trend.bars, 10);
    }

    #[test]
    fn noisy_series_is_neutral() {
        let prices = [10.0, 14.0, 9.0, 15.0, 8.0, 16.0, 9.0, 14.0, 10.0, 13.0];
        let trend = detect_trend(&make_bars(&prices), DEFAULT_WINDOW).unwrap();
        assert!(trend.r_squared <= MIN_R_SQUARED);
        assert_eq!(trend.direction, TrendDirection::Neutral);
    }

    #[test]
    fn uses_trailing_window_only() {
        // long decline followed by a clean 20-bar rise
        let mut prices: Vec<f64> = (0..30).map(|i| 200.0 - i as f64 * 3.0).collect();
        prices.extend((0..20).map(|i| 110.0 + i as f64));
        let trend = detect_trend(&make_bars(&prices), 20).unwrap();
        assert_eq!(trend.direction, TrendDirection::Bullish);
    }

    #[test]
    fn two_bars_is_enough() {
        let trend = detect_trend(&make_bars(&[10.0, 11.0]), DEFAULT_WINDOW).unwrap();
        assert_relative_eq!(trend.slope, 1.0);
        assert_relative_eq!(trend.r_squared, 1.0);
    }

    #[test]
    fn direction_labels() {
        assert_eq!(TrendDirection::Bullish.as_str(), "bullish");
        assert_eq!(TrendDirection::classify(1.0, 0.5), TrendDirection::Neutral);
        assert_eq!(TrendDirection::classify(-1.0, 0.51), TrendDirection::Bearish);
    }
}
