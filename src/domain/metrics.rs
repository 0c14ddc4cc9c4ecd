//! Per-bar annotations and per-symbol summary statistics.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::indicator::calculate_sma;
use crate::domain::indicator::trend::{detect_trend, TrendFit, DEFAULT_WINDOW};
use crate::domain::ohlcv::Bar;
use crate::domain::stats::{population_stddev, TRADING_DAYS_PER_YEAR};

pub const MA_SHORT: usize = 7;
pub const MA_LONG: usize = 30;
pub const VOLUME_WINDOW: usize = 20;
pub const STRONG_MOMENTUM: f64 = 5.0;
pub const WEEK52_DAYS: i64 = 365;

/// A bar together with the analytics derived at that bar. Fields are absent
/// until enough preceding bars exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedBar {
    #[serde(flatten)]
    pub bar: Bar,
    pub daily_return: Option<f64>,
    pub ma7: Option<f64>,
    pub ma30: Option<f64>,
    pub momentum_score: Option<f64>,
    pub volume_trend: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolatilityClass {
    Low,
    Medium,
    High,
    #[serde(rename = "Very High")]
    VeryHigh,
}

impl VolatilityClass {
    /// Bands on annualized volatility in percent: <15, [15,30), [30,50), >=50.
    pub fn classify(volatility: f64) -> Self {
        if volatility < 15.0 {
            VolatilityClass::Low
        } else if volatility < 30.0 {
            VolatilityClass::Medium
        } else if volatility < 50.0 {
            VolatilityClass::High
        } else {
            VolatilityClass::VeryHigh
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VolatilityClass::Low => "Low",
            VolatilityClass::Medium => "Medium",
            VolatilityClass::High => "High",
            VolatilityClass::VeryHigh => "Very High",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub symbol: String,
    pub as_of: NaiveDate,
    pub current_price: f64,
    pub week52_high: f64,
    pub week52_low: f64,
    pub avg_close: f64,
    pub total_volume: i64,
    pub daily_return: Option<f64>,
    pub volatility: Option<f64>,
    pub volatility_class: Option<VolatilityClass>,
    pub momentum_score: Option<f64>,
    pub strong_momentum: bool,
    pub volume_trend: Option<f64>,
    pub trend: Option<TrendFit>,
}

impl SummaryStats {
    /// None for an empty sequence.
    pub fn compute(symbol: &str, bars: &[Bar]) -> Option<Self> {
        let last = bars.last()?;
        let year = trailing_calendar_window(bars, WEEK52_DAYS);

        let week52_high = year.iter().map(|b| b.high).fold(f64::MIN, f64::max);
        let week52_low = year.iter().map(|b| b.low).fold(f64::MAX, f64::min);
        let avg_close = year.iter().map(|b| b.close).sum::<f64>() / year.len() as f64;
        let total_volume = year.iter().map(|b| b.volume).sum();

        let volatility = annualized_volatility(bars);
        let ma30 = calculate_sma(bars, MA_LONG).latest().and_then(|v| v.as_simple());
        let momentum_score = ma30.and_then(|ma| momentum_score(last.close, ma));

        Some(SummaryStats {
            symbol: symbol.to_string(),
            as_of: last.date,
            current_price: last.close,
            week52_high,
            week52_low,
            avg_close,
            total_volume,
            daily_return: last.daily_return(),
            volatility,
            volatility_class: volatility.map(VolatilityClass::classify),
            momentum_score,
            strong_momentum: momentum_score.is_some_and(|s| s.abs() > STRONG_MOMENTUM),
            volume_trend: volume_trend(bars),
            trend: detect_trend(bars, DEFAULT_WINDOW),
        })
    }
}

/// Annotate every bar with daily return, moving averages, momentum and
/// volume trend as of that bar.
pub fn annotate(bars: &[Bar]) -> Vec<AnnotatedBar> {
    let ma7 = calculate_sma(bars, MA_SHORT);
    let ma30 = calculate_sma(bars, MA_LONG);

    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let ma30_here = ma30.simple_at(i);
            AnnotatedBar {
                bar: bar.clone(),
                daily_return: bar.daily_return(),
                ma7: ma7.simple_at(i),
                ma30: ma30_here,
                momentum_score: ma30_here.and_then(|ma| momentum_score(bar.close, ma)),
                volume_trend: volume_trend(&bars[..=i]),
            }
        })
        .collect()
}

/// Bars dated within `days` calendar days of the last bar (inclusive).
pub fn trailing_calendar_window(bars: &[Bar], days: i64) -> &[Bar] {
    let Some(last) = bars.last() else {
        return bars;
    };
    let cutoff = last.date - Duration::days(days);
    let start = bars.partition_point(|b| b.date < cutoff);
    &bars[start..]
}

/// Population stdev of percent daily returns over the whole sequence,
/// scaled by sqrt(252). Needs at least two returns.
pub fn annualized_volatility(bars: &[Bar]) -> Option<f64> {
    let returns: Vec<f64> = bars.iter().filter_map(Bar::daily_return).collect();
    if returns.len() < 2 {
        return None;
    }
    population_stddev(&returns).map(|sd| sd * TRADING_DAYS_PER_YEAR.sqrt())
}

/// (close - ma30) / ma30 * 100.
pub fn momentum_score(close: f64, ma30: f64) -> Option<f64> {
    if ma30 == 0.0 {
        None
    } else {
        Some((close - ma30) / ma30 * 100.0)
    }
}

/// Last volume relative to the trailing 20-bar mean volume, in percent.
pub fn volume_trend(bars: &[Bar]) -> Option<f64> {
    if bars.len() < VOLUME_WINDOW {
        return None;
    }
    let window = &bars[bars.len() - VOLUME_WINDOW..];
    let avg = window.iter().map(|b| b.volume as f64).sum::<f64>() / VOLUME_WINDOW as f64;
    if avg == 0.0 {
        return None;
    }
    let last = window[VOLUME_WINDOW - 1].volume as f64;
    Some((last - avg) / avg * 100.0)
}
