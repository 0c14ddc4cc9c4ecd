//! Daily price/volume bars, cleaned and raw.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One cleaned daily observation. `(symbol, date)` is unique within a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl Bar {
    /// (close - open) / open * 100, undefined for a zero open.
    pub fn daily_return(&self) -> Option<f64> {
        if self.open == 0.0 {
            None
        } else {
            Some((self.close - self.open) / self.open * 100.0)
        }
    }
}

/// A loosely-typed field as delivered by a provider: JSON numbers, numeric
/// strings, or anything else that may or may not coerce.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Number(v)
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        RawValue::Number(v as f64)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        RawValue::Text(v.to_string())
    }
}

impl From<String> for RawValue {
    fn from(v: String) -> Self {
        RawValue::Text(v)
    }
}

/// Provider output before cleaning. Any field may be missing.
///
/// `date` is either text (`2024-01-05`, `2024-01-05 16:00:00`, RFC 3339) or a
/// number of seconds since the Unix epoch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    pub date: Option<RawValue>,
    pub open: Option<RawValue>,
    pub high: Option<RawValue>,
    pub low: Option<RawValue>,
    pub close: Option<RawValue>,
    pub volume: Option<RawValue>,
}

impl RawRow {
    /// Convenience constructor for fully-populated numeric rows.
    pub fn new(date: &str, open: f64, high: f64, low: f64, close: f64, volume: i64) -> Self {
        RawRow {
            date: Some(date.into()),
            open: Some(open.into()),
            high: Some(high.into()),
            low: Some(low.into()),
            close: Some(close.into()),
            volume: Some(volume.into()),
        }
    }
}

/// Keep only bars whose date falls in `[start, end]`.
pub fn slice_range(bars: &[Bar], start: NaiveDate, end: NaiveDate) -> Vec<Bar> {
    bars.iter()
        .filter(|b| b.date >= start && b.date <= end)
        .cloned()
        .collect()
}
