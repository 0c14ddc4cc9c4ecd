//! Cleaning pipeline: raw provider rows to a well-formed bar sequence.
//!
//! Steps, in order:
//! 1. forward-fill missing numeric fields from the chronologically preceding row
//! 2. backward-fill what is still missing from the following row
//! 3. drop rows that still miss any of open/high/low/close/volume
//! 4. deduplicate by calendar date, keeping the last row in input order
//! 5. coerce fields (prices positive finite, volume non-negative integer),
//!    dropping rows that fail
//! 6. normalize dates to calendar dates
//! 7. sort ascending by date
//!
//! Rows without a parseable date are discarded up front, since chronology is
//! needed for the fills. The pipeline never fails; the output may be empty.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::domain::ohlcv::{Bar, RawRow, RawValue};

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

struct Staged {
    input_index: usize,
    timestamp: NaiveDateTime,
    fields: [Option<RawValue>; 5],
}

pub fn clean(symbol: &str, rows: Vec<RawRow>) -> Vec<Bar> {
    let total = rows.len();

    let mut staged: Vec<Staged> = rows
        .into_iter()
        .enumerate()
        .filter_map(|(input_index, row)| {
            let timestamp = row.date.as_ref().and_then(parse_timestamp)?;
            Some(Staged {
                input_index,
                timestamp,
                fields: [row.open, row.high, row.low, row.close, row.volume],
            })
        })
        .collect();

    // stable, so rows sharing a timestamp keep input order
    staged.sort_by_key(|s| s.timestamp);

    forward_fill(&mut staged);
    backward_fill(&mut staged);

    staged.retain(|s| s.fields.iter().all(Option::is_some));

    let mut latest: HashMap<NaiveDate, Staged> = HashMap::new();
    for row in staged {
        let day = row.timestamp.date();
        let newer = latest
            .get(&day)
            .is_none_or(|existing| existing.input_index < row.input_index);
        if newer {
            latest.insert(day, row);
        }
    }

    let mut bars: Vec<Bar> = latest
        .into_iter()
        .filter_map(|(date, row)| coerce(symbol, date, &row.fields))
        .collect();

    bars.sort_by_key(|b| b.date);

    debug!(symbol, raw = total, clean = bars.len(), "cleaned provider rows");
    bars
}

fn forward_fill(rows: &mut [Staged]) {
    let mut last: [Option<RawValue>; 5] = Default::default();
    for row in rows.iter_mut() {
        for (field, carry) in row.fields.iter_mut().zip(last.iter_mut()) {
            match field {
                Some(v) => *carry = Some(v.clone()),
                None => *field = carry.clone(),
            }
        }
    }
}

fn backward_fill(rows: &mut [Staged]) {
    let mut next: [Option<RawValue>; 5] = Default::default();
    for row in rows.iter_mut().rev() {
        for (field, carry) in row.fields.iter_mut().zip(next.iter_mut()) {
            match field {
                Some(v) => *carry = Some(v.clone()),
                None => *field = carry.clone(),
            }
        }
    }
}

fn coerce(symbol: &str, date: NaiveDate, fields: &[Option<RawValue>; 5]) -> Option<Bar> {
    let price = |idx: usize| {
        fields[idx]
            .as_ref()
            .and_then(to_number)
            .filter(|v| *v > 0.0)
    };

    let volume = fields[4]
        .as_ref()
        .and_then(to_number)
        .filter(|v| *v >= 0.0 && *v <= i64::MAX as f64)?
        .trunc() as i64;

    Some(Bar {
        symbol: symbol.to_string(),
        date,
        open: price(0)?,
        high: price(1)?,
        low: price(2)?,
        close: price(3)?,
        volume,
    })
}

fn to_number(value: &RawValue) -> Option<f64> {
    let n = match value {
        RawValue::Number(n) => *n,
        RawValue::Text(s) => s.trim().parse::<f64>().ok()?,
    };
    n.is_finite().then_some(n)
}

/// Parse a raw date field into a timestamp; time-of-day is kept here so
/// rows within one day still order chronologically.
pub fn parse_timestamp(value: &RawValue) -> Option<NaiveDateTime> {
    match value {
        RawValue::Number(secs) if secs.is_finite() => {
            DateTime::from_timestamp(*secs as i64, 0).map(|dt| dt.naive_utc())
        }
        RawValue::Number(_) => None,
        RawValue::Text(s) => {
            let s = s.trim();
            if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                return d.and_hms_opt(0, 0, 0);
            }
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.naive_local());
            }
            DATE_TIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        }
    }
}
