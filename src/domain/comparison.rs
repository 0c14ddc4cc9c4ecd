//! Two-symbol comparison over shared trading dates.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::error::TickerError;
use crate::domain::metrics::annualized_volatility;
use crate::domain::ohlcv::Bar;
use crate::domain::stats::pearson;

pub const MIN_OVERLAP: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub symbol1: String,
    pub symbol2: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Number of dates both symbols traded on.
    pub overlap: usize,
    pub correlation: Option<f64>,
    pub symbol1_return: f64,
    pub symbol2_return: f64,
    pub symbol1_volatility: Option<f64>,
    pub symbol2_volatility: Option<f64>,
    pub better_performer: String,
}

/// Inner-join both sequences on date and compare them.
///
/// Every figure is computed on the shared dates only. Symbol 1 wins an exact
/// tie on cumulative return.
pub fn compare(
    symbol1: &str,
    bars1: &[Bar],
    symbol2: &str,
    bars2: &[Bar],
) -> Result<ComparisonResult, TickerError> {
    let (left, right) = align(bars1, bars2);

    if left.len() < MIN_OVERLAP {
        return Err(TickerError::InsufficientOverlap {
            symbol1: symbol1.to_string(),
            symbol2: symbol2.to_string(),
            overlap: left.len(),
        });
    }

    let (returns1, returns2): (Vec<f64>, Vec<f64>) = left
        .iter()
        .zip(&right)
        .filter_map(|(a, b)| Some((a.daily_return()?, b.daily_return()?)))
        .unzip();

    let symbol1_return = cumulative_return(&left);
    let symbol2_return = cumulative_return(&right);
    let better_performer = if symbol1_return >= symbol2_return {
        symbol1
    } else {
        symbol2
    };

    Ok(ComparisonResult {
        symbol1: symbol1.to_string(),
        symbol2: symbol2.to_string(),
        start: left[0].date,
        end: left[left.len() - 1].date,
        overlap: left.len(),
        correlation: pearson(&returns1, &returns2),
        symbol1_return,
        symbol2_return,
        symbol1_volatility: annualized_volatility(&left),
        symbol2_volatility: annualized_volatility(&right),
        better_performer: better_performer.to_string(),
    })
}

/// Bars of each side restricted to the dates both have, in date order.
pub fn align(bars1: &[Bar], bars2: &[Bar]) -> (Vec<Bar>, Vec<Bar>) {
    let by_date: HashMap<NaiveDate, &Bar> = bars2.iter().map(|b| (b.date, b)).collect();

    let mut pairs: Vec<(Bar, Bar)> = bars1
        .iter()
        .filter_map(|a| by_date.get(&a.date).map(|b| (a.clone(), (*b).clone())))
        .collect();
    pairs.sort_by_key(|(a, _)| a.date);
    pairs.into_iter().unzip()
}

/// (last close - first close) / first close * 100. Expects a non-empty slice.
fn cumulative_return(bars: &[Bar]) -> f64 {
    match (bars.first(), bars.last()) {
        (Some(first), Some(last)) if first.close != 0.0 => {
            (last.close - first.close) / first.close * 100.0
        }
        _ => 0.0,
    }
}
