//! Persisted bar store port trait.

use crate::domain::error::TickerError;
use crate::domain::ohlcv::Bar;
use chrono::NaiveDate;

pub trait BarStore: Send + Sync {
    /// Bars for `symbol` with `start <= date <= end`, ascending by date.
    fn get_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, TickerError>;

    /// Insert or replace every bar by (symbol, date). Either all rows are
    /// committed or none are.
    fn upsert_bars(&self, symbol: &str, bars: &[Bar]) -> Result<usize, TickerError>;

    /// First date, last date and bar count, or None when nothing is stored.
    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, TickerError>;

    fn latest_bar_date(&self, symbol: &str) -> Result<Option<NaiveDate>, TickerError> {
        Ok(self.get_data_range(symbol)?.map(|(_, last, _)| last))
    }

    fn list_symbols(&self) -> Result<Vec<String>, TickerError>;
}
