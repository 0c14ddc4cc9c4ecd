//! In-memory bar store and instrument catalog.
//!
//! Each upsert happens under a single write lock, so readers see either the
//! whole refresh or none of it.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use chrono::NaiveDate;

use crate::domain::error::TickerError;
use crate::domain::instrument::Instrument;
use crate::domain::ohlcv::Bar;
use crate::ports::catalog_port::CatalogPort;
use crate::ports::store_port::BarStore;

#[derive(Debug, Default)]
pub struct MemoryStore {
    bars: RwLock<HashMap<String, BTreeMap<NaiveDate, Bar>>>,
    instruments: RwLock<BTreeMap<String, Instrument>>,
}

fn poisoned<T>(_: T) -> TickerError {
    TickerError::Database {
        reason: "memory store lock poisoned".into(),
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BarStore for MemoryStore {
    fn get_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, TickerError> {
        let guard = self.bars.read().map_err(poisoned)?;
        Ok(guard
            .get(symbol)
            .map(|series| series.range(start..=end).map(|(_, b)| b.clone()).collect())
            .unwrap_or_default())
    }

    fn upsert_bars(&self, symbol: &str, bars: &[Bar]) -> Result<usize, TickerError> {
        let mut guard = self.bars.write().map_err(poisoned)?;
        let series = guard.entry(symbol.to_string()).or_default();
        for bar in bars {
            series.insert(
                bar.date,
                Bar {
                    symbol: symbol.to_string(),
                    ..bar.clone()
                },
            );
        }
        Ok(bars.len())
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, TickerError> {
        let guard = self.bars.read().map_err(poisoned)?;
        Ok(guard.get(symbol).and_then(|series| {
            let first = series.keys().next()?;
            let last = series.keys().next_back()?;
            Some((*first, *last, series.len()))
        }))
    }

    fn list_symbols(&self) -> Result<Vec<String>, TickerError> {
        let guard = self.bars.read().map_err(poisoned)?;
        let mut symbols: Vec<String> = guard
            .iter()
            .filter(|(_, series)| !series.is_empty())
            .map(|(s, _)| s.clone())
            .collect();
        symbols.sort();
        Ok(symbols)
    }
}

impl CatalogPort for MemoryStore {
    fn list_instruments(&self, sector: Option<&str>) -> Result<Vec<Instrument>, TickerError> {
        let guard = self.instruments.read().map_err(poisoned)?;
        Ok(guard
            .values()
            .filter(|i| sector.is_none_or(|s| i.sector.as_deref() == Some(s)))
            .cloned()
            .collect())
    }

    fn get_instrument(&self, symbol: &str) -> Result<Option<Instrument>, TickerError> {
        let guard = self.instruments.read().map_err(poisoned)?;
        Ok(guard.get(symbol).cloned())
    }

    fn upsert_instrument(&self, instrument: &Instrument) -> Result<(), TickerError> {
        let mut guard = self.instruments.write().map_err(poisoned)?;
        guard.insert(instrument.symbol.clone(), instrument.clone());
        Ok(())
    }
}
