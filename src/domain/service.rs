//! The operations exposed to the CLI and the HTTP API.
//!
//! Requests are validated here, before anything reaches the router.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::acquisition::{AcquisitionRouter, FreshnessPolicy, Resolution};
use crate::domain::comparison::{self, ComparisonResult};
use crate::domain::error::{SourceFailure, TickerError};
use crate::domain::instrument::{normalize_symbol, Instrument};
use crate::domain::metrics::{annotate, AnnotatedBar, SummaryStats};
use crate::domain::ohlcv::RawRow;
use crate::domain::settings::AnalyticsSettings;
use crate::domain::technicals::TechnicalSnapshot;
use crate::ports::catalog_port::CatalogPort;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mover {
    pub symbol: String,
    pub name: String,
    pub date: NaiveDate,
    pub current_price: f64,
    /// Latest daily return, in percent.
    pub change_percent: f64,
    pub volume: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopMovers {
    pub gainers: Vec<Mover>,
    pub losers: Vec<Mover>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataInfo {
    pub symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub bars: usize,
}

/// Outcome of a forced refresh or an import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    pub symbol: String,
    pub source: String,
    pub bars: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
}

impl LoadReport {
    fn from_resolution(symbol: &str, res: &Resolution) -> Result<Self, TickerError> {
        match (res.bars.first(), res.bars.last()) {
            (Some(first), Some(last)) => Ok(LoadReport {
                symbol: symbol.to_string(),
                source: res.source.to_string(),
                bars: res.bars.len(),
                first_date: first.date,
                last_date: last.date,
            }),
            _ => Err(TickerError::not_found(symbol, res.failures.clone())),
        }
    }
}

pub struct MarketService {
    router: AcquisitionRouter,
    catalog: Arc<dyn CatalogPort>,
    freshness: FreshnessPolicy,
    analytics: AnalyticsSettings,
}

impl MarketService {
    pub fn new(
        router: AcquisitionRouter,
        catalog: Arc<dyn CatalogPort>,
        freshness: FreshnessPolicy,
        analytics: AnalyticsSettings,
    ) -> Self {
        Self {
            router,
            catalog,
            freshness,
            analytics,
        }
    }

    pub fn list_companies(&self, sector: Option<&str>) -> Result<Vec<Instrument>, TickerError> {
        let sector = sector.map(str::trim).filter(|s| !s.is_empty());
        self.catalog.list_instruments(sector)
    }

    /// Write each instrument to the catalog, returning how many were written.
    pub fn seed_catalog(&self, instruments: &[Instrument]) -> Result<usize, TickerError> {
        for instrument in instruments {
            self.catalog.upsert_instrument(instrument)?;
        }
        info!(count = instruments.len(), "catalog seeded");
        Ok(instruments.len())
    }

    /// Annotated bars for the last `days` calendar days.
    ///
    /// An extra warm-up span is resolved before the window so the moving
    /// averages at the start of the window see their preceding bars.
    pub fn get_bars(&self, symbol: &str, days: i64) -> Result<Vec<AnnotatedBar>, TickerError> {
        let symbol = normalize_symbol(symbol)?;
        self.check_days(days, 1)?;

        let (start, end) = self.window(days);
        let res = self.router.resolve(
            &symbol,
            start - Duration::days(self.analytics.warmup_days),
            end,
            &self.freshness,
        )?;

        let annotated: Vec<AnnotatedBar> = annotate(&res.bars)
            .into_iter()
            .filter(|a| a.bar.date >= start)
            .collect();

        if annotated.is_empty() {
            let mut reasons = res.failures;
            reasons.push(SourceFailure::new(
                res.source.to_string(),
                format!("no bars in the last {days} days"),
            ));
            return Err(TickerError::not_found(symbol, reasons));
        }
        Ok(annotated)
    }

    pub fn get_summary(&self, symbol: &str) -> Result<SummaryStats, TickerError> {
        let symbol = normalize_symbol(symbol)?;
        let res = self.resolve_days(&symbol, self.analytics.summary_lookback_days)?;
        SummaryStats::compute(&symbol, &res.bars)
            .ok_or_else(|| TickerError::not_found(&symbol, res.failures))
    }

    pub fn get_technicals(&self, symbol: &str) -> Result<TechnicalSnapshot, TickerError> {
        let symbol = normalize_symbol(symbol)?;
        let res = self.resolve_days(&symbol, self.analytics.technicals_lookback_days)?;
        TechnicalSnapshot::compute(&symbol, &res.bars)
            .ok_or_else(|| TickerError::not_found(&symbol, res.failures))
    }

    pub fn compare(
        &self,
        symbol1: &str,
        symbol2: &str,
        days: i64,
    ) -> Result<ComparisonResult, TickerError> {
        let symbol1 = normalize_symbol(symbol1)?;
        let symbol2 = normalize_symbol(symbol2)?;
        self.check_days(days, 2)?;

        let left = self.resolve_days(&symbol1, days)?;
        let right = self.resolve_days(&symbol2, days)?;
        comparison::compare(&symbol1, &left.bars, &symbol2, &right.bars)
    }

    /// Largest latest-day gains and losses across the catalog.
    ///
    /// Instruments that cannot be resolved are skipped. With an empty
    /// catalog every symbol in the store is considered.
    pub fn top_movers(&self, limit: usize) -> Result<TopMovers, TickerError> {
        if limit == 0 || limit > self.analytics.max_movers {
            return Err(TickerError::InvalidRange {
                reason: format!(
                    "limit must be between 1 and {}, got {limit}",
                    self.analytics.max_movers
                ),
            });
        }

        let mut universe: Vec<(String, String)> = self
            .catalog
            .list_instruments(None)?
            .into_iter()
            .map(|i| (i.symbol, i.name))
            .collect();
        if universe.is_empty() {
            universe = self
                .router
                .store()
                .list_symbols()?
                .into_iter()
                .map(|s| (s.clone(), s))
                .collect();
        }

        let mut movers = Vec::new();
        for (symbol, name) in universe {
            let res = match self.resolve_days(&symbol, self.analytics.movers_lookback_days) {
                Ok(res) => res,
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "skipping mover");
                    continue;
                }
            };
            let Some(last) = res.bars.last() else {
                continue;
            };
            let Some(change_percent) = last.daily_return() else {
                continue;
            };
            movers.push(Mover {
                symbol,
                name,
                date: last.date,
                current_price: last.close,
                change_percent,
                volume: last.volume,
            });
        }

        Ok(rank_movers(movers, limit))
    }

    /// Re-fetch full history from the providers regardless of freshness.
    pub fn refresh(&self, symbol: &str) -> Result<LoadReport, TickerError> {
        let symbol = normalize_symbol(symbol)?;
        let res = self.router.refresh(&symbol)?;
        LoadReport::from_resolution(&symbol, &res)
    }

    /// Clean and persist rows read outside the provider cascade.
    pub fn import(
        &self,
        symbol: &str,
        source: &str,
        rows: Vec<RawRow>,
    ) -> Result<LoadReport, TickerError> {
        let symbol = normalize_symbol(symbol)?;
        let bars = self.router.ingest(&symbol, rows)?;
        match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Ok(LoadReport {
                symbol: symbol.clone(),
                source: source.to_string(),
                bars: bars.len(),
                first_date: first.date,
                last_date: last.date,
            }),
            _ => Err(TickerError::not_found(symbol, Vec::new())),
        }
    }

    pub fn info(&self, symbol: &str) -> Result<DataInfo, TickerError> {
        let symbol = normalize_symbol(symbol)?;
        match self.router.store().get_data_range(&symbol)? {
            Some((first_date, last_date, bars)) => Ok(DataInfo {
                name: self.catalog.get_instrument(&symbol)?.map(|i| i.name),
                symbol,
                first_date,
                last_date,
                bars,
            }),
            None => Err(TickerError::not_found(
                symbol,
                vec![SourceFailure::new("store", "no persisted bars")],
            )),
        }
    }

    /// Every symbol with persisted bars.
    pub fn stored_symbols(&self) -> Result<Vec<String>, TickerError> {
        self.router.store().list_symbols()
    }

    fn resolve_days(&self, symbol: &str, days: i64) -> Result<Resolution, TickerError> {
        let (start, end) = self.window(days);
        self.router.resolve(symbol, start, end, &self.freshness)
    }

    fn window(&self, days: i64) -> (NaiveDate, NaiveDate) {
        let today = self.router.today();
        (today - Duration::days(days), today)
    }

    fn check_days(&self, days: i64, min: i64) -> Result<(), TickerError> {
        if days < min || days > self.analytics.max_days {
            return Err(TickerError::InvalidRange {
                reason: format!(
                    "days must be between {min} and {}, got {days}",
                    self.analytics.max_days
                ),
            });
        }
        Ok(())
    }
}

/// Gainers by change descending and losers ascending, ties by symbol.
pub fn rank_movers(mut movers: Vec<Mover>, limit: usize) -> TopMovers {
    movers.sort_by(|a, b| {
        b.change_percent
            .partial_cmp(&a.change_percent)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
    let gainers = movers.iter().take(limit).cloned().collect();

    movers.sort_by(|a, b| {
        a.change_percent
            .partial_cmp(&b.change_percent)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
    let losers = movers.into_iter().take(limit).collect();

    TopMovers { gainers, losers }
}
