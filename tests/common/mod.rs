#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tickerlens::adapters::clock::FixedClock;
use tickerlens::adapters::memory_store::MemoryStore;
use tickerlens::domain::acquisition::{AcquisitionRouter, FreshnessPolicy};
use tickerlens::domain::error::ProviderError;
use tickerlens::domain::instrument::Instrument;
pub use tickerlens::domain::ohlcv::{Bar, RawRow};
use tickerlens::domain::service::MarketService;
use tickerlens::domain::settings::AnalyticsSettings;
use tickerlens::ports::provider_port::HistoryProvider;
use tickerlens::ports::store_port::BarStore;

/// The fixed "today" used throughout the integration tests.
pub const TODAY: &str = "2024-06-10";

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn today() -> NaiveDate {
    parse_date(TODAY)
}

/// Provider returning canned rows per symbol, counting calls.
pub struct MockProvider {
    pub name: &'static str,
    pub rows: std::collections::HashMap<String, Vec<RawRow>>,
    pub error: Option<ProviderError>,
    pub calls: AtomicUsize,
}

impl MockProvider {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            rows: std::collections::HashMap::new(),
            error: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_rows(mut self, symbol: &str, rows: Vec<RawRow>) -> Self {
        self.rows.insert(symbol.to_string(), rows);
        self
    }

    pub fn failing(mut self, error: ProviderError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl HistoryProvider for MockProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn fetch_history(&self, symbol: &str) -> Result<Vec<RawRow>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        self.rows
            .get(symbol)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownSymbol(symbol.to_string()))
    }
}

/// `n` consecutive calendar days of raw rows ending at `end`, with closes
/// stepping from `start_price` by `step`.
pub fn generate_rows(end: &str, n: i64, start_price: f64, step: f64) -> Vec<RawRow> {
    let end = parse_date(end);
    (0..n)
        .map(|i| {
            let day = end - Duration::days(n - 1 - i);
            let close = start_price + step * i as f64;
            RawRow::new(
                &day.format("%Y-%m-%d").to_string(),
                close - 0.5,
                close + 1.0,
                close - 1.0,
                close,
                1_000 + i * 10,
            )
        })
        .collect()
}

/// Same shape as `generate_rows`, already cleaned.
pub fn generate_bars(symbol: &str, end: &str, n: i64, start_price: f64, step: f64) -> Vec<Bar> {
    let end = parse_date(end);
    (0..n)
        .map(|i| {
            let close = start_price + step * i as f64;
            Bar {
                symbol: symbol.to_string(),
                date: end - Duration::days(n - 1 - i),
                open: close - 0.5,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1_000 + i * 10,
            }
        })
        .collect()
}

/// Bars with the given closes on consecutive days ending at `end`.
pub fn bars_from_closes(symbol: &str, end: &str, closes: &[f64]) -> Vec<Bar> {
    let end = parse_date(end);
    let n = closes.len() as i64;
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            symbol: symbol.to_string(),
            date: end - Duration::days(n - 1 - i as i64),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1_000,
        })
        .collect()
}

pub fn instrument(symbol: &str, name: &str, sector: &str) -> Instrument {
    Instrument {
        symbol: symbol.to_string(),
        name: name.to_string(),
        sector: Some(sector.to_string()),
        industry: None,
        market_cap: None,
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub service: MarketService,
}

pub fn harness(providers: Vec<Arc<dyn HistoryProvider>>) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let router = AcquisitionRouter::new(
        store.clone(),
        providers,
        Arc::new(FixedClock::new(today())),
    );
    let service = MarketService::new(
        router,
        store.clone(),
        FreshnessPolicy::default(),
        AnalyticsSettings::default(),
    );
    Harness { store, service }
}

/// Harness with a store pre-seeded with `bars` and no providers.
pub fn seeded_harness(bars: &[Bar]) -> Harness {
    let h = harness(Vec::new());
    if let Some(first) = bars.first() {
        h.store.upsert_bars(&first.symbol, bars).unwrap();
    }
    h
}

/// Bars whose intraday returns (close vs open, percent) are `returns`, on
/// consecutive days ending at `end`.
pub fn bars_from_returns(symbol: &str, end: &str, returns: &[f64]) -> Vec<Bar> {
    let end = parse_date(end);
    let n = returns.len() as i64;
    returns
        .iter()
        .enumerate()
        .map(|(i, &r)| {
            let open = 100.0;
            let close = open * (1.0 + r / 100.0);
            Bar {
                symbol: symbol.to_string(),
                date: end - Duration::days(n - 1 - i as i64),
                open,
                high: open.max(close) + 0.5,
                low: open.min(close) - 0.5,
                close,
                volume: 2_000,
            }
        })
        .collect()
}
