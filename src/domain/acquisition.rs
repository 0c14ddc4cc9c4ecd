//! Acquisition router: persisted store first, then each external provider
//! in priority order, falling back to stale persisted bars when every
//! provider fails.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::cleaning::clean;
use crate::domain::error::{SourceFailure, TickerError};
use crate::domain::ohlcv::{slice_range, Bar, RawRow};
use crate::ports::clock_port::Clock;
use crate::ports::provider_port::HistoryProvider;
use crate::ports::store_port::BarStore;

pub const STORE_SOURCE: &str = "store";

/// When persisted bars may be served without asking a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    /// Persisted data is fresh while `today - latest <= max_staleness_days`.
    pub max_staleness_days: i64,
    /// The earliest persisted bar may start this many days after the
    /// requested start and still count as covering it (weekends, holidays).
    pub coverage_slack_days: i64,
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self {
            max_staleness_days: 1,
            coverage_slack_days: 5,
        }
    }
}

impl FreshnessPolicy {
    pub fn is_fresh(&self, latest: NaiveDate, today: NaiveDate) -> bool {
        (today - latest).num_days() <= self.max_staleness_days
    }

    pub fn covers(&self, earliest: NaiveDate, start: NaiveDate) -> bool {
        (earliest - start).num_days() <= self.coverage_slack_days
    }
}

/// Where a resolved sequence came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum BarSource {
    Store,
    Provider(String),
    /// Persisted bars served after every provider failed.
    StaleStore,
}

impl fmt::Display for BarSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BarSource::Store => write!(f, "store"),
            BarSource::Provider(name) => write!(f, "{name}"),
            BarSource::StaleStore => write!(f, "store (stale)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub bars: Vec<Bar>,
    pub source: BarSource,
    /// Sources that were tried and failed before `source` produced data.
    pub failures: Vec<SourceFailure>,
}

pub struct AcquisitionRouter {
    store: Arc<dyn BarStore>,
    providers: Vec<Arc<dyn HistoryProvider>>,
    clock: Arc<dyn Clock>,
}

impl AcquisitionRouter {
    pub fn new(
        store: Arc<dyn BarStore>,
        providers: Vec<Arc<dyn HistoryProvider>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            providers,
            clock,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn store(&self) -> &Arc<dyn BarStore> {
        &self.store
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Bars for `symbol` in `[start, end]`, ascending by date and never empty.
    pub fn resolve(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        policy: &FreshnessPolicy,
    ) -> Result<Resolution, TickerError> {
        let mut failures = Vec::new();

        let cached = match self.store.get_bars(symbol, start, end) {
            Ok(bars) => bars,
            Err(e) => {
                warn!(symbol, error = %e, "store read failed");
                failures.push(SourceFailure::new(STORE_SOURCE, e.to_string()));
                Vec::new()
            }
        };

        if let Some(first) = cached.first() {
            let latest = self.store.latest_bar_date(symbol).unwrap_or_else(|e| {
                warn!(symbol, error = %e, "could not read latest persisted date");
                None
            });
            let fresh = latest.is_some_and(|d| policy.is_fresh(d, self.today()));
            if fresh && policy.covers(first.date, start) {
                debug!(symbol, bars = cached.len(), "serving persisted bars");
                return Ok(Resolution {
                    bars: cached,
                    source: BarSource::Store,
                    failures,
                });
            }
            debug!(symbol, ?latest, "persisted bars stale or incomplete");
        }

        for provider in &self.providers {
            let name = provider.name();
            let (bars, persisted) = match self.fetch_one(provider.as_ref(), symbol) {
                Ok(fetched) => fetched,
                Err(failure) => {
                    failures.push(failure);
                    continue;
                }
            };

            let sliced = slice_range(&bars, start, end);
            if sliced.is_empty() {
                warn!(symbol, source = name, %start, %end, "provider has no bars in requested range");
                failures.push(SourceFailure::new(name, "no bars in requested range"));
                continue;
            }

            // re-read so persisted bars the provider no longer carries are kept
            let in_range = if persisted {
                self.store.get_bars(symbol, start, end).unwrap_or_else(|e| {
                    warn!(symbol, error = %e, "store re-read failed, serving fetched slice");
                    sliced
                })
            } else {
                sliced
            };
            return Ok(Resolution {
                bars: in_range,
                source: BarSource::Provider(name.to_string()),
                failures,
            });
        }

        if cached.is_empty() {
            return Err(TickerError::not_found(symbol, failures));
        }

        warn!(
            symbol,
            bars = cached.len(),
            "all providers failed, serving stale persisted bars"
        );
        Ok(Resolution {
            bars: cached,
            source: BarSource::StaleStore,
            failures,
        })
    }

    /// Fetch full history from the providers, skipping the freshness check.
    pub fn refresh(&self, symbol: &str) -> Result<Resolution, TickerError> {
        let mut failures = Vec::new();
        for provider in &self.providers {
            match self.fetch_one(provider.as_ref(), symbol) {
                Ok((bars, _)) => {
                    return Ok(Resolution {
                        bars,
                        source: BarSource::Provider(provider.name().to_string()),
                        failures,
                    });
                }
                Err(failure) => failures.push(failure),
            }
        }
        Err(TickerError::not_found(symbol, failures))
    }

    /// Clean rows obtained outside the cascade and persist them.
    pub fn ingest(&self, symbol: &str, rows: Vec<RawRow>) -> Result<Vec<Bar>, TickerError> {
        let bars = clean(symbol, rows);
        if bars.is_empty() {
            return Err(TickerError::not_found(
                symbol,
                vec![SourceFailure::new("import", "no usable rows after cleaning")],
            ));
        }
        let written = self.store.upsert_bars(symbol, &bars)?;
        info!(symbol, rows = written, "imported bars");
        Ok(bars)
    }

    /// Fetch, clean and persist one provider's history. Empty cleaned output
    /// is a failure. The flag reports whether the upsert succeeded.
    fn fetch_one(
        &self,
        provider: &dyn HistoryProvider,
        symbol: &str,
    ) -> Result<(Vec<Bar>, bool), SourceFailure> {
        let name = provider.name();
        info!(symbol, source = name, "fetching history");

        let rows = provider.fetch_history(symbol).map_err(|e| {
            warn!(symbol, source = name, error = %e, "provider failed");
            SourceFailure::new(name, e.to_string())
        })?;

        let bars = clean(symbol, rows);
        if bars.is_empty() {
            warn!(symbol, source = name, "provider returned no usable rows");
            return Err(SourceFailure::new(name, "no usable rows after cleaning"));
        }

        let persisted = match self.store.upsert_bars(symbol, &bars) {
            Ok(written) => {
                info!(symbol, source = name, rows = written, "stored fetched bars");
                true
            }
            Err(e) => {
                warn!(symbol, source = name, error = %e, "upsert failed, serving fetched bars anyway");
                false
            }
        };
        Ok((bars, persisted))
    }
}
