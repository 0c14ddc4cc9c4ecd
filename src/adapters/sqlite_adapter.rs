//! SQLite bar store and instrument catalog.

use crate::domain::error::TickerError;
use crate::domain::instrument::Instrument;
use crate::domain::ohlcv::Bar;
use crate::ports::catalog_port::CatalogPort;
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::BarStore;
use chrono::NaiveDate;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, TransactionBehavior};

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn db_error(e: r2d2::Error) -> TickerError {
    TickerError::Database {
        reason: e.to_string(),
    }
}

fn query_error(e: rusqlite::Error) -> TickerError {
    TickerError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn parse_date(text: &str) -> Result<NaiveDate, TickerError> {
    NaiveDate::parse_from_str(text, DATE_FORMAT).map_err(|e: chrono::ParseError| {
        TickerError::Database {
            reason: format!("bad stored date {text:?}: {e}"),
        }
    })
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TickerError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| TickerError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let configured = config.get_int("sqlite", "pool_size", 4);
        let pool_size = u32::try_from(configured)
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| TickerError::ConfigInvalid {
                section: "sqlite".into(),
                key: "pool_size".into(),
                reason: format!("must be between 1 and {}, got {configured}", u32::MAX),
            })?;

        let manager = SqliteConnectionManager::file(&db_path)
            .with_init(|c| c.execute_batch("PRAGMA busy_timeout = 5000;"));
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(db_error)?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, TickerError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(db_error)?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, TickerError> {
        self.pool.get().map_err(db_error)
    }

    pub fn initialize_schema(&self) -> Result<(), TickerError> {
        let conn = self.conn()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS bars (
                symbol TEXT NOT NULL,
                date TEXT NOT NULL,
                open REAL NOT NULL,
                high REAL NOT NULL,
                low REAL NOT NULL,
                close REAL NOT NULL,
                volume INTEGER NOT NULL,
                PRIMARY KEY (symbol, date)
            );
            CREATE INDEX IF NOT EXISTS idx_bars_date ON bars(date);
            CREATE TABLE IF NOT EXISTS companies (
                symbol TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                sector TEXT,
                industry TEXT,
                market_cap REAL
            );
            CREATE INDEX IF NOT EXISTS idx_companies_sector ON companies(sector);",
        )
        .map_err(query_error)?;

        Ok(())
    }
}

impl BarStore for SqliteAdapter {
    fn get_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, TickerError> {
        let conn = self.conn()?;

        let start_str = start.format(DATE_FORMAT).to_string();
        let end_str = end.format(DATE_FORMAT).to_string();

        let mut stmt = conn
            .prepare(
                "SELECT date, open, high, low, close, volume
                 FROM bars
                 WHERE symbol = ?1 AND date >= ?2 AND date <= ?3
                 ORDER BY date ASC",
            )
            .map_err(query_error)?;

        let rows = stmt
            .query_map(params![symbol, start_str, end_str], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, f64>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, i64>(5)?,
                ))
            })
            .map_err(query_error)?;

        let mut bars = Vec::new();
        for row in rows {
            let (date, open, high, low, close, volume) = row.map_err(query_error)?;
            bars.push(Bar {
                symbol: symbol.to_string(),
                date: parse_date(&date)?,
                open,
                high,
                low,
                close,
                volume,
            });
        }

        Ok(bars)
    }

    fn upsert_bars(&self, symbol: &str, bars: &[Bar]) -> Result<usize, TickerError> {
        let mut conn = self.conn()?;

        // IMMEDIATE takes the write lock up front so concurrent refreshes
        // of the same symbol serialize instead of interleaving
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(query_error)?;

        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO bars (symbol, date, open, high, low, close, volume)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                     ON CONFLICT(symbol, date) DO UPDATE SET
                        open = excluded.open,
                        high = excluded.high,
                        low = excluded.low,
                        close = excluded.close,
                        volume = excluded.volume",
                )
                .map_err(query_error)?;

            for bar in bars {
                stmt.execute(params![
                    symbol,
                    bar.date.format(DATE_FORMAT).to_string(),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume
                ])
                .map_err(query_error)?;
            }
        }

        tx.commit().map_err(query_error)?;

        Ok(bars.len())
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, TickerError> {
        let conn = self.conn()?;

        let result: (Option<String>, Option<String>, i64) = conn
            .query_row(
                "SELECT MIN(date), MAX(date), COUNT(*) FROM bars WHERE symbol = ?1",
                params![symbol],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(query_error)?;

        match result {
            (Some(min_str), Some(max_str), count) if count > 0 => Ok(Some((
                parse_date(&min_str)?,
                parse_date(&max_str)?,
                count as usize,
            ))),
            _ => Ok(None),
        }
    }

    fn latest_bar_date(&self, symbol: &str) -> Result<Option<NaiveDate>, TickerError> {
        let conn = self.conn()?;

        let latest: Option<String> = conn
            .query_row(
                "SELECT MAX(date) FROM bars WHERE symbol = ?1",
                params![symbol],
                |row| row.get(0),
            )
            .map_err(query_error)?;

        latest.as_deref().map(parse_date).transpose()
    }

    fn list_symbols(&self) -> Result<Vec<String>, TickerError> {
        let conn = self.conn()?;

        let mut stmt = conn
            .prepare("SELECT DISTINCT symbol FROM bars ORDER BY symbol")
            .map_err(query_error)?;

        let rows = stmt
            .query_map([], |row| row.get(0))
            .map_err(query_error)?;

        let mut symbols = Vec::new();
        for row in rows {
            symbols.push(row.map_err(query_error)?);
        }

        Ok(symbols)
    }
}

fn instrument_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Instrument> {
    Ok(Instrument {
        symbol: row.get(0)?,
        name: row.get(1)?,
        sector: row.get(2)?,
        industry: row.get(3)?,
        market_cap: row.get(4)?,
    })
}

impl CatalogPort for SqliteAdapter {
    fn list_instruments(&self, sector: Option<&str>) -> Result<Vec<Instrument>, TickerError> {
        let conn = self.conn()?;

        let mut stmt = conn
            .prepare(
                "SELECT symbol, name, sector, industry, market_cap
                 FROM companies
                 WHERE ?1 IS NULL OR sector = ?1
                 ORDER BY symbol",
            )
            .map_err(query_error)?;

        let rows = stmt
            .query_map(params![sector], instrument_from_row)
            .map_err(query_error)?;

        let mut instruments = Vec::new();
        for row in rows {
            instruments.push(row.map_err(query_error)?);
        }

        Ok(instruments)
    }

    fn get_instrument(&self, symbol: &str) -> Result<Option<Instrument>, TickerError> {
        let conn = self.conn()?;

        let mut stmt = conn
            .prepare(
                "SELECT symbol, name, sector, industry, market_cap
                 FROM companies WHERE symbol = ?1",
            )
            .map_err(query_error)?;

        let mut rows = stmt
            .query_map(params![symbol], instrument_from_row)
            .map_err(query_error)?;

        rows.next().transpose().map_err(query_error)
    }

    fn upsert_instrument(&self, instrument: &Instrument) -> Result<(), TickerError> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO companies (symbol, name, sector, industry, market_cap)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(symbol) DO UPDATE SET
                name = excluded.name,
                sector = excluded.sector,
                industry = excluded.industry,
                market_cap = excluded.market_cap",
            params![
                instrument.symbol,
                instrument.name,
                instrument.sector,
                instrument.industry,
                instrument.market_cap
            ],
        )
        .map_err(query_error)?;

        Ok(())
    }
}
