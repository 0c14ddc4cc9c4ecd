//! CSV file history provider.
//!
//! One file per symbol, `<base>/<SYMBOL>.csv`, with a header naming the
//! columns `date, open, high, low, close, volume` in any order. Blank cells
//! are passed through as missing so the cleaning pipeline can fill them.

use crate::domain::error::ProviderError;
use crate::domain::ohlcv::{RawRow, RawValue};
use crate::ports::provider_port::HistoryProvider;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub struct CsvProvider {
    base_path: PathBuf,
}

impl CsvProvider {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}.csv"))
    }

    /// Symbols with a file in the base directory, sorted.
    pub fn list_symbols(&self) -> Result<Vec<String>, ProviderError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            ProviderError::Unavailable(format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ))
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                ProviderError::Unavailable(format!("directory entry error: {e}"))
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv")) {
                if let Some(stem) = path.file_stem() {
                    symbols.push(stem.to_string_lossy().to_uppercase());
                }
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}

impl HistoryProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch_history(&self, symbol: &str) -> Result<Vec<RawRow>, ProviderError> {
        let path = self.csv_path(symbol);
        read_rows(&path).map_err(|e| match e {
            ProviderError::Unavailable(_) if !path.exists() => {
                ProviderError::UnknownSymbol(symbol.to_string())
            }
            other => other,
        })
    }
}

struct Columns {
    date: usize,
    open: Option<usize>,
    high: Option<usize>,
    low: Option<usize>,
    close: Option<usize>,
    volume: Option<usize>,
}

impl Columns {
    fn from_header(header: &csv::StringRecord) -> Result<Self, ProviderError> {
        let find = |names: &[&str]| {
            header
                .iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        };

        Ok(Columns {
            date: find(&["date", "timestamp", "datetime"])
                .ok_or_else(|| ProviderError::Malformed("missing date column".into()))?,
            open: find(&["open"]),
            high: find(&["high"]),
            low: find(&["low"]),
            close: find(&["close", "adj close"]),
            volume: find(&["volume"]),
        })
    }
}

fn cell(record: &csv::StringRecord, idx: Option<usize>) -> Option<RawValue> {
    let text = record.get(idx?)?.trim();
    if text.is_empty() {
        None
    } else {
        Some(RawValue::Text(text.to_string()))
    }
}

/// Read every row of a CSV file as raw, uncoerced values.
pub fn read_rows(path: &Path) -> Result<Vec<RawRow>, ProviderError> {
    let content = fs::read_to_string(path).map_err(|e: io::Error| {
        ProviderError::Unavailable(format!("failed to read {}: {}", path.display(), e))
    })?;

    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());

    let header = rdr
        .headers()
        .map_err(|e| ProviderError::Malformed(format!("CSV header error: {e}")))?
        .clone();
    let cols = Columns::from_header(&header)?;

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record =
            result.map_err(|e| ProviderError::Malformed(format!("CSV parse error: {e}")))?;

        rows.push(RawRow {
            date: cell(&record, Some(cols.date)),
            open: cell(&record, cols.open),
            high: cell(&record, cols.high),
            low: cell(&record, cols.low),
            close: cell(&record, cols.close),
            volume: cell(&record, cols.volume),
        });
    }

    Ok(rows)
}
