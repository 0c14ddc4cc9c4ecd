//! Yahoo Finance v8 chart API provider.
//!
//! Yahoo has no official API; the chart endpoint returns parallel arrays
//! of timestamps and nullable OHLCV values.

use reqwest::blocking::Client;
use serde::Deserialize;

use crate::adapters::http::{build_client, get_json};
use crate::domain::error::{ProviderError, TickerError};
use crate::domain::ohlcv::{RawRow, RawValue};
use crate::domain::settings::YahooSettings;
use crate::ports::provider_port::HistoryProvider;

#[derive(Debug, Deserialize)]
pub struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

/// Exchange metadata; only the UTC offset of the exchange's local time is used.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChartMeta {
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
}

pub struct YahooProvider {
    client: Client,
    base_url: String,
    symbol_suffix: Option<String>,
    range: String,
}

impl YahooProvider {
    pub fn from_settings(settings: &YahooSettings, timeout_secs: u64) -> Result<Self, TickerError> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            symbol_suffix: settings.symbol_suffix.clone(),
            range: settings.range.clone(),
        })
    }

    /// Apply the configured exchange suffix unless the symbol already has
    /// one or is an index (`^NSEI`).
    pub fn remote_symbol(&self, symbol: &str) -> String {
        match &self.symbol_suffix {
            Some(suffix) if !symbol.contains('.') && !symbol.starts_with('^') => {
                format!("{symbol}{suffix}")
            }
            _ => symbol.to_string(),
        }
    }
}

impl HistoryProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo"
    }

    fn fetch_history(&self, symbol: &str) -> Result<Vec<RawRow>, ProviderError> {
        let remote = self.remote_symbol(symbol);
        let url = format!("{}/{}", self.base_url, remote);
        let chart: ChartResponse = get_json(
            &self.client,
            symbol,
            &url,
            &[("range", self.range.as_str()), ("interval", "1d")],
        )?;
        parse_chart(symbol, chart)
    }
}

/// Flatten a chart response into raw rows keyed by epoch-second timestamps.
pub fn parse_chart(symbol: &str, resp: ChartResponse) -> Result<Vec<RawRow>, ProviderError> {
    let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
        Some(err) if err.code == "Not Found" => ProviderError::UnknownSymbol(symbol.to_string()),
        Some(err) => ProviderError::Malformed(format!("{}: {}", err.code, err.description)),
        None => ProviderError::Malformed("empty result with no error".into()),
    })?;

    let data = result
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Malformed("result array is empty".into()))?;

    // a listed symbol with no trading history has no timestamp array
    let Some(timestamps) = data.timestamp else {
        return Ok(Vec::new());
    };

    // timestamps are UTC instants; shift to exchange time before taking the date
    let offset = data.meta.map_or(0, |m| m.gmtoffset);
    let quote = data.indicators.quote.into_iter().next().unwrap_or_default();
    let at = |series: &[Option<f64>], i: usize| series.get(i).copied().flatten().map(RawValue::Number);

    let rows = timestamps
        .iter()
        .enumerate()
        .map(|(i, &ts)| RawRow {
            date: Some(RawValue::Number((ts + offset) as f64)),
            open: at(&quote.open, i),
            high: at(&quote.high, i),
            low: at(&quote.low, i),
            close: at(&quote.close, i),
            volume: at(&quote.volume, i),
        })
        // holidays come back with every field null
        .filter(|r| r.open.is_some() || r.high.is_some() || r.low.is_some() || r.close.is_some())
        .collect();

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cleaning::clean;

    fn chart(json: &str) -> ChartResponse {
        serde_json::from_str(json).unwrap()
    }

    fn provider(suffix: Option<&str>) -> YahooProvider {
        YahooProvider::from_settings(
            &YahooSettings {
                base_url: "http://localhost/v8/finance/chart/".into(),
                symbol_suffix: suffix.map(str::to_string),
                range: "1y".into(),
            },
            5,
        )
        .unwrap()
    }

    #[test]
    fn parses_chart_with_nulls() {
        // 2024-01-02, 2024-01-03, 2024-01-04 at 14:30 UTC
        let resp = chart(
            r#"{"chart":{"result":[{
                "timestamp":[1704205800,1704292200,1704378600],
                "indicators":{"quote":[{
                    "open":[100.0,null,102.0],
                    "high":[101.0,null,103.0],
                    "low":[99.0,null,101.0],
                    "close":[100.5,null,102.5],
                    "volume":[1000,null,1200]
                }]}
            }],"error":null}}"#,
        );
        let rows = parse_chart("AAPL", resp).unwrap();
        assert_eq!(rows.len(), 2);

        let bars = clean("AAPL", rows);
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date.to_string(), "2024-01-02");
        assert_eq!(bars[1].date.to_string(), "2024-01-04");
        assert_eq!(bars[1].volume, 1200);
    }

    #[test]
    fn exchange_offset_sets_trading_date() {
        // Sydney opens at 10:00 AEDT, which is 23:00 UTC the previous day
        let resp = chart(
            r#"{"chart":{"result":[{
                "meta":{"symbol":"BHP.AX","gmtoffset":39600,"exchangeTimezoneName":"Australia/Sydney"},
                "timestamp":[1704322800,1704409200],
                "indicators":{"quote":[{
                    "open":[45.0,45.5],"high":[46.0,46.5],"low":[44.5,45.0],
                    "close":[45.8,46.1],"volume":[5000,5200]
                }]}
            }],"error":null}}"#,
        );
        let bars = clean("BHP", parse_chart("BHP", resp).unwrap());
        assert_eq!(bars[0].date.to_string(), "2024-01-04");
        assert_eq!(bars[1].date.to_string(), "2024-01-05");
    }

    #[test]
    fn partial_nulls_are_kept_for_filling() {
        let resp = chart(
            r#"{"chart":{"result":[{
                "timestamp":[1704205800,1704292200],
                "indicators":{"quote":[{
                    "open":[100.0,101.0],"high":[101.0,102.0],"low":[99.0,100.0],
                    "close":[100.5,null],"volume":[1000,1100]
                }]}
            }],"error":null}}"#,
        );
        let bars = clean("AAPL", parse_chart("AAPL", resp).unwrap());
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].close, 100.5);
    }

    #[test]
    fn not_found_error() {
        let resp = chart(
            r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#,
        );
        assert_eq!(
            parse_chart("ZZZZ", resp).unwrap_err(),
            ProviderError::UnknownSymbol("ZZZZ".into())
        );
    }

    #[test]
    fn other_error_is_malformed() {
        let resp = chart(r#"{"chart":{"result":null,"error":{"code":"Bad Request","description":"Invalid input"}}}"#);
        assert!(matches!(parse_chart("X", resp), Err(ProviderError::Malformed(_))));
    }

    #[test]
    fn no_timestamps_is_empty() {
        let resp = chart(r#"{"chart":{"result":[{"indicators":{"quote":[{}]}}],"error":null}}"#);
        assert!(parse_chart("X", resp).unwrap().is_empty());
    }

    #[test]
    fn suffix_rules() {
        let p = provider(Some(".NS"));
        assert_eq!(p.remote_symbol("TCS"), "TCS.NS");
        assert_eq!(p.remote_symbol("TCS.BO"), "TCS.BO");
        assert_eq!(p.remote_symbol("^NSEI"), "^NSEI");
        assert_eq!(provider(None).remote_symbol("AAPL"), "AAPL");
        assert_eq!(p.base_url, "http://localhost/v8/finance/chart");
    }
}
