//! Alpha Vantage `TIME_SERIES_DAILY` provider.
//!
//! The API answers HTTP 200 for most failures and signals them in the body:
//! `Error Message` for bad calls (including unknown symbols), `Note` or
//! `Information` when the request quota is exhausted.

use reqwest::blocking::Client;
use serde_json::{Map, Value};

use crate::adapters::http::{build_client, get_json};
use crate::domain::error::{ProviderError, TickerError};
use crate::domain::ohlcv::{RawRow, RawValue};
use crate::domain::settings::AlphaVantageSettings;
use crate::ports::provider_port::HistoryProvider;

pub struct AlphaVantageProvider {
    client: Client,
    api_key: String,
    base_url: String,
    outputsize: String,
}

impl AlphaVantageProvider {
    /// None when no API key is configured.
    pub fn from_settings(
        settings: &AlphaVantageSettings,
        timeout_secs: u64,
    ) -> Result<Option<Self>, TickerError> {
        let Some(api_key) = settings.api_key.clone() else {
            return Ok(None);
        };
        Ok(Some(Self {
            client: build_client(timeout_secs)?,
            api_key,
            base_url: settings.base_url.clone(),
            outputsize: settings.outputsize.clone(),
        }))
    }
}

impl HistoryProvider for AlphaVantageProvider {
    fn name(&self) -> &str {
        "alphavantage"
    }

    fn fetch_history(&self, symbol: &str) -> Result<Vec<RawRow>, ProviderError> {
        let body: Value = get_json(
            &self.client,
            symbol,
            &self.base_url,
            &[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", symbol),
                ("outputsize", self.outputsize.as_str()),
                ("apikey", self.api_key.as_str()),
            ],
        )?;
        parse_daily(symbol, &body)
    }
}

/// Turn a `TIME_SERIES_DAILY` body into raw rows, newest first as delivered.
pub fn parse_daily(symbol: &str, body: &Value) -> Result<Vec<RawRow>, ProviderError> {
    let obj = body
        .as_object()
        .ok_or_else(|| ProviderError::Malformed("response is not a JSON object".into()))?;

    if let Some(msg) = obj.get("Error Message").and_then(Value::as_str) {
        return Err(if msg.contains("Invalid API call") {
            ProviderError::UnknownSymbol(symbol.to_string())
        } else {
            ProviderError::Malformed(msg.to_string())
        });
    }
    for key in ["Note", "Information"] {
        if let Some(msg) = obj.get(key).and_then(Value::as_str) {
            return Err(ProviderError::RateLimited(msg.to_string()));
        }
    }

    let series = obj
        .iter()
        .find(|(k, _)| k.starts_with("Time Series"))
        .and_then(|(_, v)| v.as_object())
        .ok_or_else(|| ProviderError::Malformed("no time series in response".into()))?;

    Ok(series
        .iter()
        .map(|(date, fields)| {
            let fields = fields.as_object();
            RawRow {
                date: Some(RawValue::Text(date.clone())),
                open: field(fields, "1. open"),
                high: field(fields, "2. high"),
                low: field(fields, "3. low"),
                close: field(fields, "4. close"),
                volume: field(fields, "5. volume"),
            }
        })
        .collect())
}

fn field(fields: Option<&Map<String, Value>>, key: &str) -> Option<RawValue> {
    match fields?.get(key)? {
        Value::String(s) => Some(RawValue::Text(s.clone())),
        Value::Number(n) => n.as_f64().map(RawValue::Number),
        _ => None,
    }
}
