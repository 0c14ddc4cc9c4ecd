//! Blocking HTTP plumbing shared by the web-backed providers.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::domain::error::{ProviderError, TickerError};

const USER_AGENT: &str = concat!("tickerlens/", env!("CARGO_PKG_VERSION"));

/// A client with a bounded per-request timeout. No retries are layered on
/// top; the provider cascade is the only resilience mechanism.
pub fn build_client(timeout_secs: u64) -> Result<Client, TickerError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| TickerError::Io(std::io::Error::other(e)))
}

/// GET `url` and decode the JSON body, classifying failures.
pub fn get_json<T: DeserializeOwned>(
    client: &Client,
    symbol: &str,
    url: &str,
    query: &[(&str, &str)],
) -> Result<T, ProviderError> {
    let resp = client
        .get(url)
        .query(query)
        .send()
        .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

    let status = resp.status();
    debug!(url, %status, "provider response");
    check_status(symbol, status)?;

    resp.json::<T>()
        .map_err(|e| ProviderError::Malformed(format!("invalid JSON body: {e}")))
}

pub fn check_status(symbol: &str, status: StatusCode) -> Result<(), ProviderError> {
    if status == StatusCode::NOT_FOUND {
        return Err(ProviderError::UnknownSymbol(symbol.to_string()));
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(ProviderError::RateLimited(format!("HTTP {status}")));
    }
    if !status.is_success() {
        return Err(ProviderError::Unavailable(format!("HTTP {status}")));
    }
    Ok(())
}
