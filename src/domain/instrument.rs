//! Instrument reference data and symbol validation.

use crate::domain::error::TickerError;
use serde::{Deserialize, Serialize};

pub const MAX_SYMBOL_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    pub name: String,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub market_cap: Option<f64>,
}

/// Trim and upper-case a user-supplied symbol, rejecting anything that
/// could not be a ticker (`A-Z 0-9 . - ^ &`, at most 20 characters).
pub fn normalize_symbol(input: &str) -> Result<String, TickerError> {
    let symbol = input.trim().to_uppercase();

    if symbol.is_empty() {
        return Err(TickerError::InvalidSymbol {
            symbol,
            reason: "symbol is empty".into(),
        });
    }
    if symbol.len() > MAX_SYMBOL_LEN {
        return Err(TickerError::InvalidSymbol {
            symbol,
            reason: format!("longer than {MAX_SYMBOL_LEN} characters"),
        });
    }
    if let Some(bad) = symbol
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '&')))
    {
        return Err(TickerError::InvalidSymbol {
            symbol: symbol.clone(),
            reason: format!("unexpected character {bad:?}"),
        });
    }

    Ok(symbol)
}
