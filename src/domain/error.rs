//! Domain error types.

use std::fmt;

/// Failure of a single external history provider.
///
/// These never reach the caller directly: the acquisition cascade records
/// them and moves on to the next source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("unknown symbol {0}")]
    UnknownSymbol(String),
}

/// One source that was tried while resolving a symbol and did not produce data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFailure {
    pub source: String,
    pub reason: String,
}

impl SourceFailure {
    pub fn new(source: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.reason)
    }
}

fn join_reasons(reasons: &[SourceFailure]) -> String {
    if reasons.is_empty() {
        return "no sources attempted".to_string();
    }
    reasons
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Top-level error type for tickerlens.
#[derive(Debug, thiserror::Error)]
pub enum TickerError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no data found for {symbol} ({})", join_reasons(.reasons))]
    NotFound {
        symbol: String,
        reasons: Vec<SourceFailure>,
    },

    #[error("insufficient overlap between {symbol1} and {symbol2}: {overlap} shared dates, need 2")]
    InsufficientOverlap {
        symbol1: String,
        symbol2: String,
        overlap: usize,
    },

    #[error("invalid range: {reason}")]
    InvalidRange { reason: String },

    #[error("invalid symbol {symbol:?}: {reason}")]
    InvalidSymbol { symbol: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TickerError {
    pub fn not_found(symbol: impl Into<String>, reasons: Vec<SourceFailure>) -> Self {
        TickerError::NotFound {
            symbol: symbol.into(),
            reasons,
        }
    }
}

impl From<&TickerError> for std::process::ExitCode {
    fn from(err: &TickerError) -> Self {
        let code: u8 = match err {
            TickerError::Io(_) => 1,
            TickerError::ConfigParse { .. }
            | TickerError::ConfigMissing { .. }
            | TickerError::ConfigInvalid { .. } => 2,
            TickerError::Database { .. } | TickerError::DatabaseQuery { .. } => 3,
            TickerError::InvalidRange { .. } | TickerError::InvalidSymbol { .. } => 4,
            TickerError::NotFound { .. } | TickerError::InsufficientOverlap { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
