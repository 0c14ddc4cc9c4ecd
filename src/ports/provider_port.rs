//! External history provider port trait.

use crate::domain::error::ProviderError;
use crate::domain::ohlcv::RawRow;

/// A source of raw daily history for a symbol.
///
/// Implementations make one bounded attempt per call and report failure as
/// a typed [`ProviderError`]; they never retry.
pub trait HistoryProvider: Send + Sync {
    /// Short identifier used in logs and failure reasons.
    fn name(&self) -> &str;

    fn fetch_history(&self, symbol: &str) -> Result<Vec<RawRow>, ProviderError>;
}
