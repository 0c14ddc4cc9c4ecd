//! Instrument reference data port trait.

use crate::domain::error::TickerError;
use crate::domain::instrument::Instrument;

pub trait CatalogPort: Send + Sync {
    /// All instruments ordered by symbol, optionally restricted to one sector.
    fn list_instruments(&self, sector: Option<&str>) -> Result<Vec<Instrument>, TickerError>;

    fn get_instrument(&self, symbol: &str) -> Result<Option<Instrument>, TickerError>;

    fn upsert_instrument(&self, instrument: &Instrument) -> Result<(), TickerError>;
}
