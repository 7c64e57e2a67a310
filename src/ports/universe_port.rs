//! Ticker universe provider port.

use crate::domain::error::ScreenerError;

pub trait UniversePort {
    /// Raw provider symbols; normalization happens in the domain.
    fn list_tickers(&self) -> Result<Vec<String>, ScreenerError>;
}
