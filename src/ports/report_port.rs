//! Result table output port.

use crate::domain::error::ScreenerError;
use crate::domain::screener::Candidate;
use crate::domain::summary::{SummaryParams, SummaryRow};
use crate::domain::trade::Trade;

pub trait ReportPort {
    fn write_candidates(&self, candidates: &[Candidate]) -> Result<(), ScreenerError>;

    /// `overlay` supplies notional and leverage for the per-trade option column.
    fn write_trades(&self, trades: &[Trade], overlay: &SummaryParams) -> Result<(), ScreenerError>;

    fn write_summary(&self, rows: &[SummaryRow]) -> Result<(), ScreenerError>;
}
