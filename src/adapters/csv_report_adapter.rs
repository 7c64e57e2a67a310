//! CSV report writer.
//!
//! Writes `candidates.csv`, `trades.csv` and `summary.csv` into an output
//! directory, or every table to stdout one after another.

use crate::domain::error::ScreenerError;
use crate::domain::screener::Candidate;
use crate::domain::summary::{SummaryParams, SummaryRow};
use crate::domain::trade::Trade;
use crate::ports::report_port::ReportPort;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub enum ReportTarget {
    Directory(PathBuf),
    Stdout,
}

pub struct CsvReportAdapter {
    target: ReportTarget,
}

impl CsvReportAdapter {
    pub fn new(target: ReportTarget) -> Self {
        Self { target }
    }

    pub fn to_directory(dir: PathBuf) -> Result<Self, ScreenerError> {
        fs::create_dir_all(&dir)?;
        Ok(Self::new(ReportTarget::Directory(dir)))
    }

    fn writer(&self, name: &str) -> Result<csv::Writer<Box<dyn Write>>, ScreenerError> {
        let sink: Box<dyn Write> = match &self.target {
            ReportTarget::Directory(dir) => Box::new(fs::File::create(dir.join(name))?),
            ReportTarget::Stdout => Box::new(io::stdout()),
        };
        Ok(csv::Writer::from_writer(sink))
    }
}

impl ReportPort for CsvReportAdapter {
    fn write_candidates(&self, candidates: &[Candidate]) -> Result<(), ScreenerError> {
        let mut wtr = self.writer("candidates.csv")?;
        wtr.write_record(["date", "ticker", "bounce_score"])?;
        for c in candidates {
            wtr.write_record([
                c.date.format("%Y-%m-%d").to_string(),
                c.ticker.clone(),
                c.bounce_score.to_string(),
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_trades(&self, trades: &[Trade], overlay: &SummaryParams) -> Result<(), ScreenerError> {
        let mut wtr = self.writer("trades.csv")?;
        wtr.write_record([
            "ticker",
            "entry_time",
            "entry_price",
            "entry_method",
            "exit_time",
            "exit_price",
            "exit_method",
            "net",
            "return_pct",
            "option_net",
        ])?;
        for t in trades {
            wtr.write_record([
                t.ticker.clone(),
                t.entry_time.format(TIME_FORMAT).to_string(),
                format!("{:.2}", t.entry_price),
                t.entry_method.to_string(),
                t.exit_time.format(TIME_FORMAT).to_string(),
                format!("{:.2}", t.exit_price),
                t.exit_method.to_string(),
                format!("{:.2}", t.net),
                format!("{:.6}", t.return_pct),
                format!("{:.2}", t.option_net(overlay.option_notional, overlay.option_leverage)),
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_summary(&self, rows: &[SummaryRow]) -> Result<(), ScreenerError> {
        let mut wtr = self.writer("summary.csv")?;
        wtr.write_record(["metric", "value", "note"])?;
        for row in rows {
            wtr.write_record([&row.metric, &row.value, &row.note])?;
        }
        wtr.flush()?;
        Ok(())
    }
}
