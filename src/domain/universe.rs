//! Ticker universe normalization and the per-run fetch report.

use crate::domain::bar_series::BarSeries;
use crate::domain::error::ScreenerError;
use crate::ports::universe_port::UniversePort;
use std::collections::{BTreeMap, HashSet};

pub const MAX_TICKER_LEN: usize = 6;

/// Upper-case, trim, map `-` and `/` to `.`, then require
/// `[A-Z0-9.-]{1,6}`.
pub fn normalize_ticker(raw: &str) -> Option<String> {
    let ticker: String = raw
        .trim()
        .chars()
        .map(|c| match c {
            '-' | '/' => '.',
            other => other.to_ascii_uppercase(),
        })
        .collect();
    let valid = !ticker.is_empty()
        && ticker.len() <= MAX_TICKER_LEN
        && ticker
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '.' || c == '-');
    valid.then_some(ticker)
}

/// Normalized, de-duplicated tickers in first-seen order. Invalid symbols
/// are dropped with a warning.
pub fn normalize_universe<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut tickers = Vec::new();
    for symbol in raw {
        let symbol = symbol.as_ref();
        match normalize_ticker(symbol) {
            Some(t) => {
                if seen.insert(t.clone()) {
                    tickers.push(t);
                }
            }
            None => tracing::warn!(symbol, "dropping invalid ticker"),
        }
    }
    tickers
}

/// Split a ticker list on commas and whitespace; blank tokens are skipped.
pub fn parse_tickers(input: &str) -> Vec<String> {
    normalize_universe(
        input
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty()),
    )
}

/// Loads and normalizes the universe. An empty result is an error.
pub fn load_universe(provider: &dyn UniversePort) -> Result<Vec<String>, ScreenerError> {
    let tickers = normalize_universe(provider.list_tickers()?);
    if tickers.is_empty() {
        return Err(ScreenerError::EmptyUniverse);
    }
    tracing::info!(tickers = tickers.len(), "universe loaded");
    Ok(tickers)
}

/// Series that fetched cleanly, plus the tickers dropped for this run.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub series: BTreeMap<String, BarSeries>,
    pub failed: Vec<(String, ScreenerError)>,
}

impl FetchReport {
    pub fn fail(&mut self, ticker: &str, error: ScreenerError) {
        tracing::warn!(ticker, error = %error, "dropping ticker");
        self.failed.push((ticker.to_string(), error));
    }

    pub fn log_summary(&self) {
        if !self.failed.is_empty() {
            tracing::warn!(
                loaded = self.series.len(),
                failed = self.failed.len(),
                "some tickers failed to load"
            );
        }
    }
}
