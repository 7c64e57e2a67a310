//! Cross-sectional screening: the full pipeline over every ticker as of one
//! date, survivors ranked by bounce score.

use crate::domain::bar_series::BarSeries;
use crate::domain::filter::{FilterKind, MIN_TREND_BARS};
use crate::domain::pipeline::{PipelineOutcome, TrendPipeline};
use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Trailing bars handed to the pipeline.
pub const DEFAULT_WINDOW: usize = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub date: NaiveDate,
    pub ticker: String,
    pub bounce_score: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    InsufficientBars { bars: usize },
    /// The ticker has no bar on the evaluated day.
    NoBarOnDay,
    MissingValues,
    Filter(FilterKind),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InsufficientBars { bars } => write!(f, "insufficient history ({bars} bars)"),
            SkipReason::NoBarOnDay => write!(f, "no bar on day"),
            SkipReason::MissingValues => write!(f, "missing values"),
            SkipReason::Filter(kind) => write!(f, "failed {kind}"),
        }
    }
}

/// Per-stage exclusion counts for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScreenDiagnostics {
    pub evaluated: usize,
    pub passed: usize,
    pub insufficient_history: usize,
    pub missing_values: usize,
    pub filter_failures: HashMap<FilterKind, usize>,
}

impl ScreenDiagnostics {
    pub fn record(&mut self, result: Result<u32, SkipReason>) {
        self.evaluated += 1;
        match result {
            Ok(_) => self.passed += 1,
            Err(SkipReason::InsufficientBars { .. } | SkipReason::NoBarOnDay) => {
                self.insufficient_history += 1
            }
            Err(SkipReason::MissingValues) => self.missing_values += 1,
            Err(SkipReason::Filter(kind)) => *self.filter_failures.entry(kind).or_default() += 1,
        }
    }

    pub fn merge(mut self, other: ScreenDiagnostics) -> Self {
        self.evaluated += other.evaluated;
        self.passed += other.passed;
        self.insufficient_history += other.insufficient_history;
        self.missing_values += other.missing_values;
        for (kind, n) in other.filter_failures {
            *self.filter_failures.entry(kind).or_default() += n;
        }
        self
    }

    pub fn failures(&self, kind: FilterKind) -> usize {
        self.filter_failures.get(&kind).copied().unwrap_or(0)
    }

    pub fn log_summary(&self, label: &str) {
        tracing::info!(
            run = label,
            total = self.evaluated,
            passed = self.passed,
            insufficient_history = self.insufficient_history,
            missing_values = self.missing_values,
            liquidity = self.failures(FilterKind::Liquidity),
            stacked_ema = self.failures(FilterKind::StackedEma),
            atr_band = self.failures(FilterKind::AtrBand),
            rsi_band = self.failures(FilterKind::RsiBand),
            bounce = self.failures(FilterKind::Bounce),
            "screen diagnostics"
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSettings {
    pub window: usize,
    pub min_bars: usize,
}

impl Default for ScreenSettings {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            min_bars: MIN_TREND_BARS,
        }
    }
}

/// Why a whole run produced no rows, if it did not complete normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    RegimeClosed,
    EmptyUniverse,
}

#[derive(Debug, Clone)]
pub struct ScreenReport {
    pub as_of: NaiveDate,
    pub candidates: Vec<Candidate>,
    pub diagnostics: ScreenDiagnostics,
    pub status: RunStatus,
}

impl ScreenReport {
    pub fn empty(as_of: NaiveDate, status: RunStatus) -> Self {
        Self {
            as_of,
            candidates: Vec::new(),
            diagnostics: ScreenDiagnostics::default(),
            status,
        }
    }
}

/// Evaluate one ticker's trailing window ending at `date`.
///
/// Shared by the cross-sectional and rolling screeners so a single-day
/// rolling run always agrees with an as-of screen.
pub fn evaluate_window(
    series: &BarSeries,
    date: NaiveDate,
    pipeline: &TrendPipeline,
    settings: &ScreenSettings,
) -> Result<u32, SkipReason> {
    let window = series.window_ending(date, settings.window);
    if window.len() < settings.min_bars {
        return Err(SkipReason::InsufficientBars { bars: window.len() });
    }
    if window.iter().any(|b| !b.is_complete()) {
        return Err(SkipReason::MissingValues);
    }
    match pipeline.screen_window(window) {
        PipelineOutcome::Passed { score } => Ok(score),
        PipelineOutcome::Rejected(kind) => Err(SkipReason::Filter(kind)),
    }
}

/// Highest score first, ticker as tie-break.
pub fn rank_candidates(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        b.bounce_score
            .cmp(&a.bounce_score)
            .then_with(|| a.ticker.cmp(&b.ticker))
    });
}

pub fn screen_universe(
    universe: &BTreeMap<String, BarSeries>,
    as_of: NaiveDate,
    pipeline: &TrendPipeline,
    settings: &ScreenSettings,
) -> ScreenReport {
    let results: Vec<(&String, Result<u32, SkipReason>)> = universe
        .par_iter()
        .map(|(ticker, series)| (ticker, evaluate_window(series, as_of, pipeline, settings)))
        .collect();

    let mut diagnostics = ScreenDiagnostics::default();
    let mut candidates = Vec::new();
    for (ticker, result) in results {
        diagnostics.record(result);
        match result {
            Ok(bounce_score) => candidates.push(Candidate {
                date: as_of,
                ticker: ticker.clone(),
                bounce_score,
            }),
            Err(reason) => tracing::debug!(%ticker, %reason, "excluded"),
        }
    }
    rank_candidates(&mut candidates);

    ScreenReport {
        as_of,
        candidates,
        diagnostics,
        status: RunStatus::Completed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::OhlcvBar;
    use chrono::Duration;

    fn trend_series(ticker: &str, n: usize) -> BarSeries {
        let start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        let ratio = 5.0f64.powf(1.0 / (n as f64 - 1.0));
        let mut bars: Vec<OhlcvBar> = (0..n)
            .map(|i| {
                let c = 100.0 * ratio.powi(i as i32);
                OhlcvBar::daily(start + Duration::days(i as i64), c * 0.99, c * 1.02, c * 0.98, c, 1e6)
            })
            .collect();
        bars.last_mut().unwrap().volume = 2e6;
        BarSeries::new(ticker, bars)
    }

    fn relaxed() -> TrendPipeline {
        let mut pipeline = TrendPipeline::default();
        pipeline.rsi_band.high = 100.0;
        pipeline.bounce.min_bounces = 0;
        pipeline
    }

    #[test]
    fn insufficient_history_is_skipped() {
        let series = trend_series("AAA", 100);
        let date = series.last_date().unwrap();
        assert_eq!(
            evaluate_window(&series, date, &relaxed(), &ScreenSettings::default()),
            Err(SkipReason::InsufficientBars { bars: 100 })
        );
    }

    #[test]
    fn missing_value_in_window_is_skipped() {
        let mut series = trend_series("AAA", 400);
        series.bars[350].volume = f64::NAN;
        let date = series.last_date().unwrap();
        assert_eq!(
            evaluate_window(&series, date, &relaxed(), &ScreenSettings::default()),
            Err(SkipReason::MissingValues)
        );
    }

    #[test]
    fn missing_value_outside_window_is_ignored() {
        let mut series = trend_series("AAA", 400);
        series.bars[10].volume = f64::NAN;
        let date = series.last_date().unwrap();
        assert!(evaluate_window(&series, date, &relaxed(), &ScreenSettings::default()).is_ok());
    }

    #[test]
    fn screen_universe_ranks_and_counts() {
        let mut universe = BTreeMap::new();
        universe.insert("BBB".to_string(), trend_series("BBB", 500));
        universe.insert("AAA".to_string(), trend_series("AAA", 500));
        universe.insert("SHORT".to_string(), trend_series("SHORT", 50));
        let as_of = universe["AAA"].last_date().unwrap();

        let report = screen_universe(&universe, as_of, &relaxed(), &ScreenSettings::default());
        let tickers: Vec<&str> = report.candidates.iter().map(|c| c.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["AAA", "BBB"]);
        assert_eq!(report.diagnostics.evaluated, 3);
        assert_eq!(report.diagnostics.passed, 2);
        assert_eq!(report.diagnostics.insufficient_history, 1);
        assert_eq!(report.status, RunStatus::Completed);
    }

    #[test]
    fn rank_orders_score_then_ticker() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let c = |t: &str, s| Candidate {
            date: d,
            ticker: t.to_string(),
            bounce_score: s,
        };
        let mut candidates = vec![c("ZZZ", 2), c("AAA", 2), c("MMM", 5)];
        rank_candidates(&mut candidates);
        let order: Vec<&str> = candidates.iter().map(|c| c.ticker.as_str()).collect();
        assert_eq!(order, vec!["MMM", "AAA", "ZZZ"]);
    }

    #[test]
    fn diagnostics_merge_adds_counts() {
        let mut a = ScreenDiagnostics::default();
        a.record(Err(SkipReason::Filter(FilterKind::RsiBand)));
        let mut b = ScreenDiagnostics::default();
        b.record(Err(SkipReason::Filter(FilterKind::RsiBand)));
        b.record(Ok(3));
        let merged = a.merge(b);
        assert_eq!(merged.evaluated, 3);
        assert_eq!(merged.passed, 1);
        assert_eq!(merged.failures(FilterKind::RsiBand), 2);
    }
}
