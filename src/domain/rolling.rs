//! Historical rolling screener.
//!
//! Every (ticker, day) in range is screened on its own trailing window.
//! Nothing is carried between days, so the panel depends only on the bars.

use crate::domain::bar_series::{BarSeries, build_unified_timeline};
use crate::domain::pipeline::TrendPipeline;
use crate::domain::screener::{
    Candidate, RunStatus, ScreenDiagnostics, ScreenSettings, SkipReason, evaluate_window,
};
use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct CandidatePanel {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Sorted by date ascending, then score descending, then ticker.
    pub candidates: Vec<Candidate>,
    pub diagnostics: ScreenDiagnostics,
    pub status: RunStatus,
}

impl CandidatePanel {
    pub fn empty(start: NaiveDate, end: NaiveDate, status: RunStatus) -> Self {
        Self {
            start,
            end,
            candidates: Vec::new(),
            diagnostics: ScreenDiagnostics::default(),
            status,
        }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

pub fn sort_panel(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| b.bounce_score.cmp(&a.bounce_score))
            .then_with(|| a.ticker.cmp(&b.ticker))
    });
}

/// Trading days in `[start, end]` seen in any series.
pub fn trading_days(
    universe: &BTreeMap<String, BarSeries>,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<NaiveDate> {
    build_unified_timeline(universe.values())
        .into_iter()
        .filter(|d| *d >= start && *d <= end)
        .collect()
}

fn screen_ticker(
    series: &BarSeries,
    days: &[NaiveDate],
    pipeline: &TrendPipeline,
    settings: &ScreenSettings,
) -> (Vec<Candidate>, ScreenDiagnostics) {
    let mut diagnostics = ScreenDiagnostics::default();
    let mut candidates = Vec::new();
    for &day in days {
        // A day the ticker did not trade would re-screen its last window.
        let result = if series.get_bar(day).is_some() {
            evaluate_window(series, day, pipeline, settings)
        } else {
            Err(SkipReason::NoBarOnDay)
        };
        diagnostics.record(result);
        match result {
            Ok(bounce_score) => candidates.push(Candidate {
                date: day,
                ticker: series.ticker.clone(),
                bounce_score,
            }),
            Err(SkipReason::Filter(_)) => {}
            Err(reason) => {
                tracing::trace!(ticker = %series.ticker, date = %day, %reason, "window skipped")
            }
        }
    }
    (candidates, diagnostics)
}

pub fn screen_history(
    universe: &BTreeMap<String, BarSeries>,
    start: NaiveDate,
    end: NaiveDate,
    pipeline: &TrendPipeline,
    settings: &ScreenSettings,
) -> CandidatePanel {
    let days = trading_days(universe, start, end);
    tracing::info!(
        tickers = universe.len(),
        days = days.len(),
        %start,
        %end,
        "rolling screen"
    );

    let (mut candidates, diagnostics) = universe
        .par_iter()
        .map(|(_, series)| screen_ticker(series, &days, pipeline, settings))
        .reduce(
            || (Vec::new(), ScreenDiagnostics::default()),
            |(mut acc, diag_a), (found, diag_b)| {
                acc.extend(found);
                (acc, diag_a.merge(diag_b))
            },
        );
    sort_panel(&mut candidates);

    CandidatePanel {
        start,
        end,
        candidates,
        diagnostics,
        status: RunStatus::Completed,
    }
}
