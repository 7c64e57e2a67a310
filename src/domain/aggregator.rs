//! Chronological trade aggregation over a candidate panel.
//!
//! Candidates are folded in panel order. The fold state carries two dedup
//! sets: one issuer per day (cleared when the candidate date advances) and
//! one trade per (ticker, entry time) for the whole run. Order matters: the
//! first candidate to claim a day wins it.

use crate::domain::screener::Candidate;
use crate::domain::share_class::ShareClassMap;
use crate::domain::simulator::{RejectReason, SimulationOutcome};
use crate::domain::trade::Trade;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{HashMap, HashSet};

/// Runs the entry/exit simulation for one candidate.
pub trait CandidateSimulator {
    fn simulate(&self, candidate: &Candidate) -> SimulationOutcome;
}

impl<F> CandidateSimulator for F
where
    F: Fn(&Candidate) -> SimulationOutcome,
{
    fn simulate(&self, candidate: &Candidate) -> SimulationOutcome {
        self(candidate)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregationStats {
    pub candidates: usize,
    pub simulated: usize,
    pub skipped_same_day: usize,
    pub duplicate_trades: usize,
    pub rejections: HashMap<RejectReason, usize>,
}

#[derive(Debug, Clone, Default)]
pub struct AggregationResult {
    pub trades: Vec<Trade>,
    pub stats: AggregationStats,
}

#[derive(Debug, Default)]
struct FoldState {
    current_day: Option<NaiveDate>,
    traded_today: HashSet<(NaiveDate, String)>,
    executed: HashSet<(String, NaiveDateTime)>,
    result: AggregationResult,
}

impl FoldState {
    fn step(
        mut self,
        candidate: &Candidate,
        simulator: &dyn CandidateSimulator,
        classes: &ShareClassMap,
    ) -> Self {
        self.result.stats.candidates += 1;
        if self.current_day != Some(candidate.date) {
            self.traded_today.clear();
            self.current_day = Some(candidate.date);
        }

        let class = classes.class_of(&candidate.ticker).to_string();
        if self.traded_today.contains(&(candidate.date, class.clone())) {
            self.result.stats.skipped_same_day += 1;
            return self;
        }

        self.result.stats.simulated += 1;
        let trade = match simulator.simulate(candidate) {
            SimulationOutcome::Traded(trade) => trade,
            SimulationOutcome::NoTrade(reason) => {
                tracing::debug!(ticker = %candidate.ticker, date = %candidate.date, %reason, "no trade");
                *self.result.stats.rejections.entry(reason).or_default() += 1;
                return self;
            }
        };

        let day_key = (trade.entry_day(), class);
        let trade_key = (trade.ticker.clone(), trade.entry_time);
        if self.traded_today.contains(&day_key) || self.executed.contains(&trade_key) {
            self.result.stats.duplicate_trades += 1;
            return self;
        }
        self.traded_today.insert(day_key);
        self.executed.insert(trade_key);
        self.result.trades.push(trade);
        self
    }
}

/// Folds a panel already sorted by date into executed trades.
pub fn aggregate_trades(
    panel: &[Candidate],
    simulator: &dyn CandidateSimulator,
    classes: &ShareClassMap,
) -> AggregationResult {
    let state = panel
        .iter()
        .fold(FoldState::default(), |state, candidate| {
            state.step(candidate, simulator, classes)
        });
    tracing::info!(
        candidates = state.result.stats.candidates,
        simulated = state.result.stats.simulated,
        trades = state.result.trades.len(),
        "aggregation complete"
    );
    state.result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trade::{EntryMethod, ExitMethod};
    use std::cell::RefCell;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn cand(date: &str, ticker: &str, score: u32) -> Candidate {
        Candidate {
            date: d(date),
            ticker: ticker.to_string(),
            bounce_score: score,
        }
    }

    fn trade_on(ticker: &str, day: NaiveDate, hour: u32) -> Trade {
        let entry = day.and_hms_opt(hour, 0, 0).unwrap();
        Trade::new(
            ticker,
            entry,
            100.0,
            EntryMethod::Reclaim,
            entry + chrono::Duration::hours(1),
            101.0,
            ExitMethod::MaxHoldExit,
        )
    }

    fn enter_same_day(c: &Candidate) -> SimulationOutcome {
        SimulationOutcome::Traded(trade_on(&c.ticker, c.date, 10))
    }

    #[test]
    fn same_class_same_day_trades_once() {
        let panel = vec![cand("2024-03-04", "GOOGL", 4), cand("2024-03-04", "GOOG", 3)];
        let calls = RefCell::new(Vec::new());
        let sim = |c: &Candidate| {
            calls.borrow_mut().push(c.ticker.clone());
            enter_same_day(c)
        };
        let result = aggregate_trades(&panel, &sim, &ShareClassMap::default());
        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].ticker, "GOOGL");
        // GOOG is skipped without simulation.
        assert_eq!(*calls.borrow(), vec!["GOOGL".to_string()]);
        assert_eq!(result.stats.skipped_same_day, 1);
    }

    #[test]
    fn different_tickers_same_day_both_trade() {
        let panel = vec![cand("2024-03-04", "AAA", 4), cand("2024-03-04", "BBB", 3)];
        let result = aggregate_trades(&panel, &enter_same_day, &ShareClassMap::default());
        assert_eq!(result.trades.len(), 2);
    }

    #[test]
    fn rejection_does_not_claim_the_day() {
        let panel = vec![cand("2024-03-04", "GOOGL", 4), cand("2024-03-04", "GOOG", 3)];
        let sim = |c: &Candidate| {
            if c.ticker == "GOOGL" {
                SimulationOutcome::NoTrade(RejectReason::NoReclaim)
            } else {
                enter_same_day(c)
            }
        };
        let result = aggregate_trades(&panel, &sim, &ShareClassMap::default());
        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].ticker, "GOOG");
        assert_eq!(result.stats.rejections[&RejectReason::NoReclaim], 1);
    }

    #[test]
    fn rejections_are_tallied_per_reason() {
        let panel = vec![
            cand("2024-03-04", "AAA", 4),
            cand("2024-03-04", "BBB", 3),
            cand("2024-03-05", "CCC", 2),
        ];
        let sim = |c: &Candidate| match c.ticker.as_str() {
            "CCC" => SimulationOutcome::NoTrade(RejectReason::BounceTouch),
            _ => SimulationOutcome::NoTrade(RejectReason::DataUnavailable),
        };
        let result = aggregate_trades(&panel, &sim, &ShareClassMap::default());
        assert!(result.trades.is_empty());
        let expected: HashMap<RejectReason, usize> = [
            (RejectReason::DataUnavailable, 2),
            (RejectReason::BounceTouch, 1),
        ]
        .into_iter()
        .collect();
        assert_eq!(result.stats.rejections, expected);
        assert_eq!(result.stats.simulated, 3);
    }

    #[test]
    fn same_entry_time_across_days_is_deduplicated() {
        // Both candidate days resolve to the same Tuesday entry.
        let panel = vec![cand("2024-03-04", "AAA", 4), cand("2024-03-05", "AAA", 4)];
        let sim = |_: &Candidate| SimulationOutcome::Traded(trade_on("AAA", d("2024-03-05"), 11));
        let result = aggregate_trades(&panel, &sim, &ShareClassMap::default());
        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.stats.duplicate_trades, 1);
    }

    #[test]
    fn actual_entry_day_is_checked() {
        // Monday candidates entering Tuesday are keyed on Tuesday.
        let panel = vec![cand("2024-03-04", "GOOGL", 4), cand("2024-03-04", "FOXA", 2)];
        let sim = |c: &Candidate| {
            let entry_day = d("2024-03-05");
            SimulationOutcome::Traded(trade_on(&c.ticker, entry_day, 10))
        };
        let result = aggregate_trades(&panel, &sim, &ShareClassMap::default());
        assert_eq!(result.trades.len(), 2);

        let panel = vec![cand("2024-03-04", "GOOGL", 4), cand("2024-03-04", "GOOG", 2)];
        let shifted = |c: &Candidate| {
            let hour = if c.ticker == "GOOGL" { 10 } else { 11 };
            SimulationOutcome::Traded(trade_on(&c.ticker, d("2024-03-05"), hour))
        };
        let result = aggregate_trades(&panel, &shifted, &ShareClassMap::default());
        assert_eq!(result.trades.len(), 1);
    }

    #[test]
    fn day_set_clears_when_date_advances() {
        let panel = vec![cand("2024-03-04", "GOOGL", 4), cand("2024-03-05", "GOOG", 3)];
        let result = aggregate_trades(&panel, &enter_same_day, &ShareClassMap::default());
        assert_eq!(result.trades.len(), 2);
    }
}
