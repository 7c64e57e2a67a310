//! Integration tests over the run entry points with in-memory ports.
//!
//! Tests cover:
//! - As-of screening behind the market regime gate
//! - Single-day rolling screen agreeing with the as-of screen
//! - Full backtest: screen, intraday entry/exit, aggregation, summary
//! - Share-class dedup in aggregation

mod common;

use chrono::Duration;
use common::*;
use contscreen::domain::aggregator::aggregate_trades;
use contscreen::domain::bar_series::BarSeries;
use contscreen::domain::config::ScreenerConfig;
use contscreen::domain::indicator::ema::calculate_ema;
use contscreen::domain::rolling::{screen_history, sort_panel};
use contscreen::domain::runner::RunContext;
use contscreen::domain::screener::{Candidate, RunStatus, ScreenSettings, screen_universe};
use contscreen::domain::share_class::ShareClassMap;
use contscreen::domain::simulator::{RejectReason, SimulationOutcome};
use contscreen::domain::trade::{EntryMethod, ExitMethod, Trade};
use proptest::prelude::*;
use std::collections::BTreeMap;

fn relaxed_config() -> ScreenerConfig {
    ScreenerConfig {
        pipeline: relaxed_pipeline(),
        ..ScreenerConfig::default()
    }
}

fn candidate_day() -> chrono::NaiveDate {
    date(2024, 3, 4)
}

/// Two trending tickers with a volume spike on the candidate day, one with
/// too little history, and the index.
fn screening_port(index: Vec<OhlcvBar>) -> MockDataPort {
    let day = candidate_day();
    MockDataPort::new()
        .with_daily("SPY", index)
        .with_daily("AAA", geometric_daily(day, 500, 5.0, true))
        .with_daily("BBB", geometric_daily(day, 480, 5.0, true))
        .with_daily("NEW", geometric_daily(day, 60, 2.0, true))
}

mod screening {
    use super::*;

    #[test]
    fn bullish_regime_ranks_trending_tickers() {
        let day = candidate_day();
        let port = screening_port(bullish_index(day + Duration::days(30)));
        let universe = MockUniverse::of(&["aaa", "BBB", "NEW", "MISSING"]);
        let config = relaxed_config();
        let context = RunContext::new(&port, &universe, &config).with_today(day);

        let report = context.run_screener(Some(day)).unwrap();
        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(report.as_of, day);
        let tickers: Vec<&str> = report.candidates.iter().map(|c| c.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["AAA", "BBB"]);
        assert!(report.candidates.iter().all(|c| c.date == day));
        assert_eq!(report.diagnostics.evaluated, 3);
        assert_eq!(report.diagnostics.insufficient_history, 1);
    }

    #[test]
    fn default_as_of_is_latest_index_date() {
        let day = candidate_day();
        let port = screening_port(bullish_index(day));
        let universe = MockUniverse::of(&["AAA"]);
        let config = relaxed_config();
        let context = RunContext::new(&port, &universe, &config)
            .with_today(day + Duration::days(3));

        let report = context.run_screener(None).unwrap();
        assert_eq!(report.as_of, day);
        assert_eq!(report.candidates.len(), 1);
    }

    #[test]
    fn bearish_regime_produces_empty_screen() {
        let day = candidate_day();
        let port = screening_port(bearish_index(day));
        let universe = MockUniverse::of(&["AAA", "BBB"]);
        let config = relaxed_config();
        let context = RunContext::new(&port, &universe, &config).with_today(day);

        let report = context.run_screener(Some(day)).unwrap();
        assert_eq!(report.status, RunStatus::RegimeClosed);
        assert!(report.candidates.is_empty());
        assert_eq!(report.diagnostics.evaluated, 0);
    }

    #[test]
    fn short_index_history_closes_gate() {
        let day = candidate_day();
        let port = screening_port(geometric_daily(day, 150, 1.2, false));
        let universe = MockUniverse::of(&["AAA"]);
        let config = relaxed_config();
        let context = RunContext::new(&port, &universe, &config).with_today(day);

        let report = context.run_screener(Some(day)).unwrap();
        assert_eq!(report.status, RunStatus::RegimeClosed);
    }

    #[test]
    fn unusable_universe_is_empty_result() {
        let day = candidate_day();
        let port = screening_port(bullish_index(day));
        let universe = MockUniverse::of(&["$$$", "  "]);
        let config = relaxed_config();
        let context = RunContext::new(&port, &universe, &config).with_today(day);

        let report = context.run_screener(Some(day)).unwrap();
        assert_eq!(report.status, RunStatus::EmptyUniverse);
        assert!(report.candidates.is_empty());
    }

    #[test]
    fn default_thresholds_reject_monotone_trend() {
        let day = candidate_day();
        let port = screening_port(bullish_index(day));
        let universe = MockUniverse::of(&["AAA", "BBB"]);
        let config = ScreenerConfig::default();
        let context = RunContext::new(&port, &universe, &config).with_today(day);

        let report = context.run_screener(Some(day)).unwrap();
        assert!(report.candidates.is_empty());
        assert_eq!(
            report
                .diagnostics
                .failures(contscreen::domain::filter::FilterKind::RsiBand),
            2
        );
    }
}

mod rolling {
    use super::*;

    #[test]
    fn single_day_history_matches_as_of_screen() {
        let day = candidate_day();
        let port = screening_port(bullish_index(day));
        let universe = MockUniverse::of(&["AAA", "BBB", "NEW"]);
        let config = relaxed_config();
        let context = RunContext::new(&port, &universe, &config).with_today(day);

        let screen = context.run_screener(Some(day)).unwrap();
        let panel = context.run_screener_backtest(day, day).unwrap();
        assert_eq!(panel.candidates, screen.candidates);
        assert_eq!(panel.status, RunStatus::Completed);
    }

    #[test]
    fn inverted_range_is_empty_panel() {
        let day = candidate_day();
        let port = screening_port(bullish_index(day));
        let universe = MockUniverse::of(&["AAA"]);
        let config = relaxed_config();
        let context = RunContext::new(&port, &universe, &config).with_today(day);

        let panel = context
            .run_screener_backtest(day, day - Duration::days(1))
            .unwrap();
        assert!(panel.is_empty());
    }

    fn spiky_universe() -> BTreeMap<String, BarSeries> {
        let last = candidate_day();
        let mut universe = BTreeMap::new();
        for (ticker, growth, every) in [("AAA", 5.0, 3usize), ("BBB", 3.0, 4), ("CCC", 6.0, 5)] {
            let mut bars = geometric_daily(last, 420, growth, false);
            for (i, bar) in bars.iter_mut().enumerate() {
                if i % every == 0 {
                    bar.volume = 2_500_000.0;
                }
            }
            universe.insert(ticker.to_string(), BarSeries::new(ticker, bars));
        }
        universe
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn rolling_single_day_is_idempotent(offset in 0i64..40) {
            let universe = spiky_universe();
            let day = candidate_day() - Duration::days(offset);
            let pipeline = relaxed_pipeline();
            let settings = ScreenSettings::default();

            let as_of = screen_universe(&universe, day, &pipeline, &settings);
            let panel = screen_history(&universe, day, day, &pipeline, &settings);
            prop_assert_eq!(panel.candidates, as_of.candidates);
        }
    }
}

mod backtest {
    use super::*;

    /// Daily EMA 9 the simulator will see on the candidate day.
    fn daily_ema9(daily: &[OhlcvBar]) -> f64 {
        let day = candidate_day();
        let window: Vec<OhlcvBar> = daily
            .iter()
            .filter(|b| b.date() >= day - Duration::days(60) && b.date() <= day)
            .cloned()
            .collect();
        calculate_ema(&window, 9).last_value().unwrap()
    }

    fn preload(e: f64) -> Vec<OhlcvBar> {
        session(
            candidate_day() - Duration::days(1),
            &vec![(e + 2.8, e + 3.0, e + 3.2); 20],
        )
    }

    fn backtest_port(intraday: Option<Vec<OhlcvBar>>) -> (MockDataPort, f64) {
        let day = candidate_day();
        let daily = geometric_daily(day, 500, 5.0, true);
        let e = daily_ema9(&daily);
        let mut port = MockDataPort::new()
            .with_daily("SPY", bullish_index(day + Duration::days(30)))
            .with_daily("AAA", daily);
        if let Some(bars) = intraday {
            port = port.with_intraday("AAA", bars);
        }
        (port, e)
    }

    #[test]
    fn break_and_reclaim_takes_profit() {
        let day = candidate_day();
        let (_, e) = backtest_port(None);
        let entry = e + 0.5;
        let mut bars = preload(e);
        bars.extend(session(
            day,
            &[
                (e + 2.5, e + 3.0, e + 3.2),
                (e - 1.5, e - 1.0, e + 3.0),
                (e - 1.0, entry, e + 0.6),
                (e + 0.4, entry * 1.05, entry * 1.05 + 0.1),
            ],
        ));
        // 20 preload bars, then the session
        let reclaim_time = bars[22].timestamp;
        let exit_time = bars[23].timestamp;
        let (port, _) = backtest_port(Some(bars));

        let universe = MockUniverse::of(&["AAA"]);
        let config = relaxed_config();
        let context = RunContext::new(&port, &universe, &config).with_today(day);
        let report = context
            .run_backtester(Some(day - Duration::days(10)), Some(day + Duration::days(11)))
            .unwrap();

        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(report.panel.candidates.len(), 1);
        assert_eq!(report.panel.candidates[0].date, day);
        assert_eq!(report.trades.len(), 1);

        let trade = &report.trades[0];
        assert_eq!(trade.ticker, "AAA");
        assert_eq!(trade.entry_method, EntryMethod::Reclaim);
        assert_eq!(trade.exit_method, ExitMethod::TakeProfit);
        assert_eq!(trade.entry_time, reclaim_time);
        assert_eq!(trade.exit_time, exit_time);
        assert!(trade.is_win());

        assert_eq!(report.summary.total_trades, 1);
        assert!((report.summary.win_rate - 1.0).abs() < 1e-12);
        assert_eq!(report.summary.rows().len(), 10);
    }

    #[test]
    fn touch_before_break_is_rejected() {
        let day = candidate_day();
        let (_, e) = backtest_port(None);
        let mut bars = preload(e);
        bars.extend(session(
            day,
            &[(e - 0.05, e + 1.0, e + 1.2), (e - 1.5, e - 1.0, e + 1.0), (e - 1.0, e + 0.5, e + 0.6)],
        ));
        let (port, _) = backtest_port(Some(bars));

        let universe = MockUniverse::of(&["AAA"]);
        let config = relaxed_config();
        let context = RunContext::new(&port, &universe, &config).with_today(day);
        let report = context
            .run_backtester(Some(day - Duration::days(10)), Some(day + Duration::days(11)))
            .unwrap();

        assert!(report.trades.is_empty());
        assert_eq!(report.stats.rejections.get(&RejectReason::BounceTouch), Some(&1));
        assert_eq!(report.summary.total_trades, 0);
    }

    #[test]
    fn missing_intraday_is_data_unavailable() {
        let day = candidate_day();
        let (port, _) = backtest_port(None);
        let universe = MockUniverse::of(&["AAA"]);
        let config = relaxed_config();
        let context = RunContext::new(&port, &universe, &config).with_today(day);
        let report = context
            .run_backtester(Some(day - Duration::days(10)), Some(day + Duration::days(11)))
            .unwrap();

        assert!(report.trades.is_empty());
        assert_eq!(report.stats.simulated, 1);
        assert_eq!(
            report.stats.rejections.get(&RejectReason::DataUnavailable),
            Some(&1)
        );
    }

    #[test]
    fn bearish_regime_skips_backtest() {
        let day = candidate_day();
        let port = MockDataPort::new()
            .with_daily("SPY", bearish_index(day + Duration::days(30)))
            .with_daily("AAA", geometric_daily(day, 500, 5.0, true));
        let universe = MockUniverse::of(&["AAA"]);
        let config = relaxed_config();
        let context = RunContext::new(&port, &universe, &config).with_today(day);
        let report = context
            .run_backtester(Some(day - Duration::days(10)), Some(day + Duration::days(11)))
            .unwrap();

        assert_eq!(report.status, RunStatus::RegimeClosed);
        assert!(report.trades.is_empty());
        assert_eq!(report.summary.total_trades, 0);
    }
}

mod aggregation {
    use super::*;

    fn trade_for(candidate: &Candidate) -> SimulationOutcome {
        let entry = candidate.date.and_hms_opt(10, 0, 0).unwrap();
        SimulationOutcome::Traded(Trade::new(
            &candidate.ticker,
            entry,
            100.0,
            EntryMethod::Reclaim,
            entry + Duration::hours(2),
            104.0,
            ExitMethod::TakeProfit,
        ))
    }

    #[test]
    fn share_classes_trade_once_per_day() {
        let day = candidate_day();
        let c = |ticker: &str, score| Candidate {
            date: day,
            ticker: ticker.to_string(),
            bounce_score: score,
        };
        let mut panel = vec![
            c("GOOG", 2),
            c("GOOGL", 4),
            c("MSFT", 3),
            Candidate {
                date: day + Duration::days(1),
                ticker: "GOOG".to_string(),
                bounce_score: 2,
            },
        ];
        sort_panel(&mut panel);

        let result = aggregate_trades(&panel, &trade_for, &ShareClassMap::default());
        let traded: Vec<(&str, chrono::NaiveDate)> = result
            .trades
            .iter()
            .map(|t| (t.ticker.as_str(), t.entry_day()))
            .collect();
        assert_eq!(
            traded,
            vec![
                ("GOOGL", day),
                ("MSFT", day),
                ("GOOG", day + Duration::days(1))
            ]
        );
        assert_eq!(result.stats.skipped_same_day, 1);
        assert_eq!(result.stats.simulated, 3);
    }
}
