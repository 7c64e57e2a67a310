//! Run entry points: as-of screen, rolling screen, and full backtest.
//!
//! Per-ticker data problems and a closed regime gate never fail a run; they
//! produce an empty, well-typed result with a [`RunStatus`].

use crate::domain::aggregator::{AggregationStats, CandidateSimulator, aggregate_trades};
use crate::domain::config::ScreenerConfig;
use crate::domain::error::ScreenerError;
use crate::domain::ohlcv::Interval;
use crate::domain::regime::{REGIME_SMA_PERIOD, RegimeVerdict, evaluate_regime};
use crate::domain::rolling::{CandidatePanel, screen_history};
use crate::domain::screener::{Candidate, RunStatus, ScreenReport, screen_universe};
use crate::domain::simulator::{RejectReason, SimulationOutcome, simulate_trade};
use crate::domain::summary::BacktestSummary;
use crate::domain::trade::Trade;
use crate::domain::universe::load_universe;
use crate::ports::data_port::DataPort;
use crate::ports::universe_port::UniversePort;
use chrono::{Duration, NaiveDate};

/// Calendar days of index history fetched for the regime SMA.
pub const INDEX_LOOKBACK_DAYS: i64 = 420;
/// Calendar days of daily history fetched ahead of the first screened day.
pub const HISTORY_LOOKBACK_DAYS: i64 = 450;
/// Default backtest span when no start date is given.
pub const DEFAULT_BACKTEST_DAYS: i64 = 59;

pub struct RunContext<'a> {
    pub data: &'a dyn DataPort,
    pub universe: &'a dyn UniversePort,
    pub config: &'a ScreenerConfig,
    pub today: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct RegimeCheck {
    as_of: NaiveDate,
    verdict: RegimeVerdict,
}

#[derive(Debug, Clone)]
pub struct BacktestReport {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub panel: CandidatePanel,
    pub trades: Vec<Trade>,
    pub stats: AggregationStats,
    pub summary: BacktestSummary,
    pub status: RunStatus,
}

impl<'a> RunContext<'a> {
    pub fn new(
        data: &'a dyn DataPort,
        universe: &'a dyn UniversePort,
        config: &'a ScreenerConfig,
    ) -> Self {
        Self {
            data,
            universe,
            config,
            today: chrono::Local::now().date_naive(),
        }
    }

    /// Pin the date used when a run has no explicit dates.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Last index date on or before today, if the index can be fetched.
    fn latest_index_date(&self) -> Option<NaiveDate> {
        let start = self.today - Duration::days(INDEX_LOOKBACK_DAYS);
        self.data
            .fetch_daily(&self.config.data.index, start, self.today)
            .ok()
            .and_then(|s| s.last_date())
    }

    fn check_regime(&self, requested: Option<NaiveDate>) -> RegimeCheck {
        let index = &self.config.data.index;
        let end = requested.unwrap_or(self.today);
        let start = end - Duration::days(INDEX_LOOKBACK_DAYS);

        let check = match self.data.fetch_daily(index, start, end) {
            Ok(series) => {
                let as_of = requested.or(series.last_date()).unwrap_or(end);
                RegimeCheck {
                    as_of,
                    verdict: evaluate_regime(series.up_to(as_of), REGIME_SMA_PERIOD),
                }
            }
            Err(e) => {
                tracing::warn!(%index, error = %e, "index fetch failed");
                RegimeCheck {
                    as_of: end,
                    verdict: RegimeVerdict::Insufficient { bars: 0 },
                }
            }
        };

        match check.verdict {
            RegimeVerdict::Bullish { close, sma } => {
                tracing::info!(%index, as_of = %check.as_of, close, sma, "regime open")
            }
            RegimeVerdict::Bearish { close, sma } => {
                tracing::warn!(%index, as_of = %check.as_of, close, sma, "bearish regime, screening disabled")
            }
            RegimeVerdict::Insufficient { bars } => {
                tracing::warn!(%index, bars, "not enough index history, screening disabled")
            }
        }
        check
    }

    /// Tickers for this run, or `None` when the provider has nothing usable.
    fn tickers(&self) -> Result<Option<Vec<String>>, ScreenerError> {
        match load_universe(self.universe) {
            Ok(tickers) => Ok(Some(tickers)),
            Err(ScreenerError::EmptyUniverse) => {
                tracing::warn!("universe is empty");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Rank the universe as of `as_of`, or the latest index date.
    pub fn run_screener(&self, as_of: Option<NaiveDate>) -> Result<ScreenReport, ScreenerError> {
        let regime = self.check_regime(as_of);
        if !regime.verdict.allows_trading() {
            return Ok(ScreenReport::empty(regime.as_of, RunStatus::RegimeClosed));
        }
        let Some(tickers) = self.tickers()? else {
            return Ok(ScreenReport::empty(regime.as_of, RunStatus::EmptyUniverse));
        };

        let start = regime.as_of - Duration::days(HISTORY_LOOKBACK_DAYS);
        let fetched = self.data.fetch_daily_batch(&tickers, start, regime.as_of);
        fetched.log_summary();

        let report = screen_universe(
            &fetched.series,
            regime.as_of,
            &self.config.pipeline,
            &self.config.screen,
        );
        report.diagnostics.log_summary("screen");
        tracing::info!(as_of = %report.as_of, candidates = report.candidates.len(), "screen complete");
        Ok(report)
    }

    /// Candidate panel over `[start, end]`.
    pub fn run_screener_backtest(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<CandidatePanel, ScreenerError> {
        if start > end {
            tracing::warn!(%start, %end, "empty screening range");
            return Ok(CandidatePanel::empty(start, end, RunStatus::Completed));
        }
        let regime = self.check_regime(Some(end));
        if !regime.verdict.allows_trading() {
            return Ok(CandidatePanel::empty(start, end, RunStatus::RegimeClosed));
        }
        let Some(tickers) = self.tickers()? else {
            return Ok(CandidatePanel::empty(start, end, RunStatus::EmptyUniverse));
        };

        let fetch_start = start - Duration::days(HISTORY_LOOKBACK_DAYS);
        let fetched = self.data.fetch_daily_batch(&tickers, fetch_start, end);
        fetched.log_summary();

        let panel = screen_history(
            &fetched.series,
            start,
            end,
            &self.config.pipeline,
            &self.config.screen,
        );
        panel.diagnostics.log_summary("screen-history");
        tracing::info!(candidates = panel.len(), "rolling screen complete");
        Ok(panel)
    }

    /// Screen `[start, end - lookahead]`, simulate every candidate, and
    /// summarize over `[start, end]`.
    pub fn run_backtester(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<BacktestReport, ScreenerError> {
        let settings = &self.config.backtest;
        let end = end
            .or_else(|| self.latest_index_date())
            .unwrap_or(self.today);
        let start = start.unwrap_or(end - Duration::days(DEFAULT_BACKTEST_DAYS));
        let cutoff = end - Duration::days(settings.exit_lookahead_days);

        let panel = self.run_screener_backtest(start, cutoff)?;
        let simulator = DataPortSimulator::new(self);
        let aggregated = aggregate_trades(&panel.candidates, &simulator, &self.config.share_classes);
        let summary = BacktestSummary::compute(&aggregated.trades, start, end, settings.summary);
        tracing::info!(
            %start,
            %end,
            trades = summary.total_trades,
            win_rate = summary.win_rate,
            "backtest complete"
        );

        Ok(BacktestReport {
            start,
            end,
            status: panel.status,
            panel,
            trades: aggregated.trades,
            stats: aggregated.stats,
            summary,
        })
    }
}

/// Fetches per-candidate daily and intraday bars through the data port and
/// runs the state machine.
pub struct DataPortSimulator<'c, 'a> {
    context: &'c RunContext<'a>,
}

impl<'c, 'a> DataPortSimulator<'c, 'a> {
    pub fn new(context: &'c RunContext<'a>) -> Self {
        Self { context }
    }
}

impl CandidateSimulator for DataPortSimulator<'_, '_> {
    fn simulate(&self, candidate: &Candidate) -> SimulationOutcome {
        let settings = &self.context.config.backtest;
        let day = candidate.date;
        let until = day + Duration::days(settings.exit_lookahead_days);
        let ticker = candidate.ticker.as_str();

        let data = self.context.data;
        let daily = data.fetch_daily(ticker, day - Duration::days(settings.daily_lookback_days), until);
        let intraday = data.fetch_intraday(
            ticker,
            day - Duration::days(settings.intraday_preload_days),
            until,
            Interval::FIFTEEN_MINUTES,
        );
        match (daily, intraday) {
            (Ok(daily), Ok(intraday)) => {
                simulate_trade(ticker, day, &intraday.bars, &daily.bars, &settings.simulation)
            }
            (Err(e), _) | (_, Err(e)) => {
                tracing::debug!(ticker, date = %day, error = %e, "candidate data unavailable");
                SimulationOutcome::NoTrade(RejectReason::DataUnavailable)
            }
        }
    }
}
