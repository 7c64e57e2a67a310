//! Backtest summary statistics over executed trades.

use crate::domain::trade::Trade;
use chrono::NaiveDate;

const DAYS_PER_YEAR: f64 = 365.25;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryParams {
    pub risk_free_rate: f64,
    pub option_leverage: f64,
    pub option_notional: f64,
}

impl Default for SummaryParams {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.05,
            option_leverage: 10.0,
            option_notional: 1000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestSummary {
    pub total_trades: usize,
    pub win_rate: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub expectancy: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub profit_factor: f64,
    pub trades_per_year: f64,
    pub est_annual_return: f64,
    pub cumulative_net: f64,
    pub option_gain: f64,
    pub sharpe_ratio: f64,
    pub params: SummaryParams,
}

/// One `(Metric, Value, Note)` row of the rendered summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    pub metric: String,
    pub value: String,
    pub note: String,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Sample standard deviation; 0 for fewer than two values.
fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

impl BacktestSummary {
    /// Statistics over `trades` annualized across `[start, end]`.
    pub fn compute(trades: &[Trade], start: NaiveDate, end: NaiveDate, params: SummaryParams) -> Self {
        let returns: Vec<f64> = trades.iter().map(|t| t.return_pct).collect();
        let wins: Vec<f64> = returns.iter().copied().filter(|&r| r > 0.0).collect();
        let losses: Vec<f64> = returns.iter().copied().filter(|&r| r <= 0.0).collect();

        let total_trades = trades.len();
        let win_rate = if total_trades > 0 {
            wins.len() as f64 / total_trades as f64
        } else {
            0.0
        };
        let avg_win = mean(&wins);
        let avg_loss = mean(&losses);
        let expectancy = win_rate * avg_win + (1.0 - win_rate) * avg_loss;

        let gross_profit: f64 = trades.iter().map(|t| t.net).filter(|&n| n > 0.0).sum();
        let gross_loss: f64 = trades
            .iter()
            .map(|t| t.net)
            .filter(|&n| n <= 0.0)
            .sum::<f64>()
            .abs();
        let profit_factor = if gross_loss > 0.0 {
            gross_profit / gross_loss
        } else if total_trades > 0 {
            f64::INFINITY
        } else {
            0.0
        };

        let span_days = (end - start).num_days().max(1) as f64;
        let trades_per_year = total_trades as f64 / (span_days / DAYS_PER_YEAR);
        let est_annual_return = expectancy * trades_per_year;

        let std = sample_std(&returns);
        let sharpe_ratio = if total_trades > 1 && std > 0.0 {
            (est_annual_return - params.risk_free_rate) / (std * trades_per_year.sqrt())
        } else {
            0.0
        };

        BacktestSummary {
            total_trades,
            win_rate,
            avg_win,
            avg_loss,
            expectancy,
            gross_profit,
            gross_loss,
            profit_factor,
            trades_per_year,
            est_annual_return,
            cumulative_net: trades.iter().map(|t| t.net).sum(),
            option_gain: trades
                .iter()
                .map(|t| t.option_net(params.option_notional, params.option_leverage))
                .sum(),
            sharpe_ratio,
            params,
        }
    }

    pub fn rows(&self) -> Vec<SummaryRow> {
        let pct = |v: f64| format!("{:.2}%", v * 100.0);
        let row = |metric: &str, value: String, note: String| SummaryRow {
            metric: metric.to_string(),
            value,
            note,
        };
        let bond = format!("Compare to {:.0}% bond", self.params.risk_free_rate * 100.0);
        vec![
            row("Total Trades", self.total_trades.to_string(), String::new()),
            row("Win Rate", pct(self.win_rate), String::new()),
            row("Avg Win %", pct(self.avg_win), String::new()),
            row("Avg Loss %", pct(self.avg_loss), String::new()),
            row("Profit Factor (Gross)", format!("{:.2}", self.profit_factor), String::new()),
            row("Expectancy (Per Trade)", pct(self.expectancy), String::new()),
            row("Est. Annual Return", pct(self.est_annual_return), bond),
            row(
                "Cumulative Net ($)",
                format!("{:.2}", self.cumulative_net),
                "Total profit per 1 share traded".to_string(),
            ),
            row(
                "Est. Option Gain ($)",
                format!("${:.2}", self.option_gain),
                format!(
                    "Based on ${} pos, {:.0}x leverage",
                    dollars_short(self.params.option_notional),
                    self.params.option_leverage
                ),
            ),
            row(
                "Annualized Sharpe Ratio",
                format!("{:.2}", self.sharpe_ratio),
                "Excess return per unit of risk vs. bond".to_string(),
            ),
        ]
    }
}

/// `1000` as `1k`, `2500` as `2.5k`; smaller amounts unchanged.
fn dollars_short(amount: f64) -> String {
    if amount.abs() >= 1000.0 {
        let k = amount / 1000.0;
        if k.fract() == 0.0 {
            format!("{:.0}k", k)
        } else {
            format!("{}k", (k * 10.0).round() / 10.0)
        }
    } else {
        format!("{:.0}", amount)
    }
}
