//! Performance metrics over an equity curve and a trade history.

use chrono::NaiveDateTime;
use std::collections::BTreeMap;

use super::portfolio::EquityPoint;
use super::position::{ClosedTrade, Direction};

/// Hourly bars: 252 trading days × 24.
pub const DEFAULT_PERIODS_PER_YEAR: f64 = 252.0 * 24.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub initial_capital: f64,
    pub final_capital: f64,
    pub net_pnl: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    /// Longest stretch below a prior peak, in equity points.
    pub max_drawdown_duration: usize,
    pub total_trades: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub trades_breakeven: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub avg_holding_hours: f64,
    pub total_commission: f64,
    pub first_exit: Option<NaiveDateTime>,
    pub last_exit: Option<NaiveDateTime>,
}

impl Metrics {
    pub fn compute(
        equity_curve: &[EquityPoint],
        trades: &[ClosedTrade],
        initial_capital: f64,
        periods_per_year: f64,
        risk_free_rate: f64,
    ) -> Self {
        let final_capital = equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(initial_capital);

        let total_return = if initial_capital > 0.0 {
            (final_capital - initial_capital) / initial_capital
        } else {
            0.0
        };

        let years = equity_curve.len() as f64 / periods_per_year;
        let annualized_return = if years > 0.0 && total_return.is_finite() && total_return > -1.0 {
            (1.0 + total_return).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(equity_curve);

        let period_rf = risk_free_rate / periods_per_year;
        let (sharpe_ratio, sortino_ratio) =
            compute_risk_adjusted(equity_curve, initial_capital, period_rf, periods_per_year);

        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut trades_breakeven = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;
        let mut total_hours = 0.0_f64;
        let mut total_commission = 0.0_f64;

        for trade in trades {
            let pnl = trade.pnl;
            if pnl > 0.0 {
                trades_won += 1;
                total_wins += pnl;
                largest_win = largest_win.max(pnl);
            } else if pnl < 0.0 {
                trades_lost += 1;
                total_losses += pnl.abs();
                largest_loss = largest_loss.max(pnl.abs());
            } else {
                trades_breakeven += 1;
            }
            total_hours += trade.holding_hours();
            total_commission += trade.commission;
        }

        let total_trades = trades.len();
        let win_rate = ratio(trades_won as f64, total_trades as f64);

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        Metrics {
            initial_capital,
            final_capital,
            net_pnl: final_capital - initial_capital,
            total_return,
            annualized_return,
            sharpe_ratio,
            sortino_ratio,
            max_drawdown,
            max_drawdown_duration,
            total_trades,
            trades_won,
            trades_lost,
            trades_breakeven,
            win_rate,
            profit_factor,
            avg_win: ratio(total_wins, trades_won as f64),
            avg_loss: ratio(total_losses, trades_lost as f64),
            largest_win,
            largest_loss,
            avg_holding_hours: ratio(total_hours, total_trades as f64),
            total_commission,
            first_exit: trades.iter().map(|t| t.exit_time).min(),
            last_exit: trades.iter().map(|t| t.exit_time).max(),
        }
    }
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 { num / den } else { 0.0 }
}

/// Max fractional drawdown and its longest duration in points.
pub fn compute_drawdown(equity_curve: &[EquityPoint]) -> (f64, usize) {
    let Some(first) = equity_curve.first() else {
        return (0.0, 0);
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;
    let mut max_duration = 0usize;
    let mut duration = 0usize;

    for point in equity_curve {
        if point.equity >= peak {
            peak = point.equity;
            duration = 0;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - point.equity) / peak);
            duration += 1;
            max_duration = max_duration.max(duration);
        }
    }

    (max_dd, max_duration)
}

/// Drawdown from the running peak at every point, as a fraction.
pub fn drawdown_series(equity_curve: &[EquityPoint]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    equity_curve
        .iter()
        .map(|p| {
            peak = peak.max(p.equity);
            if peak > 0.0 { (peak - p.equity) / peak } else { 0.0 }
        })
        .collect()
}

/// Sharpe and Sortino over per-period returns, the first one measured from
/// `initial_capital`.
fn compute_risk_adjusted(
    equity_curve: &[EquityPoint],
    initial_capital: f64,
    period_rf: f64,
    periods_per_year: f64,
) -> (f64, f64) {
    if equity_curve.is_empty() {
        return (0.0, 0.0);
    }

    let equity: Vec<f64> = std::iter::once(initial_capital)
        .chain(equity_curve.iter().map(|p| p.equity))
        .collect();
    let returns: Vec<f64> = equity
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect();

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let stddev = (returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n).sqrt();
    let excess = mean - period_rf;
    let scale = periods_per_year.sqrt();

    let sharpe = if stddev > 0.0 { excess / stddev * scale } else { 0.0 };

    let downside: f64 = returns
        .iter()
        .filter(|&&r| r < period_rf)
        .map(|&r| (r - period_rf).powi(2))
        .sum();
    let downside_dev = (downside / n).sqrt();
    let sortino = if downside_dev > 0.0 {
        excess / downside_dev * scale
    } else {
        0.0
    };

    (sharpe, sortino)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolResult {
    pub symbol: String,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub total_pnl: f64,
    pub win_rate: f64,
    pub avg_profit: f64,
    pub avg_loss: f64,
}

impl SymbolResult {
    /// Breakdown by symbol, sorted by name. Empty for a single-symbol run.
    pub fn compute_per_symbol(trades: &[ClosedTrade]) -> Vec<SymbolResult> {
        let mut by_symbol: BTreeMap<&str, Vec<&ClosedTrade>> = BTreeMap::new();
        for trade in trades {
            by_symbol.entry(trade.symbol.as_str()).or_default().push(trade);
        }
        if by_symbol.len() <= 1 {
            return Vec::new();
        }

        by_symbol
            .into_iter()
            .map(|(symbol, trades)| {
                let wins: Vec<f64> = trades.iter().map(|t| t.pnl).filter(|p| *p > 0.0).collect();
                let losses: Vec<f64> = trades.iter().map(|t| t.pnl).filter(|p| *p < 0.0).collect();
                SymbolResult {
                    symbol: symbol.to_string(),
                    total_trades: trades.len(),
                    winning_trades: wins.len(),
                    losing_trades: losses.len(),
                    total_pnl: trades.iter().map(|t| t.pnl).sum(),
                    win_rate: ratio(wins.len() as f64, trades.len() as f64),
                    avg_profit: ratio(wins.iter().sum(), wins.len() as f64),
                    avg_loss: ratio(losses.iter().map(|l| l.abs()).sum(), losses.len() as f64),
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectionResult {
    pub direction: Direction,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub total_pnl: f64,
    pub win_rate: f64,
    pub avg_pnl: f64,
}

impl DirectionResult {
    /// LONG then SHORT; a side with no trades is left out.
    pub fn compute(trades: &[ClosedTrade]) -> Vec<DirectionResult> {
        [Direction::Long, Direction::Short]
            .into_iter()
            .filter_map(|direction| {
                let side: Vec<&ClosedTrade> =
                    trades.iter().filter(|t| t.direction == direction).collect();
                if side.is_empty() {
                    return None;
                }
                let total_pnl: f64 = side.iter().map(|t| t.pnl).sum();
                let winning_trades = side.iter().filter(|t| t.pnl > 0.0).count();
                Some(DirectionResult {
                    direction,
                    total_trades: side.len(),
                    winning_trades,
                    total_pnl,
                    win_rate: ratio(winning_trades as f64, side.len() as f64),
                    avg_pnl: total_pnl / side.len() as f64,
                })
            })
            .collect()
    }
}
