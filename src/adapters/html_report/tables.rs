//! HTML fragments for the report: summary, metrics, breakdowns, trade log
//! and the monthly returns heatmap.

use crate::domain::metrics::{DirectionResult, Metrics, SymbolResult};
use crate::domain::portfolio::EquityPoint;
use crate::domain::position::ClosedTrade;
use crate::ports::report_port::ReportData;
use chrono::Datelike;
use std::collections::BTreeMap;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn sign_class(value: f64) -> &'static str {
    if value > 0.0 {
        "pos"
    } else if value < 0.0 {
        "neg"
    } else {
        ""
    }
}

fn pct(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

fn row(label: &str, value: &str) -> String {
    format!("<tr><th>{}</th><td>{}</td></tr>\n", escape(label), value)
}

fn signed_cell(value: f64, text: String) -> String {
    format!("<td class=\"{}\">{}</td>", sign_class(value), text)
}

pub fn render_summary(report: &ReportData<'_>) -> String {
    let curve = &report.portfolio.equity_curve;
    let period = match (curve.first(), curve.last()) {
        (Some(first), Some(last)) => format!(
            "{} to {}",
            first.time.format("%Y-%m-%d %H:%M"),
            last.time.format("%Y-%m-%d %H:%M")
        ),
        _ => "n/a".to_string(),
    };

    let mut out = String::from("<table class=\"summary\">\n");
    out.push_str(&row("Strategy", &escape(report.strategy_description)));
    out.push_str(&row("Symbols", &escape(&report.symbols.join(", "))));
    out.push_str(&row("Interval", &escape(report.interval)));
    out.push_str(&row("Period", &period));
    out.push_str(&row(
        "Initial capital",
        &format!("{:.2}", report.portfolio.initial_capital),
    ));
    out.push_str("</table>");
    out
}

pub fn render_metrics_table(m: &Metrics) -> String {
    let profit_factor = if m.profit_factor.is_infinite() {
        "∞".to_string()
    } else {
        format!("{:.2}", m.profit_factor)
    };

    let mut out = String::from("<table>\n");
    out.push_str(&row("Final capital", &format!("{:.2}", m.final_capital)));
    out.push_str(&format!(
        "<tr><th>Net PnL</th>{}</tr>\n",
        signed_cell(m.net_pnl, format!("{:+.2}", m.net_pnl))
    ));
    out.push_str(&format!(
        "<tr><th>Total return</th>{}</tr>\n",
        signed_cell(m.total_return, pct(m.total_return))
    ));
    out.push_str(&row("Annualized return", &pct(m.annualized_return)));
    out.push_str(&row("Sharpe ratio", &format!("{:.2}", m.sharpe_ratio)));
    out.push_str(&row("Sortino ratio", &format!("{:.2}", m.sortino_ratio)));
    out.push_str(&row("Max drawdown", &pct(m.max_drawdown)));
    out.push_str(&row(
        "Max drawdown duration",
        &format!("{} bars", m.max_drawdown_duration),
    ));
    out.push_str(&row(
        "Trades",
        &format!(
            "{} ({} won, {} lost, {} breakeven)",
            m.total_trades, m.trades_won, m.trades_lost, m.trades_breakeven
        ),
    ));
    out.push_str(&row("Win rate", &pct(m.win_rate)));
    out.push_str(&row("Profit factor", &profit_factor));
    out.push_str(&row("Average win", &format!("{:.2}", m.avg_win)));
    out.push_str(&row("Average loss", &format!("{:.2}", m.avg_loss)));
    out.push_str(&row("Largest win", &format!("{:.2}", m.largest_win)));
    out.push_str(&row("Largest loss", &format!("{:.2}", m.largest_loss)));
    out.push_str(&row(
        "Average holding",
        &format!("{:.1} h", m.avg_holding_hours),
    ));
    out.push_str(&row("Commission paid", &format!("{:.2}", m.total_commission)));
    out.push_str("</table>");
    out
}

/// Empty for single-symbol runs.
pub fn render_symbol_table(results: &[SymbolResult]) -> String {
    if results.is_empty() {
        return String::new();
    }
    let mut out = String::from("<h2>By Symbol</h2>\n<table>\n");
    out.push_str(
        "<tr><th>Symbol</th><th>Trades</th><th>Won</th><th>Lost</th>\
         <th>Win rate</th><th>PnL</th><th>Avg profit</th><th>Avg loss</th></tr>\n",
    );
    for r in results {
        out.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>{}<td>{:.2}</td><td>{:.2}</td></tr>\n",
            escape(&r.symbol),
            r.total_trades,
            r.winning_trades,
            r.losing_trades,
            pct(r.win_rate),
            signed_cell(r.total_pnl, format!("{:+.2}", r.total_pnl)),
            r.avg_profit,
            r.avg_loss,
        ));
    }
    out.push_str("</table>");
    out
}

pub fn render_direction_table(results: &[DirectionResult]) -> String {
    if results.is_empty() {
        return "<p class=\"muted\">No trades.</p>".to_string();
    }
    let mut out = String::from("<table>\n");
    out.push_str(
        "<tr><th>Direction</th><th>Trades</th><th>Won</th><th>Win rate</th>\
         <th>PnL</th><th>Avg PnL</th></tr>\n",
    );
    for r in results {
        out.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td>{}{}</tr>\n",
            r.direction,
            r.total_trades,
            r.winning_trades,
            pct(r.win_rate),
            signed_cell(r.total_pnl, format!("{:+.2}", r.total_pnl)),
            signed_cell(r.avg_pnl, format!("{:+.2}", r.avg_pnl)),
        ));
    }
    out.push_str("</table>");
    out
}

pub fn render_trade_log(trades: &[ClosedTrade]) -> String {
    if trades.is_empty() {
        return "<p class=\"muted\">No trades recorded.</p>".to_string();
    }

    let mut sorted: Vec<&ClosedTrade> = trades.iter().collect();
    sorted.sort_by_key(|t| t.entry_time);

    let mut out = String::from("<table>\n");
    out.push_str(
        "<tr><th>#</th><th>Symbol</th><th>Side</th><th>Entry time</th><th>Exit time</th>\
         <th>Size</th><th>Entry</th><th>Exit</th><th>SL</th><th>TP</th><th>Reason</th>\
         <th>PnL</th><th>Return</th></tr>\n",
    );
    for (i, t) in sorted.iter().enumerate() {
        out.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{:.6}</td>\
             <td>{:.6}</td><td>{:.6}</td><td>{:.6}</td><td>{:.6}</td><td>{}</td>{}{}</tr>\n",
            i + 1,
            escape(&t.symbol),
            t.direction,
            t.entry_time.format("%Y-%m-%d %H:%M"),
            t.exit_time.format("%Y-%m-%d %H:%M"),
            t.size,
            t.entry_price,
            t.exit_price,
            t.stop_loss,
            t.take_profit,
            t.exit_reason,
            signed_cell(t.pnl, format!("{:+.2}", t.pnl)),
            signed_cell(t.pnl, format!("{:+.2}%", t.return_pct())),
        ));
    }
    out.push_str("</table>");
    out
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyReturns {
    pub year: i32,
    pub month: u32,
    pub return_pct: f64,
}

/// Month-end equity against the previous month-end. The first month is
/// measured from the first equity point.
pub fn compute_monthly_returns(equity_curve: &[EquityPoint]) -> Vec<MonthlyReturns> {
    let Some(first) = equity_curve.first() else {
        return Vec::new();
    };

    let mut month_end: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    for point in equity_curve {
        month_end.insert((point.time.year(), point.time.month()), point.equity);
    }

    let mut reference = first.equity;
    month_end
        .into_iter()
        .map(|((year, month), end)| {
            let return_pct = if reference > 0.0 {
                (end - reference) / reference
            } else {
                0.0
            };
            reference = end;
            MonthlyReturns {
                year,
                month,
                return_pct,
            }
        })
        .collect()
}

fn heat_color(ret: f64) -> &'static str {
    if ret >= 0.10 {
        "#15803d"
    } else if ret >= 0.05 {
        "#4ade80"
    } else if ret > 0.0 {
        "#dcfce7"
    } else if ret == 0.0 {
        "#ffffff"
    } else if ret > -0.05 {
        "#fee2e2"
    } else if ret > -0.10 {
        "#f87171"
    } else {
        "#b91c1c"
    }
}

fn heat_cell(ret: f64) -> String {
    format!(
        "<td style=\"background:{}\">{:+.1}%</td>",
        heat_color(ret),
        ret * 100.0
    )
}

pub fn render_monthly_returns(returns: &[MonthlyReturns]) -> String {
    if returns.is_empty() {
        return "<p class=\"muted\">Insufficient data for monthly returns.</p>".to_string();
    }

    let mut years: BTreeMap<i32, [Option<f64>; 12]> = BTreeMap::new();
    for r in returns {
        years.entry(r.year).or_insert([None; 12])[(r.month - 1) as usize] = Some(r.return_pct);
    }

    let mut out = String::from("<table class=\"heat\">\n<tr><th>Year</th>");
    for m in MONTHS {
        out.push_str(&format!("<th>{m}</th>"));
    }
    out.push_str("<th>YTD</th></tr>\n");

    for (year, months) in &years {
        out.push_str(&format!("<tr><th>{year}</th>"));
        let mut ytd = 1.0_f64;
        for ret in months {
            match ret {
                Some(r) => {
                    ytd *= 1.0 + r;
                    out.push_str(&heat_cell(*r));
                }
                None => out.push_str("<td class=\"muted\">-</td>"),
            }
        }
        out.push_str(&heat_cell(ytd - 1.0));
        out.push_str("</tr>\n");
    }
    out.push_str("</table>");
    out
}
