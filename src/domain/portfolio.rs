//! Multi-symbol portfolio: entries from strategy signals, exits at stop or
//! target, equity tracking.

use chrono::NaiveDateTime;
use log::{debug, info};
use std::collections::HashMap;

use super::execution::ExecutionConfig;
use super::indicator::IndicatorType;
use super::market_data::SymbolData;
use super::position::{ClosedTrade, ExitReason, Position};
use super::risk::RiskAssessor;
use super::signal::SignalContext;
use super::strategy::SignalGenerator;

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub time: NaiveDateTime,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioManager {
    /// Realized capital; changes only when a position closes.
    pub capital: f64,
    pub initial_capital: f64,
    /// Fraction of capital risked per trade (0.01 = 1 %).
    pub risk_per_trade: f64,
    pub max_open_positions: usize,
    pub atr: IndicatorType,
    pub risk: RiskAssessor,
    pub execution: ExecutionConfig,
    pub open_positions: HashMap<String, Position>,
    pub trade_history: Vec<ClosedTrade>,
    pub equity_curve: Vec<EquityPoint>,
    pub verbose: bool,
}

impl PortfolioManager {
    pub fn new(initial_capital: f64, risk_per_trade: f64, max_open_positions: usize) -> Self {
        PortfolioManager {
            capital: initial_capital,
            initial_capital,
            risk_per_trade,
            max_open_positions,
            atr: IndicatorType::ATR,
            risk: RiskAssessor::default(),
            execution: ExecutionConfig::default(),
            open_positions: HashMap::new(),
            trade_history: Vec::new(),
            equity_curve: Vec::new(),
            verbose: false,
        }
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.open_positions.contains_key(symbol)
    }

    pub fn position_count(&self) -> usize {
        self.open_positions.len()
    }

    /// Process candle `index` of `data`: manage the open position on this
    /// symbol if there is one, otherwise look for an entry while below the
    /// position limit.
    pub fn update_for_symbol(
        &mut self,
        strategy: &mut dyn SignalGenerator,
        data: &SymbolData,
        index: usize,
    ) {
        if index >= data.len() {
            return;
        }
        if self.open_positions.contains_key(&data.symbol) {
            self.manage_open_position(data, index);
        } else if self.open_positions.len() < self.max_open_positions {
            self.check_new_entry(strategy, data, index);
        }
    }

    fn manage_open_position(&mut self, data: &SymbolData, index: usize) {
        let candle = &data.candles[index];
        let Some(position) = self.open_positions.get(&data.symbol) else {
            return;
        };
        let exit = if position.stop_hit(candle.low, candle.high) {
            Some((position.stop_loss, ExitReason::StopLoss))
        } else if position.target_hit(candle.low, candle.high) {
            Some((position.take_profit, ExitReason::TakeProfit))
        } else {
            None
        };
        if let Some((level, reason)) = exit {
            self.close_position(&data.symbol, level, reason, candle.close_time);
        }
    }

    fn check_new_entry(&mut self, strategy: &mut dyn SignalGenerator, data: &SymbolData, index: usize) {
        let ctx = SignalContext::new(data, index);
        let Some(direction) = strategy.check_signal(&ctx).direction() else {
            return;
        };
        let candle = ctx.candle();

        let Some(atr) = data.simple_at(self.atr, index).filter(|a| *a > 0.0) else {
            debug!("{} {}: no valid {}, skipping entry", data.symbol, candle.close_time, self.atr);
            return;
        };

        let entry_price = self.execution.entry_fill(direction, candle.close);
        let stop_loss = self.risk.initial_stop_loss(candle.close, atr, direction);
        let size = self
            .risk
            .position_size(self.capital, self.risk_per_trade, entry_price, stop_loss);
        if size <= 0.0 {
            debug!("{} {}: zero position size, skipping entry", data.symbol, candle.close_time);
            return;
        }
        let take_profit = self.risk.resolve_take_profit(
            strategy.take_profit(&ctx, direction),
            entry_price,
            stop_loss,
            direction,
        );

        let position = Position {
            symbol: data.symbol.clone(),
            direction,
            entry_time: candle.close_time,
            entry_price,
            size,
            stop_loss,
            take_profit,
            entry_commission: self.execution.commission(size * entry_price),
        };
        if self.verbose {
            info!(
                "OPEN {} {} @ {:.6} size {:.6} SL {:.6} TP {:.6} ({})",
                position.direction,
                position.symbol,
                position.entry_price,
                position.size,
                position.stop_loss,
                position.take_profit,
                position.entry_time
            );
        }
        self.open_positions.insert(data.symbol.clone(), position);
    }

    /// Close `symbol` at market `level` and realize the PnL.
    pub fn close_position(
        &mut self,
        symbol: &str,
        level: f64,
        reason: ExitReason,
        exit_time: NaiveDateTime,
    ) -> Option<&ClosedTrade> {
        let position = self.open_positions.remove(symbol)?;
        let exit_price = self.execution.exit_fill(position.direction, level);
        let exit_commission = self.execution.commission(position.size * exit_price);
        let commission = position.entry_commission + exit_commission;
        let pnl = position.direction.sign() * (exit_price - position.entry_price) * position.size
            - commission;
        self.capital += pnl;

        let trade = ClosedTrade {
            symbol: position.symbol,
            direction: position.direction,
            size: position.size,
            entry_price: position.entry_price,
            exit_price,
            stop_loss: position.stop_loss,
            take_profit: position.take_profit,
            entry_time: position.entry_time,
            exit_time,
            exit_reason: reason,
            pnl,
            commission,
        };
        if self.verbose {
            info!(
                "CLOSE {} {} @ {:.6} ({}) PnL {:+.2} capital {:.2}",
                trade.direction, trade.symbol, trade.exit_price, trade.exit_reason, trade.pnl, self.capital
            );
        }
        self.trade_history.push(trade);
        self.trade_history.last()
    }

    /// Capital plus unrealized PnL; positions without a price count at entry.
    pub fn equity(&self, prices: &HashMap<String, f64>) -> f64 {
        let unrealized: f64 = self
            .open_positions
            .values()
            .filter_map(|pos| prices.get(&pos.symbol).map(|&p| pos.unrealized_pnl(p)))
            .sum();
        self.capital + unrealized
    }

    pub fn mark_to_market(&mut self, time: NaiveDateTime, prices: &HashMap<String, f64>) {
        let equity = self.equity(prices);
        self.equity_curve.push(EquityPoint { time, equity });
    }

    /// Close every open position at its last price with `EndOfData`.
    pub fn close_all(&mut self, time: NaiveDateTime, prices: &HashMap<String, f64>) {
        let mut symbols: Vec<String> = self.open_positions.keys().cloned().collect();
        symbols.sort();
        for symbol in symbols {
            let Some(level) = prices
                .get(&symbol)
                .copied()
                .or_else(|| self.open_positions.get(&symbol).map(|p| p.entry_price))
            else {
                continue;
            };
            self.close_position(&symbol, level, ExitReason::EndOfData, time);
        }
    }
}
