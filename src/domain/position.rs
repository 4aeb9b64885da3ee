//! Open positions and closed trades.

use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short.
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "LONG",
            Direction::Short => "SHORT",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    pub direction: Direction,
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,
    pub size: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub entry_commission: f64,
}

impl Position {
    pub fn is_long(&self) -> bool {
        self.direction == Direction::Long
    }

    pub fn is_short(&self) -> bool {
        self.direction == Direction::Short
    }

    pub fn notional(&self, price: f64) -> f64 {
        self.size * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.direction.sign() * self.size * (price - self.entry_price)
    }

    /// Whether a bar spanning `low..=high` touched the stop.
    pub fn stop_hit(&self, low: f64, high: f64) -> bool {
        match self.direction {
            Direction::Long => low <= self.stop_loss,
            Direction::Short => high >= self.stop_loss,
        }
    }

    /// Whether a bar spanning `low..=high` touched the target.
    pub fn target_hit(&self, low: f64, high: f64) -> bool {
        match self.direction {
            Direction::Long => high >= self.take_profit,
            Direction::Short => low <= self.take_profit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    EndOfData,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::StopLoss => "STOP_LOSS",
            ExitReason::TakeProfit => "TAKE_PROFIT",
            ExitReason::EndOfData => "END_OF_DATA",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClosedTrade {
    pub symbol: String,
    pub direction: Direction,
    pub size: f64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub entry_time: NaiveDateTime,
    pub exit_time: NaiveDateTime,
    pub exit_reason: ExitReason,
    /// Net of both commissions.
    pub pnl: f64,
    pub commission: f64,
}

impl ClosedTrade {
    pub fn holding_hours(&self) -> f64 {
        (self.exit_time - self.entry_time).num_seconds() as f64 / 3600.0
    }

    /// PnL relative to the entry notional, in percent.
    pub fn return_pct(&self) -> f64 {
        let notional = self.size * self.entry_price;
        if notional == 0.0 {
            0.0
        } else {
            self.pnl / notional * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::hour;

    fn sample_long_position() -> Position {
        Position {
            symbol: "BTCUSDT".into(),
            direction: Direction::Long,
            entry_time: hour(0),
            entry_price: 50.0,
            size: 100.0,
            stop_loss: 45.0,
            take_profit: 60.0,
            entry_commission: 0.0,
        }
    }

    fn sample_short_position() -> Position {
        Position {
            symbol: "ETHUSDT".into(),
            direction: Direction::Short,
            entry_time: hour(0),
            entry_price: 100.0,
            size: 100.0,
            stop_loss: 110.0,
            take_profit: 80.0,
            entry_commission: 0.0,
        }
    }

    #[test]
    fn direction_flags() {
        assert!(sample_long_position().is_long());
        assert!(sample_short_position().is_short());
        assert_eq!(Direction::Short.to_string(), "SHORT");
    }

    #[test]
    fn unrealized_pnl_long() {
        let pos = sample_long_position();
        assert!((pos.unrealized_pnl(55.0) - 500.0).abs() < f64::EPSILON);
        assert!((pos.unrealized_pnl(45.0) + 500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unrealized_pnl_short() {
        let pos = sample_short_position();
        assert!((pos.unrealized_pnl(90.0) - 1000.0).abs() < f64::EPSILON);
        assert!((pos.unrealized_pnl(110.0) + 1000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn long_stop_uses_bar_low() {
        let pos = sample_long_position();
        assert!(pos.stop_hit(44.0, 52.0));
        assert!(pos.stop_hit(45.0, 52.0));
        assert!(!pos.stop_hit(46.0, 70.0));
    }

    #[test]
    fn short_stop_uses_bar_high() {
        let pos = sample_short_position();
        assert!(pos.stop_hit(95.0, 111.0));
        assert!(pos.stop_hit(95.0, 110.0));
        assert!(!pos.stop_hit(70.0, 109.0));
    }

    #[test]
    fn long_target_uses_bar_high() {
        let pos = sample_long_position();
        assert!(pos.target_hit(50.0, 61.0));
        assert!(pos.target_hit(50.0, 60.0));
        assert!(!pos.target_hit(40.0, 59.0));
    }

    #[test]
    fn short_target_uses_bar_low() {
        let pos = sample_short_position();
        assert!(pos.target_hit(79.0, 100.0));
        assert!(!pos.target_hit(81.0, 120.0));
    }

    #[test]
    fn closed_trade_holding_and_return() {
        let trade = ClosedTrade {
            symbol: "BTCUSDT".into(),
            direction: Direction::Long,
            size: 10.0,
            entry_price: 50.0,
            exit_price: 55.0,
            stop_loss: 45.0,
            take_profit: 55.0,
            entry_time: hour(0),
            exit_time: hour(6),
            exit_reason: ExitReason::TakeProfit,
            pnl: 50.0,
            commission: 0.0,
        };
        assert!((trade.holding_hours() - 6.0).abs() < f64::EPSILON);
        assert!((trade.return_pct() - 10.0).abs() < 1e-9);
        assert_eq!(trade.exit_reason.to_string(), "TAKE_PROFIT");
    }
}
