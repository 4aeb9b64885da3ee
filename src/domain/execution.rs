//! Fill simulation: slippage by side and commission on notional.
//!
//! Both percentages are in percent units (0.1 = 0.1 %). The defaults are
//! zero, which gives fills exactly at the requested level.

use super::position::Direction;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExecutionConfig {
    pub commission_pct: f64,
    pub slippage_pct: f64,
}

impl ExecutionConfig {
    /// Commission charged on a fill of `notional`.
    pub fn commission(&self, notional: f64) -> f64 {
        notional.abs() * self.commission_pct / 100.0
    }

    /// Price paid when opening a position in `direction` at `market_price`.
    pub fn entry_fill(&self, direction: Direction, market_price: f64) -> f64 {
        match direction {
            Direction::Long => apply_slippage_buy(market_price, self.slippage_pct),
            Direction::Short => apply_slippage_sell(market_price, self.slippage_pct),
        }
    }

    /// Price received when closing a position in `direction` at `market_price`.
    pub fn exit_fill(&self, direction: Direction, market_price: f64) -> f64 {
        match direction {
            Direction::Long => apply_slippage_sell(market_price, self.slippage_pct),
            Direction::Short => apply_slippage_buy(market_price, self.slippage_pct),
        }
    }
}

/// Buying (long entry, short cover) fills above the market.
pub fn apply_slippage_buy(market_price: f64, slippage_pct: f64) -> f64 {
    market_price * (1.0 + slippage_pct / 100.0)
}

/// Selling (long exit, short entry) fills below the market.
pub fn apply_slippage_sell(market_price: f64, slippage_pct: f64) -> f64 {
    market_price * (1.0 - slippage_pct / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config() -> ExecutionConfig {
        ExecutionConfig {
            commission_pct: 0.1,
            slippage_pct: 0.05,
        }
    }

    #[test]
    fn commission_on_notional() {
        let config = make_config();
        assert!((config.commission(10_000.0) - 10.0).abs() < 1e-9);
        assert!((config.commission(-10_000.0) - 10.0).abs() < 1e-9);
        assert!(ExecutionConfig::default().commission(10_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn long_fills() {
        let config = make_config();
        assert!((config.entry_fill(Direction::Long, 100.0) - 100.05).abs() < 1e-9);
        assert!((config.exit_fill(Direction::Long, 100.0) - 99.95).abs() < 1e-9);
    }

    #[test]
    fn short_fills() {
        let config = make_config();
        assert!((config.entry_fill(Direction::Short, 100.0) - 99.95).abs() < 1e-9);
        assert!((config.exit_fill(Direction::Short, 100.0) - 100.05).abs() < 1e-9);
    }

    #[test]
    fn zero_slippage_is_identity() {
        let config = ExecutionConfig::default();
        assert_eq!(config.entry_fill(Direction::Long, 42.5), 42.5);
        assert_eq!(config.exit_fill(Direction::Short, 42.5), 42.5);
    }
}
