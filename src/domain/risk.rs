//! ATR-based stop placement and fixed-fraction position sizing.

use super::position::Direction;

#[derive(Debug, Clone, PartialEq)]
pub struct RiskAssessor {
    pub atr_multiplier_sl: f64,
    /// Target distance as a multiple of the stop distance, used when the
    /// strategy has no usable take-profit.
    pub reward_ratio: f64,
}

impl Default for RiskAssessor {
    fn default() -> Self {
        RiskAssessor {
            atr_multiplier_sl: 1.5,
            reward_ratio: 2.0,
        }
    }
}

impl RiskAssessor {
    pub fn new(atr_multiplier_sl: f64, reward_ratio: f64) -> Self {
        RiskAssessor {
            atr_multiplier_sl,
            reward_ratio,
        }
    }

    /// close - ATR * k for longs, close + ATR * k for shorts.
    pub fn initial_stop_loss(&self, close: f64, atr: f64, direction: Direction) -> f64 {
        close - direction.sign() * atr * self.atr_multiplier_sl
    }

    /// Units such that hitting `stop` loses `balance * risk_pct`.
    /// Zero when the distance to the stop is not a positive finite number.
    pub fn position_size(&self, balance: f64, risk_pct: f64, entry: f64, stop: f64) -> f64 {
        let risk_per_unit = (entry - stop).abs();
        if !(risk_per_unit.is_finite() && risk_per_unit > 0.0) {
            return 0.0;
        }
        let size = balance * risk_pct / risk_per_unit;
        if size.is_finite() && size > 0.0 {
            size
        } else {
            0.0
        }
    }

    pub fn fallback_take_profit(&self, entry: f64, stop: f64, direction: Direction) -> f64 {
        entry + direction.sign() * (entry - stop).abs() * self.reward_ratio
    }

    /// `candidate` if it lies on the profitable side of `entry`, otherwise
    /// the reward-ratio target.
    pub fn resolve_take_profit(
        &self,
        candidate: Option<f64>,
        entry: f64,
        stop: f64,
        direction: Direction,
    ) -> f64 {
        match candidate {
            Some(tp) if tp.is_finite() && direction.sign() * (tp - entry) > 0.0 => tp,
            _ => self.fallback_take_profit(entry, stop, direction),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn stop_loss_by_direction() {
        let risk = RiskAssessor::new(2.0, 2.0);
        assert_relative_eq!(risk.initial_stop_loss(100.0, 1.5, Direction::Long), 97.0);
        assert_relative_eq!(risk.initial_stop_loss(100.0, 1.5, Direction::Short), 103.0);
    }

    #[test]
    fn default_multiplier() {
        let risk = RiskAssessor::default();
        assert_relative_eq!(risk.initial_stop_loss(100.0, 2.0, Direction::Long), 97.0);
    }

    #[test]
    fn size_risks_fixed_fraction() {
        let risk = RiskAssessor::default();
        let size = risk.position_size(10_000.0, 0.01, 100.0, 98.0);
        assert_relative_eq!(size, 50.0);
        // Short side: stop above entry.
        assert_relative_eq!(risk.position_size(10_000.0, 0.01, 100.0, 102.0), 50.0);
    }

    #[test]
    fn size_zero_for_degenerate_stop() {
        let risk = RiskAssessor::default();
        assert_eq!(risk.position_size(10_000.0, 0.01, 100.0, 100.0), 0.0);
        assert_eq!(risk.position_size(10_000.0, 0.01, 100.0, f64::NAN), 0.0);
        assert_eq!(risk.position_size(0.0, 0.01, 100.0, 99.0), 0.0);
    }

    #[test]
    fn fallback_take_profit_uses_reward_ratio() {
        let risk = RiskAssessor::new(1.5, 2.0);
        assert_relative_eq!(risk.fallback_take_profit(100.0, 97.0, Direction::Long), 106.0);
        assert_relative_eq!(risk.fallback_take_profit(100.0, 103.0, Direction::Short), 94.0);
    }

    #[test]
    fn resolve_take_profit_rejects_wrong_side() {
        let risk = RiskAssessor::new(1.5, 2.0);
        assert_relative_eq!(
            risk.resolve_take_profit(Some(104.0), 100.0, 97.0, Direction::Long),
            104.0
        );
        assert_relative_eq!(
            risk.resolve_take_profit(Some(99.0), 100.0, 97.0, Direction::Long),
            106.0
        );
        assert_relative_eq!(
            risk.resolve_take_profit(None, 100.0, 103.0, Direction::Short),
            94.0
        );
        assert_relative_eq!(
            risk.resolve_take_profit(Some(95.0), 100.0, 103.0, Direction::Short),
            95.0
        );
    }
}
