//! RSI extreme confirmed by a MACD histogram zero cross.

use crate::domain::indicator::IndicatorType;
use crate::domain::signal::{Signal, SignalContext};
use crate::domain::strategy::{histogram_at, SignalGenerator};

#[derive(Debug, Clone, PartialEq)]
pub struct BasicStrategy {
    pub rsi: IndicatorType,
    pub macd: IndicatorType,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
}

impl BasicStrategy {
    pub fn new(rsi_period: usize, rsi_oversold: f64, rsi_overbought: f64) -> Self {
        BasicStrategy {
            rsi: IndicatorType::Rsi(rsi_period),
            macd: IndicatorType::MACD,
            rsi_oversold,
            rsi_overbought,
        }
    }
}

impl Default for BasicStrategy {
    fn default() -> Self {
        BasicStrategy::new(14, 30.0, 70.0)
    }
}

impl SignalGenerator for BasicStrategy {
    fn name(&self) -> &str {
        "Basic"
    }

    fn required_indicators(&self) -> Vec<IndicatorType> {
        vec![self.rsi, self.macd]
    }

    fn check_signal(&mut self, ctx: &SignalContext<'_>) -> Signal {
        if ctx.index == 0 {
            return Signal::Hold;
        }
        let (Some(rsi), Some(hist), Some(prev_hist)) = (
            ctx.data.simple_at(self.rsi, ctx.index),
            histogram_at(ctx.data, self.macd, ctx.index),
            histogram_at(ctx.data, self.macd, ctx.index - 1),
        ) else {
            return Signal::Hold;
        };

        if rsi < self.rsi_oversold && hist > 0.0 && prev_hist < 0.0 {
            Signal::Buy
        } else if rsi > self.rsi_overbought && hist < 0.0 && prev_hist > 0.0 {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }

    fn describe(&self) -> String {
        format!(
            "Basic: {} < {} with MACD histogram crossing up -> BUY; {} > {} with histogram crossing down -> SELL",
            self.rsi, self.rsi_oversold, self.rsi, self.rsi_overbought
        )
    }
}
