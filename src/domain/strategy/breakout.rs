//! Donchian channel breakout in both directions.
//!
//! A close above the previous bar's upper channel is a BUY unless already
//! long; a close below the previous lower channel is a SELL unless already
//! short.

use crate::domain::indicator::IndicatorType;
use crate::domain::position::Direction;
use crate::domain::signal::{Signal, SignalContext};
use crate::domain::strategy::{channel_at, SignalGenerator};

#[derive(Debug, Clone, PartialEq)]
pub struct BreakoutStrategy {
    pub period: usize,
    pub channel: IndicatorType,
}

impl BreakoutStrategy {
    pub fn new(period: usize) -> Self {
        BreakoutStrategy {
            period,
            channel: IndicatorType::Donchian {
                lower_period: period,
                upper_period: period,
            },
        }
    }
}

impl SignalGenerator for BreakoutStrategy {
    fn name(&self) -> &str {
        "Breakout"
    }

    fn required_indicators(&self) -> Vec<IndicatorType> {
        vec![self.channel]
    }

    fn check_signal(&mut self, ctx: &SignalContext<'_>) -> Signal {
        if ctx.index < self.period {
            return Signal::Hold;
        }
        let Some((upper, lower)) = channel_at(ctx.data, self.channel, ctx.index - 1) else {
            return Signal::Hold;
        };
        let close = ctx.candle().close;

        if ctx.current_direction != Some(Direction::Long) && close > upper {
            Signal::Buy
        } else if ctx.current_direction != Some(Direction::Short) && close < lower {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }

    fn describe(&self) -> String {
        format!(
            "Breakout: close beyond the previous {} channel",
            self.channel
        )
    }
}
