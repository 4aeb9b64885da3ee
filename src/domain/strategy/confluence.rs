//! Mean reversion at structural support or resistance.
//!
//! BUY needs three things at once: the close within 0.1 % of the Donchian
//! lower channel, at or below the lower Bollinger band, and RSI oversold.
//! SELL mirrors it at the upper channel and band.

use crate::domain::indicator::IndicatorType;
use crate::domain::position::Direction;
use crate::domain::signal::{Signal, SignalContext};
use crate::domain::strategy::{bands_at, bollinger_type, channel_at, SignalGenerator};

const CHANNEL_TOLERANCE: f64 = 0.001;

#[derive(Debug, Clone, PartialEq)]
pub struct ConfluenceStrategy {
    pub channel: IndicatorType,
    pub bands: IndicatorType,
    pub rsi: IndicatorType,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
}

impl ConfluenceStrategy {
    pub fn new(
        dc_period: usize,
        bb_period: usize,
        bb_std: f64,
        rsi_period: usize,
        rsi_oversold: f64,
        rsi_overbought: f64,
    ) -> Self {
        ConfluenceStrategy {
            channel: IndicatorType::Donchian {
                lower_period: dc_period,
                upper_period: dc_period,
            },
            bands: bollinger_type(bb_period, bb_std),
            rsi: IndicatorType::Rsi(rsi_period),
            rsi_oversold,
            rsi_overbought,
        }
    }
}

impl Default for ConfluenceStrategy {
    fn default() -> Self {
        ConfluenceStrategy::new(20, 20, 2.0, 14, 30.0, 70.0)
    }
}

fn near(price: f64, level: f64) -> bool {
    level != 0.0 && ((price - level) / level).abs() < CHANNEL_TOLERANCE
}

impl SignalGenerator for ConfluenceStrategy {
    fn name(&self) -> &str {
        "Confluence"
    }

    fn required_indicators(&self) -> Vec<IndicatorType> {
        vec![self.channel, self.bands, self.rsi]
    }

    fn check_signal(&mut self, ctx: &SignalContext<'_>) -> Signal {
        let i = ctx.index;
        let (Some((dc_upper, dc_lower)), Some((bb_upper, _, bb_lower)), Some(rsi)) = (
            channel_at(ctx.data, self.channel, i),
            bands_at(ctx.data, self.bands, i),
            ctx.data.simple_at(self.rsi, i),
        ) else {
            return Signal::Hold;
        };
        let close = ctx.candle().close;

        if near(close, dc_lower) && close <= bb_lower && rsi < self.rsi_oversold {
            Signal::Buy
        } else if near(close, dc_upper) && close >= bb_upper && rsi > self.rsi_overbought {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }

    fn take_profit(&self, ctx: &SignalContext<'_>, _direction: Direction) -> Option<f64> {
        bands_at(ctx.data, self.bands, ctx.index).map(|(_, middle, _)| middle)
    }

    fn describe(&self) -> String {
        format!(
            "Confluence: {} edge + {} outer band + {} beyond {}/{}, exit at middle band",
            self.channel, self.bands, self.rsi, self.rsi_oversold, self.rsi_overbought
        )
    }
}
