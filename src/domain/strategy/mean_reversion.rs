//! Bollinger band touch confirmed by RSI, targeting the middle band.

use crate::domain::indicator::IndicatorType;
use crate::domain::position::Direction;
use crate::domain::signal::{Signal, SignalContext};
use crate::domain::strategy::{bands_at, bollinger_type, SignalGenerator};

#[derive(Debug, Clone, PartialEq)]
pub struct MeanReversionStrategy {
    pub bands: IndicatorType,
    pub rsi: IndicatorType,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
}

impl MeanReversionStrategy {
    pub fn new(
        bb_period: usize,
        bb_std: f64,
        rsi_period: usize,
        rsi_oversold: f64,
        rsi_overbought: f64,
    ) -> Self {
        MeanReversionStrategy {
            bands: bollinger_type(bb_period, bb_std),
            rsi: IndicatorType::Rsi(rsi_period),
            rsi_oversold,
            rsi_overbought,
        }
    }
}

impl Default for MeanReversionStrategy {
    fn default() -> Self {
        MeanReversionStrategy::new(20, 2.0, 14, 30.0, 70.0)
    }
}

impl SignalGenerator for MeanReversionStrategy {
    fn name(&self) -> &str {
        "MeanReversion"
    }

    fn required_indicators(&self) -> Vec<IndicatorType> {
        vec![self.bands, self.rsi]
    }

    fn check_signal(&mut self, ctx: &SignalContext<'_>) -> Signal {
        let (Some((upper, _, lower)), Some(rsi)) = (
            bands_at(ctx.data, self.bands, ctx.index),
            ctx.data.simple_at(self.rsi, ctx.index),
        ) else {
            return Signal::Hold;
        };
        let close = ctx.candle().close;

        if close <= lower && rsi < self.rsi_oversold {
            Signal::Buy
        } else if close >= upper && rsi > self.rsi_overbought {
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
            "MeanReversion: close at {} outer band with {} beyond {}/{}, exit at middle band",
            self.bands, self.rsi, self.rsi_oversold, self.rsi_overbought
        )
    }
}
