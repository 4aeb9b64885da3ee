//! Trading signals and the context strategies evaluate them in.

use std::fmt;

use crate::domain::market_data::SymbolData;
use crate::domain::ohlcv::Candle;
use crate::domain::position::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl Signal {
    pub fn direction(&self) -> Option<Direction> {
        match self {
            Signal::Buy => Some(Direction::Long),
            Signal::Sell => Some(Direction::Short),
            Signal::Hold => None,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Signal::Buy => "BUY",
            Signal::Sell => "SELL",
            Signal::Hold => "HOLD",
        })
    }
}

/// What a wave reading suggests before trend adaptation and validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveAction {
    ConsiderLong,
    ConsiderShort,
    Hold,
}

impl WaveAction {
    pub fn to_signal(self) -> Signal {
        match self {
            WaveAction::ConsiderLong => Signal::Buy,
            WaveAction::ConsiderShort => Signal::Sell,
            WaveAction::Hold => Signal::Hold,
        }
    }
}

impl fmt::Display for WaveAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WaveAction::ConsiderLong => "CONSIDER_LONG",
            WaveAction::ConsiderShort => "CONSIDER_SHORT",
            WaveAction::Hold => "HOLD",
        })
    }
}

/// A symbol's data as of candle `index`. Strategies must not look past it.
#[derive(Debug, Clone, Copy)]
pub struct SignalContext<'a> {
    pub data: &'a SymbolData,
    pub index: usize,
    pub current_direction: Option<Direction>,
}

impl<'a> SignalContext<'a> {
    pub fn new(data: &'a SymbolData, index: usize) -> Self {
        SignalContext {
            data,
            index,
            current_direction: None,
        }
    }

    pub fn with_direction(mut self, direction: Option<Direction>) -> Self {
        self.current_direction = direction;
        self
    }

    pub fn symbol(&self) -> &str {
        &self.data.symbol
    }

    pub fn candle(&self) -> &'a Candle {
        &self.data.candles[self.index]
    }

    pub fn previous(&self) -> Option<&'a Candle> {
        self.index.checked_sub(1).map(|i| &self.data.candles[i])
    }

    /// Candles up to and including the current one.
    pub fn history(&self) -> &'a [Candle] {
        &self.data.candles[..=self.index]
    }

    /// The last `len` candles up to the current one.
    pub fn window(&self, len: usize) -> &'a [Candle] {
        self.data.window(self.index, len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_candles;

    #[test]
    fn wave_action_maps_to_signal() {
        assert_eq!(WaveAction::ConsiderLong.to_signal(), Signal::Buy);
        assert_eq!(WaveAction::ConsiderShort.to_signal(), Signal::Sell);
        assert_eq!(WaveAction::Hold.to_signal(), Signal::Hold);
    }

    #[test]
    fn signal_direction() {
        assert_eq!(Signal::Buy.direction(), Some(Direction::Long));
        assert_eq!(Signal::Sell.direction(), Some(Direction::Short));
        assert_eq!(Signal::Hold.direction(), None);
        assert_eq!(Signal::Sell.to_string(), "SELL");
    }

    #[test]
    fn context_views_stop_at_index() {
        let data = SymbolData::new("X".into(), make_candles(&[1.0, 2.0, 3.0, 4.0, 5.0]));
        let ctx = SignalContext::new(&data, 2);
        assert_eq!(ctx.history().len(), 3);
        assert!((ctx.candle().close - 3.0).abs() < f64::EPSILON);
        assert!((ctx.previous().unwrap().close - 2.0).abs() < f64::EPSILON);
        assert_eq!(ctx.window(2).len(), 2);
        assert!(SignalContext::new(&data, 0).previous().is_none());
    }
}
