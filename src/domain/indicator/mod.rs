//! Technical indicator implementations.
//!
//! This module provides types for representing indicator values and series:
//! - `IndicatorPoint`: A single point in an indicator time series
//! - `IndicatorValue`: Enum for different indicator output shapes
//! - `IndicatorType`: Enum for indicator identity + parameters (serves as HashMap key)
//! - `IndicatorSeries`: A time series of indicator values

pub mod adx;
pub mod bollinger;
pub mod donchian;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod stddev;

pub use adx::calculate_adx;
pub use bollinger::calculate_bollinger;
pub use donchian::calculate_donchian;
pub use ema::calculate_ema;
pub use macd::calculate_macd;
pub use rsi::calculate_rsi;
pub use stddev::calculate_stddev;

use chrono::NaiveDateTime;
use std::fmt;

#[derive(Debug, Clone)]
pub struct IndicatorPoint {
    pub time: NaiveDateTime,
    pub valid: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
    Bollinger {
        upper: f64,
        middle: f64,
        lower: f64,
    },
    Donchian {
        upper: f64,
        middle: f64,
        lower: f64,
    },
    Adx {
        adx: f64,
        plus_di: f64,
        minus_di: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Ema(usize),
    Rsi(usize),
    Atr(usize),
    Stddev(usize),
    Adx(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Bollinger {
        period: usize,
        stddev_mult_x100: u32,
    },
    Donchian {
        lower_period: usize,
        upper_period: usize,
    },
}

impl IndicatorType {
    pub const EMA_FAST: IndicatorType = IndicatorType::Ema(9);
    pub const EMA_SLOW: IndicatorType = IndicatorType::Ema(21);
    pub const RSI: IndicatorType = IndicatorType::Rsi(14);
    pub const ATR: IndicatorType = IndicatorType::Atr(14);
    pub const ADX: IndicatorType = IndicatorType::Adx(14);
    pub const MACD: IndicatorType = IndicatorType::Macd {
        fast: 12,
        slow: 26,
        signal: 9,
    };
    pub const BOLLINGER: IndicatorType = IndicatorType::Bollinger {
        period: 20,
        stddev_mult_x100: 200,
    };
    pub const DONCHIAN: IndicatorType = IndicatorType::Donchian {
        lower_period: 20,
        upper_period: 20,
    };

    /// Bars before the first valid value.
    pub fn warmup(&self) -> usize {
        match *self {
            IndicatorType::Ema(n) | IndicatorType::Atr(n) | IndicatorType::Stddev(n) => {
                n.saturating_sub(1)
            }
            IndicatorType::Rsi(n) => n,
            IndicatorType::Adx(n) => 2 * n.saturating_sub(1) + 1,
            IndicatorType::Macd { slow, signal, .. } => {
                slow.saturating_sub(1) + signal.saturating_sub(1)
            }
            IndicatorType::Bollinger { period, .. } => period.saturating_sub(1),
            IndicatorType::Donchian {
                lower_period,
                upper_period,
            } => lower_period.max(upper_period).saturating_sub(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// The point at `index` if it exists and is past warmup.
    pub fn valid_at(&self, index: usize) -> Option<&IndicatorValue> {
        self.values
            .get(index)
            .filter(|p| p.valid)
            .map(|p| &p.value)
    }

    /// Scalar value at `index`, for single-output indicators.
    pub fn simple_at(&self, index: usize) -> Option<f64> {
        match self.valid_at(index)? {
            IndicatorValue::Simple(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
            IndicatorType::Stddev(period) => write!(f, "STDDEV({})", period),
            IndicatorType::Adx(period) => write!(f, "ADX({})", period),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorType::Bollinger {
                period,
                stddev_mult_x100,
            } => {
                let mult = *stddev_mult_x100 as f64 / 100.0;
                write!(f, "BOLLINGER({},{})", period, mult)
            }
            IndicatorType::Donchian {
                lower_period,
                upper_period,
            } => write!(f, "DONCHIAN({},{})", lower_period, upper_period),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indicator_type_display_macd() {
        assert_eq!(IndicatorType::MACD.to_string(), "MACD(12,26,9)");
    }

    #[test]
    fn indicator_type_display_bollinger() {
        assert_eq!(IndicatorType::BOLLINGER.to_string(), "BOLLINGER(20,2)");
    }

    #[test]
    fn indicator_type_display_donchian() {
        assert_eq!(IndicatorType::DONCHIAN.to_string(), "DONCHIAN(20,20)");
    }

    #[test]
    fn warmups_match_series() {
        assert_eq!(IndicatorType::EMA_SLOW.warmup(), 20);
        assert_eq!(IndicatorType::RSI.warmup(), 14);
        assert_eq!(IndicatorType::MACD.warmup(), 33);
        assert_eq!(IndicatorType::ADX.warmup(), 27);
    }

    #[test]
    fn indicator_type_hash_eq() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(IndicatorType::Ema(9), "fast");
        map.insert(IndicatorType::Ema(21), "slow");
        map.insert(IndicatorType::MACD, "macd");

        assert_eq!(map.get(&IndicatorType::EMA_FAST), Some(&"fast"));
        assert_eq!(map.get(&IndicatorType::EMA_SLOW), Some(&"slow"));
        assert_eq!(
            map.get(&IndicatorType::Macd {
                fast: 12,
                slow: 26,
                signal: 9
            }),
            Some(&"macd")
        );
    }

    #[test]
    fn simple_at_skips_warmup() {
        let series = IndicatorSeries {
            indicator_type: IndicatorType::Ema(2),
            values: vec![
                IndicatorPoint {
                    time: test_support::hour(0),
                    valid: false,
                    value: IndicatorValue::Simple(0.0),
                },
                IndicatorPoint {
                    time: test_support::hour(1),
                    valid: true,
                    value: IndicatorValue::Simple(4.5),
                },
            ],
        };
        assert_eq!(series.simple_at(0), None);
        assert_eq!(series.simple_at(1), Some(4.5));
        assert_eq!(series.simple_at(2), None);
    }
}
