//! Donchian Channels.
//!
//! Upper = highest high over `upper_period` candles, lower = lowest low over
//! `lower_period` candles, both including the current candle. Middle is their
//! midpoint.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::Candle;

pub fn calculate_donchian(
    candles: &[Candle],
    lower_period: usize,
    upper_period: usize,
) -> IndicatorSeries {
    let indicator_type = IndicatorType::Donchian {
        lower_period,
        upper_period,
    };
    let warmup = indicator_type.warmup();

    let values = candles
        .iter()
        .enumerate()
        .map(|(i, candle)| {
            let valid = lower_period > 0 && upper_period > 0 && i >= warmup;
            let (upper, lower) = if valid {
                let upper = candles[i + 1 - upper_period..=i]
                    .iter()
                    .map(|c| c.high)
                    .fold(f64::NEG_INFINITY, f64::max);
                let lower = candles[i + 1 - lower_period..=i]
                    .iter()
                    .map(|c| c.low)
                    .fold(f64::INFINITY, f64::min);
                (upper, lower)
            } else {
                (0.0, 0.0)
            };
            IndicatorPoint {
                time: candle.close_time,
                valid,
                value: IndicatorValue::Donchian {
                    upper,
                    middle: (upper + lower) / 2.0,
                    lower,
                },
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}

/// (upper, lower) at `index`, if valid.
pub fn channel_at(series: &IndicatorSeries, index: usize) -> Option<(f64, f64)> {
    match series.valid_at(index)? {
        IndicatorValue::Donchian { upper, lower, .. } => Some((*upper, *lower)),
        _ => None,
    }
}
