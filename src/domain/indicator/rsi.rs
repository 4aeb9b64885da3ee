//! Relative Strength Index with Wilder smoothing.
//!
//! - First average: simple mean of gains/losses over the first n changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss), and 100 when avg_loss == 0.
//! The first n candles are warmup.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::Candle;

fn rsi_from(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}

pub fn calculate_rsi(candles: &[Candle], period: usize) -> IndicatorSeries {
    let invalid = |c: &Candle| IndicatorPoint {
        time: c.close_time,
        valid: false,
        value: IndicatorValue::Simple(0.0),
    };

    if period == 0 || candles.len() < 2 {
        return IndicatorSeries {
            indicator_type: IndicatorType::Rsi(period),
            values: candles.iter().map(invalid).collect(),
        };
    }

    let mut values = Vec::with_capacity(candles.len());
    values.push(invalid(&candles[0]));

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    let mut gain_sum = 0.0;
    let mut loss_sum = 0.0;

    for (n, pair) in candles.windows(2).enumerate() {
        let change = pair[1].close - pair[0].close;
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);

        if n + 1 < period {
            gain_sum += gain;
            loss_sum += loss;
            values.push(invalid(&pair[1]));
            continue;
        }

        if n + 1 == period {
            avg_gain = (gain_sum + gain) / period as f64;
            avg_loss = (loss_sum + loss) / period as f64;
        } else {
            avg_gain = (avg_gain * (period - 1) as f64 + gain) / period as f64;
            avg_loss = (avg_loss * (period - 1) as f64 + loss) / period as f64;
        }

        values.push(IndicatorPoint {
            time: pair[1].close_time,
            valid: true,
            value: IndicatorValue::Simple(rsi_from(avg_gain, avg_loss)),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}
