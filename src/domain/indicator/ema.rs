//! Exponential Moving Average.
//!
//! k = 2/(n+1), seeded with the SMA of the first n values, then
//! EMA[i] = x[i]*k + EMA[i-1]*(1-k). The first (n-1) values are warmup.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::Candle;

/// EMA over an arbitrary sequence; `None` during warmup.
pub fn ema_values(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; values.len()];
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut ema = 0.0;
    let mut sum = 0.0;

    for (i, &x) in values.iter().enumerate() {
        if i + 1 < period {
            sum += x;
            out.push(None);
        } else if i + 1 == period {
            sum += x;
            ema = sum / period as f64;
            out.push(Some(ema));
        } else {
            ema = x * k + ema * (1.0 - k);
            out.push(Some(ema));
        }
    }
    out
}

pub fn calculate_ema(candles: &[Candle], period: usize) -> IndicatorSeries {
    if period == 0 || candles.is_empty() {
        return IndicatorSeries {
            indicator_type: IndicatorType::Ema(period),
            values: Vec::new(),
        };
    }

    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let values = ema_values(&closes, period)
        .into_iter()
        .zip(candles)
        .map(|(ema, candle)| IndicatorPoint {
            time: candle.close_time,
            valid: ema.is_some(),
            value: IndicatorValue::Simple(ema.unwrap_or(0.0)),
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Ema(period),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_candles;

    #[test]
    fn ema_warmup() {
        let candles = make_candles(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        let series = calculate_ema(&candles, 3);

        assert!(!series.values[0].valid);
        assert!(!series.values[1].valid);
        assert!(series.values[2].valid);
        assert!(series.values[4].valid);
    }

    #[test]
    fn ema_period_1_tracks_close() {
        let series = calculate_ema(&make_candles(&[10.0, 20.0, 30.0]), 1);
        assert_eq!(series.simple_at(0), Some(10.0));
        assert_eq!(series.simple_at(2), Some(30.0));
    }

    #[test]
    fn ema_recursive_calculation() {
        let series = calculate_ema(&make_candles(&[10.0, 20.0, 30.0, 40.0, 50.0]), 3);

        let k = 0.5;
        let sma = 20.0;
        let ema_3 = 40.0 * k + sma * (1.0 - k);
        let ema_4 = 50.0 * k + ema_3 * (1.0 - k);

        assert!((series.simple_at(2).unwrap() - sma).abs() < f64::EPSILON);
        assert!((series.simple_at(3).unwrap() - ema_3).abs() < f64::EPSILON);
        assert!((series.simple_at(4).unwrap() - ema_4).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_equal_prices() {
        let series = calculate_ema(&make_candles(&[100.0; 6]), 3);
        for i in 2..6 {
            assert!((series.simple_at(i).unwrap() - 100.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn ema_empty_and_zero_period() {
        assert!(calculate_ema(&[], 3).values.is_empty());
        assert!(calculate_ema(&make_candles(&[1.0, 2.0]), 0).values.is_empty());
    }

    #[test]
    fn ema_values_on_raw_sequence() {
        let out = ema_values(&[2.0, 4.0, 6.0], 2);
        assert_eq!(out[0], None);
        assert_eq!(out[1], Some(3.0));
        // 6*(2/3) + 3*(1/3) = 5
        assert!((out[2].unwrap() - 5.0).abs() < 1e-12);
    }
}
