//! Standard deviation of closes.
//!
//! Population standard deviation (divides by n) over a rolling window.
//! Warmup: first (n-1) candles are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::Candle;

/// Mean and population standard deviation of `window`.
pub fn mean_and_stddev(window: &[f64]) -> (f64, f64) {
    if window.is_empty() {
        return (0.0, 0.0);
    }
    let n = window.len() as f64;
    let mean = window.iter().sum::<f64>() / n;
    let variance = window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

pub fn calculate_stddev(candles: &[Candle], period: usize) -> IndicatorSeries {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let warmup = period.saturating_sub(1);

    let values = candles
        .iter()
        .enumerate()
        .map(|(i, candle)| {
            let valid = period > 0 && i >= warmup;
            let value = if valid {
                mean_and_stddev(&closes[i + 1 - period..=i]).1
            } else {
                0.0
            };
            IndicatorPoint {
                time: candle.close_time,
                valid,
                value: IndicatorValue::Simple(value),
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Stddev(period),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_candles;

    #[test]
    fn stddev_warmup() {
        let series = calculate_stddev(&make_candles(&[10.0, 20.0, 30.0, 40.0, 50.0]), 3);
        assert!(!series.values[0].valid);
        assert!(!series.values[1].valid);
        assert!(series.values[2].valid);
        assert!(series.values[4].valid);
    }

    #[test]
    fn stddev_constant_values() {
        let series = calculate_stddev(&make_candles(&[100.0; 5]), 3);
        assert!(series.simple_at(2).unwrap().abs() < f64::EPSILON);
    }

    #[test]
    fn stddev_known_values() {
        let series = calculate_stddev(&make_candles(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 8);
        assert!((series.simple_at(7).unwrap() - 2.0).abs() < 1e-10);
    }

    #[test]
    fn stddev_zero_period_invalid() {
        let series = calculate_stddev(&make_candles(&[1.0, 2.0]), 0);
        assert!(series.values.iter().all(|p| !p.valid));
    }

    #[test]
    fn mean_and_stddev_empty() {
        assert_eq!(mean_and_stddev(&[]), (0.0, 0.0));
    }
}
