//! Bollinger Bands.
//!
//! - Middle: SMA over n closes
//! - Upper/Lower: Middle ± multiplier × population StdDev
//!
//! Warmup: first (period-1) candles are invalid.

use crate::domain::indicator::stddev::mean_and_stddev;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::Candle;

pub fn calculate_bollinger(
    candles: &[Candle],
    period: usize,
    stddev_mult_x100: u32,
) -> IndicatorSeries {
    let warmup = period.saturating_sub(1);
    let mult = stddev_mult_x100 as f64 / 100.0;
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();

    let values = candles
        .iter()
        .enumerate()
        .map(|(i, candle)| {
            let valid = period > 0 && i >= warmup;
            let (upper, middle, lower) = if valid {
                let (mean, sd) = mean_and_stddev(&closes[i + 1 - period..=i]);
                (mean + mult * sd, mean, mean - mult * sd)
            } else {
                (0.0, 0.0, 0.0)
            };
            IndicatorPoint {
                time: candle.close_time,
                valid,
                value: IndicatorValue::Bollinger {
                    upper,
                    middle,
                    lower,
                },
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Bollinger {
            period,
            stddev_mult_x100,
        },
        values,
    }
}

/// (upper - lower) / middle, as a percentage.
pub fn bandwidth(upper: f64, middle: f64, lower: f64) -> Option<f64> {
    (middle != 0.0).then(|| (upper - lower) / middle * 100.0)
}

/// Position of `close` within the bands: 0 at lower, 1 at upper.
pub fn percent_b(close: f64, upper: f64, lower: f64) -> Option<f64> {
    let width = upper - lower;
    (width != 0.0).then(|| (close - lower) / width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_candles;

    fn bands(series: &IndicatorSeries, i: usize) -> (f64, f64, f64) {
        match series.valid_at(i) {
            Some(IndicatorValue::Bollinger {
                upper,
                middle,
                lower,
            }) => (*upper, *middle, *lower),
            other => panic!("expected Bollinger value, got {:?}", other),
        }
    }

    #[test]
    fn bollinger_warmup() {
        let series = calculate_bollinger(&make_candles(&[10.0, 20.0, 30.0, 40.0]), 3, 200);
        assert!(!series.values[0].valid);
        assert!(!series.values[1].valid);
        assert!(series.values[2].valid);
    }

    #[test]
    fn bollinger_constant_values_collapse() {
        let series = calculate_bollinger(&make_candles(&[100.0; 5]), 3, 200);
        let (u, m, l) = bands(&series, 4);
        assert!((u - 100.0).abs() < f64::EPSILON);
        assert!((m - 100.0).abs() < f64::EPSILON);
        assert!((l - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn bollinger_basic_calculation() {
        let series = calculate_bollinger(&make_candles(&[10.0, 20.0, 30.0]), 3, 200);
        let (u, m, l) = bands(&series, 2);
        let sd = (200.0_f64 / 3.0).sqrt();
        assert!((m - 20.0).abs() < 1e-10);
        assert!((u - (20.0 + 2.0 * sd)).abs() < 1e-10);
        assert!((l - (20.0 - 2.0 * sd)).abs() < 1e-10);
    }

    #[test]
    fn bollinger_multiplier_one() {
        let series = calculate_bollinger(&make_candles(&[10.0, 20.0, 30.0]), 3, 100);
        let (u, m, _) = bands(&series, 2);
        assert!((u - m - (200.0_f64 / 3.0).sqrt()).abs() < 1e-10);
    }

    #[test]
    fn bandwidth_and_percent_b() {
        assert_eq!(bandwidth(110.0, 100.0, 90.0), Some(20.0));
        assert_eq!(bandwidth(1.0, 0.0, -1.0), None);
        assert_eq!(percent_b(95.0, 110.0, 90.0), Some(0.25));
        assert_eq!(percent_b(100.0, 100.0, 100.0), None);
    }
}
