//! MACD (Moving Average Convergence Divergence).
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! Warmup: max(fast, slow) - 1 + signal - 1 candles.

use crate::domain::indicator::ema::ema_values;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::Candle;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

pub fn calculate_macd(
    candles: &[Candle],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> IndicatorSeries {
    let indicator_type = IndicatorType::Macd {
        fast,
        slow,
        signal: signal_period,
    };
    if candles.is_empty() || fast == 0 || slow == 0 || signal_period == 0 {
        return IndicatorSeries {
            indicator_type,
            values: Vec::new(),
        };
    }

    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let ema_fast = ema_values(&closes, fast);
    let ema_slow = ema_values(&closes, slow);

    let macd_line: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| match (f, s) {
            (Some(f), Some(s)) => f - s,
            _ => 0.0,
        })
        .collect();

    let line_start = fast.max(slow) - 1;
    let mut signal_line = vec![None; candles.len()];
    if candles.len() > line_start {
        for (offset, v) in ema_values(&macd_line[line_start..], signal_period)
            .into_iter()
            .enumerate()
        {
            signal_line[line_start + offset] = v;
        }
    }

    let values = candles
        .iter()
        .enumerate()
        .map(|(i, candle)| {
            let line = macd_line[i];
            let signal = signal_line[i].unwrap_or(0.0);
            IndicatorPoint {
                time: candle.close_time,
                valid: signal_line[i].is_some(),
                value: IndicatorValue::Macd {
                    line,
                    signal,
                    histogram: line - signal,
                },
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}

pub fn calculate_macd_default(candles: &[Candle]) -> IndicatorSeries {
    calculate_macd(candles, DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL)
}

/// Histogram at `index`, if valid.
pub fn histogram_at(series: &IndicatorSeries, index: usize) -> Option<f64> {
    match series.valid_at(index)? {
        IndicatorValue::Macd { histogram, .. } => Some(*histogram),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_candles;

    fn rising(n: usize) -> Vec<Candle> {
        let prices: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
        make_candles(&prices)
    }

    #[test]
    fn macd_warmup_default() {
        let series = calculate_macd_default(&rising(40));
        let warmup = DEFAULT_SLOW - 1 + DEFAULT_SIGNAL - 1;
        for i in 0..warmup {
            assert!(!series.values[i].valid, "index {} should not be valid", i);
        }
        assert!(series.values[warmup].valid);
    }

    #[test]
    fn macd_histogram_equals_line_minus_signal() {
        let series = calculate_macd_default(&rising(40));
        for point in series.values.iter().filter(|p| p.valid) {
            if let IndicatorValue::Macd {
                line,
                signal,
                histogram,
            } = point.value
            {
                assert!((histogram - (line - signal)).abs() < f64::EPSILON);
            }
        }
    }

    #[test]
    fn macd_positive_in_uptrend() {
        let series = calculate_macd_default(&rising(60));
        if let Some(IndicatorValue::Macd { line, .. }) = series.valid_at(59) {
            assert!(*line > 0.0);
        } else {
            panic!("expected valid MACD");
        }
    }

    #[test]
    fn macd_flat_prices_zero() {
        let series = calculate_macd(&make_candles(&[50.0; 20]), 3, 5, 3);
        assert_eq!(histogram_at(&series, 19), Some(0.0));
        assert_eq!(histogram_at(&series, 0), None);
    }

    #[test]
    fn macd_zero_period_empty() {
        assert!(calculate_macd(&rising(10), 0, 26, 9).values.is_empty());
    }
}
