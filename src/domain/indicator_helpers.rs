//! ATR and indicator-set computation shared by strategies and the backtest.

use std::collections::HashMap;

use crate::domain::indicator::{
    calculate_adx, calculate_bollinger, calculate_donchian, calculate_ema, calculate_macd,
    calculate_rsi, calculate_stddev, IndicatorPoint, IndicatorSeries, IndicatorType,
    IndicatorValue,
};
use crate::domain::ohlcv::Candle;

/// The indicator set every symbol gets before a run.
pub const DEFAULT_INDICATORS: [IndicatorType; 8] = [
    IndicatorType::EMA_FAST,
    IndicatorType::EMA_SLOW,
    IndicatorType::RSI,
    IndicatorType::MACD,
    IndicatorType::BOLLINGER,
    IndicatorType::ATR,
    IndicatorType::DONCHIAN,
    IndicatorType::ADX,
];

/// Average True Range with Wilder smoothing, seeded by the mean of the first
/// `period` true ranges. The first candle's TR is high - low.
pub fn calc_atr(candles: &[Candle], period: usize) -> IndicatorSeries {
    if candles.len() < period || period == 0 {
        return IndicatorSeries {
            indicator_type: IndicatorType::Atr(period),
            values: vec![],
        };
    }

    let mut values: Vec<IndicatorPoint> = Vec::with_capacity(candles.len());
    let mut atr = 0.0;
    let mut seed_sum = 0.0;

    for (i, candle) in candles.iter().enumerate() {
        let tr = if i == 0 {
            candle.range()
        } else {
            candle.true_range(candles[i - 1].close)
        };

        let valid = if i + 1 < period {
            seed_sum += tr;
            false
        } else if i + 1 == period {
            atr = (seed_sum + tr) / period as f64;
            true
        } else {
            atr = (atr * (period - 1) as f64 + tr) / period as f64;
            true
        };

        values.push(IndicatorPoint {
            time: candle.close_time,
            valid,
            value: IndicatorValue::Simple(if valid { atr } else { 0.0 }),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Atr(period),
        values,
    }
}

pub fn compute_indicator(candles: &[Candle], indicator: IndicatorType) -> IndicatorSeries {
    match indicator {
        IndicatorType::Ema(n) => calculate_ema(candles, n),
        IndicatorType::Rsi(n) => calculate_rsi(candles, n),
        IndicatorType::Atr(n) => calc_atr(candles, n),
        IndicatorType::Stddev(n) => calculate_stddev(candles, n),
        IndicatorType::Adx(n) => calculate_adx(candles, n),
        IndicatorType::Macd { fast, slow, signal } => calculate_macd(candles, fast, slow, signal),
        IndicatorType::Bollinger {
            period,
            stddev_mult_x100,
        } => calculate_bollinger(candles, period, stddev_mult_x100),
        IndicatorType::Donchian {
            lower_period,
            upper_period,
        } => calculate_donchian(candles, lower_period, upper_period),
    }
}

/// Compute each requested indicator once over the full series.
pub fn compute_indicators(
    candles: &[Candle],
    indicators: &[IndicatorType],
) -> HashMap<IndicatorType, IndicatorSeries> {
    let mut out = HashMap::with_capacity(indicators.len());
    for &indicator in indicators {
        out.entry(indicator)
            .or_insert_with(|| compute_indicator(candles, indicator));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::candle;

    fn flat_range(n: usize) -> Vec<Candle> {
        (0..n).map(|i| candle(i, 100.0, 110.0, 90.0, 100.0)).collect()
    }

    #[test]
    fn atr_warmup() {
        let series = calc_atr(&flat_range(5), 3);
        assert_eq!(series.values.len(), 5);
        assert!(!series.values[0].valid);
        assert!(!series.values[1].valid);
        assert!(series.values[2].valid);
        assert!((series.simple_at(4).unwrap() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn atr_seed_is_average() {
        let candles = vec![
            candle(0, 105.0, 110.0, 100.0, 105.0),
            candle(1, 110.0, 115.0, 105.0, 110.0),
            candle(2, 115.0, 120.0, 110.0, 115.0),
        ];
        let series = calc_atr(&candles, 3);
        assert!((series.simple_at(2).unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn atr_wilder_smoothing() {
        let candles = vec![
            candle(0, 105.0, 110.0, 100.0, 105.0),
            candle(1, 110.0, 115.0, 105.0, 110.0),
            candle(2, 115.0, 120.0, 110.0, 115.0),
            candle(3, 125.0, 130.0, 115.0, 125.0),
        ];
        let series = calc_atr(&candles, 3);
        // TR[3] = max(15, |130-115|, |115-115|) = 15
        let expected = (10.0 * 2.0 + 15.0) / 3.0;
        assert!((series.simple_at(3).unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn atr_insufficient_candles() {
        assert!(calc_atr(&flat_range(2), 5).values.is_empty());
    }

    #[test]
    fn compute_default_set() {
        let candles = flat_range(60);
        let map = compute_indicators(&candles, &DEFAULT_INDICATORS);
        assert_eq!(map.len(), DEFAULT_INDICATORS.len());
        for series in map.values() {
            assert_eq!(series.values.len(), 60, "{}", series.indicator_type);
        }
    }

    #[test]
    fn compute_deduplicates_requests() {
        let candles = flat_range(30);
        let map = compute_indicators(&candles, &[IndicatorType::RSI, IndicatorType::Rsi(14)]);
        assert_eq!(map.len(), 1);
    }
}
