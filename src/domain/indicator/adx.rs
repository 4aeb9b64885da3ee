//! Average Directional Index (Wilder).
//!
//! +DM/-DM and TR are Wilder-smoothed over n candles to give +DI/-DI.
//! DX = 100 * |+DI - -DI| / (+DI + -DI); ADX is the Wilder average of DX,
//! seeded with the mean of the first n DX values.
//! Warmup: 2n - 1 candles.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::Candle;

pub fn calculate_adx(candles: &[Candle], period: usize) -> IndicatorSeries {
    let indicator_type = IndicatorType::Adx(period);
    let mut values: Vec<IndicatorPoint> = candles
        .iter()
        .map(|c| IndicatorPoint {
            time: c.close_time,
            valid: false,
            value: IndicatorValue::Adx {
                adx: 0.0,
                plus_di: 0.0,
                minus_di: 0.0,
            },
        })
        .collect();

    if period == 0 || candles.len() <= period {
        return IndicatorSeries {
            indicator_type,
            values,
        };
    }

    let n = period as f64;
    let mut smooth_tr = 0.0;
    let mut smooth_plus = 0.0;
    let mut smooth_minus = 0.0;
    let mut dx_seed = 0.0;
    let mut adx = 0.0;

    for i in 1..candles.len() {
        let cur = &candles[i];
        let prev = &candles[i - 1];
        let up = cur.high - prev.high;
        let down = prev.low - cur.low;
        let plus_dm = if up > down && up > 0.0 { up } else { 0.0 };
        let minus_dm = if down > up && down > 0.0 { down } else { 0.0 };
        let tr = cur.true_range(prev.close);

        if i <= period {
            smooth_tr += tr;
            smooth_plus += plus_dm;
            smooth_minus += minus_dm;
            if i < period {
                continue;
            }
        } else {
            smooth_tr = smooth_tr - smooth_tr / n + tr;
            smooth_plus = smooth_plus - smooth_plus / n + plus_dm;
            smooth_minus = smooth_minus - smooth_minus / n + minus_dm;
        }

        let (plus_di, minus_di) = if smooth_tr > 0.0 {
            (100.0 * smooth_plus / smooth_tr, 100.0 * smooth_minus / smooth_tr)
        } else {
            (0.0, 0.0)
        };
        let di_sum = plus_di + minus_di;
        let dx = if di_sum > 0.0 {
            100.0 * (plus_di - minus_di).abs() / di_sum
        } else {
            0.0
        };

        // DX values start at index `period`; ADX needs `period` of them.
        let dx_count = i - period + 1;
        let valid = if dx_count < period {
            dx_seed += dx;
            false
        } else if dx_count == period {
            adx = (dx_seed + dx) / n;
            true
        } else {
            adx = (adx * (n - 1.0) + dx) / n;
            true
        };

        values[i] = IndicatorPoint {
            time: cur.close_time,
            valid,
            value: IndicatorValue::Adx {
                adx,
                plus_di,
                minus_di,
            },
        };
    }

    IndicatorSeries {
        indicator_type,
        values,
    }
}
