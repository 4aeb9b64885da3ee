//! Per-symbol candle store and the master timeline.

use crate::domain::indicator::{IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::indicator_helpers::compute_indicators;
use crate::domain::ohlcv::Candle;
use chrono::NaiveDateTime;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone)]
pub struct SymbolData {
    pub symbol: String,
    pub candles: Vec<Candle>,
    pub indicators: HashMap<IndicatorType, IndicatorSeries>,
    pub time_index: HashMap<NaiveDateTime, usize>,
}

impl SymbolData {
    pub fn new(symbol: String, candles: Vec<Candle>) -> Self {
        let time_index = candles
            .iter()
            .enumerate()
            .map(|(i, c)| (c.close_time, i))
            .collect();
        Self {
            symbol,
            candles,
            indicators: HashMap::new(),
            time_index,
        }
    }

    /// Build and compute `indicators` over the whole series.
    pub fn with_indicators(symbol: String, candles: Vec<Candle>, indicators: &[IndicatorType]) -> Self {
        let mut data = Self::new(symbol, candles);
        data.indicators = compute_indicators(&data.candles, indicators);
        data
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn candle_at(&self, time: NaiveDateTime) -> Option<&Candle> {
        self.time_index.get(&time).map(|&i| &self.candles[i])
    }

    pub fn index_of(&self, time: NaiveDateTime) -> Option<usize> {
        self.time_index.get(&time).copied()
    }

    pub fn indicator_at(&self, indicator: IndicatorType, index: usize) -> Option<&IndicatorValue> {
        self.indicators.get(&indicator)?.valid_at(index)
    }

    pub fn simple_at(&self, indicator: IndicatorType, index: usize) -> Option<f64> {
        self.indicators.get(&indicator)?.simple_at(index)
    }

    /// Candles `[index + 1 - len, index]`, clipped at the start of the series.
    pub fn window(&self, index: usize, len: usize) -> &[Candle] {
        if self.candles.is_empty() {
            return &[];
        }
        let end = index.min(self.candles.len() - 1);
        let start = (end + 1).saturating_sub(len);
        &self.candles[start..=end]
    }

    pub fn last_time(&self) -> Option<NaiveDateTime> {
        self.candles.last().map(|c| c.close_time)
    }
}

/// Sorted union of every symbol's close times.
pub fn build_master_timeline(symbols: &[SymbolData]) -> Vec<NaiveDateTime> {
    let times: BTreeSet<NaiveDateTime> = symbols
        .iter()
        .flat_map(|sd| sd.candles.iter().map(|c| c.close_time))
        .collect();
    times.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::{candle, hour};

    fn series(symbol: &str, hours: &[usize]) -> Vec<Candle> {
        hours
            .iter()
            .map(|&h| {
                let mut c = candle(h, 100.0, 101.0, 99.0, 100.0 + h as f64);
                c.symbol = symbol.to_string();
                c
            })
            .collect()
    }

    #[test]
    fn new_builds_time_index() {
        let sd = SymbolData::new("BTCUSDT".into(), series("BTCUSDT", &[0, 1, 2]));
        assert_eq!(sd.time_index.len(), 3);
        let t = sd.candles[1].close_time;
        assert_eq!(sd.index_of(t), Some(1));
        assert!((sd.candle_at(t).unwrap().close - 101.0).abs() < f64::EPSILON);
        assert_eq!(sd.index_of(hour(7)), None);
    }

    #[test]
    fn window_clips_at_start() {
        let sd = SymbolData::new("ETHUSDT".into(), series("ETHUSDT", &[0, 1, 2, 3, 4]));
        assert_eq!(sd.window(1, 3).len(), 2);
        assert_eq!(sd.window(4, 3).len(), 3);
        assert!((sd.window(4, 3)[0].close - 102.0).abs() < f64::EPSILON);
        assert_eq!(sd.window(10, 2).len(), 2);
    }

    #[test]
    fn master_timeline_is_sorted_union() {
        let a = SymbolData::new("A".into(), series("A", &[0, 2, 4]));
        let b = SymbolData::new("B".into(), series("B", &[1, 2, 3]));
        let timeline = build_master_timeline(&[a, b]);
        assert_eq!(timeline.len(), 5);
        assert!(timeline.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn with_indicators_computes_series() {
        let sd = SymbolData::with_indicators(
            "A".into(),
            series("A", &(0..30).collect::<Vec<_>>()),
            &[IndicatorType::Ema(5)],
        );
        assert!(sd.simple_at(IndicatorType::Ema(5), 3).is_none());
        assert!(sd.simple_at(IndicatorType::Ema(5), 10).is_some());
        assert!(sd.simple_at(IndicatorType::RSI, 10).is_none());
    }
}
