#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::process::ExitCode;
use wavetrader::domain::error::TraderError;
use wavetrader::domain::indicator::IndicatorType;
use wavetrader::domain::ohlcv::{Candle, Interval};
use wavetrader::domain::signal::{Signal, SignalContext};
use wavetrader::domain::strategy::SignalGenerator;
use wavetrader::ports::data_port::DataPort;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Candle>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_candles(mut self, symbol: &str, candles: Vec<Candle>) -> Self {
        self.data.insert(symbol.to_string(), candles);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_klines(
        &self,
        symbol: &str,
        interval: Interval,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<Vec<Candle>, TraderError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(TraderError::Data {
                reason: reason.clone(),
            });
        }
        let candles: Vec<Candle> = self
            .data
            .get(symbol)
            .map(|c| {
                c.iter()
                    .filter(|c| start.is_none_or(|s| c.close_time >= s))
                    .filter(|c| end.is_none_or(|e| c.close_time <= e))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        if candles.is_empty() {
            return Err(TraderError::NoData {
                symbol: symbol.to_string(),
                interval: interval.to_string(),
            });
        }
        Ok(candles)
    }

    fn list_symbols(&self) -> Result<Vec<String>, TraderError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
        _interval: Interval,
    ) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, TraderError> {
        Ok(self.data.get(symbol).and_then(|c| match (c.first(), c.last()) {
            (Some(f), Some(l)) => Some((f.close_time, l.close_time, c.len())),
            _ => None,
        }))
    }
}

pub fn start_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// Hourly candle `i` after 2024-01-01 00:00.
pub fn hourly(symbol: &str, i: usize, open: f64, high: f64, low: f64, close: f64) -> Candle {
    let open_time = start_time() + Duration::hours(i as i64);
    Candle {
        symbol: symbol.to_string(),
        open_time,
        close_time: open_time + Duration::milliseconds(3_599_999),
        open,
        high,
        low,
        close,
        volume: 100.0,
        quote_volume: 100.0 * close,
        trades: 50,
        taker_buy_base: 50.0,
        taker_buy_quote: 50.0 * close,
    }
}

/// `n` candles closing at 100 with a range of 99..101, so ATR settles at 2.
pub fn flat_candles(symbol: &str, n: usize) -> Vec<Candle> {
    (0..n).map(|i| hourly(symbol, i, 100.0, 101.0, 99.0, 100.0)).collect()
}

/// Candles whose closes trace straight legs between `anchors`.
pub fn zigzag_candles(symbol: &str, anchors: &[f64], steps: usize) -> Vec<Candle> {
    let mut closes = vec![anchors[0]];
    for leg in anchors.windows(2) {
        for s in 1..=steps {
            closes.push(leg[0] + (leg[1] - leg[0]) * s as f64 / steps as f64);
        }
    }
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let prev = if i == 0 { c } else { closes[i - 1] };
            hourly(symbol, i, prev, prev.max(c) * 1.002, prev.min(c) * 0.998, c)
        })
        .collect()
}

/// Repeated five-wave up impulses and corrections, drifting higher.
pub fn wave_candles(symbol: &str, cycles: usize) -> Vec<Candle> {
    let mut anchors = vec![100.0];
    for k in 0..cycles {
        let base = 100.0 + k as f64 * 5.0;
        anchors.extend([base + 10.0, base + 4.0, base + 25.0, base + 18.0, base + 30.0, base + 5.0]);
    }
    zigzag_candles(symbol, &anchors, 6)
}

/// Signals at fixed candle indices, for deterministic portfolios.
pub struct ScriptedStrategy {
    pub signals: HashMap<usize, Signal>,
}

impl ScriptedStrategy {
    pub fn new(signals: &[(usize, Signal)]) -> Self {
        Self {
            signals: signals.iter().copied().collect(),
        }
    }
}

impl SignalGenerator for ScriptedStrategy {
    fn name(&self) -> &str {
        "scripted"
    }

    fn required_indicators(&self) -> Vec<IndicatorType> {
        vec![]
    }

    fn check_signal(&mut self, ctx: &SignalContext<'_>) -> Signal {
        self.signals.get(&ctx.index).copied().unwrap_or(Signal::Hold)
    }

    fn describe(&self) -> String {
        "scripted signals".to_string()
    }
}

/// `ExitCode` has no `PartialEq`; compare the debug form.
pub fn same_exit(a: ExitCode, b: ExitCode) -> bool {
    format!("{a:?}") == format!("{b:?}")
}
