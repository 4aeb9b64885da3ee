//! Kline (candlestick) representation and interval handling.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::TraderError;

/// One closed kline as served by Binance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub symbol: String,
    pub open_time: NaiveDateTime,
    pub close_time: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub quote_volume: f64,
    pub trades: u64,
    pub taker_buy_base: f64,
    pub taker_buy_quote: f64,
}

impl Candle {
    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    /// high - low
    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

/// Convert a Binance millisecond timestamp into a naive UTC datetime.
pub fn from_millis(ms: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(ms).map(|dt| dt.naive_utc())
}

/// Inverse of [`from_millis`].
pub fn to_millis(dt: NaiveDateTime) -> i64 {
    dt.and_utc().timestamp_millis()
}

/// Kline intervals accepted by the Binance API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interval {
    M1,
    M3,
    M5,
    M15,
    M30,
    H1,
    H2,
    H4,
    H6,
    H8,
    H12,
    D1,
    D3,
    W1,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::M1 => "1m",
            Interval::M3 => "3m",
            Interval::M5 => "5m",
            Interval::M15 => "15m",
            Interval::M30 => "30m",
            Interval::H1 => "1h",
            Interval::H2 => "2h",
            Interval::H4 => "4h",
            Interval::H6 => "6h",
            Interval::H8 => "8h",
            Interval::H12 => "12h",
            Interval::D1 => "1d",
            Interval::D3 => "3d",
            Interval::W1 => "1w",
        }
    }

    pub fn duration_ms(&self) -> i64 {
        const MINUTE: i64 = 60_000;
        let minutes = match self {
            Interval::M1 => 1,
            Interval::M3 => 3,
            Interval::M5 => 5,
            Interval::M15 => 15,
            Interval::M30 => 30,
            Interval::H1 => 60,
            Interval::H2 => 120,
            Interval::H4 => 240,
            Interval::H6 => 360,
            Interval::H8 => 480,
            Interval::H12 => 720,
            Interval::D1 => 1_440,
            Interval::D3 => 4_320,
            Interval::W1 => 10_080,
        };
        minutes * MINUTE
    }

    /// Bars in a calendar year of continuous (24/7) trading.
    pub fn bars_per_year(&self) -> f64 {
        365.0 * 86_400_000.0 / self.duration_ms() as f64
    }
}

impl FromStr for Interval {
    type Err = TraderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let interval = match s.trim() {
            "1m" => Interval::M1,
            "3m" => Interval::M3,
            "5m" => Interval::M5,
            "15m" => Interval::M15,
            "30m" => Interval::M30,
            "1h" => Interval::H1,
            "2h" => Interval::H2,
            "4h" => Interval::H4,
            "6h" => Interval::H6,
            "8h" => Interval::H8,
            "12h" => Interval::H12,
            "1d" => Interval::D1,
            "3d" => Interval::D3,
            "1w" => Interval::W1,
            other => {
                return Err(TraderError::InvalidInterval {
                    interval: other.to_string(),
                });
            }
        };
        Ok(interval)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
