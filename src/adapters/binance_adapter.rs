//! Binance spot REST market data: `/api/v3/klines` and `/api/v3/exchangeInfo`.
//!
//! Public endpoints only, no API key. Requests are retried with exponential
//! backoff on connection errors, timeouts, 429 and 5xx responses.

use crate::domain::error::TraderError;
use crate::domain::ohlcv::{from_millis, to_millis, Candle, Interval};
use crate::ports::data_port::DataPort;
use crate::adapters::csv_adapter::dedupe_and_sort;
use chrono::NaiveDateTime;
use log::{debug, info, warn};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";

/// Maximum klines per request accepted by the endpoint.
pub const KLINE_LIMIT: usize = 1000;

/// One kline as served by the REST API: numbers as JSON strings except the
/// timestamps and the trade count.
#[derive(Debug, Deserialize)]
struct RawKline(
    i64,
    String,
    String,
    String,
    String,
    String,
    i64,
    String,
    u64,
    String,
    String,
    #[allow(dead_code)] serde_json::Value,
);

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
struct SymbolInfo {
    symbol: String,
    status: String,
}

pub struct BinanceAdapter {
    client: reqwest::blocking::Client,
    base_url: String,
    max_retries: u32,
    base_delay: Duration,
}

impl BinanceAdapter {
    pub fn new(base_url: &str) -> Result<Self, TraderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("wavetrader/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TraderError::Http {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        })
    }

    fn get_text(&self, path: &str, query: &[(&str, String)]) -> Result<String, TraderError> {
        let url = format!("{}{}", self.base_url, path);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                debug!("retrying {} in {:?} (attempt {})", path, delay, attempt + 1);
                std::thread::sleep(delay);
            }

            match self.client.get(&url).query(query).send() {
                Ok(resp) => {
                    let status = resp.status();
                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                        warn!("{} returned HTTP {}", path, status);
                        last_error = Some(TraderError::Http {
                            reason: format!("HTTP {status} for {path}"),
                        });
                        continue;
                    }
                    let body = resp.text().map_err(|e| TraderError::Http {
                        reason: format!("failed to read response for {path}: {e}"),
                    })?;
                    if !status.is_success() {
                        return Err(TraderError::Http {
                            reason: format!("HTTP {status} for {path}: {body}"),
                        });
                    }
                    return Ok(body);
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        last_error = Some(TraderError::Http {
                            reason: e.to_string(),
                        });
                        continue;
                    }
                    return Err(TraderError::Http {
                        reason: e.to_string(),
                    });
                }
            }
        }

        Err(last_error.unwrap_or_else(|| TraderError::Http {
            reason: "max retries exceeded".into(),
        }))
    }

    fn klines_page(
        &self,
        symbol: &str,
        interval: Interval,
        start: Option<i64>,
        end: Option<i64>,
        limit: usize,
    ) -> Result<Vec<Candle>, TraderError> {
        let mut query = vec![
            ("symbol", symbol.to_uppercase()),
            ("interval", interval.to_string()),
            ("limit", limit.min(KLINE_LIMIT).to_string()),
        ];
        if let Some(s) = start {
            query.push(("startTime", s.to_string()));
        }
        if let Some(e) = end {
            query.push(("endTime", e.to_string()));
        }
        let body = self.get_text("/api/v3/klines", &query)?;
        parse_klines(&body, symbol)
    }

    /// The most recent `limit` closed and in-progress klines.
    pub fn recent_klines(
        &self,
        symbol: &str,
        interval: Interval,
        limit: usize,
    ) -> Result<Vec<Candle>, TraderError> {
        self.klines_page(symbol, interval, None, None, limit)
    }
}

fn parse_number(raw: &str, name: &str) -> Result<f64, TraderError> {
    raw.parse().map_err(|e| TraderError::Data {
        reason: format!("invalid {name} '{raw}': {e}"),
    })
}

fn parse_time(ms: i64) -> Result<NaiveDateTime, TraderError> {
    from_millis(ms).ok_or_else(|| TraderError::Data {
        reason: format!("invalid timestamp {ms}"),
    })
}

/// Parse a `/api/v3/klines` response body.
pub fn parse_klines(body: &str, symbol: &str) -> Result<Vec<Candle>, TraderError> {
    let raw: Vec<RawKline> = serde_json::from_str(body)?;
    raw.into_iter()
        .map(|k| {
            Ok::<_, TraderError>(Candle {
                symbol: symbol.to_uppercase(),
                open_time: parse_time(k.0)?,
                open: parse_number(&k.1, "open")?,
                high: parse_number(&k.2, "high")?,
                low: parse_number(&k.3, "low")?,
                close: parse_number(&k.4, "close")?,
                volume: parse_number(&k.5, "volume")?,
                close_time: parse_time(k.6)?,
                quote_volume: parse_number(&k.7, "quote volume")?,
                trades: k.8,
                taker_buy_base: parse_number(&k.9, "taker buy base")?,
                taker_buy_quote: parse_number(&k.10, "taker buy quote")?,
            })
        })
        .collect()
}

/// Symbols currently trading, sorted.
pub fn parse_exchange_symbols(body: &str) -> Result<Vec<String>, TraderError> {
    let info: ExchangeInfo = serde_json::from_str(body)?;
    let mut symbols: Vec<String> = info
        .symbols
        .into_iter()
        .filter(|s| s.status == "TRADING")
        .map(|s| s.symbol)
        .collect();
    symbols.sort();
    Ok(symbols)
}

impl DataPort for BinanceAdapter {
    /// Without a start, only the most recent page is returned; with one,
    /// pages of [`KLINE_LIMIT`] are walked forward until the end.
    fn fetch_klines(
        &self,
        symbol: &str,
        interval: Interval,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<Vec<Candle>, TraderError> {
        let end_ms = end.map(to_millis);
        let mut candles = Vec::new();

        match start {
            None => candles = self.klines_page(symbol, interval, None, end_ms, KLINE_LIMIT)?,
            Some(start) => {
                let mut cursor = to_millis(start);
                loop {
                    let page = self.klines_page(symbol, interval, Some(cursor), end_ms, KLINE_LIMIT)?;
                    let full = page.len() == KLINE_LIMIT;
                    let Some(last) = page.last() else {
                        break;
                    };
                    cursor = to_millis(last.open_time) + 1;
                    candles.extend(page);
                    debug!("{} {}: {} klines so far", symbol, interval, candles.len());
                    if !full || end_ms.is_some_and(|e| cursor > e) {
                        break;
                    }
                }
            }
        }

        let candles = dedupe_and_sort(candles);
        if candles.is_empty() {
            return Err(TraderError::NoData {
                symbol: symbol.to_string(),
                interval: interval.to_string(),
            });
        }
        info!("fetched {} {} klines for {}", candles.len(), interval, symbol);
        Ok(candles)
    }

    fn list_symbols(&self) -> Result<Vec<String>, TraderError> {
        let body = self.get_text("/api/v3/exchangeInfo", &[])?;
        parse_exchange_symbols(&body)
    }

    /// The count is derived from the interval length, not downloaded.
    fn get_data_range(
        &self,
        symbol: &str,
        interval: Interval,
    ) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, TraderError> {
        let first = self.klines_page(symbol, interval, Some(0), None, 1)?;
        let last = self.klines_page(symbol, interval, None, None, 1)?;
        Ok(match (first.first(), last.last()) {
            (Some(f), Some(l)) => {
                let span = to_millis(l.open_time) - to_millis(f.open_time);
                let count = (span / interval.duration_ms()) as usize + 1;
                Some((f.close_time, l.close_time, count))
            }
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KLINES: &str = r#"[
        [1499040000000,"0.01634790","0.80000000","0.01575800","0.01577100","148976.11427815",1499043599999,"2434.19055334",308,"1756.87402397","28.46694368","0"],
        [1499043600000,"0.01577100","0.01600000","0.01550000","0.01590000","1000.00000000",1499047199999,"15.90000000",12,"500.00000000","7.95000000","0"]
    ]"#;

    #[test]
    fn parses_kline_arrays() {
        let candles = parse_klines(KLINES, "ethbtc").unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].symbol, "ETHBTC");
        assert_eq!(candles[0].open_time, from_millis(1_499_040_000_000).unwrap());
        assert_eq!(candles[0].close_time, from_millis(1_499_043_599_999).unwrap());
        assert!((candles[0].high - 0.8).abs() < 1e-12);
        assert!((candles[1].close - 0.0159).abs() < 1e-12);
        assert_eq!(candles[0].trades, 308);
        assert!((candles[1].taker_buy_quote - 7.95).abs() < 1e-12);
    }

    #[test]
    fn rejects_bad_number() {
        let body = r#"[[1499040000000,"x","1","1","1","1",1499043599999,"1",1,"1","1","0"]]"#;
        assert!(matches!(
            parse_klines(body, "BTCUSDT"),
            Err(TraderError::Data { .. })
        ));
    }

    #[test]
    fn rejects_non_array_body() {
        let body = r#"{"code":-1121,"msg":"Invalid symbol."}"#;
        assert!(matches!(parse_klines(body, "NOPE"), Err(TraderError::Json(_))));
    }

    #[test]
    fn exchange_info_keeps_trading_symbols() {
        let body = r#"{"timezone":"UTC","symbols":[
            {"symbol":"ETHBTC","status":"TRADING","baseAsset":"ETH"},
            {"symbol":"BTCUSDT","status":"TRADING","baseAsset":"BTC"},
            {"symbol":"LUNAUSDT","status":"BREAK","baseAsset":"LUNA"}
        ]}"#;
        assert_eq!(parse_exchange_symbols(body).unwrap(), vec!["BTCUSDT", "ETHBTC"]);
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let adapter = BinanceAdapter::new("https://api.binance.com/").unwrap();
        assert_eq!(adapter.base_url, DEFAULT_BASE_URL);
    }
}
