//! CSV kline files: `{SYMBOL}_{INTERVAL}.csv` under a data directory.
//!
//! Two layouts are read. The 12-column Binance kline dump (open time,
//! OHLCV, close time, quote volume, trades, taker buy volumes, ignore) with
//! millisecond or microsecond timestamps, and a simple
//! `open_time,open,high,low,close,volume` layout whose open time is either
//! epoch milliseconds or a `YYYY-MM-DD[ HH:MM[:SS]]` string. A header row is
//! optional in both.

use crate::domain::error::TraderError;
use crate::domain::ohlcv::{from_millis, to_millis, Candle, Interval};
use crate::domain::position::ClosedTrade;
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime};
use log::warn;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

const BINANCE_HEADER: [&str; 12] = [
    "open_time",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "close_time",
    "quote_volume",
    "trades",
    "taker_buy_base",
    "taker_buy_quote",
    "ignore",
];

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn csv_path(&self, symbol: &str, interval: Interval) -> PathBuf {
        self.base_path.join(format!("{}_{}.csv", symbol, interval))
    }

    /// Every candle in the file, deduplicated by close time and sorted.
    pub fn read_all(&self, symbol: &str, interval: Interval) -> Result<Vec<Candle>, TraderError> {
        let path = self.csv_path(symbol, interval);
        if !path.exists() {
            return Err(TraderError::NoData {
                symbol: symbol.to_string(),
                interval: interval.to_string(),
            });
        }
        let content = fs::read_to_string(&path)?;
        parse_klines(&content, symbol, interval).map_err(|reason| TraderError::Data {
            reason: format!("{}: {}", path.display(), reason),
        })
    }

    /// Write `candles` in the Binance layout, with a header row.
    pub fn write_klines(
        &self,
        symbol: &str,
        interval: Interval,
        candles: &[Candle],
    ) -> Result<PathBuf, TraderError> {
        fs::create_dir_all(&self.base_path)?;
        let path = self.csv_path(symbol, interval);
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(BINANCE_HEADER)?;
        for c in candles {
            writer.write_record([
                to_millis(c.open_time).to_string(),
                c.open.to_string(),
                c.high.to_string(),
                c.low.to_string(),
                c.close.to_string(),
                c.volume.to_string(),
                to_millis(c.close_time).to_string(),
                c.quote_volume.to_string(),
                c.trades.to_string(),
                c.taker_buy_base.to_string(),
                c.taker_buy_quote.to_string(),
                "0".to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(path)
    }
}

/// Write closed trades as CSV, one row per trade.
pub fn write_trade_log(path: &Path, trades: &[ClosedTrade]) -> Result<(), TraderError> {
    let mut writer = csv::Writer::from_path(path)?;
    for trade in trades {
        writer.serialize(trade)?;
    }
    writer.flush()?;
    Ok(())
}

fn parse_klines(content: &str, symbol: &str, interval: Interval) -> Result<Vec<Candle>, String> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut candles = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| format!("CSV parse error: {e}"))?;
        let first = record.get(0).unwrap_or_default();
        if first.is_empty() || (line == 0 && parse_open_time(first).is_none()) {
            continue;
        }
        let candle = if record.len() >= 11 {
            parse_binance_row(&record, symbol)
        } else {
            parse_simple_row(&record, symbol, interval)
        }
        .map_err(|e| format!("line {}: {}", line + 1, e))?;
        candles.push(candle);
    }

    Ok(dedupe_and_sort(candles))
}

fn field(record: &csv::StringRecord, idx: usize, name: &str) -> Result<f64, String> {
    record
        .get(idx)
        .ok_or_else(|| format!("missing {name} column"))?
        .parse()
        .map_err(|e| format!("invalid {name} value: {e}"))
}

/// Binance dumps switched to microseconds in 2025.
fn epoch_to_datetime(raw: i64) -> Option<NaiveDateTime> {
    if raw > 100_000_000_000_000 {
        from_millis(raw / 1000)
    } else {
        from_millis(raw)
    }
}

fn parse_open_time(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(ts) = raw.parse::<i64>() {
        return epoch_to_datetime(ts);
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn parse_binance_row(record: &csv::StringRecord, symbol: &str) -> Result<Candle, String> {
    let open_time = record
        .get(0)
        .and_then(|s| s.parse::<i64>().ok())
        .and_then(epoch_to_datetime)
        .ok_or("invalid open_time")?;
    let close_time = record
        .get(6)
        .and_then(|s| s.parse::<i64>().ok())
        .and_then(epoch_to_datetime)
        .ok_or("invalid close_time")?;
    Ok(Candle {
        symbol: symbol.to_string(),
        open_time,
        close_time,
        open: field(record, 1, "open")?,
        high: field(record, 2, "high")?,
        low: field(record, 3, "low")?,
        close: field(record, 4, "close")?,
        volume: field(record, 5, "volume")?,
        quote_volume: field(record, 7, "quote_volume")?,
        trades: record
            .get(8)
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or("invalid trades value")?,
        taker_buy_base: field(record, 9, "taker_buy_base")?,
        taker_buy_quote: field(record, 10, "taker_buy_quote")?,
    })
}

fn parse_simple_row(
    record: &csv::StringRecord,
    symbol: &str,
    interval: Interval,
) -> Result<Candle, String> {
    let open_time = record
        .get(0)
        .and_then(parse_open_time)
        .ok_or("invalid open_time")?;
    let close = field(record, 4, "close")?;
    let volume = field(record, 5, "volume")?;
    Ok(Candle {
        symbol: symbol.to_string(),
        open_time,
        close_time: open_time + chrono::Duration::milliseconds(interval.duration_ms() - 1),
        open: field(record, 1, "open")?,
        high: field(record, 2, "high")?,
        low: field(record, 3, "low")?,
        close,
        volume,
        quote_volume: volume * close,
        trades: 0,
        taker_buy_base: 0.0,
        taker_buy_quote: 0.0,
    })
}

/// Keep the first candle per close time, ascending.
pub fn dedupe_and_sort(mut candles: Vec<Candle>) -> Vec<Candle> {
    let before = candles.len();
    candles.sort_by_key(|c| c.close_time);
    candles.dedup_by_key(|c| c.close_time);
    if candles.len() < before {
        warn!("dropped {} duplicate klines", before - candles.len());
    }
    candles
}

impl DataPort for CsvAdapter {
    fn fetch_klines(
        &self,
        symbol: &str,
        interval: Interval,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<Vec<Candle>, TraderError> {
        let candles: Vec<Candle> = self
            .read_all(symbol, interval)?
            .into_iter()
            .filter(|c| start.is_none_or(|s| c.close_time >= s))
            .filter(|c| end.is_none_or(|e| c.close_time <= e))
            .collect();
        if candles.is_empty() {
            return Err(TraderError::NoData {
                symbol: symbol.to_string(),
                interval: interval.to_string(),
            });
        }
        Ok(candles)
    }

    fn list_symbols(&self) -> Result<Vec<String>, TraderError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| TraderError::Data {
            reason: format!("failed to read directory {}: {}", self.base_path.display(), e),
        })?;

        let mut symbols = BTreeSet::new();
        for entry in entries {
            let name = entry?.file_name();
            let name = name.to_string_lossy();
            let Some(stem) = name.strip_suffix(".csv") else {
                continue;
            };
            if let Some((symbol, interval)) = stem.rsplit_once('_')
                && interval.parse::<Interval>().is_ok()
                && !symbol.is_empty()
            {
                symbols.insert(symbol.to_string());
            }
        }
        Ok(symbols.into_iter().collect())
    }

    fn get_data_range(
        &self,
        symbol: &str,
        interval: Interval,
    ) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, TraderError> {
        let candles = match self.read_all(symbol, interval) {
            Ok(c) => c,
            Err(TraderError::NoData { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(match (candles.first(), candles.last()) {
            (Some(first), Some(last)) => Some((first.close_time, last.close_time, candles.len())),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::{Direction, ExitReason};
    use tempfile::TempDir;

    // 2024-01-01 00:00 UTC
    const T0: i64 = 1_704_067_200_000;
    const HOUR: i64 = 3_600_000;

    fn binance_row(i: i64, close: f64) -> String {
        format!(
            "{},{},{},{},{},12.5,{},{},42,6.0,{},0\n",
            T0 + i * HOUR,
            close - 1.0,
            close + 2.0,
            close - 2.0,
            close,
            T0 + (i + 1) * HOUR - 1,
            12.5 * close,
            6.0 * close
        )
    }

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        // Out of order with a duplicate; no header.
        let content = [binance_row(1, 101.0), binance_row(0, 100.0), binance_row(2, 102.0), binance_row(1, 999.0)]
            .concat();
        fs::write(path.join("BTCUSDT_1h.csv"), content).unwrap();
        fs::write(
            path.join("ETHUSDT_4h.csv"),
            "open_time,open,high,low,close,volume\n\
             2024-01-01 00:00:00,10,11,9,10.5,100\n\
             2024-01-01 04:00:00,10.5,12,10,11.5,200\n",
        )
        .unwrap();
        fs::write(path.join("notes.csv"), "hello\n").unwrap();
        fs::write(path.join("README.md"), "x").unwrap();

        (dir, path)
    }

    #[test]
    fn reads_binance_layout_sorted_and_deduplicated() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        let candles = adapter.fetch_klines("BTCUSDT", Interval::H1, None, None).unwrap();

        assert_eq!(candles.len(), 3);
        assert!(candles.windows(2).all(|w| w[0].close_time < w[1].close_time));
        assert_eq!(candles[0].open_time, from_millis(T0).unwrap());
        assert_eq!(candles[1].close, 101.0);
        assert_eq!(candles[1].high, 103.0);
        assert_eq!(candles[1].trades, 42);
        assert_eq!(candles[0].symbol, "BTCUSDT");
    }

    #[test]
    fn reads_simple_layout_with_header() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        let candles = adapter.fetch_klines("ETHUSDT", Interval::H4, None, None).unwrap();

        assert_eq!(candles.len(), 2);
        assert_eq!(candles[1].close, 11.5);
        assert_eq!(
            candles[0].close_time,
            from_millis(T0 + 4 * HOUR - 1).unwrap()
        );
    }

    #[test]
    fn filters_by_close_time() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        let start = from_millis(T0 + HOUR);
        let end = from_millis(T0 + 2 * HOUR);
        let candles = adapter.fetch_klines("BTCUSDT", Interval::H1, start, end).unwrap();
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].close, 101.0);
    }

    #[test]
    fn microsecond_timestamps() {
        assert_eq!(
            epoch_to_datetime(T0 * 1000),
            epoch_to_datetime(T0)
        );
    }

    #[test]
    fn missing_file_is_no_data() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        let result = adapter.fetch_klines("XRPUSDT", Interval::H1, None, None);
        assert!(matches!(result, Err(TraderError::NoData { .. })));
        assert!(adapter.get_data_range("XRPUSDT", Interval::H1).unwrap().is_none());
    }

    #[test]
    fn malformed_row_is_data_error() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("BAD_1h.csv"),
            "open_time,open,high,low,close,volume\n2024-01-01,1,2,x,1,1\n",
        )
        .unwrap();
        let adapter = CsvAdapter::new(dir.path().to_path_buf());
        assert!(matches!(
            adapter.fetch_klines("BAD", Interval::H1, None, None),
            Err(TraderError::Data { .. })
        ));
    }

    #[test]
    fn list_symbols_uses_interval_suffix() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        assert_eq!(adapter.list_symbols().unwrap(), vec!["BTCUSDT", "ETHUSDT"]);
    }

    #[test]
    fn data_range() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        let (first, last, count) = adapter
            .get_data_range("BTCUSDT", Interval::H1)
            .unwrap()
            .unwrap();
        assert_eq!(count, 3);
        assert_eq!(first, from_millis(T0 + HOUR - 1).unwrap());
        assert_eq!(last, from_millis(T0 + 3 * HOUR - 1).unwrap());
    }

    #[test]
    fn write_klines_reads_back() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path.clone());
        let original = adapter.fetch_klines("BTCUSDT", Interval::H1, None, None).unwrap();

        let out = CsvAdapter::new(path.join("out"));
        let written = out.write_klines("BTCUSDT", Interval::H1, &original).unwrap();
        assert!(written.ends_with("BTCUSDT_1h.csv"));
        let reread = out.fetch_klines("BTCUSDT", Interval::H1, None, None).unwrap();
        assert_eq!(reread, original);
    }

    #[test]
    fn trade_log_has_header_and_rows() {
        let dir = TempDir::new().unwrap();
        let t = from_millis(T0).unwrap();
        let trade = ClosedTrade {
            symbol: "BTCUSDT".into(),
            direction: Direction::Short,
            size: 0.5,
            entry_price: 100.0,
            exit_price: 95.0,
            stop_loss: 103.0,
            take_profit: 95.0,
            entry_time: t,
            exit_time: t + chrono::Duration::hours(3),
            exit_reason: ExitReason::TakeProfit,
            pnl: 2.5,
            commission: 0.0,
        };
        let path = dir.path().join("trades.csv");
        write_trade_log(&path, &[trade]).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert!(lines.next().unwrap().starts_with("symbol,direction,size"));
        let row = lines.next().unwrap();
        assert!(row.contains("SHORT"));
        assert!(row.contains("TAKE_PROFIT"));
    }
}
