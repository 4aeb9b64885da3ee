//! Live kline stream: parse Binance kline events, keep a rolling candle
//! history and run the strategy on every newly closed candle.
//!
//! The websocket loop itself needs the `live` feature.

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::TraderError;
use crate::domain::indicator::IndicatorType;
use crate::domain::market_data::SymbolData;
use crate::domain::ohlcv::{from_millis, Candle, Interval};
use crate::domain::portfolio::PortfolioManager;
use crate::domain::strategy::SignalGenerator;
use chrono::NaiveDateTime;
use log::{debug, info};
use serde::Deserialize;
use std::collections::HashMap;

pub const STREAM_BASE_URL: &str = "wss://stream.binance.com:9443/ws";

pub fn stream_url(symbol: &str, interval: Interval) -> String {
    format!(
        "{}/{}@kline_{}",
        STREAM_BASE_URL,
        symbol.to_lowercase(),
        interval
    )
}

#[derive(Debug, Deserialize)]
struct KlineEvent {
    #[serde(rename = "k")]
    kline: KlinePayload,
}

#[derive(Debug, Deserialize)]
struct KlinePayload {
    #[serde(rename = "t")]
    open_time: i64,
    #[serde(rename = "T")]
    close_time: i64,
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "o")]
    open: String,
    #[serde(rename = "h")]
    high: String,
    #[serde(rename = "l")]
    low: String,
    #[serde(rename = "c")]
    close: String,
    #[serde(rename = "v")]
    volume: String,
    #[serde(rename = "n")]
    trades: u64,
    #[serde(rename = "x")]
    closed: bool,
    #[serde(rename = "q")]
    quote_volume: String,
    #[serde(rename = "V")]
    taker_buy_base: String,
    #[serde(rename = "Q")]
    taker_buy_quote: String,
}

fn number(raw: &str) -> Result<f64, TraderError> {
    raw.parse().map_err(|e| TraderError::Stream {
        reason: format!("invalid number '{raw}': {e}"),
    })
}

fn time(ms: i64) -> Result<NaiveDateTime, TraderError> {
    from_millis(ms).ok_or_else(|| TraderError::Stream {
        reason: format!("invalid timestamp {ms}"),
    })
}

/// The candle carried by a kline event, only once it has closed.
pub fn parse_kline_event(text: &str) -> Result<Option<Candle>, TraderError> {
    let event: KlineEvent = serde_json::from_str(text)?;
    let k = event.kline;
    if !k.closed {
        return Ok(None);
    }
    Ok(Some(Candle {
        symbol: k.symbol,
        open_time: time(k.open_time)?,
        close_time: time(k.close_time)?,
        open: number(&k.open)?,
        high: number(&k.high)?,
        low: number(&k.low)?,
        close: number(&k.close)?,
        volume: number(&k.volume)?,
        quote_volume: number(&k.quote_volume)?,
        trades: k.trades,
        taker_buy_base: number(&k.taker_buy_base)?,
        taker_buy_quote: number(&k.taker_buy_quote)?,
    }))
}

/// One symbol's rolling history plus the portfolio trading it.
pub struct LiveFeed {
    pub data: SymbolData,
    pub portfolio: PortfolioManager,
    strategy: Box<dyn SignalGenerator>,
    indicators: Vec<IndicatorType>,
    max_history: usize,
}

impl LiveFeed {
    /// `history` is the REST warm-up; an in-progress last kline is dropped.
    pub fn new(
        symbol: &str,
        mut history: Vec<Candle>,
        strategy: Box<dyn SignalGenerator>,
        config: &BacktestConfig,
        now: NaiveDateTime,
    ) -> Self {
        history.retain(|c| c.close_time < now);
        let indicators = config.indicators_for(strategy.as_ref());
        let max_history = history.len().max(config.min_data_points).max(500);
        LiveFeed {
            data: SymbolData::with_indicators(symbol.to_string(), history, &indicators),
            portfolio: config.new_portfolio(),
            strategy,
            indicators,
            max_history,
        }
    }

    pub fn last_close_time(&self) -> Option<NaiveDateTime> {
        self.data.last_time()
    }

    /// Append a closed candle and trade on it. Stale or duplicate candles are
    /// ignored and return `false`.
    pub fn on_closed_candle(&mut self, candle: Candle) -> bool {
        if self.last_close_time().is_some_and(|last| candle.close_time <= last) {
            debug!("ignoring stale kline closing at {}", candle.close_time);
            return false;
        }

        let mut candles = std::mem::take(&mut self.data.candles);
        candles.push(candle);
        if candles.len() > self.max_history {
            let excess = candles.len() - self.max_history;
            candles.drain(..excess);
        }
        self.data = SymbolData::with_indicators(self.data.symbol.clone(), candles, &self.indicators);

        let index = self.data.len() - 1;
        let trades_before = self.portfolio.trade_history.len();
        let open_before = self.portfolio.has_position(&self.data.symbol);
        self.portfolio
            .update_for_symbol(self.strategy.as_mut(), &self.data, index);

        let last = &self.data.candles[index];
        let prices = HashMap::from([(self.data.symbol.clone(), last.close)]);
        self.portfolio.mark_to_market(last.close_time, &prices);

        if let Some(trade) = self.portfolio.trade_history.get(trades_before) {
            info!(
                "{} closed {} {} PnL {:+.2} ({})",
                trade.exit_time, trade.direction, trade.symbol, trade.pnl, trade.exit_reason
            );
        }
        if !open_before && let Some(pos) = self.portfolio.open_positions.get(&self.data.symbol) {
            info!(
                "{} opened {} {} @ {:.6} SL {:.6} TP {:.6}",
                pos.entry_time, pos.direction, pos.symbol, pos.entry_price, pos.stop_loss, pos.take_profit
            );
        }
        true
    }
}

#[cfg(feature = "live")]
mod websocket {
    use super::{parse_kline_event, LiveFeed};
    use crate::domain::error::TraderError;
    use futures::StreamExt;
    use log::{error, info, warn};
    use std::time::Duration;
    use tokio_tungstenite::{connect_async, tungstenite::Message};

    const INITIAL_RECONNECT_DELAY_SECS: u64 = 1;
    const MAX_RECONNECT_DELAY_SECS: u64 = 60;

    /// Stream `url` into `feed` forever, reconnecting with exponential backoff.
    pub async fn run_with_reconnect(url: &str, feed: &mut LiveFeed) {
        let mut delay = INITIAL_RECONNECT_DELAY_SECS;
        loop {
            match run_once(url, feed).await {
                Ok(()) => {
                    info!("kline stream closed, reconnecting");
                    delay = INITIAL_RECONNECT_DELAY_SECS;
                }
                Err(e) => {
                    error!("kline stream error: {e}");
                    warn!("reconnecting in {delay} seconds");
                    tokio::time::sleep(Duration::from_secs(delay)).await;
                    delay = (delay * 2).min(MAX_RECONNECT_DELAY_SECS);
                }
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }

    async fn run_once(url: &str, feed: &mut LiveFeed) -> Result<(), TraderError> {
        let (ws_stream, _) = connect_async(url).await.map_err(|e| TraderError::Stream {
            reason: format!("connect to {url}: {e}"),
        })?;
        info!("connected to {url}");
        let (_write, mut read) = ws_stream.split();

        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => match parse_kline_event(text.as_str()) {
                    Ok(Some(candle)) => {
                        feed.on_closed_candle(candle);
                    }
                    Ok(None) => {}
                    Err(e) => warn!("unexpected kline payload: {e}"),
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(TraderError::Stream {
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(feature = "live")]
pub use websocket::run_with_reconnect;
