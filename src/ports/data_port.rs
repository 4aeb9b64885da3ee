//! Market data access port.

use crate::domain::error::TraderError;
use crate::domain::ohlcv::{Candle, Interval};
use chrono::NaiveDateTime;

pub trait DataPort {
    /// Candles for `symbol` whose close time falls in `[start, end]`, sorted
    /// by close time. `None` bounds are open.
    fn fetch_klines(
        &self,
        symbol: &str,
        interval: Interval,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<Vec<Candle>, TraderError>;

    fn list_symbols(&self) -> Result<Vec<String>, TraderError>;

    /// First close time, last close time and candle count.
    fn get_data_range(
        &self,
        symbol: &str,
        interval: Interval,
    ) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, TraderError>;
}
