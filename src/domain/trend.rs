//! Trend filter and market classification.
//!
//! Three classifiers share one entry point, [`TrendFilter::detect`]:
//! - `EmaSlope`: votes on EMA-21 slope, price vs EMA and 10-bar momentum.
//! - `MultiPeriod`: a rally override, then a score over 20/50/100-bar
//!   changes and the close's position in its recent range.
//! - `Balanced`: separate bull and bear scores with wider thresholds.
//!
//! All of them only read candles up to the index they are asked about.

use std::fmt;

use log::debug;

use crate::domain::indicator::IndicatorType;
use crate::domain::market_data::SymbolData;
use crate::domain::ohlcv::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trend {
    Bullish,
    Bearish,
    Neutral,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Bullish => "BULLISH",
            Trend::Bearish => "BEARISH",
            Trend::Neutral => "NEUTRAL",
        }
    }

    pub fn parse(s: &str) -> Option<Trend> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bullish" => Some(Trend::Bullish),
            "bearish" => Some(Trend::Bearish),
            "neutral" => Some(Trend::Neutral),
            _ => None,
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendMode {
    EmaSlope,
    MultiPeriod,
    Balanced,
}

impl TrendMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendMode::EmaSlope => "ema_slope",
            TrendMode::MultiPeriod => "multi_period",
            TrendMode::Balanced => "balanced",
        }
    }

    pub fn parse(s: &str) -> Option<TrendMode> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ema_slope" | "ema" => Some(TrendMode::EmaSlope),
            "multi_period" | "multi" => Some(TrendMode::MultiPeriod),
            "balanced" => Some(TrendMode::Balanced),
            _ => None,
        }
    }
}

impl fmt::Display for TrendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thresholds are fractions (0.01 = 1 %) except `rally_threshold_pct`.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendFilter {
    pub mode: TrendMode,
    /// Minimum history before `EmaSlope` or `Balanced` say anything.
    pub lookback: usize,
    pub slope_bars: usize,
    pub ema_slope_threshold: f64,
    pub price_vs_ema_threshold: f64,
    pub momentum_threshold: f64,
    pub rally_window: usize,
    pub rally_threshold_pct: f64,
    /// `MultiPeriod` result when the score is zero.
    pub fallback: Trend,
}

impl Default for TrendFilter {
    fn default() -> Self {
        TrendFilter {
            mode: TrendMode::MultiPeriod,
            lookback: 50,
            slope_bars: 10,
            ema_slope_threshold: 0.01,
            price_vs_ema_threshold: 0.005,
            momentum_threshold: 0.02,
            rally_window: 100,
            rally_threshold_pct: 20.0,
            fallback: Trend::Neutral,
        }
    }
}

impl TrendFilter {
    pub fn with_mode(mode: TrendMode) -> Self {
        TrendFilter {
            mode,
            ..Default::default()
        }
    }

    /// EMA the `EmaSlope` mode reads from the symbol's indicator map.
    pub fn required_indicators(&self) -> Vec<IndicatorType> {
        match self.mode {
            TrendMode::EmaSlope => vec![IndicatorType::EMA_SLOW],
            TrendMode::MultiPeriod | TrendMode::Balanced => vec![],
        }
    }

    /// Trend as of candle `index` of `data`, reading its whole history.
    pub fn detect(&self, data: &SymbolData, index: usize) -> Trend {
        self.detect_within(data, index, None)
    }

    /// Trend as of candle `index`, reading at most the last `window` candles.
    pub fn detect_within(&self, data: &SymbolData, index: usize, window: Option<usize>) -> Trend {
        if data.is_empty() {
            return Trend::Neutral;
        }
        let index = index.min(data.len() - 1);
        let start = window.map_or(0, |w| (index + 1).saturating_sub(w));
        let history = &data.candles[start..=index];
        let trend = match self.mode {
            TrendMode::EmaSlope => self.ema_slope(data, index, history.len()),
            TrendMode::MultiPeriod => self.multi_period(history),
            TrendMode::Balanced => self.balanced(history),
        };
        debug!(
            "{} trend at {}: {} ({})",
            data.symbol, data.candles[index].close_time, trend, self.mode
        );
        trend
    }

    fn ema_slope(&self, data: &SymbolData, index: usize, available: usize) -> Trend {
        if available < self.lookback.max(self.slope_bars) || self.slope_bars == 0 {
            return Trend::Neutral;
        }
        let back = index + 1 - self.slope_bars;
        let (Some(ema_now), Some(ema_then)) = (
            data.simple_at(IndicatorType::EMA_SLOW, index),
            data.simple_at(IndicatorType::EMA_SLOW, back),
        ) else {
            return Trend::Neutral;
        };
        if ema_then == 0.0 || ema_now == 0.0 {
            return Trend::Neutral;
        }
        let close = data.candles[index].close;
        let close_then = data.candles[back].close;
        if close_then == 0.0 {
            return Trend::Neutral;
        }

        let slope = (ema_now - ema_then) / ema_then;
        let price_vs_ema = (close - ema_now) / ema_now;
        let momentum = (close - close_then) / close_then;

        let votes = [
            (slope, self.ema_slope_threshold),
            (price_vs_ema, self.price_vs_ema_threshold),
            (momentum, self.momentum_threshold),
        ];
        let bull = votes.iter().filter(|(v, t)| *v > *t).count();
        let bear = votes.iter().filter(|(v, t)| *v < -*t).count();

        if bull >= 2 {
            Trend::Bullish
        } else if bear >= 2 {
            Trend::Bearish
        } else {
            Trend::Neutral
        }
    }

    fn multi_period(&self, history: &[Candle]) -> Trend {
        let len = history.len();
        let Some(close) = history.last().map(|c| c.close) else {
            return Trend::Neutral;
        };

        if self.rally_window > 0 && len >= self.rally_window {
            if let Some(total) = pct_change(history[len - self.rally_window].close, close) {
                if total > self.rally_threshold_pct {
                    return Trend::Bullish;
                }
                if total < -self.rally_threshold_pct {
                    return Trend::Bearish;
                }
            }
        }

        let mut score: i32 = 0;
        for lookback in [20, 50, 100] {
            if let Some(change) = change_over(history, lookback) {
                score += if change > 3.0 {
                    2
                } else if change > 1.0 {
                    1
                } else if change < -3.0 {
                    -2
                } else if change < -1.0 {
                    -1
                } else {
                    0
                };
            }
        }

        if len >= 10 {
            let recent = &history[len.saturating_sub(50)..];
            let (low, high) = recent.iter().fold((f64::MAX, f64::MIN), |(lo, hi), c| {
                (lo.min(c.close), hi.max(c.close))
            });
            if high > low {
                let position = (close - low) / (high - low);
                if position > 0.7 {
                    score += 2;
                } else if position < 0.3 {
                    score -= 2;
                }
            }
        }

        if score >= 1 {
            Trend::Bullish
        } else if score <= -1 {
            Trend::Bearish
        } else {
            self.fallback
        }
    }

    fn balanced(&self, history: &[Candle]) -> Trend {
        let len = history.len();
        if len < self.lookback {
            return Trend::Neutral;
        }
        let close = history[len - 1].close;

        let mut bull = 0;
        let mut bear = 0;
        for lookback in [20, 50, 100] {
            if let Some(change) = change_over(history, lookback) {
                if change > 5.0 {
                    bull += 2;
                } else if change > 1.0 {
                    bull += 1;
                } else if change < -5.0 {
                    bear += 2;
                } else if change < -1.0 {
                    bear += 1;
                }
            }
        }

        if let Some(momentum) = change_over(history, 20) {
            if momentum > 2.0 {
                bull += 1;
            } else if momentum < -2.0 {
                bear += 1;
            }
        }

        if len >= 20 {
            let recent = &history[len.saturating_sub(50)..];
            let (low, high) = recent.iter().fold((f64::MAX, f64::MIN), |(lo, hi), c| {
                (lo.min(c.low), hi.max(c.high))
            });
            if high > low {
                let position = (close - low) / (high - low);
                if position > 0.7 {
                    bull += 1;
                } else if position < 0.3 {
                    bear += 1;
                }
            }
        }

        let net = bull - bear;
        if net >= 2 {
            Trend::Bullish
        } else if net <= -2 {
            Trend::Bearish
        } else {
            Trend::Neutral
        }
    }
}

/// Percent change from `from` to `to`; `None` when `from` is zero.
fn pct_change(from: f64, to: f64) -> Option<f64> {
    (from != 0.0).then(|| (to / from - 1.0) * 100.0)
}

/// Percent change from the close `lookback - 1` bars ago to the last close.
fn change_over(history: &[Candle], lookback: usize) -> Option<f64> {
    let len = history.len();
    if lookback == 0 || len < lookback {
        return None;
    }
    pct_change(history[len - lookback].close, history[len - 1].close)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketRegime {
    StrongBull,
    Bull,
    Sideways,
    Bear,
    StrongBear,
}

impl fmt::Display for MarketRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MarketRegime::StrongBull => "strong bull",
            MarketRegime::Bull => "bull",
            MarketRegime::Sideways => "sideways",
            MarketRegime::Bear => "bear",
            MarketRegime::StrongBear => "strong bear",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarketConditions {
    pub first_close: f64,
    pub last_close: f64,
    pub total_change_pct: f64,
    /// Sample standard deviation of bar-to-bar returns, in percent.
    pub volatility_pct: f64,
    /// `(bars, change_pct)` for each period the history covers.
    pub period_changes: Vec<(usize, f64)>,
    pub regime: MarketRegime,
}

pub const MARKET_PERIODS: [usize; 4] = [30, 60, 120, 240];

pub fn classify_market(candles: &[Candle]) -> Option<MarketConditions> {
    let first_close = candles.first()?.close;
    let last_close = candles.last()?.close;
    let total_change_pct = pct_change(first_close, last_close)?;

    let returns: Vec<f64> = candles
        .windows(2)
        .filter(|w| w[0].close != 0.0)
        .map(|w| w[1].close / w[0].close - 1.0)
        .collect();
    let volatility_pct = if returns.len() > 1 {
        let mean = returns.iter().sum::<f64>() / returns.len() as f64;
        let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>()
            / (returns.len() - 1) as f64;
        var.sqrt() * 100.0
    } else {
        0.0
    };

    let period_changes = MARKET_PERIODS
        .iter()
        .filter_map(|&p| change_over(candles, p).map(|c| (p, c)))
        .collect();

    let regime = if total_change_pct > 20.0 {
        MarketRegime::StrongBull
    } else if total_change_pct > 5.0 {
        MarketRegime::Bull
    } else if total_change_pct < -20.0 {
        MarketRegime::StrongBear
    } else if total_change_pct < -5.0 {
        MarketRegime::Bear
    } else {
        MarketRegime::Sideways
    };

    Some(MarketConditions {
        first_close,
        last_close,
        total_change_pct,
        volatility_pct,
        period_changes,
        regime,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::{candle, make_candles};
    use approx::assert_relative_eq;

    fn linear(n: usize, start: f64, step: f64) -> Vec<f64> {
        (0..n).map(|i| start + step * i as f64).collect()
    }

    fn data(prices: &[f64]) -> SymbolData {
        SymbolData::with_indicators("TEST".into(), make_candles(prices), &[IndicatorType::EMA_SLOW])
    }

    #[test]
    fn ema_slope_uptrend_is_bullish() {
        let sd = data(&linear(80, 100.0, 1.0));
        let filter = TrendFilter::with_mode(TrendMode::EmaSlope);
        assert_eq!(filter.detect(&sd, 79), Trend::Bullish);
    }

    #[test]
    fn ema_slope_downtrend_is_bearish() {
        let sd = data(&linear(80, 200.0, -1.0));
        let filter = TrendFilter::with_mode(TrendMode::EmaSlope);
        assert_eq!(filter.detect(&sd, 79), Trend::Bearish);
    }

    #[test]
    fn ema_slope_needs_lookback() {
        let sd = data(&linear(80, 100.0, 1.0));
        let filter = TrendFilter::with_mode(TrendMode::EmaSlope);
        assert_eq!(filter.detect(&sd, 48), Trend::Neutral);
        assert_eq!(filter.detect(&sd, 49), Trend::Bullish);
    }

    #[test]
    fn window_limits_multi_period_history() {
        // +50% over 90 bars, then a 30-bar pullback
        let mut prices = linear(90, 100.0, 50.0 / 89.0);
        prices.extend(linear(30, 150.0 - 10.0 / 30.0, -10.0 / 30.0));
        let sd = data(&prices);
        let filter = TrendFilter::default();
        assert_eq!(filter.detect(&sd, 119), Trend::Bullish);
        assert_eq!(filter.detect_within(&sd, 119, Some(30)), Trend::Bearish);
        assert_eq!(filter.detect_within(&sd, 119, None), Trend::Bullish);
    }

    #[test]
    fn window_shorter_than_lookback_is_neutral() {
        let sd = data(&linear(80, 100.0, 1.0));
        let filter = TrendFilter::with_mode(TrendMode::EmaSlope);
        assert_eq!(filter.detect_within(&sd, 79, Some(40)), Trend::Neutral);
        assert_eq!(filter.detect_within(&sd, 79, Some(60)), Trend::Bullish);
    }

    #[test]
    fn ema_slope_flat_is_neutral() {
        let sd = data(&[100.0; 80]);
        let filter = TrendFilter::with_mode(TrendMode::EmaSlope);
        assert_eq!(filter.detect(&sd, 79), Trend::Neutral);
    }

    #[test]
    fn multi_period_rally_override() {
        // +25 % over 100 bars, but the last 50 bars drift down.
        let mut prices = linear(50, 100.0, 1.0);
        prices.extend(linear(50, 149.0, -0.48));
        let sd = data(&prices);
        let filter = TrendFilter::default();
        assert!(prices[99] / prices[0] > 1.2);
        assert_eq!(filter.detect(&sd, 99), Trend::Bullish);
    }

    #[test]
    fn multi_period_crash_override() {
        let sd = data(&linear(100, 200.0, -0.6));
        assert_eq!(TrendFilter::default().detect(&sd, 99), Trend::Bearish);
    }

    #[test]
    fn multi_period_score_without_rally() {
        let sd = data(&linear(60, 100.0, 0.2));
        assert_eq!(TrendFilter::default().detect(&sd, 59), Trend::Bullish);
        let sd = data(&linear(60, 100.0, -0.2));
        assert_eq!(TrendFilter::default().detect(&sd, 59), Trend::Bearish);
    }

    #[test]
    fn multi_period_flat_uses_fallback() {
        let sd = data(&[100.0; 120]);
        assert_eq!(TrendFilter::default().detect(&sd, 119), Trend::Neutral);
        let filter = TrendFilter {
            fallback: Trend::Bullish,
            ..Default::default()
        };
        assert_eq!(filter.detect(&sd, 119), Trend::Bullish);
    }

    #[test]
    fn balanced_requires_history() {
        let sd = data(&linear(40, 100.0, 2.0));
        let filter = TrendFilter::with_mode(TrendMode::Balanced);
        assert_eq!(filter.detect(&sd, 39), Trend::Neutral);
    }

    #[test]
    fn balanced_trends() {
        let filter = TrendFilter::with_mode(TrendMode::Balanced);
        let up = data(&linear(120, 100.0, 0.5));
        assert_eq!(filter.detect(&up, 119), Trend::Bullish);
        let down = data(&linear(120, 200.0, -0.5));
        assert_eq!(filter.detect(&down, 119), Trend::Bearish);
        let flat = data(&[100.0; 120]);
        assert_eq!(filter.detect(&flat, 119), Trend::Neutral);
    }

    #[test]
    fn detect_ignores_future_bars() {
        let mut prices = vec![100.0; 60];
        prices.extend(linear(60, 100.0, 3.0));
        let sd = data(&prices);
        let filter = TrendFilter::with_mode(TrendMode::Balanced);
        assert_eq!(filter.detect(&sd, 59), Trend::Neutral);
        assert_eq!(filter.detect(&sd, 119), Trend::Bullish);
    }

    #[test]
    fn classify_market_regimes() {
        let strong = classify_market(&make_candles(&linear(241, 100.0, 0.25))).unwrap();
        assert_eq!(strong.regime, MarketRegime::StrongBull);
        assert_relative_eq!(strong.total_change_pct, 60.0, epsilon = 1e-9);
        assert_eq!(strong.period_changes.len(), 4);

        let bear = classify_market(&make_candles(&linear(31, 100.0, -0.3))).unwrap();
        assert_eq!(bear.regime, MarketRegime::Bear);
        assert_eq!(bear.period_changes.len(), 1);

        let flat = classify_market(&make_candles(&[100.0, 101.0, 100.0])).unwrap();
        assert_eq!(flat.regime, MarketRegime::Sideways);
        assert!(flat.volatility_pct > 0.0);

        assert!(classify_market(&[]).is_none());
    }

    #[test]
    fn period_change_uses_bar_lookback() {
        let candles: Vec<Candle> = (0..30)
            .map(|i| {
                let c = if i == 0 { 50.0 } else { 100.0 + i as f64 };
                candle(i, c, c, c, c)
            })
            .collect();
        let conditions = classify_market(&candles).unwrap();
        // The 30-bar change starts at the first candle.
        assert_eq!(conditions.period_changes, vec![(30, (129.0 / 50.0 - 1.0) * 100.0)]);
    }

    #[test]
    fn parse_names() {
        assert_eq!(TrendMode::parse("Balanced"), Some(TrendMode::Balanced));
        assert_eq!(TrendMode::parse("ema_slope"), Some(TrendMode::EmaSlope));
        assert_eq!(TrendMode::parse("x"), None);
        assert_eq!(Trend::parse("NEUTRAL"), Some(Trend::Neutral));
        assert_eq!(Trend::Bearish.to_string(), "BEARISH");
    }
}
