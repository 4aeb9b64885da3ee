//! Elliott wave strategy with trend adaptation.
//!
//! Each evaluation runs on the last `wave_analysis_lookback` candles (the
//! whole history outside scalping mode):
//!
//! 1. classify the trend (when the filter is enabled),
//! 2. detect impulses and take the most recent one,
//! 3. drop it below `min_wave_confidence`,
//! 4. adapt the wave's suggested action to the trend,
//! 5. validate the candidate against recent price action (scalping mode),
//! 6. enforce the per-symbol cooldown.
//!
//! The presets reproduce the successive tunings of the strategy:
//! `v1` (no trend, classic validation), `v2` (EMA slope trend, conservative
//! adaptation, strict validation), `v2.5` (multi-period trend, forced
//! adaptation, permissive validation) and `robust` (balanced trend).

use std::collections::HashMap;
use std::fmt;

use log::debug;

use crate::domain::error::TraderError;
use crate::domain::indicator::IndicatorType;
use crate::domain::ohlcv::Candle;
use crate::domain::position::Direction;
use crate::domain::signal::{Signal, SignalContext, WaveAction};
use crate::domain::strategy::{positive_usize, SignalGenerator};
use crate::domain::trend::{Trend, TrendFilter, TrendMode};
use crate::domain::wave::{latest_wave_signal, WaveAnalyzer, WaveDirection, WaveSignal};
use crate::ports::config_port::ConfigPort;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdaptationMode {
    /// Flip only signals that fight the trend; in a neutral market, short
    /// completed upward waves only near the 10-bar high.
    Conservative,
    /// The trend decides the side; a neutral trend keeps the wave's action.
    Forced,
    None,
}

impl AdaptationMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "conservative" => Some(AdaptationMode::Conservative),
            "forced" => Some(AdaptationMode::Forced),
            "none" | "off" => Some(AdaptationMode::None),
            _ => None,
        }
    }
}

impl fmt::Display for AdaptationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AdaptationMode::Conservative => "conservative",
            AdaptationMode::Forced => "forced",
            AdaptationMode::None => "none",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Last 5 bars: minimum volatility, live volume, and entries only at
    /// the matching extreme (shorts near the high, longs near the low).
    Classic,
    /// Last 10 bars: minimum volatility, no longs at the high or shorts at
    /// the low, and no entries into RSI extremes.
    Strict,
    /// Last 5 bars: minimum volatility only.
    Permissive,
}

impl ValidationMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "classic" => Some(ValidationMode::Classic),
            "strict" => Some(ValidationMode::Strict),
            "permissive" => Some(ValidationMode::Permissive),
            _ => None,
        }
    }
}

impl fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValidationMode::Classic => "classic",
            ValidationMode::Strict => "strict",
            ValidationMode::Permissive => "permissive",
        })
    }
}

pub const PRESETS: [&str; 4] = ["v1", "v2", "v2.5", "robust"];

#[derive(Debug, Clone, PartialEq)]
pub struct ElliottConfig {
    pub preset: String,
    pub min_wave_confidence: f64,
    pub wave_analysis_lookback: usize,
    pub scalping_mode: bool,
    pub trend_filter_enabled: bool,
    pub trend: TrendFilter,
    pub adaptation: AdaptationMode,
    pub validation: ValidationMode,
    /// (max high - min low) / mean close over the validation window.
    pub min_volatility: f64,
    /// Bars between signals on one symbol; 0 disables it.
    pub signal_cooldown: usize,
    pub tp_range_multiplier: f64,
    pub analyzer: WaveAnalyzer,
}

impl ElliottConfig {
    pub fn v1(scalping_mode: bool) -> Self {
        ElliottConfig {
            preset: "v1".into(),
            min_wave_confidence: 0.7,
            wave_analysis_lookback: 50,
            scalping_mode,
            trend_filter_enabled: false,
            trend: TrendFilter::with_mode(TrendMode::EmaSlope),
            adaptation: AdaptationMode::None,
            validation: ValidationMode::Classic,
            min_volatility: 0.005,
            signal_cooldown: 5,
            tp_range_multiplier: 1.5,
            analyzer: WaveAnalyzer {
                min_wave_length: if scalping_mode { 10 } else { 20 },
                ..WaveAnalyzer::default()
            },
        }
    }

    pub fn v2(scalping_mode: bool) -> Self {
        ElliottConfig {
            preset: "v2".into(),
            min_wave_confidence: 0.75,
            wave_analysis_lookback: 100,
            scalping_mode,
            trend_filter_enabled: true,
            trend: TrendFilter::with_mode(TrendMode::EmaSlope),
            adaptation: AdaptationMode::Conservative,
            validation: ValidationMode::Strict,
            min_volatility: 0.003,
            signal_cooldown: 3,
            tp_range_multiplier: 1.2,
            analyzer: WaveAnalyzer {
                min_wave_length: if scalping_mode { 8 } else { 15 },
                ..WaveAnalyzer::default()
            },
        }
    }

    pub fn v2_5(scalping_mode: bool) -> Self {
        ElliottConfig {
            preset: "v2.5".into(),
            min_wave_confidence: 0.5,
            wave_analysis_lookback: 80,
            trend: TrendFilter::with_mode(TrendMode::MultiPeriod),
            adaptation: AdaptationMode::Forced,
            validation: ValidationMode::Permissive,
            min_volatility: 0.0001,
            signal_cooldown: 0,
            ..ElliottConfig::v2(scalping_mode)
        }
    }

    pub fn robust(scalping_mode: bool) -> Self {
        ElliottConfig {
            preset: "robust".into(),
            min_wave_confidence: 0.6,
            trend: TrendFilter::with_mode(TrendMode::Balanced),
            min_volatility: 0.00005,
            ..ElliottConfig::v2_5(scalping_mode)
        }
    }

    pub fn preset(name: &str, scalping_mode: bool) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "v1" => Some(Self::v1(scalping_mode)),
            "v2" => Some(Self::v2(scalping_mode)),
            "v2.5" | "v25" => Some(Self::v2_5(scalping_mode)),
            "robust" => Some(Self::robust(scalping_mode)),
            _ => None,
        }
    }

    /// Preset from `[elliott] preset` (default `v2.5`) with per-key overrides.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TraderError> {
        let name = config
            .get_string("elliott", "preset")
            .unwrap_or_else(|| "v2.5".to_string());
        let scalping = config.get_bool("elliott", "scalping_mode", true);
        let mut cfg = Self::preset(&name, scalping).ok_or_else(|| TraderError::UnknownStrategy {
            name: format!("elliott preset '{name}'"),
        })?;

        cfg.min_wave_confidence =
            config.get_double("elliott", "min_wave_confidence", cfg.min_wave_confidence);
        cfg.wave_analysis_lookback = positive_usize(
            config,
            "elliott",
            "wave_analysis_lookback",
            cfg.wave_analysis_lookback as i64,
        )?;
        cfg.trend_filter_enabled =
            config.get_bool("elliott", "trend_filter", cfg.trend_filter_enabled);
        cfg.min_volatility = config.get_double("elliott", "min_volatility", cfg.min_volatility);
        cfg.signal_cooldown =
            config.get_int("elliott", "signal_cooldown", cfg.signal_cooldown as i64).max(0) as usize;
        cfg.tp_range_multiplier =
            config.get_double("elliott", "tp_range_multiplier", cfg.tp_range_multiplier);

        if let Some(s) = config.get_string("elliott", "adaptation") {
            cfg.adaptation = AdaptationMode::parse(&s).ok_or_else(|| {
                TraderError::invalid("elliott", "adaptation", format!("unknown mode '{s}'"))
            })?;
        }
        if let Some(s) = config.get_string("elliott", "validation") {
            cfg.validation = ValidationMode::parse(&s).ok_or_else(|| {
                TraderError::invalid("elliott", "validation", format!("unknown mode '{s}'"))
            })?;
        }

        if let Some(s) = config.get_string("elliott", "trend_mode") {
            cfg.trend.mode = TrendMode::parse(&s).ok_or_else(|| {
                TraderError::invalid("elliott", "trend_mode", format!("unknown mode '{s}'"))
            })?;
        }
        if let Some(s) = config.get_string("elliott", "trend_fallback") {
            cfg.trend.fallback = Trend::parse(&s).ok_or_else(|| {
                TraderError::invalid("elliott", "trend_fallback", format!("unknown trend '{s}'"))
            })?;
        }
        cfg.trend.lookback =
            positive_usize(config, "elliott", "trend_lookback", cfg.trend.lookback as i64)?;
        cfg.trend.rally_window =
            positive_usize(config, "elliott", "rally_window", cfg.trend.rally_window as i64)?;
        cfg.trend.rally_threshold_pct =
            config.get_double("elliott", "rally_threshold_pct", cfg.trend.rally_threshold_pct);

        cfg.analyzer.min_wave_length = positive_usize(
            config,
            "elliott",
            "min_wave_length",
            cfg.analyzer.min_wave_length as i64,
        )?;
        cfg.analyzer.swing_threshold_pct =
            config.get_double("elliott", "swing_threshold_pct", cfg.analyzer.swing_threshold_pct);
        cfg.analyzer.fib_validation =
            config.get_bool("elliott", "fib_validation", cfg.analyzer.fib_validation);
        cfg.analyzer.both_directions =
            config.get_bool("elliott", "both_directions", cfg.analyzer.both_directions);

        Ok(cfg)
    }
}

impl Default for ElliottConfig {
    fn default() -> Self {
        ElliottConfig::v2_5(true)
    }
}

#[derive(Debug, Clone)]
pub struct ElliottWaveStrategy {
    pub config: ElliottConfig,
    name: String,
    /// Absolute bar index of the last non-HOLD signal, per symbol.
    last_signal_bar: HashMap<String, usize>,
}

impl ElliottWaveStrategy {
    pub fn new(config: ElliottConfig) -> Self {
        let name = format!("ElliottWave {}", config.preset);
        ElliottWaveStrategy {
            config,
            name,
            last_signal_bar: HashMap::new(),
        }
    }

    /// Candles the waves are read from.
    fn analysis_window<'a>(&self, ctx: &SignalContext<'a>) -> &'a [Candle] {
        if self.config.scalping_mode {
            ctx.window(self.config.wave_analysis_lookback)
        } else {
            ctx.history()
        }
    }

    /// Trend over the same candles the waves are read from.
    pub fn trend_at(&self, ctx: &SignalContext<'_>) -> Trend {
        if self.config.trend_filter_enabled {
            let window = self
                .config
                .scalping_mode
                .then_some(self.config.wave_analysis_lookback);
            self.config.trend.detect_within(ctx.data, ctx.index, window)
        } else {
            Trend::Neutral
        }
    }

    /// Trend-adapted action for the latest wave, before validation.
    pub fn adapt(&self, latest: &WaveSignal, trend: Trend, window: &[Candle]) -> WaveAction {
        let base = latest.action;
        match self.config.adaptation {
            AdaptationMode::None => base,
            AdaptationMode::Forced => match trend {
                Trend::Bullish => WaveAction::ConsiderLong,
                Trend::Bearish => WaveAction::ConsiderShort,
                Trend::Neutral => base,
            },
            AdaptationMode::Conservative => match (trend, base, latest.direction) {
                (Trend::Bullish, WaveAction::ConsiderShort, WaveDirection::Upward) => {
                    WaveAction::ConsiderLong
                }
                (Trend::Bearish, WaveAction::ConsiderLong, WaveDirection::Downward) => {
                    WaveAction::ConsiderShort
                }
                (Trend::Neutral, _, _) => neutral_action(latest, window),
                _ => base,
            },
        }
    }

    /// Whether recent price action supports acting on `action`.
    pub fn validate(&self, ctx: &SignalContext<'_>, window: &[Candle], action: WaveAction) -> bool {
        let (min_len, recent_len) = match self.config.validation {
            ValidationMode::Classic => (5, 5),
            ValidationMode::Strict => (5, 10),
            ValidationMode::Permissive => (3, 5),
        };
        if window.len() < min_len {
            return false;
        }
        let recent = &window[window.len().saturating_sub(recent_len)..];
        let Some(stats) = RecentStats::of(recent) else {
            return false;
        };
        if stats.volatility < self.config.min_volatility {
            return false;
        }

        match self.config.validation {
            ValidationMode::Permissive => true,
            ValidationMode::Classic => {
                if stats.mean_volume <= 0.0 {
                    return false;
                }
                match action {
                    WaveAction::ConsiderShort => stats.close >= stats.high * 0.98,
                    WaveAction::ConsiderLong => stats.close <= stats.low * 1.02,
                    WaveAction::Hold => true,
                }
            }
            ValidationMode::Strict => {
                let rsi = ctx.data.simple_at(IndicatorType::RSI, ctx.index);
                match action {
                    WaveAction::ConsiderLong => {
                        stats.close <= stats.high * 0.98 && rsi.is_none_or(|r| r <= 75.0)
                    }
                    WaveAction::ConsiderShort => {
                        stats.close >= stats.low * 1.02 && rsi.is_none_or(|r| r >= 25.0)
                    }
                    WaveAction::Hold => true,
                }
            }
        }
    }

    fn in_cooldown(&self, symbol: &str, index: usize) -> bool {
        let cooldown = self.config.signal_cooldown;
        if !self.config.scalping_mode || cooldown == 0 {
            return false;
        }
        self.last_signal_bar
            .get(symbol)
            .is_some_and(|&last| index.saturating_sub(last) < cooldown)
    }
}

/// Traditional reading used when the trend gives no direction: completed
/// downward waves are longs, completed upward waves are shorts only close
/// to the 10-bar high.
fn neutral_action(latest: &WaveSignal, window: &[Candle]) -> WaveAction {
    match latest.direction {
        WaveDirection::Downward if latest.points >= 5 => WaveAction::ConsiderLong,
        WaveDirection::Upward if latest.points >= 5 => {
            let recent = &window[window.len().saturating_sub(10)..];
            let high = recent.iter().map(|c| c.high).fold(f64::MIN, f64::max);
            match recent.last() {
                Some(c) if c.close >= high * 0.99 => WaveAction::ConsiderShort,
                _ => WaveAction::Hold,
            }
        }
        _ => latest.action,
    }
}

struct RecentStats {
    high: f64,
    low: f64,
    close: f64,
    mean_volume: f64,
    volatility: f64,
}

impl RecentStats {
    fn of(recent: &[Candle]) -> Option<Self> {
        let close = recent.last()?.close;
        let n = recent.len() as f64;
        let high = recent.iter().map(|c| c.high).fold(f64::MIN, f64::max);
        let low = recent.iter().map(|c| c.low).fold(f64::MAX, f64::min);
        let mean_close = recent.iter().map(|c| c.close).sum::<f64>() / n;
        if mean_close == 0.0 {
            return None;
        }
        Some(RecentStats {
            high,
            low,
            close,
            mean_volume: recent.iter().map(|c| c.volume).sum::<f64>() / n,
            volatility: (high - low) / mean_close,
        })
    }
}

impl SignalGenerator for ElliottWaveStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_indicators(&self) -> Vec<IndicatorType> {
        let mut out = if self.config.trend_filter_enabled {
            self.config.trend.required_indicators()
        } else {
            Vec::new()
        };
        if self.config.validation == ValidationMode::Strict {
            out.push(IndicatorType::RSI);
        }
        out
    }

    fn check_signal(&mut self, ctx: &SignalContext<'_>) -> Signal {
        if ctx.index + 1 < self.config.wave_analysis_lookback {
            return Signal::Hold;
        }
        let window = self.analysis_window(ctx);
        let trend = self.trend_at(ctx);

        let waves = self.config.analyzer.analyze(window);
        let Some(latest) = latest_wave_signal(&waves) else {
            return Signal::Hold;
        };
        if latest.confidence < self.config.min_wave_confidence {
            return Signal::Hold;
        }

        let action = self.adapt(&latest, trend, window);
        if action == WaveAction::Hold {
            return Signal::Hold;
        }
        if self.config.scalping_mode && !self.validate(ctx, window, action) {
            debug!(
                "{} {}: {} rejected by {} validation",
                ctx.symbol(),
                ctx.candle().close_time,
                action,
                self.config.validation
            );
            return Signal::Hold;
        }
        if self.in_cooldown(ctx.symbol(), ctx.index) {
            return Signal::Hold;
        }

        debug!(
            "{} {}: {} wave ({} pts, conf {:.2}) {} -> {} in {} trend",
            ctx.symbol(),
            ctx.candle().close_time,
            latest.direction.as_str(),
            latest.points,
            latest.confidence,
            latest.action,
            action,
            trend
        );
        self.last_signal_bar.insert(ctx.symbol().to_string(), ctx.index);
        action.to_signal()
    }

    fn take_profit(&self, ctx: &SignalContext<'_>, direction: Direction) -> Option<f64> {
        let candle = ctx.candle();
        Some(candle.close + direction.sign() * candle.range() * self.config.tp_range_multiplier)
    }

    fn describe(&self) -> String {
        let c = &self.config;
        let trend = if c.trend_filter_enabled {
            format!("{} (lookback {})", c.trend.mode, c.trend.lookback)
        } else {
            "off".to_string()
        };
        format!(
            "{}: lookback {} bars{}, min confidence {:.2}, min wave length {}, swing {:.2}%, \
             trend {}, adaptation {}, validation {}, cooldown {}, TP {}x candle range",
            self.name,
            c.wave_analysis_lookback,
            if c.scalping_mode { " (scalping)" } else { "" },
            c.min_wave_confidence,
            c.analyzer.min_wave_length,
            c.analyzer.swing_threshold_pct,
            trend,
            c.adaptation,
            c.validation,
            c.signal_cooldown,
            c.tp_range_multiplier
        )
    }

    fn reset(&mut self) {
        self.last_signal_bar.clear();
    }
}
