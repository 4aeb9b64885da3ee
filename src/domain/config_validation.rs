//! Configuration validation.
//!
//! Every numeric range and enumeration is checked before a run so a bad
//! value fails fast with the section and key that caused it.

use crate::domain::error::TraderError;
use crate::domain::ohlcv::Interval;
use crate::domain::strategy::{ElliottConfig, STRATEGY_KINDS};
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_all(config: &dyn ConfigPort) -> Result<(), TraderError> {
    validate_data_config(config)?;
    validate_backtest_config(config)?;
    validate_risk_config(config)?;
    validate_strategy_config(config)?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), TraderError> {
    if let Some(interval) = config.get_string("data", "interval") {
        interval.parse::<Interval>()?;
    }
    match config.get_string("data", "source").as_deref().map(str::trim) {
        None | Some("csv") | Some("binance") => {}
        Some(other) => {
            return Err(TraderError::invalid(
                "data",
                "source",
                format!("unknown source '{other}', expected csv or binance"),
            ));
        }
    }
    validate_dates(config)
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), TraderError> {
    positive(config, "backtest", "initial_capital", 10_000.0)?;
    fraction(config, "backtest", "risk_per_trade", 0.01)?;
    positive_int(config, "backtest", "max_open_positions", 3)?;
    non_negative_int(config, "backtest", "min_data_points", 200)?;
    positive(config, "backtest", "periods_per_year", 6048.0)?;
    non_negative(config, "backtest", "commission_pct", 0.0)?;
    non_negative(config, "backtest", "slippage_pct", 0.0)?;

    let rf = config.get_double("backtest", "risk_free_rate", 0.0);
    if !(0.0..1.0).contains(&rf) {
        return Err(TraderError::invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    Ok(())
}

pub fn validate_risk_config(config: &dyn ConfigPort) -> Result<(), TraderError> {
    positive_int(config, "risk", "atr_period", 14)?;
    positive(config, "risk", "atr_multiplier_sl", 2.0)?;
    positive(config, "risk", "reward_ratio", 2.0)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), TraderError> {
    let kind = config
        .get_string("strategy", "kind")
        .unwrap_or_else(|| "elliott".to_string());
    let normalized = kind.trim().to_ascii_lowercase();
    if !STRATEGY_KINDS.contains(&normalized.as_str()) && normalized != "elliott_wave" {
        return Err(TraderError::UnknownStrategy { name: kind });
    }

    positive_int(config, "strategy", "rsi_period", 14)?;
    positive_int(config, "strategy", "bb_period", 20)?;
    positive_int(config, "strategy", "dc_period", 20)?;
    positive(config, "strategy", "bb_std", 2.0)?;

    let oversold = config.get_double("strategy", "rsi_oversold", 30.0);
    let overbought = config.get_double("strategy", "rsi_overbought", 70.0);
    if !(0.0..=100.0).contains(&oversold) || !(0.0..=100.0).contains(&overbought) {
        return Err(TraderError::invalid(
            "strategy",
            "rsi_oversold",
            "RSI thresholds must be within 0..100",
        ));
    }
    if oversold >= overbought {
        return Err(TraderError::invalid(
            "strategy",
            "rsi_oversold",
            "rsi_oversold must be below rsi_overbought",
        ));
    }

    if normalized.starts_with("elliott") {
        validate_elliott_config(config)?;
    }
    Ok(())
}

/// Resolves the preset with its overrides and range-checks the result.
pub fn validate_elliott_config(config: &dyn ConfigPort) -> Result<(), TraderError> {
    let cfg = ElliottConfig::from_config(config)?;

    if !(0.0..=1.0).contains(&cfg.min_wave_confidence) {
        return Err(TraderError::invalid(
            "elliott",
            "min_wave_confidence",
            "min_wave_confidence must be within 0..1",
        ));
    }
    if cfg.wave_analysis_lookback < 10 {
        return Err(TraderError::invalid(
            "elliott",
            "wave_analysis_lookback",
            "wave_analysis_lookback must be at least 10",
        ));
    }
    if cfg.min_volatility < 0.0 {
        return Err(TraderError::invalid(
            "elliott",
            "min_volatility",
            "min_volatility must be non-negative",
        ));
    }
    if cfg.tp_range_multiplier <= 0.0 {
        return Err(TraderError::invalid(
            "elliott",
            "tp_range_multiplier",
            "tp_range_multiplier must be positive",
        ));
    }
    if cfg.analyzer.min_wave_length < 5 {
        return Err(TraderError::invalid(
            "elliott",
            "min_wave_length",
            "min_wave_length must be at least 5",
        ));
    }
    if cfg.analyzer.swing_threshold_pct <= 0.0 {
        return Err(TraderError::invalid(
            "elliott",
            "swing_threshold_pct",
            "swing_threshold_pct must be positive",
        ));
    }
    if cfg.trend.lookback < 2 || cfg.trend.rally_window < 2 {
        return Err(TraderError::invalid(
            "elliott",
            "trend_lookback",
            "trend windows must span at least 2 bars",
        ));
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), TraderError> {
    let start = parse_date(config, "start_date")?;
    let end = parse_date(config, "end_date")?;
    if let (Some(start), Some(end)) = (start, end)
        && start >= end
    {
        return Err(TraderError::invalid(
            "data",
            "start_date",
            "start_date must be before end_date",
        ));
    }
    Ok(())
}

/// Optional `[data]` date in YYYY-MM-DD form.
pub fn parse_date(config: &dyn ConfigPort, key: &str) -> Result<Option<NaiveDate>, TraderError> {
    match config.get_string("data", key) {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                TraderError::invalid("data", key, format!("invalid {key} format, expected YYYY-MM-DD"))
            }),
    }
}

fn positive(config: &dyn ConfigPort, section: &str, key: &str, default: f64) -> Result<(), TraderError> {
    let value = config.get_double(section, key, default);
    if !(value.is_finite() && value > 0.0) {
        return Err(TraderError::invalid(section, key, format!("{key} must be positive")));
    }
    Ok(())
}

fn non_negative(config: &dyn ConfigPort, section: &str, key: &str, default: f64) -> Result<(), TraderError> {
    let value = config.get_double(section, key, default);
    if !(value.is_finite() && value >= 0.0) {
        return Err(TraderError::invalid(section, key, format!("{key} must be non-negative")));
    }
    Ok(())
}

fn fraction(config: &dyn ConfigPort, section: &str, key: &str, default: f64) -> Result<(), TraderError> {
    let value = config.get_double(section, key, default);
    if !(value > 0.0 && value <= 1.0) {
        return Err(TraderError::invalid(section, key, format!("{key} must be within (0, 1]")));
    }
    Ok(())
}

fn positive_int(config: &dyn ConfigPort, section: &str, key: &str, default: i64) -> Result<(), TraderError> {
    if config.get_int(section, key, default) <= 0 {
        return Err(TraderError::invalid(section, key, format!("{key} must be positive")));
    }
    Ok(())
}

fn non_negative_int(config: &dyn ConfigPort, section: &str, key: &str, default: i64) -> Result<(), TraderError> {
    if config.get_int(section, key, default) < 0 {
        return Err(TraderError::invalid(section, key, format!("{key} must be non-negative")));
    }
    Ok(())
}
