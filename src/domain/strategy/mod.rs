//! Signal generators and their construction from config.
//!
//! Every strategy implements [`SignalGenerator`]. The portfolio asks a
//! strategy for a signal only when it has no open position on the symbol,
//! and asks for a take-profit level right after a BUY or SELL.

pub mod basic;
pub mod breakout;
pub mod confluence;
pub mod elliott;
pub mod mean_reversion;

pub use basic::BasicStrategy;
pub use breakout::BreakoutStrategy;
pub use confluence::ConfluenceStrategy;
pub use elliott::{AdaptationMode, ElliottConfig, ElliottWaveStrategy, ValidationMode};
pub use mean_reversion::MeanReversionStrategy;

use crate::domain::error::TraderError;
use crate::domain::indicator::{IndicatorType, IndicatorValue};
use crate::domain::market_data::SymbolData;
use crate::domain::position::Direction;
use crate::domain::signal::{Signal, SignalContext};
use crate::ports::config_port::ConfigPort;

pub trait SignalGenerator: Send {
    fn name(&self) -> &str;

    /// Indicators that must be present in [`SymbolData::indicators`].
    fn required_indicators(&self) -> Vec<IndicatorType>;

    fn check_signal(&mut self, ctx: &SignalContext<'_>) -> Signal;

    /// Target for a position just opened at the context's close. `None`
    /// leaves the choice to the risk settings.
    fn take_profit(&self, _ctx: &SignalContext<'_>, _direction: Direction) -> Option<f64> {
        None
    }

    fn describe(&self) -> String;

    /// Forget per-symbol state between runs.
    fn reset(&mut self) {}
}

pub const STRATEGY_KINDS: [&str; 5] = [
    "elliott",
    "basic",
    "breakout",
    "mean_reversion",
    "confluence",
];

pub fn build_strategy(config: &dyn ConfigPort) -> Result<Box<dyn SignalGenerator>, TraderError> {
    let kind = config
        .get_string("strategy", "kind")
        .unwrap_or_else(|| "elliott".to_string());

    let rsi_period = positive_usize(config, "strategy", "rsi_period", 14)?;
    let rsi_oversold = config.get_double("strategy", "rsi_oversold", 30.0);
    let rsi_overbought = config.get_double("strategy", "rsi_overbought", 70.0);
    let bb_period = positive_usize(config, "strategy", "bb_period", 20)?;
    let bb_std = config.get_double("strategy", "bb_std", 2.0);
    let dc_period = positive_usize(config, "strategy", "dc_period", 20)?;

    let strategy: Box<dyn SignalGenerator> = match kind.trim().to_ascii_lowercase().as_str() {
        "elliott" | "elliott_wave" => {
            Box::new(ElliottWaveStrategy::new(ElliottConfig::from_config(config)?))
        }
        "basic" => Box::new(BasicStrategy::new(rsi_period, rsi_oversold, rsi_overbought)),
        "breakout" => Box::new(BreakoutStrategy::new(dc_period)),
        "mean_reversion" => Box::new(MeanReversionStrategy::new(
            bb_period,
            bb_std,
            rsi_period,
            rsi_oversold,
            rsi_overbought,
        )),
        "confluence" => Box::new(ConfluenceStrategy::new(
            dc_period,
            bb_period,
            bb_std,
            rsi_period,
            rsi_oversold,
            rsi_overbought,
        )),
        _ => return Err(TraderError::UnknownStrategy { name: kind }),
    };
    Ok(strategy)
}

pub(crate) fn positive_usize(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<usize, TraderError> {
    let value = config.get_int(section, key, default);
    if value <= 0 {
        return Err(TraderError::invalid(section, key, format!("{key} must be positive")));
    }
    Ok(value as usize)
}

pub(crate) fn bollinger_type(period: usize, stddev: f64) -> IndicatorType {
    IndicatorType::Bollinger {
        period,
        stddev_mult_x100: (stddev * 100.0).round().max(0.0) as u32,
    }
}

/// (upper, middle, lower) Bollinger bands at `index`.
pub(crate) fn bands_at(data: &SymbolData, ty: IndicatorType, index: usize) -> Option<(f64, f64, f64)> {
    match data.indicator_at(ty, index)? {
        IndicatorValue::Bollinger {
            upper,
            middle,
            lower,
        } => Some((*upper, *middle, *lower)),
        _ => None,
    }
}

/// (upper, lower) Donchian channel at `index`.
pub(crate) fn channel_at(data: &SymbolData, ty: IndicatorType, index: usize) -> Option<(f64, f64)> {
    match data.indicator_at(ty, index)? {
        IndicatorValue::Donchian { upper, lower, .. } => Some((*upper, *lower)),
        _ => None,
    }
}

pub(crate) fn histogram_at(data: &SymbolData, ty: IndicatorType, index: usize) -> Option<f64> {
    match data.indicator_at(ty, index)? {
        IndicatorValue::Macd { histogram, .. } => Some(*histogram),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    #[test]
    fn default_kind_is_elliott() {
        let config = FileConfigAdapter::from_string("[strategy]\n").unwrap();
        let strategy = build_strategy(&config).unwrap();
        assert!(strategy.name().starts_with("ElliottWave"));
    }

    #[test]
    fn builds_each_kind() {
        for kind in STRATEGY_KINDS {
            let config =
                FileConfigAdapter::from_string(&format!("[strategy]\nkind = {kind}\n")).unwrap();
            let strategy = build_strategy(&config).unwrap();
            if kind != "elliott" {
                assert!(!strategy.required_indicators().is_empty(), "{kind}");
            }
            assert!(!strategy.describe().is_empty());
        }
    }

    #[test]
    fn unknown_kind_is_an_error() {
        let config = FileConfigAdapter::from_string("[strategy]\nkind = martingale\n").unwrap();
        match build_strategy(&config) {
            Err(TraderError::UnknownStrategy { name }) => assert_eq!(name, "martingale"),
            other => panic!("expected UnknownStrategy, got {:?}", other.map(|s| s.describe())),
        }
    }

    #[test]
    fn rejects_zero_period() {
        let config =
            FileConfigAdapter::from_string("[strategy]\nkind = breakout\ndc_period = 0\n").unwrap();
        assert!(matches!(
            build_strategy(&config),
            Err(TraderError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn bollinger_type_rounds_multiplier() {
        assert_eq!(bollinger_type(20, 2.0), IndicatorType::BOLLINGER);
        assert_eq!(
            bollinger_type(10, 1.5),
            IndicatorType::Bollinger {
                period: 10,
                stddev_mult_x100: 150
            }
        );
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
    use crate::domain::market_data::SymbolData;

    /// Install a hand-made series; `None` entries are warmup points.
    pub fn set_series(data: &mut SymbolData, ty: IndicatorType, values: Vec<Option<IndicatorValue>>) {
        let values = data
            .candles
            .iter()
            .zip(values)
            .map(|(c, v)| IndicatorPoint {
                time: c.close_time,
                valid: v.is_some(),
                value: v.unwrap_or(IndicatorValue::Simple(0.0)),
            })
            .collect();
        data.indicators.insert(
            ty,
            IndicatorSeries {
                indicator_type: ty,
                values,
            },
        );
    }
}
