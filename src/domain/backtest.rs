//! Backtest engine: walks the master timeline and drives the portfolio.

use chrono::NaiveDateTime;
use log::{info, warn};
use std::collections::HashMap;

use super::error::TraderError;
use super::execution::ExecutionConfig;
use super::indicator::IndicatorType;
use super::indicator_helpers::DEFAULT_INDICATORS;
use super::market_data::SymbolData;
use super::metrics::DEFAULT_PERIODS_PER_YEAR;
use super::ohlcv::Candle;
use super::portfolio::PortfolioManager;
use super::position::Position;
use super::risk::RiskAssessor;
use super::strategy::SignalGenerator;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    pub risk_per_trade: f64,
    pub max_open_positions: usize,
    /// Timeline steps skipped before the first signal check.
    pub min_data_points: usize,
    pub periods_per_year: f64,
    pub risk_free_rate: f64,
    pub commission_pct: f64,
    pub slippage_pct: f64,
    pub close_at_end: bool,
    pub verbose: bool,
    pub atr_period: usize,
    pub atr_multiplier_sl: f64,
    pub reward_ratio: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_capital: 10_000.0,
            risk_per_trade: 0.01,
            max_open_positions: 3,
            min_data_points: 200,
            periods_per_year: DEFAULT_PERIODS_PER_YEAR,
            risk_free_rate: 0.0,
            commission_pct: 0.0,
            slippage_pct: 0.0,
            close_at_end: false,
            verbose: false,
            atr_period: 14,
            atr_multiplier_sl: 2.0,
            reward_ratio: 2.0,
        }
    }
}

impl BacktestConfig {
    pub fn atr_indicator(&self) -> IndicatorType {
        IndicatorType::Atr(self.atr_period)
    }

    /// The default set, the strategy's own indicators and the ATR used for
    /// stops, each once.
    pub fn indicators_for(&self, strategy: &dyn SignalGenerator) -> Vec<IndicatorType> {
        let mut indicators = DEFAULT_INDICATORS.to_vec();
        let extra = strategy.required_indicators().into_iter().chain([self.atr_indicator()]);
        for indicator in extra {
            if !indicators.contains(&indicator) {
                indicators.push(indicator);
            }
        }
        indicators
    }

    pub fn new_portfolio(&self) -> PortfolioManager {
        let mut portfolio = PortfolioManager::new(
            self.initial_capital,
            self.risk_per_trade,
            self.max_open_positions,
        );
        portfolio.atr = self.atr_indicator();
        portfolio.risk = RiskAssessor::new(self.atr_multiplier_sl, self.reward_ratio);
        portfolio.execution = ExecutionConfig {
            commission_pct: self.commission_pct,
            slippage_pct: self.slippage_pct,
        };
        portfolio.verbose = self.verbose;
        portfolio
    }
}

/// Reject series too short to trade, then compute `indicators` over them.
pub fn prepare_symbol(
    symbol: &str,
    candles: Vec<Candle>,
    indicators: &[IndicatorType],
    min_data_points: usize,
) -> Result<SymbolData, TraderError> {
    if candles.len() < min_data_points {
        return Err(TraderError::InsufficientData {
            symbol: symbol.to_string(),
            bars: candles.len(),
            minimum: min_data_points,
        });
    }
    Ok(SymbolData::with_indicators(symbol.to_string(), candles, indicators))
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub portfolio: PortfolioManager,
    /// Positions still open after the last step.
    pub open_positions: Vec<Position>,
    pub steps: usize,
}

pub fn run_backtest(
    symbols: &[SymbolData],
    timeline: &[NaiveDateTime],
    strategy: &mut dyn SignalGenerator,
    config: &BacktestConfig,
) -> BacktestResult {
    let mut portfolio = config.new_portfolio();
    let mut last_prices: HashMap<String, f64> = HashMap::new();
    let mut steps = 0usize;

    strategy.reset();

    if timeline.len() <= config.min_data_points {
        warn!(
            "timeline has {} steps, need more than {}; nothing to simulate",
            timeline.len(),
            config.min_data_points
        );
    }

    for (step, &time) in timeline.iter().enumerate() {
        let trading = step >= config.min_data_points;
        for data in symbols {
            let Some(index) = data.index_of(time) else {
                continue;
            };
            last_prices.insert(data.symbol.clone(), data.candles[index].close);
            if trading {
                portfolio.update_for_symbol(strategy, data, index);
            }
        }
        if trading {
            portfolio.mark_to_market(time, &last_prices);
            steps += 1;
        }
    }

    if config.close_at_end
        && let Some(&end) = timeline.last()
    {
        portfolio.close_all(end, &last_prices);
        let capital = portfolio.capital;
        if let Some(last) = portfolio.equity_curve.last_mut() {
            last.equity = capital;
        }
    }

    let mut open_positions: Vec<Position> = portfolio.open_positions.values().cloned().collect();
    open_positions.sort_by(|a, b| a.symbol.cmp(&b.symbol));

    info!(
        "backtest finished: {} steps, {} trades, {} open",
        steps,
        portfolio.trade_history.len(),
        open_positions.len()
    );

    BacktestResult {
        portfolio,
        open_positions,
        steps,
    }
}
