//! Core domain types and logic.

pub mod ohlcv;
pub mod indicator;
pub mod indicator_helpers;
pub mod market_data;
pub mod wave;
pub mod trend;
pub mod signal;
pub mod position;
pub mod execution;
pub mod risk;
pub mod portfolio;
pub mod strategy;
pub mod backtest;
pub mod metrics;
pub mod config_validation;
pub mod error;
