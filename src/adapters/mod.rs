//! Concrete adapter implementations for ports.

#[cfg(feature = "binance")]
pub mod binance_adapter;
pub mod csv_adapter;
pub mod file_config_adapter;
pub mod html_report;
pub mod kline_stream;
