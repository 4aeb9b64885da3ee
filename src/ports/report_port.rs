//! Report generation port.

use std::path::Path;

use crate::domain::error::TraderError;
use crate::domain::metrics::{DirectionResult, Metrics, SymbolResult};
use crate::domain::portfolio::PortfolioManager;

/// Everything a report renders.
pub struct ReportData<'a> {
    pub title: &'a str,
    pub strategy_description: &'a str,
    pub symbols: &'a [String],
    pub interval: &'a str,
    pub portfolio: &'a PortfolioManager,
    pub metrics: &'a Metrics,
    pub symbol_results: &'a [SymbolResult],
    pub direction_results: &'a [DirectionResult],
}

pub trait ReportPort {
    fn write(&self, report: &ReportData<'_>, output_path: &Path) -> Result<(), TraderError>;
}
