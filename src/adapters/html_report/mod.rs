//! Self-contained HTML backtest report.
//!
//! A template (the built-in default or a user file) carries `{{PLACEHOLDER}}`
//! markers; [`resolve`] fills them from `chart_svg` and `tables`. Unknown
//! placeholders are left alone, so a custom template may use any subset.

pub mod chart_svg;
pub mod default_template;
pub mod tables;

use std::fs;
use std::path::Path;

use crate::domain::error::TraderError;
use crate::ports::report_port::{ReportData, ReportPort};

pub fn resolve(template: &str, report: &ReportData<'_>) -> String {
    let portfolio = report.portfolio;
    let mut output = template.replace("{{TITLE}}", &tables::escape(report.title));
    output = output.replace("{{SUMMARY}}", &tables::render_summary(report));
    output = output.replace("{{METRICS_TABLE}}", &tables::render_metrics_table(report.metrics));

    let equity_svg = chart_svg::generate_equity_svg(&portfolio.equity_curve);
    output = output.replace(
        "{{EQUITY_CURVE_SVG}}",
        if equity_svg.is_empty() {
            "<p class=\"muted\">No equity data.</p>"
        } else {
            &equity_svg
        },
    );

    let dd_svg = chart_svg::generate_drawdown_svg(&portfolio.equity_curve);
    output = output.replace(
        "{{DRAWDOWN_CHART_SVG}}",
        if dd_svg.is_empty() {
            "<p class=\"muted\">No drawdown data.</p>"
        } else {
            &dd_svg
        },
    );

    output = output.replace(
        "{{SYMBOL_TABLE}}",
        &tables::render_symbol_table(report.symbol_results),
    );
    output = output.replace(
        "{{DIRECTION_TABLE}}",
        &tables::render_direction_table(report.direction_results),
    );

    let monthly = tables::compute_monthly_returns(&portfolio.equity_curve);
    output = output.replace("{{MONTHLY_RETURNS}}", &tables::render_monthly_returns(&monthly));
    output = output.replace(
        "{{TRADE_LOG}}",
        &tables::render_trade_log(&portfolio.trade_history),
    );

    let generated = chrono::Utc::now().format("%Y-%m-%d %H:%M UTC").to_string();
    output.replace("{{GENERATED_AT}}", &generated)
}

pub struct HtmlReportAdapter {
    template: Option<String>,
}

impl HtmlReportAdapter {
    pub fn new() -> Self {
        Self { template: None }
    }

    pub fn with_template_file<P: AsRef<Path>>(path: P) -> Result<Self, TraderError> {
        let template = fs::read_to_string(path)?;
        Ok(Self {
            template: Some(template),
        })
    }
}

impl Default for HtmlReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for HtmlReportAdapter {
    fn write(&self, report: &ReportData<'_>, output_path: &Path) -> Result<(), TraderError> {
        let template = match &self.template {
            Some(custom) => custom.as_str(),
            None => default_template::template(),
        };
        let html = resolve(template, report);

        if let Some(parent) = output_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(output_path, html)?;
        log::info!("report written to {}", output_path.display());
        Ok(())
    }
}
