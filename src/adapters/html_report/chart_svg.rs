//! Inline SVG charts for the equity curve and drawdown.

use crate::domain::metrics::drawdown_series;
use crate::domain::portfolio::EquityPoint;
use chrono::NaiveDateTime;

const CHART_WIDTH: f64 = 900.0;
const CHART_HEIGHT: f64 = 300.0;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 20.0;
const MARGIN_BOTTOM: f64 = 40.0;

struct Series<'a> {
    times: Vec<NaiveDateTime>,
    values: Vec<f64>,
    stroke: &'a str,
    fill: Option<&'a str>,
    top_label: String,
    bottom_label: String,
}

fn percent(v: f64) -> String {
    format!("-{:.1}%", v * 100.0)
}

pub fn generate_equity_svg(equity_curve: &[EquityPoint]) -> String {
    if equity_curve.is_empty() {
        return String::new();
    }
    let values: Vec<f64> = equity_curve.iter().map(|p| p.equity).collect();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    render(&Series {
        times: equity_curve.iter().map(|p| p.time).collect(),
        values,
        stroke: "#2563eb",
        fill: None,
        top_label: format!("{max:.0}"),
        bottom_label: format!("{min:.0}"),
    })
}

/// Drawdown drawn downward from a zero line at the top.
pub fn generate_drawdown_svg(equity_curve: &[EquityPoint]) -> String {
    if equity_curve.len() < 2 {
        return String::new();
    }
    let drawdowns = drawdown_series(equity_curve);
    let max_dd = drawdowns.iter().copied().fold(0.0_f64, f64::max);
    render(&Series {
        times: equity_curve.iter().map(|p| p.time).collect(),
        // Flip so the zero line sits on top.
        values: drawdowns.iter().map(|d| max_dd - d).collect(),
        stroke: "#dc2626",
        fill: Some("#fecaca"),
        top_label: percent(0.0),
        bottom_label: percent(max_dd),
    })
}

fn render(series: &Series<'_>) -> String {
    let values = &series.values;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = if max - min > 0.0 { max - min } else { 1.0 };

    let plot_width = CHART_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_height = CHART_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let last = (values.len() - 1).max(1) as f64;

    let x = |i: usize| MARGIN_LEFT + i as f64 / last * plot_width;
    let y = |v: f64| MARGIN_TOP + plot_height - (v - min) / range * plot_height;

    let mut path = String::new();
    for (i, &v) in values.iter().enumerate() {
        let cmd = if i == 0 { 'M' } else { 'L' };
        path.push_str(&format!("{cmd} {:.1} {:.1} ", x(i), y(v)));
    }
    let path = path.trim_end();

    let mut svg = format!(
        r#"<svg width="100%" viewBox="0 0 {CHART_WIDTH} {CHART_HEIGHT}" xmlns="http://www.w3.org/2000/svg">"#
    );
    svg.push_str("\n  <rect width=\"100%\" height=\"100%\" fill=\"white\"/>\n");
    svg.push_str(&format!(
        "  <line x1=\"{MARGIN_LEFT}\" y1=\"{MARGIN_TOP}\" x2=\"{MARGIN_LEFT}\" y2=\"{}\" stroke=\"#ccc\"/>\n",
        CHART_HEIGHT - MARGIN_BOTTOM
    ));
    svg.push_str(&format!(
        "  <line x1=\"{MARGIN_LEFT}\" y1=\"{0}\" x2=\"{1}\" y2=\"{0}\" stroke=\"#ccc\"/>\n",
        CHART_HEIGHT - MARGIN_BOTTOM,
        CHART_WIDTH - MARGIN_RIGHT
    ));

    for (label, ly) in [
        (&series.top_label, MARGIN_TOP + 5.0),
        (&series.bottom_label, CHART_HEIGHT - MARGIN_BOTTOM),
    ] {
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{ly}\" text-anchor=\"end\" font-size=\"11\" fill=\"#666\">{label}</text>\n",
            MARGIN_LEFT - 6.0
        ));
    }

    let n = series.times.len();
    for (i, anchor) in [(0, "start"), (n / 2, "middle"), (n - 1, "end")] {
        svg.push_str(&format!(
            "  <text x=\"{:.1}\" y=\"{}\" text-anchor=\"{anchor}\" font-size=\"11\" fill=\"#666\">{}</text>\n",
            x(i),
            CHART_HEIGHT - 12.0,
            series.times[i].format("%Y-%m-%d %H:%M")
        ));
    }

    if let Some(fill) = series.fill {
        svg.push_str(&format!(
            "  <path d=\"{path} L {:.1} {MARGIN_TOP} L {MARGIN_LEFT} {MARGIN_TOP} Z\" fill=\"{fill}\" stroke=\"none\"/>\n",
            x(n - 1)
        ));
    }
    svg.push_str(&format!(
        "  <path d=\"{path}\" fill=\"none\" stroke=\"{}\" stroke-width=\"1.5\"/>\n",
        series.stroke
    ));
    svg.push_str("</svg>");
    svg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::hour;

    fn curve(values: &[f64]) -> Vec<EquityPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &equity)| EquityPoint { time: hour(i), equity })
            .collect()
    }

    #[test]
    fn equity_empty_curve() {
        assert!(generate_equity_svg(&[]).is_empty());
    }

    #[test]
    fn equity_single_point() {
        let svg = generate_equity_svg(&curve(&[10_000.0]));
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("M 70.0"));
    }

    #[test]
    fn equity_path_has_one_segment_per_point() {
        let svg = generate_equity_svg(&curve(&[100.0, 110.0, 105.0, 120.0]));
        assert_eq!(svg.matches(" L ").count(), 3);
        assert!(svg.contains(">120<"));
        assert!(svg.contains(">100<"));
        assert!(svg.contains("2024-01-01 00:00"));
    }

    #[test]
    fn drawdown_needs_two_points() {
        assert!(generate_drawdown_svg(&curve(&[100.0])).is_empty());
    }

    #[test]
    fn drawdown_labels_max() {
        let svg = generate_drawdown_svg(&curve(&[100.0, 120.0, 90.0, 130.0]));
        assert!(svg.contains("-25.0%"));
        assert!(svg.contains("-0.0%"));
        assert!(svg.contains("fill=\"#fecaca\""));
    }
}
