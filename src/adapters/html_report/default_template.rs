//! Built-in HTML report template.
//!
//! Placeholders: `{{TITLE}}`, `{{SUMMARY}}`, `{{METRICS_TABLE}}`,
//! `{{EQUITY_CURVE_SVG}}`, `{{DRAWDOWN_CHART_SVG}}`, `{{SYMBOL_TABLE}}`,
//! `{{DIRECTION_TABLE}}`, `{{MONTHLY_RETURNS}}`, `{{TRADE_LOG}}`,
//! `{{GENERATED_AT}}`.

const TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{{TITLE}}</title>
<style>
  body { font-family: -apple-system, "Segoe UI", Helvetica, Arial, sans-serif; margin: 2rem auto; max-width: 1100px; color: #1f2937; }
  h1 { margin-bottom: 0.2rem; }
  h2 { margin-top: 2rem; border-bottom: 1px solid #e5e7eb; padding-bottom: 0.3rem; }
  table { border-collapse: collapse; width: 100%; font-size: 0.9rem; }
  th, td { padding: 0.35rem 0.6rem; border-bottom: 1px solid #f0f0f0; text-align: right; }
  th:first-child, td:first-child { text-align: left; }
  th { background: #f9fafb; }
  .pos { color: #15803d; }
  .neg { color: #b91c1c; }
  .muted { color: #6b7280; }
  .summary td { text-align: left; }
  .heat td { text-align: center; }
</style>
</head>
<body>
<h1>{{TITLE}}</h1>
<p class="muted">Generated {{GENERATED_AT}}</p>

<h2>Summary</h2>
{{SUMMARY}}

<h2>Performance</h2>
{{METRICS_TABLE}}

<h2>Equity Curve</h2>
{{EQUITY_CURVE_SVG}}

<h2>Drawdown</h2>
{{DRAWDOWN_CHART_SVG}}

{{SYMBOL_TABLE}}

<h2>By Direction</h2>
{{DIRECTION_TABLE}}

<h2>Monthly Returns</h2>
{{MONTHLY_RETURNS}}

<h2>Trade Log</h2>
{{TRADE_LOG}}
</body>
</html>
"#;

pub fn template() -> &'static str {
    TEMPLATE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_has_every_placeholder() {
        for placeholder in [
            "{{TITLE}}",
            "{{SUMMARY}}",
            "{{METRICS_TABLE}}",
            "{{EQUITY_CURVE_SVG}}",
            "{{DRAWDOWN_CHART_SVG}}",
            "{{SYMBOL_TABLE}}",
            "{{DIRECTION_TABLE}}",
            "{{MONTHLY_RETURNS}}",
            "{{TRADE_LOG}}",
            "{{GENERATED_AT}}",
        ] {
            assert!(template().contains(placeholder), "{placeholder}");
        }
    }
}
