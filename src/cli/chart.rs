//! Standalone HTML chart with an inline SVG line plot.

use crate::cli::ui::format_whole;
use crate::core::chart::{ChartMode, ChartSink};
use crate::core::month::Month;
use crate::core::simulation::SimulationReport;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

const WIDTH: i32 = 960;
const HEIGHT: i32 = 480;
const PADDING: f64 = 56.0;
const BASELINE_COLOR: &str = "#000000";
const TOTAL_COLOR: &str = "#222222";
const GUIDE_COLOR: &str = "#8c8c8c";
const PALETTE: [&str; 8] = [
    "#348dc1", "#ff9933", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#17becf",
];

struct LineSeries {
    label: String,
    color: &'static str,
    stroke_width: f64,
    dash: bool,
    values: Vec<f64>,
}

struct HorizontalGuide {
    value: f64,
    label: String,
}

/// Writes the simulation as a single HTML file.
pub struct HtmlChart {
    path: PathBuf,
    mode: ChartMode,
}

impl HtmlChart {
    pub fn new(path: impl Into<PathBuf>, mode: ChartMode) -> Self {
        HtmlChart {
            path: path.into(),
            mode,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ChartSink for HtmlChart {
    fn render(&self, report: &SimulationReport) -> Result<()> {
        let html = render_html(report, self.mode);
        std::fs::write(&self.path, html)
            .with_context(|| format!("Failed to write chart to {}", self.path.display()))?;
        info!(path = %self.path.display(), mode = %self.mode, "Chart written");
        Ok(())
    }
}

fn chart_series(report: &SimulationReport, mode: ChartMode) -> (Vec<LineSeries>, Vec<HorizontalGuide>) {
    let valuation = &report.valuation;
    let rows = valuation.months.len();
    let mut series: Vec<LineSeries> = valuation
        .holdings
        .iter()
        .zip(PALETTE.iter().cycle())
        .map(|(holding, &color)| LineSeries {
            label: holding.currency.clone(),
            color,
            stroke_width: 1.5,
            dash: false,
            values: match mode {
                ChartMode::Percentage => holding.percentage(),
                ChartMode::Value => holding.values.clone(),
            },
        })
        .collect();

    let mut guides = Vec::new();
    match mode {
        ChartMode::Percentage => {
            series.push(LineSeries {
                label: format!("{} (baseline)", report.home_currency),
                color: BASELINE_COLOR,
                stroke_width: 1.5,
                dash: true,
                values: vec![100.0; rows],
            });
        }
        ChartMode::Value => {
            series.push(LineSeries {
                label: "Total".to_string(),
                color: TOTAL_COLOR,
                stroke_width: 2.2,
                dash: false,
                values: valuation.total.clone(),
            });
            series.push(LineSeries {
                label: format!("{} (baseline)", report.home_currency),
                color: BASELINE_COLOR,
                stroke_width: 1.5,
                dash: true,
                values: vec![valuation.initial_total().unwrap_or_default(); rows],
            });
            guides.extend(report.milestones.iter().filter(|m| m.reached.is_some()).map(
                |m| HorizontalGuide {
                    value: m.threshold,
                    label: format_whole(m.threshold),
                },
            ));
        }
    }

    (series, guides)
}

/// Escapes text for HTML and SVG element content and attribute values.
fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Renders the full HTML document for `report`.
pub fn render_html(report: &SimulationReport, mode: ChartMode) -> String {
    let (title, y_label) = match mode {
        ChartMode::Percentage => (
            format!("Percentage appreciation of currencies vs {}", report.home_currency),
            "Appreciation (%)".to_string(),
        ),
        ChartMode::Value => (
            format!(
                "Value of {} {} split across currencies",
                report.deposit, report.home_currency
            ),
            format!("Value ({})", report.home_currency),
        ),
    };

    let (series, guides) = chart_series(report, mode);
    let svg = render_line_chart(&report.valuation.months, &series, &guides, &y_label);

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
body{{font-family:Arial,sans-serif;margin:24px;color:#333}}
h1{{font-size:18px;font-weight:normal}}
.fx-plot svg{{width:100%;max-width:{w}px;height:auto}}
</style>
</head>
<body>
<h1>{title}</h1>
<div class="fx-plot">{svg}</div>
</body>
</html>
"#,
        title = escape_text(&title),
        w = WIDTH,
        svg = svg
    )
}

fn extent(series: &[LineSeries], guides: &[HorizontalGuide]) -> Option<(f64, f64)> {
    let values = series
        .iter()
        .flat_map(|s| s.values.iter().copied())
        .chain(guides.iter().map(|g| g.value))
        .filter(|v| v.is_finite());

    let (min_v, max_v) = values.fold(None, |acc: Option<(f64, f64)>, v| match acc {
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        None => Some((v, v)),
    })?;

    if (max_v - min_v).abs() < f64::EPSILON {
        let pad = if min_v == 0.0 { 1.0 } else { min_v.abs() * 0.05 };
        return Some((min_v - pad, max_v + pad));
    }
    let pad = (max_v - min_v) * 0.05;
    Some((min_v - pad, max_v + pad))
}

fn scale_value(value: f64, min_v: f64, max_v: f64, height: f64) -> f64 {
    let inner_height = height - 2.0 * PADDING;
    let norm = (value - min_v) / (max_v - min_v);
    PADDING + (1.0 - norm) * inner_height
}

fn x_positions(len: usize, width: f64) -> Vec<f64> {
    match len {
        0 => Vec::new(),
        1 => vec![width / 2.0],
        _ => {
            let inner_width = width - 2.0 * PADDING;
            (0..len)
                .map(|i| PADDING + inner_width * (i as f64 / (len - 1) as f64))
                .collect()
        }
    }
}

fn render_line_chart(
    months: &[Month],
    series: &[LineSeries],
    guides: &[HorizontalGuide],
    y_label: &str,
) -> String {
    let width = WIDTH as f64;
    let height = HEIGHT as f64;
    let xs = x_positions(months.len(), width);

    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {WIDTH} {HEIGHT}"><style>text{{font-family:Arial,sans-serif;font-size:11px;fill:#666}}</style>"#
    );

    let Some((min_v, max_v)) = extent(series, guides) else {
        svg.push_str("</svg>");
        return svg;
    };

    add_value_axis(&mut svg, min_v, max_v, width, height, y_label);

    for guide in guides {
        let y = scale_value(guide.value, min_v, max_v, height);
        svg.push_str(&format!(
            r#"<line x1="{x1:.2}" y1="{y:.2}" x2="{x2:.2}" y2="{y:.2}" stroke="{GUIDE_COLOR}" stroke-width="0.8" stroke-dasharray="2 3" />"#,
            x1 = PADDING,
            x2 = width - PADDING,
        ));
        svg.push_str(&format!(
            r#"<text x="{x:.2}" y="{y:.2}" text-anchor="end" font-size="9">{label}</text>"#,
            x = width - PADDING,
            y = y - 4.0,
            label = escape_text(&guide.label)
        ));
    }

    for line in series {
        let points = line
            .values
            .iter()
            .zip(&xs)
            .filter(|(v, _)| v.is_finite())
            .map(|(v, x)| format!("{x:.2},{:.2}", scale_value(*v, min_v, max_v, height)))
            .collect::<Vec<_>>()
            .join(" ");
        if points.is_empty() {
            continue;
        }
        svg.push_str(&format!(
            r#"<polyline fill="none" stroke="{color}" stroke-width="{width}" stroke-dasharray="{dash}" points="{points}" />"#,
            color = line.color,
            width = line.stroke_width,
            dash = if line.dash { "5 4" } else { "0" },
        ));
    }

    add_time_axis(&mut svg, months, &xs, width, height);
    add_legend(&mut svg, series, width);

    svg.push_str("</svg>");
    svg
}

fn add_value_axis(svg: &mut String, min_v: f64, max_v: f64, width: f64, height: f64, label: &str) {
    const TICKS: usize = 5;
    for i in 0..=TICKS {
        let value = min_v + (max_v - min_v) * i as f64 / TICKS as f64;
        let y = scale_value(value, min_v, max_v, height);
        svg.push_str(&format!(
            r##"<line x1="{x1:.2}" y1="{y:.2}" x2="{x2:.2}" y2="{y:.2}" stroke="#eeeeee" stroke-width="0.5" />"##,
            x1 = PADDING,
            x2 = width - PADDING,
        ));
        svg.push_str(&format!(
            r#"<text x="{x:.2}" y="{ty:.2}" text-anchor="end">{value:.1}</text>"#,
            x = PADDING - 6.0,
            ty = y + 4.0,
        ));
    }
    svg.push_str(&format!(
        r#"<text x="14" y="{y:.2}" text-anchor="middle" transform="rotate(-90 14 {y:.2})">{label}</text>"#,
        y = height / 2.0,
        label = escape_text(label)
    ));
}

fn add_time_axis(svg: &mut String, months: &[Month], xs: &[f64], width: f64, height: f64) {
    let axis_y = height - PADDING + 5.0;
    svg.push_str(&format!(
        r##"<line x1="{x1:.2}" y1="{axis_y:.2}" x2="{x2:.2}" y2="{axis_y:.2}" stroke="#000" stroke-width="1" />"##,
        x1 = PADDING,
        x2 = width - PADDING,
    ));

    // Label the first month and every January.
    for (idx, (month, x)) in months.iter().zip(xs).enumerate() {
        if idx != 0 && month.month() != 1 {
            continue;
        }
        svg.push_str(&format!(
            r##"<line x1="{x:.2}" y1="{y1:.2}" x2="{x:.2}" y2="{y2:.2}" stroke="#dddddd" stroke-width="0.5" />"##,
            y1 = PADDING,
            y2 = axis_y,
        ));
        let label = if idx == 0 {
            month.to_string()
        } else {
            month.year().to_string()
        };
        svg.push_str(&format!(
            r#"<text x="{x:.2}" y="{y:.2}" text-anchor="middle">{label}</text>"#,
            y = axis_y + 16.0,
        ));
    }
    svg.push_str(&format!(
        r#"<text x="{x:.2}" y="{y:.2}" text-anchor="middle">Year</text>"#,
        x = width / 2.0,
        y = height - 8.0
    ));
}

fn add_legend(svg: &mut String, series: &[LineSeries], width: f64) {
    let x = width - PADDING - 130.0;
    let mut y = PADDING + 14.0;
    for entry in series {
        svg.push_str(&format!(
            r#"<line x1="{x:.2}" y1="{ly:.2}" x2="{x2:.2}" y2="{ly:.2}" stroke="{color}" stroke-width="2" stroke-dasharray="{dash}" />"#,
            x2 = x + 20.0,
            ly = y - 4.0,
            color = entry.color,
            dash = if entry.dash { "5 4" } else { "0" },
        ));
        svg.push_str(&format!(
            r##"<text x="{tx:.2}" y="{y:.2}" text-anchor="start" fill="#333">{label}</text>"##,
            tx = x + 26.0,
            label = escape_text(&entry.label)
        ));
        y += 16.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::goals::find_milestones;
    use crate::core::table::PriceTable;
    use crate::core::valuation::{Deposit, simulate};
    use std::collections::BTreeMap;

    fn report() -> SimulationReport {
        let months: Vec<Month> = ["2019-11", "2019-12", "2020-01", "2020-02"]
            .iter()
            .map(|m| m.parse().unwrap())
            .collect();
        let table = PriceTable::from_columns(
            months.clone(),
            vec![
                ("EUR".to_string(), vec![4.0, 4.2, 4.5, 5.0]),
                ("USD".to_string(), vec![4.0, 4.1, 3.9, 4.4]),
            ],
        )
        .unwrap();
        let deposit = Deposit::new(20_000, 2);
        let valuation = simulate(&table, &deposit).unwrap();
        let milestones = find_milestones(&valuation.months, &valuation.total, &[210.0, 1000.0]);

        SimulationReport {
            home_currency: "BRL".to_string(),
            deposit,
            requested_start: months[0],
            start: months[0],
            series_lengths: BTreeMap::from([("EUR".to_string(), 4), ("USD".to_string(), 4)]),
            dropped: Vec::new(),
            valuation,
            milestones,
        }
    }

    #[test]
    fn test_percentage_chart_has_baseline_and_currencies() {
        let html = render_html(&report(), ChartMode::Percentage);

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("Percentage appreciation of currencies vs BRL"));
        assert!(html.contains("BRL (baseline)"));
        assert!(html.contains(">EUR<"));
        assert!(html.contains(">USD<"));
        assert_eq!(html.matches("<polyline").count(), 3);
        assert!(html.contains(">2019-11<"));
        assert!(html.contains(">2020<"));
    }

    #[test]
    fn test_value_chart_has_total_and_reached_guides() {
        let html = render_html(&report(), ChartMode::Value);

        assert!(html.contains("Value of 200.00 BRL split across currencies"));
        assert!(html.contains(">Total<"));
        assert_eq!(html.matches("<polyline").count(), 4);
        // Only the reached milestone gets a guide.
        assert!(html.contains(">210<"));
        assert!(!html.contains(">1,000<"));
    }

    #[test]
    fn test_markup_in_currency_names_is_escaped() {
        let mut report = report();
        report.home_currency = "R&D<X>".to_string();
        report.valuation.holdings[0].currency = "E\"U<R".to_string();

        let html = render_html(&report, ChartMode::Value);

        assert!(html.contains("Value of 200.00 R&amp;D&lt;X&gt; split across currencies"));
        assert!(html.contains("Value (R&amp;D&lt;X&gt;)"));
        assert!(html.contains(">E&quot;U&lt;R<"));
        assert!(!html.contains("R&D"));
        assert!(!html.contains("<X>"));
        assert_eq!(escape_text("a & b"), "a &amp; b");
    }

    #[test]
    fn test_render_writes_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("chart.html");
        let chart = HtmlChart::new(&path, ChartMode::Percentage);

        chart.render(&report()).unwrap();

        let content = std::fs::read_to_string(chart.path()).unwrap();
        assert!(content.contains("<svg"));
    }

    #[test]
    fn test_extent_pads_flat_series() {
        let flat = [LineSeries {
            label: "X".to_string(),
            color: BASELINE_COLOR,
            stroke_width: 1.0,
            dash: false,
            values: vec![100.0, 100.0],
        }];
        let (lo, hi) = extent(&flat, &[]).unwrap();
        assert!(lo < 100.0 && hi > 100.0);
        assert!(extent(&[], &[]).is_none());
    }
}
