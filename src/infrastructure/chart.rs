//! SVG rendering of the acreage/tree diagnostic chart.

use crate::domain::PlotData;
use crate::infrastructure::traits::ChartRenderer;

const WIDTH: f64 = 1200.0;
const HEIGHT: f64 = 600.0;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 80.0;
const MARGIN_BOTTOM: f64 = 60.0;
const Y_TICKS: usize = 5;

/// Two side-by-side bar charts: acreage (blue) and trees (green), one bar per plot.
#[derive(Debug, Default)]
pub struct SvgChartRenderer;

struct Panel<'a> {
    title: &'a str,
    y_label: &'a str,
    color: &'a str,
    values: Vec<f64>,
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Append one SVG element followed by a newline.
fn line(svg: &mut String, element: &str) {
    svg.push_str(element);
    svg.push('\n');
}

fn tick_label(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}

impl SvgChartRenderer {
    fn panel(&self, svg: &mut String, x0: f64, panel: &Panel<'_>, indices: &[usize]) {
        let width = WIDTH / 2.0;
        let left = x0 + MARGIN_LEFT;
        let plot_w = width - MARGIN_LEFT - MARGIN_RIGHT;
        let plot_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
        let bottom = MARGIN_TOP + plot_h;

        let max = panel.values.iter().copied().fold(0.0_f64, f64::max);
        let y_max = if max > 0.0 { max * 1.05 } else { 1.0 };

        line(
            svg,
            &format!(
                r#"<text x="{:.1}" y="{:.1}" font-size="16" text-anchor="middle">{}</text>"#,
                left + plot_w / 2.0,
                MARGIN_TOP - 12.0,
                escape_xml(panel.title)
            ),
        );
        line(
            svg,
            &format!(
                r#"<line x1="{l:.1}" y1="{t:.1}" x2="{l:.1}" y2="{b:.1}" stroke="black"/><line x1="{l:.1}" y1="{b:.1}" x2="{r:.1}" y2="{b:.1}" stroke="black"/>"#,
                l = left,
                t = MARGIN_TOP,
                b = bottom,
                r = left + plot_w,
            ),
        );

        for i in 0..=Y_TICKS {
            let value = y_max * i as f64 / Y_TICKS as f64;
            let y = bottom - plot_h * i as f64 / Y_TICKS as f64;
            line(
                svg,
                &format!(
                    r#"<text x="{:.1}" y="{:.1}" font-size="11" text-anchor="end">{}</text>"#,
                    left - 6.0,
                    y + 4.0,
                    tick_label(value)
                ),
            );
        }

        let slot = if indices.is_empty() {
            plot_w
        } else {
            plot_w / indices.len() as f64
        };
        for (&index, &value) in indices.iter().zip(&panel.values) {
            let bar_h = plot_h * value / y_max;
            let x = left + slot * index as f64 + slot * 0.1;
            line(
                svg,
                &format!(
                    r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}"/>"#,
                    x,
                    bottom - bar_h,
                    slot * 0.8,
                    bar_h,
                    panel.color
                ),
            );
            line(
                svg,
                &format!(
                    r#"<text x="{:.1}" y="{:.1}" font-size="11" text-anchor="middle">{}</text>"#,
                    x + slot * 0.4,
                    bottom + 16.0,
                    index
                ),
            );
        }

        line(
            svg,
            &format!(
                r#"<text x="{:.1}" y="{:.1}" font-size="13" text-anchor="middle">Index</text>"#,
                left + plot_w / 2.0,
                HEIGHT - 15.0
            ),
        );
        line(
            svg,
            &format!(
                r#"<text x="{x:.1}" y="{y:.1}" font-size="13" text-anchor="middle" transform="rotate(-90 {x:.1} {y:.1})">{label}</text>"#,
                x = x0 + 18.0,
                y = MARGIN_TOP + plot_h / 2.0,
                label = escape_xml(panel.y_label)
            ),
        );
    }
}

impl ChartRenderer for SvgChartRenderer {
    fn render(&self, title: &str, data: &PlotData) -> String {
        let mut svg = String::new();
        line(
            &mut svg,
            &format!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif">"#,
                w = WIDTH,
                h = HEIGHT
            ),
        );
        line(&mut svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
        line(
            &mut svg,
            &format!(
                r#"<text x="{:.1}" y="30" font-size="18" text-anchor="middle">{}</text>"#,
                WIDTH / 2.0,
                escape_xml(title)
            ),
        );

        let acreage = Panel {
            title: "Acreage",
            y_label: "Validated Acres",
            color: "blue",
            values: data.acreages.clone(),
        };
        let trees = Panel {
            title: "Trees",
            y_label: "Trees",
            color: "green",
            values: data.tree_counts.iter().map(|&c| c as f64).collect(),
        };
        self.panel(&mut svg, 0.0, &acreage, &data.indices);
        self.panel(&mut svg, WIDTH / 2.0, &trees, &data.indices);

        svg.push_str("</svg>\n");
        svg
    }
}
