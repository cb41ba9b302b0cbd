//! Canonical report text and chart series. Pure: no I/O.

use crate::domain::entities::{PlotData, PlotObservation, StandIdentity, TpaReport};

/// Confidence level as a whole percentage, truncated toward zero.
///
/// No rounding: 0.29 renders as 28% because `0.29 * 100.0` is 28.999999999999996,
/// matching reports already published for such levels.
fn confidence_percent(level: f64) -> u32 {
    (level * 100.0).trunc() as u32
}

/// Render `"{tpa}±{ci} @ {level}%"` with two decimals, e.g. `"7.50±19.62 @ 95%"`.
pub fn format_report(report: &TpaReport) -> String {
    format!(
        "{:.2}±{:.2} @ {}%",
        report.tpa,
        report.confidence_interval,
        confidence_percent(report.confidence_level)
    )
}

/// Title used on the diagnostic chart.
pub fn chart_title(stand: &StandIdentity, report_str: &str) -> String {
    format!("{}: {}", stand, report_str)
}

/// Positional series for the acreage and tree bar charts, in plot order.
pub fn build_plot_data(observations: &[PlotObservation]) -> PlotData {
    PlotData {
        indices: (0..observations.len()).collect(),
        acreages: observations.iter().map(|o| o.validated_acres).collect(),
        tree_counts: observations.iter().map(|o| o.tree_count).collect(),
    }
}
