//! Text summary builder for CLI output.

use crate::model::ExportReport;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// Human-readable size, e.g. `1.5 KiB`.
fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Build a text summary from a finished export.
pub(crate) fn build_text_summary(report: &ExportReport) -> TextSummary {
    let mut lines = Vec::new();

    lines.push(format!("User: {}", report.username));
    lines.push(format!(
        "Files: {} ({})",
        report.file_count,
        format_bytes(report.total_bytes)
    ));
    lines.push(format!("Archive: {}", report.archive_path.display()));
    if let Some(feedback) = report.overall_feedback.as_deref() {
        if !feedback.trim().is_empty() {
            lines.push(format!("Feedback: {}", feedback));
        }
    }
    if !report.exported_at_utc.is_empty() {
        lines.push(format!("Exported at: {}", report.exported_at_utc));
    }

    TextSummary { lines }
}
