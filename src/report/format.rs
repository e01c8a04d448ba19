//! Formatted terminal output for uploads and the dashboard.

use crate::domain::{Metric, RowError, TimeSeries, UploadOutcome};
use crate::report::DashboardView;

/// Format the result of one upload (accepted or rejected).
///
/// At most `max_errors` row errors are listed; the rest are summarized.
pub fn format_upload_summary(outcome: &UploadOutcome, max_errors: usize) -> String {
    let mut out = String::new();

    match (&outcome.aggregate, &outcome.fatal) {
        (Some(agg), _) if outcome.accepted => {
            out.push_str("=== dash - upload accepted ===\n");
            out.push_str(&format!("Owner: {}\n", agg.owner));
            out.push_str(&format!(
                "Rows: {} | rejected: {} | duplicates removed: {}\n",
                agg.row_count, agg.rejected_count, agg.duplicates_removed
            ));
            out.push_str(&format!("Columns: {}\n", agg.columns.join(", ")));
            for metric in Metric::ALL {
                let series = agg.series(metric);
                out.push_str(&format!(
                    "{}: {} points | total {:.2}\n",
                    title(metric),
                    series.len(),
                    series.total()
                ));
            }
        }
        (_, fatal) => {
            out.push_str("=== dash - upload rejected ===\n");
            match fatal {
                Some(fatal) => out.push_str(&format!("Reason: {fatal}\n")),
                None => out.push_str("Reason: unknown\n"),
            }
        }
    }

    if !outcome.errors.is_empty() {
        out.push_str(&format_row_errors(&outcome.errors, max_errors));
    }

    out
}

fn format_row_errors(errors: &[RowError], max_errors: usize) -> String {
    let mut out = format!("\nSkipped ({}):\n", errors.len());
    for e in errors.iter().take(max_errors) {
        out.push_str(&format!("  {e}\n"));
    }
    if errors.len() > max_errors {
        out.push_str(&format!("  ... and {} more\n", errors.len() - max_errors));
    }
    out
}

/// Format both series as aligned `label  value` tables, each headed by its total.
pub fn format_dashboard(view: &DashboardView) -> String {
    let mut out = String::new();
    for (i, metric) in Metric::ALL.into_iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let series = match metric {
            Metric::Sales => &view.sales,
            Metric::Quantity => &view.quantity,
        };
        out.push_str(&format_series(title(metric), series));
    }
    out
}

fn format_series(title: &str, series: &TimeSeries) -> String {
    let mut out = format!("{title} ({} points) | total {:.2}\n", series.len(), series.total());
    if series.is_empty() {
        out.push_str("  (no data)\n");
        return out;
    }

    let width = series.labels().map(str::len).max().unwrap_or(0).max(5);
    out.push_str(&format!("  {:<width$}  {:>12}\n", "label", "value"));
    for p in series.points() {
        out.push_str(&format!("  {:<width$}  {:>12.2}\n", p.label, p.value));
    }
    out
}

fn title(metric: Metric) -> &'static str {
    match metric {
        Metric::Sales => "Sales",
        Metric::Quantity => "Quantity",
    }
}
