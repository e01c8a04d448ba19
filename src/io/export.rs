//! Export a stored aggregate to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts:
//! one `metric,label,value` row per point, sales first, in series order.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::{DatasetAggregate, Metric};
use crate::error::AppError;

/// Write the aggregate's points to a CSV file.
pub fn write_aggregate_csv(path: &Path, aggregate: &DatasetAggregate) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_aggregate(file, aggregate)
}

/// Write the aggregate's points as CSV to any writer.
pub fn write_aggregate<W: Write>(writer: W, aggregate: &DatasetAggregate) -> Result<(), AppError> {
    let mut out = csv::Writer::from_writer(writer);

    out.write_record(["metric", "label", "value"])
        .map_err(|e| AppError::new(4, format!("Failed to write export CSV header: {e}")))?;

    for metric in Metric::ALL {
        for p in aggregate.series(metric).points() {
            let value = p.value.to_string();
            out.write_record([metric.as_str(), p.label.as_str(), value.as_str()])
                .map_err(|e| AppError::new(4, format!("Failed to write export CSV row: {e}")))?;
        }
    }

    out.flush()
        .map_err(|e| AppError::new(4, format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}
