//! Header resolution and per-row validation.
//!
//! The header is resolved once per file into a `ColumnIndex`. Each data row is
//! then turned into zero or more `MetricRecord`s:
//!
//! - a bad label rejects the whole row
//! - a bad metric cell rejects only that column, as long as another metric cell
//!   on the same row is usable
//! - a row where every present metric cell is bad is rejected

use chrono::{NaiveDate, NaiveDateTime};

use crate::domain::{
    BucketMode, FileError, IngestConfig, Metric, MetricRecord, RawRow, RowError, RowReason,
};

/// Column positions resolved from the header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnIndex {
    pub label: usize,
    pub sales: Option<usize>,
    pub quantity: Option<usize>,
    /// Normalized header names, in file order.
    pub names: Vec<String>,
}

impl ColumnIndex {
    /// Resolve required columns from raw header cells.
    ///
    /// Requires the label column plus at least one metric column.
    pub fn resolve(header: &[String], config: &IngestConfig) -> Result<Self, FileError> {
        let names: Vec<String> = header.iter().map(|h| normalize_header_name(h)).collect();
        let position = |wanted: &str| {
            let wanted = normalize_header_name(wanted);
            names.iter().position(|n| *n == wanted)
        };

        let label = position(&config.label_column);
        let sales = position(&config.sales_column);
        let quantity = position(&config.quantity_column);

        let mut missing = Vec::new();
        if label.is_none() {
            missing.push(normalize_header_name(&config.label_column));
        }
        if sales.is_none() && quantity.is_none() {
            missing.push(normalize_header_name(&config.sales_column));
            missing.push(normalize_header_name(&config.quantity_column));
        }

        match label {
            Some(label) if missing.is_empty() => Ok(Self {
                label,
                sales,
                quantity,
                names,
            }),
            _ => Err(FileError::MissingColumns { missing }),
        }
    }

    pub fn width(&self) -> usize {
        self.names.len()
    }

    pub fn metric(&self, metric: Metric) -> Option<usize> {
        match metric {
            Metric::Sales => self.sales,
            Metric::Quantity => self.quantity,
        }
    }

    /// Header name of the metric's column, if the file has one.
    pub fn metric_name(&self, metric: Metric) -> Option<&str> {
        self.metric(metric).map(|idx| self.name(idx))
    }

    fn name(&self, idx: usize) -> &str {
        self.names.get(idx).map(String::as_str).unwrap_or("")
    }
}

/// A row that produced at least one record.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRow {
    pub records: Vec<MetricRecord>,
    /// Columns dropped from an otherwise accepted row.
    pub warnings: Vec<RowError>,
}

/// A row that produced nothing usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowRejection {
    pub errors: Vec<RowError>,
}

impl RowRejection {
    fn single(error: RowError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

/// Validate a parsed row against the resolved columns.
pub fn validate(
    row: &RawRow,
    columns: &ColumnIndex,
    config: &IngestConfig,
) -> Result<ValidatedRow, RowRejection> {
    let label_name = columns.name(columns.label);
    let raw_label = row.cells.get(columns.label).map(|s| s.trim()).unwrap_or("");
    if raw_label.is_empty() {
        return Err(RowRejection::single(RowError::in_column(
            row.line,
            RowReason::EmptyLabel,
            label_name,
        )));
    }

    let label = bucket_label(raw_label, config.bucket).ok_or_else(|| {
        RowRejection::single(RowError::in_column(row.line, RowReason::InvalidDate, label_name))
    })?;

    let mut records = Vec::with_capacity(Metric::ALL.len());
    let mut errors = Vec::new();

    for metric in Metric::ALL {
        let Some(idx) = columns.metric(metric) else {
            continue;
        };
        let cell = row.cells.get(idx).map(String::as_str).unwrap_or("");
        match parse_metric_value(cell) {
            Some(value) => records.push(MetricRecord {
                label: label.clone(),
                value,
                metric,
            }),
            None => errors.push(RowError::in_column(
                row.line,
                RowReason::InvalidNumber,
                columns.name(idx),
            )),
        }
    }

    if records.is_empty() {
        return Err(RowRejection { errors });
    }

    Ok(ValidatedRow {
        records,
        warnings: errors,
    })
}

/// Finite and non-negative, or nothing.
pub fn parse_metric_value(cell: &str) -> Option<f64> {
    let v = cell.trim().parse::<f64>().ok()?;
    if v.is_finite() && v >= 0.0 { Some(v) } else { None }
}

/// Normalize a label according to the bucket mode.
///
/// Returns `None` when the mode needs a date and the label is not one.
pub fn bucket_label(label: &str, mode: BucketMode) -> Option<String> {
    match mode {
        BucketMode::Raw => Some(label.to_string()),
        BucketMode::Day => parse_date(label).map(|d| d.format("%Y-%m-%d").to_string()),
        BucketMode::Month => parse_date(label).map(|d| d.format("%Y-%m").to_string()),
    }
}

pub(crate) fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}').trim();
    name.to_ascii_lowercase()
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    const DATE_FMTS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];
    const DATETIME_FMTS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

    let s = s.trim();
    DATE_FMTS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FMTS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
}
