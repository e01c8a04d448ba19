//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during ingestion
//! - persisted by the filesystem store
//! - handed to the presentation layer as JSON

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One of the two tracked quantities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Sales,
    Quantity,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::Sales, Metric::Quantity];

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Sales => "sales",
            Metric::Quantity => "quantity",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity whose uploads and aggregate are isolated from everyone else's.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role attached to an authenticated session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Viewer,
}

/// Identity + role as established by the authentication collaborator.
///
/// The ingestion core never checks `role`; it only tags aggregates with `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerContext {
    pub id: OwnerId,
    pub role: Role,
}

impl OwnerContext {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: OwnerId::new(id),
            role,
        }
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Self::new(id, Role::Admin)
    }

    pub fn viewer(id: impl Into<String>) -> Self {
        Self::new(id, Role::Viewer)
    }
}

/// How labels are normalized before aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BucketMode {
    /// Use the label cell exactly as written (trimmed).
    #[default]
    Raw,
    /// Parse the label as a date and bucket by day (`YYYY-MM-DD`).
    Day,
    /// Parse the label as a date and bucket by month (`YYYY-MM`).
    Month,
}

/// Delimiter + quote character used to split lines into cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    pub delimiter: char,
    pub quote: char,
}

impl Default for Dialect {
    fn default() -> Self {
        Self {
            delimiter: ',',
            quote: '"',
        }
    }
}

/// Resolved configuration for one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub dialect: Dialect,
    pub label_column: String,
    pub sales_column: String,
    pub quantity_column: String,
    pub bucket: BucketMode,
    /// Skip data rows whose cells exactly repeat an earlier data row.
    pub dedupe_rows: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            label_column: "date".to_string(),
            sales_column: "sales".to_string(),
            quantity_column: "quantity".to_string(),
            bucket: BucketMode::Raw,
            dedupe_rows: false,
        }
    }
}

impl IngestConfig {
    pub fn metric_column(&self, metric: Metric) -> &str {
        match metric {
            Metric::Sales => &self.sales_column,
            Metric::Quantity => &self.quantity_column,
        }
    }
}

/// One data line split into cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based data line number; the first line after the header is 1.
    pub line: usize,
    pub cells: Vec<String>,
}

/// A single validated metric observation.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    pub label: String,
    pub value: f64,
    pub metric: Metric,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub label: String,
    pub value: f64,
}

/// Ordered points for one metric.
///
/// Points keep first-seen label order and labels are unique; the aggregator is
/// the only producer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeSeries {
    points: Vec<SeriesPoint>,
}

impl TimeSeries {
    pub(crate) fn from_points(points: Vec<SeriesPoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.points.iter().map(|p| p.label.as_str())
    }

    pub fn value_of(&self, label: &str) -> Option<f64> {
        self.points.iter().find(|p| p.label == label).map(|p| p.value)
    }

    pub fn total(&self) -> f64 {
        self.points.iter().map(|p| p.value).sum()
    }

    /// First label that appears more than once, if any.
    pub fn duplicate_label(&self) -> Option<&str> {
        let mut seen = std::collections::HashSet::with_capacity(self.points.len());
        self.labels().find(|label| !seen.insert(*label))
    }
}

/// Committed, queryable result of the most recent successful ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetAggregate {
    pub owner: OwnerId,
    pub sales: TimeSeries,
    pub quantity: TimeSeries,
    /// Non-blank data lines after the header.
    pub row_count: usize,
    /// Lines skipped because of a parse or row-level validation error.
    pub rejected_count: usize,
    pub computed_at: DateTime<Utc>,
    /// Normalized header names of the uploaded file.
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub duplicates_removed: usize,
}

impl DatasetAggregate {
    pub fn series(&self, metric: Metric) -> &TimeSeries {
        match metric {
            Metric::Sales => &self.sales,
            Metric::Quantity => &self.quantity,
        }
    }

    /// True when both aggregates carry the same series content.
    pub fn same_content(&self, other: &DatasetAggregate) -> bool {
        self.sales == other.sales && self.quantity == other.quantity
    }
}

/// Structured reason for a skipped row or column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RowReason {
    MalformedRow,
    EmptyLabel,
    InvalidNumber,
    InvalidDate,
}

impl RowReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RowReason::MalformedRow => "malformed-row",
            RowReason::EmptyLabel => "empty-label",
            RowReason::InvalidNumber => "invalid-number",
            RowReason::InvalidDate => "invalid-date",
        }
    }
}

impl fmt::Display for RowReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-fatal, per-row (or per-column) problem.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("line {line}: {reason}{}", .column.as_ref().map(|c| format!(" (column `{c}`)")).unwrap_or_default())]
pub struct RowError {
    pub line: usize,
    pub reason: RowReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
}

impl RowError {
    pub fn new(line: usize, reason: RowReason) -> Self {
        Self {
            line,
            reason,
            column: None,
        }
    }

    pub fn in_column(line: usize, reason: RowReason, column: impl Into<String>) -> Self {
        Self {
            line,
            reason,
            column: Some(column.into()),
        }
    }
}

/// Whole-file problems. Any of these aborts the run before the store is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum FileError {
    #[error("not-text: upload is not valid UTF-8 text")]
    NotText,
    #[error("missing-columns: {}", .missing.join(", "))]
    MissingColumns { missing: Vec<String> },
    #[error("empty-dataset: no valid metric values in upload")]
    EmptyDataset,
}

impl FileError {
    pub fn reason(&self) -> &'static str {
        match self {
            FileError::NotText => "not-text",
            FileError::MissingColumns { .. } => "missing-columns",
            FileError::EmptyDataset => "empty-dataset",
        }
    }
}

/// Result of one upload, returned to the caller and never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    pub accepted: bool,
    pub aggregate: Option<Arc<DatasetAggregate>>,
    pub errors: Vec<RowError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fatal: Option<FileError>,
}

impl UploadOutcome {
    pub fn accepted(aggregate: Arc<DatasetAggregate>, errors: Vec<RowError>) -> Self {
        Self {
            accepted: true,
            aggregate: Some(aggregate),
            errors,
            fatal: None,
        }
    }

    pub fn rejected(fatal: FileError, errors: Vec<RowError>) -> Self {
        Self {
            accepted: false,
            aggregate: None,
            errors,
            fatal: Some(fatal),
        }
    }
}
