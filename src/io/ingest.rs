//! Upload ingest: decode → header → per-row parse/validate/fold → commit.
//!
//! This module is responsible for turning an uploaded delimited file into a
//! `DatasetAggregate` and committing it for its owner.
//!
//! Design goals:
//! - **Strict header**: missing required columns abort the upload
//! - **Row-level validation**: skip bad rows/columns, but report what happened
//! - **All-or-nothing commit**: the store is touched once, and only on success
//! - **No auth logic here**: the caller decides who may upload

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, info_span, warn};

use crate::aggregate::Aggregator;
use crate::domain::{
    DatasetAggregate, FileError, IngestConfig, OwnerContext, RowError, RowReason, UploadOutcome,
};
use crate::io::row::{parse_row, split_line};
use crate::io::schema::{ColumnIndex, normalize_header_name, validate};
use crate::store::{DatasetStore, StoreError};

/// Ingest one uploaded file for `owner` and commit the result to `store`.
///
/// Whole-file problems come back as a rejected `UploadOutcome`; only store
/// failures are returned as `Err`.
pub fn ingest<S>(
    bytes: &[u8],
    owner: &OwnerContext,
    config: &IngestConfig,
    store: &S,
) -> Result<UploadOutcome, StoreError>
where
    S: DatasetStore + ?Sized,
{
    let span = info_span!("ingest", owner = %owner.id, bytes = bytes.len());
    let _enter = span.enter();

    let scanned = decode_text(bytes).and_then(|text| scan(text, config).map_err(|r| r.into_parts()));
    let run = match scanned {
        Ok(run) => run,
        Err((fatal, errors)) => {
            warn!(reason = fatal.reason(), row_errors = errors.len(), "upload rejected");
            return Ok(UploadOutcome::rejected(fatal, errors));
        }
    };

    let Scan {
        columns,
        aggregator,
        errors,
        row_count,
        rejected_count,
        duplicates_removed,
    } = run;
    let records = aggregator.record_count();
    let series = aggregator.finish();

    let aggregate = Arc::new(DatasetAggregate {
        owner: owner.id.clone(),
        sales: series.sales,
        quantity: series.quantity,
        row_count,
        rejected_count,
        computed_at: Utc::now(),
        columns: columns.names,
        duplicates_removed,
    });

    store.replace(&owner.id, Arc::clone(&aggregate))?;

    info!(
        rows = row_count,
        rejected = rejected_count,
        duplicates = duplicates_removed,
        records,
        sales_points = aggregate.sales.len(),
        quantity_points = aggregate.quantity.len(),
        "upload committed"
    );

    Ok(UploadOutcome::accepted(aggregate, errors))
}

/// Read path for the dashboard: the owner's current aggregate, if any.
pub fn get_aggregate<S>(store: &S, owner: &OwnerContext) -> Result<Option<Arc<DatasetAggregate>>, StoreError>
where
    S: DatasetStore + ?Sized,
{
    store.get(&owner.id)
}

/// Everything one run collected before commit.
struct Scan {
    columns: ColumnIndex,
    aggregator: Aggregator,
    errors: Vec<RowError>,
    row_count: usize,
    rejected_count: usize,
    duplicates_removed: usize,
}

/// A fatal error plus whatever row errors were collected before it.
struct Rejection {
    fatal: FileError,
    errors: Vec<RowError>,
}

impl Rejection {
    fn into_parts(self) -> (FileError, Vec<RowError>) {
        (self.fatal, self.errors)
    }
}

impl From<FileError> for Rejection {
    fn from(fatal: FileError) -> Self {
        Self {
            fatal,
            errors: Vec::new(),
        }
    }
}

fn decode_text(bytes: &[u8]) -> Result<&str, (FileError, Vec<RowError>)> {
    let text = std::str::from_utf8(bytes).map_err(|_| (FileError::NotText, Vec::new()))?;
    if text.contains('\0') {
        return Err((FileError::NotText, Vec::new()));
    }
    Ok(text.strip_prefix('\u{feff}').unwrap_or(text))
}

fn scan(text: &str, config: &IngestConfig) -> Result<Scan, Rejection> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line))
        .skip_while(|(_, line)| line.trim().is_empty());

    let Some((header_line, header)) = lines.next() else {
        return Err(FileError::MissingColumns {
            missing: vec![
                normalize_header_name(&config.label_column),
                normalize_header_name(&config.sales_column),
                normalize_header_name(&config.quantity_column),
            ],
        }
        .into());
    };

    let columns = ColumnIndex::resolve(&split_line(header, config.dialect), config)?;
    // Data lines are numbered from 1 after the header; blank lines keep their slot.
    let lines = lines.map(|(physical, line)| (physical - header_line, line));
    debug!(line = header_line, columns = ?columns.names, "header resolved");

    let mut aggregator = Aggregator::new();
    let mut errors = Vec::new();
    let mut row_count = 0usize;
    let mut rejected_count = 0usize;
    let mut duplicates_removed = 0usize;
    let mut seen: HashSet<Vec<String>> = HashSet::new();

    for (line_number, line) in lines {
        let row = match parse_row(line, line_number, config.dialect, columns.width()) {
            Ok(None) => continue,
            Ok(Some(row)) => row,
            Err(e) => {
                debug!(line = line_number, reason = %e.reason, "row skipped");
                row_count += 1;
                rejected_count += 1;
                errors.push(e);
                continue;
            }
        };
        row_count += 1;

        if config.dedupe_rows && !seen.insert(row.cells.clone()) {
            duplicates_removed += 1;
            continue;
        }

        match validate(&row, &columns, config) {
            Ok(valid) => {
                for w in &valid.warnings {
                    debug!(line = w.line, reason = %w.reason, column = ?w.column, "column skipped");
                }
                errors.extend(valid.warnings);

                let offered = valid.records.len();
                let overflowed = aggregator.fold(valid.records);
                for record in &overflowed {
                    debug!(line = line_number, metric = %record.metric, "bucket sum would overflow");
                    let column = columns.metric_name(record.metric).unwrap_or(record.metric.as_str());
                    errors.push(RowError::in_column(line_number, RowReason::InvalidNumber, column));
                }
                if !overflowed.is_empty() && overflowed.len() == offered {
                    rejected_count += 1;
                }
            }
            Err(rejection) => {
                debug!(line = line_number, errors = rejection.errors.len(), "row rejected");
                rejected_count += 1;
                errors.extend(rejection.errors);
            }
        }
    }

    if aggregator.is_empty() {
        return Err(Rejection {
            fatal: FileError::EmptyDataset,
            errors,
        });
    }

    Ok(Scan {
        columns,
        aggregator,
        errors,
        row_count,
        rejected_count,
        duplicates_removed,
    })
}
