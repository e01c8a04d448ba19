//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - ingestion configuration (`IngestConfig`, `Dialect`, `BucketMode`)
//! - owner identity (`OwnerId`, `OwnerContext`, `Role`)
//! - row/record/series types (`RawRow`, `MetricRecord`, `TimeSeries`)
//! - outputs and error taxonomy (`DatasetAggregate`, `UploadOutcome`, `RowError`, `FileError`)

pub mod types;

pub use types::*;
