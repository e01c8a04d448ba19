//! Shared upload/view workflow used by every CLI command.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! session check -> read file -> ingest -> commit, and store -> view.
//!
//! The command handlers can then focus on presentation.

use std::path::Path;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::app::access;
use crate::cli::UploadJob;
use crate::domain::{DatasetAggregate, IngestConfig, OwnerContext, Role, UploadOutcome};
use crate::error::AppError;
use crate::io::ingest::{get_aggregate, ingest};
use crate::report::DashboardView;
use crate::store::DatasetStore;

/// File extensions accepted for upload.
pub const ALLOWED_EXTENSIONS: [&str; 2] = ["csv", "tsv"];

/// Outcome of one job in a batch.
#[derive(Debug)]
pub struct JobResult {
    pub job: UploadJob,
    pub outcome: Result<UploadOutcome, AppError>,
}

/// A dataset store plus the parsing options used for uploads.
#[derive(Debug)]
pub struct Dashboard<S> {
    store: S,
    config: IngestConfig,
}

impl<S: DatasetStore> Dashboard<S> {
    pub fn new(store: S, config: IngestConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Upload raw bytes for an admin session.
    pub fn upload(&self, ctx: &OwnerContext, bytes: &[u8]) -> Result<UploadOutcome, AppError> {
        access::require_admin(ctx)?;
        Ok(ingest(bytes, ctx, &self.config, &self.store)?)
    }

    /// Upload a file from disk. The extension is checked before reading.
    pub fn upload_file(&self, ctx: &OwnerContext, path: &Path) -> Result<UploadOutcome, AppError> {
        access::require_admin(ctx)?;
        check_extension(path)?;
        let bytes = std::fs::read(path)
            .map_err(|e| AppError::new(2, format!("Failed to read upload '{}': {e}", path.display())))?;
        debug!(path = %path.display(), bytes = bytes.len(), "read upload");
        self.upload(ctx, &bytes)
    }

    /// Run several uploads in parallel; results keep the job order.
    ///
    /// One failing job never stops the others.
    pub fn upload_batch(&self, role: Role, jobs: &[UploadJob]) -> Vec<JobResult> {
        info!(jobs = jobs.len(), "batch upload started");
        jobs.par_iter()
            .map(|job| {
                let outcome = access::authenticate(&job.owner, role)
                    .and_then(|ctx| self.upload_file(&ctx, &job.path));
                JobResult {
                    job: job.clone(),
                    outcome,
                }
            })
            .collect()
    }

    /// The owner's stored aggregate, if any.
    pub fn aggregate(&self, ctx: &OwnerContext) -> Result<Option<Arc<DatasetAggregate>>, AppError> {
        access::require_authenticated(ctx)?;
        Ok(get_aggregate(&self.store, ctx)?)
    }

    /// Dashboard payload; an owner without uploads gets empty series.
    pub fn view(&self, ctx: &OwnerContext) -> Result<DashboardView, AppError> {
        Ok(self
            .aggregate(ctx)?
            .map(|agg| DashboardView::from(agg.as_ref()))
            .unwrap_or_else(DashboardView::empty))
    }

    /// Drop the owner's aggregate. Returns whether anything was stored.
    pub fn purge(&self, ctx: &OwnerContext) -> Result<bool, AppError> {
        access::require_admin(ctx)?;
        let removed = self.store.purge(&ctx.id)?;
        info!(owner = %ctx.id, removed, "purge");
        Ok(removed)
    }
}

fn check_extension(path: &Path) -> Result<(), AppError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(AppError::new(
            2,
            format!(
                "Invalid file type '{}': expected a .csv or .tsv file",
                path.display()
            ),
        )),
    }
}
