//! Per-owner aggregate storage.
//!
//! Every owner has exactly one slot. `replace` swaps the whole aggregate in one
//! step (last writer wins) and `get` hands out a shared `Arc`, so readers only
//! ever see a complete generation.

use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;
use tracing::debug;

use crate::domain::{DatasetAggregate, OwnerId};

pub mod fs;

pub use fs::FsStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("aggregate tagged for `{aggregate}` cannot be stored in the slot of `{slot}`")]
    OwnerMismatch { slot: OwnerId, aggregate: OwnerId },
    #[error("store I/O error at '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode aggregate: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("corrupt aggregate at '{}': {message}", .path.display())]
    Corrupt { path: PathBuf, message: String },
}

/// Storage seam between the ingestion core and its persistence.
pub trait DatasetStore: Send + Sync {
    /// Atomically replace the owner's aggregate.
    fn replace(&self, owner: &OwnerId, aggregate: Arc<DatasetAggregate>) -> Result<(), StoreError>;

    /// Current aggregate, or `None` if the owner never uploaded.
    fn get(&self, owner: &OwnerId) -> Result<Option<Arc<DatasetAggregate>>, StoreError>;

    /// Drop the owner's aggregate. Returns whether anything was stored.
    fn purge(&self, owner: &OwnerId) -> Result<bool, StoreError>;
}

impl<S: DatasetStore + ?Sized> DatasetStore for Arc<S> {
    fn replace(&self, owner: &OwnerId, aggregate: Arc<DatasetAggregate>) -> Result<(), StoreError> {
        (**self).replace(owner, aggregate)
    }

    fn get(&self, owner: &OwnerId) -> Result<Option<Arc<DatasetAggregate>>, StoreError> {
        (**self).get(owner)
    }

    fn purge(&self, owner: &OwnerId) -> Result<bool, StoreError> {
        (**self).purge(owner)
    }
}

pub(crate) fn check_owner(owner: &OwnerId, aggregate: &DatasetAggregate) -> Result<(), StoreError> {
    if aggregate.owner != *owner {
        return Err(StoreError::OwnerMismatch {
            slot: owner.clone(),
            aggregate: aggregate.owner.clone(),
        });
    }
    Ok(())
}

/// In-process store. Slots live as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: DashMap<OwnerId, Arc<DatasetAggregate>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl DatasetStore for MemoryStore {
    fn replace(&self, owner: &OwnerId, aggregate: Arc<DatasetAggregate>) -> Result<(), StoreError> {
        check_owner(owner, &aggregate)?;
        let previous = self.slots.insert(owner.clone(), aggregate);
        debug!(owner = %owner, replaced = previous.is_some(), "memory store slot swapped");
        Ok(())
    }

    fn get(&self, owner: &OwnerId) -> Result<Option<Arc<DatasetAggregate>>, StoreError> {
        Ok(self.slots.get(owner).map(|slot| Arc::clone(slot.value())))
    }

    fn purge(&self, owner: &OwnerId) -> Result<bool, StoreError> {
        Ok(self.slots.remove(owner).is_some())
    }
}
