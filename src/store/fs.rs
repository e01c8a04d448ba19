//! Filesystem-backed store: one JSON document per owner under a root directory.
//!
//! Writes land in a temp file inside the root and are renamed over the target,
//! so a reader opening the file sees either the old or the new aggregate.
//! Writers for the same owner are serialized; readers take no lock.

use std::fs::{self, File};
use std::io::{BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::{DatasetStore, StoreError, check_owner};
use crate::domain::{DatasetAggregate, Metric, OwnerId};

pub struct FsStore {
    root: PathBuf,
    writers: DashMap<OwnerId, Arc<Mutex<()>>>,
}

impl FsStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| StoreError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(Self {
            root,
            writers: DashMap::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the owner's document.
    pub fn path_for(&self, owner: &OwnerId) -> PathBuf {
        self.root.join(format!("{}.json", file_stem(owner)))
    }

    fn writer_lock(&self, owner: &OwnerId) -> Arc<Mutex<()>> {
        Arc::clone(&self.writers.entry(owner.clone()).or_default())
    }

    /// Drop the owner's lock entry unless another writer holds or waits on it.
    ///
    /// Call while still holding `held`: the map and the caller own the only two
    /// references when nobody else is queued.
    fn release_writer(&self, owner: &OwnerId, held: &Arc<Mutex<()>>) {
        self.writers
            .remove_if(owner, |_, lock| Arc::ptr_eq(lock, held) && Arc::strong_count(lock) == 2);
    }

    fn write_document(&self, path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        let mut tmp = NamedTempFile::new_in(&self.root).map_err(Self::io_error(&self.root))?;
        tmp.write_all(bytes).map_err(Self::io_error(tmp.path()))?;
        tmp.as_file().sync_all().map_err(Self::io_error(tmp.path()))?;
        tmp.persist(path).map_err(|e| StoreError::Io {
            path: path.to_path_buf(),
            source: e.error,
        })?;
        Ok(())
    }

    fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
        move |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl DatasetStore for FsStore {
    fn replace(&self, owner: &OwnerId, aggregate: Arc<DatasetAggregate>) -> Result<(), StoreError> {
        check_owner(owner, &aggregate)?;
        let bytes = serde_json::to_vec_pretty(aggregate.as_ref())?;

        let path = self.path_for(owner);
        let lock = self.writer_lock(owner);
        let written = {
            let _guard = lock.lock();
            let written = self.write_document(&path, &bytes);
            self.release_writer(owner, &lock);
            written
        };
        written?;

        debug!(owner = %owner, path = %path.display(), bytes = bytes.len(), "aggregate persisted");
        Ok(())
    }

    fn get(&self, owner: &OwnerId) -> Result<Option<Arc<DatasetAggregate>>, StoreError> {
        let path = self.path_for(owner);
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Self::io_error(&path)(e)),
        };

        let aggregate: DatasetAggregate =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| StoreError::Corrupt {
                path: path.clone(),
                message: e.to_string(),
            })?;

        if aggregate.owner != *owner {
            warn!(owner = %owner, tagged = %aggregate.owner, "stored aggregate carries another owner");
            return Err(StoreError::Corrupt {
                path,
                message: format!("document is tagged for `{}`", aggregate.owner),
            });
        }
        for metric in Metric::ALL {
            if let Some(label) = aggregate.series(metric).duplicate_label() {
                return Err(StoreError::Corrupt {
                    path,
                    message: format!("duplicate {metric} label `{label}`"),
                });
            }
        }

        Ok(Some(Arc::new(aggregate)))
    }

    fn purge(&self, owner: &OwnerId) -> Result<bool, StoreError> {
        let path = self.path_for(owner);
        let lock = self.writer_lock(owner);
        let _guard = lock.lock();

        let removed = match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Self::io_error(&path)(e)),
        };
        self.release_writer(owner, &lock);
        removed
    }
}

/// Map an owner id onto a file stem that cannot escape the root.
///
/// ASCII alphanumerics, `-` and `_` pass through; every other byte becomes `~xx`.
fn file_stem(owner: &OwnerId) -> String {
    let id = owner.as_str();
    if id.is_empty() {
        return "~".to_string();
    }
    let mut out = String::with_capacity(id.len());
    for ch in id.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
            out.push(ch);
        } else {
            let mut buf = [0u8; 4];
            for b in ch.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("~{b:02x}"));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::aggregate;
    use tempfile::tempdir;

    #[test]
    fn persists_and_reloads_aggregate() {
        let dir = tempdir().unwrap();
        let store = FsStore::open(dir.path().join("store")).unwrap();
        let owner = OwnerId::new("alice");

        assert!(store.get(&owner).unwrap().is_none());

        let agg = Arc::new(aggregate("alice", &[("2024-01", 10.0), ("2024-02", 5.5)]));
        store.replace(&owner, Arc::clone(&agg)).unwrap();

        let loaded = store.get(&owner).unwrap().unwrap();
        assert_eq!(*loaded, *agg);
        assert_eq!(loaded.sales.labels().collect::<Vec<_>>(), vec!["2024-01", "2024-02"]);
    }

    #[test]
    fn reopened_store_sees_previous_writes() {
        let dir = tempdir().unwrap();
        let owner = OwnerId::new("alice");
        {
            let store = FsStore::open(dir.path()).unwrap();
            store.replace(&owner, Arc::new(aggregate("alice", &[("d1", 1.0)]))).unwrap();
            store.replace(&owner, Arc::new(aggregate("alice", &[("d2", 2.0)]))).unwrap();
        }
        let store = FsStore::open(dir.path()).unwrap();
        let loaded = store.get(&owner).unwrap().unwrap();
        assert_eq!(loaded.sales.value_of("d2"), Some(2.0));
        assert_eq!(loaded.sales.len(), 1);
    }

    #[test]
    fn owner_ids_cannot_escape_root() {
        assert_eq!(file_stem(&OwnerId::new("alice_01")), "alice_01");
        assert_eq!(file_stem(&OwnerId::new("../etc")), "~2e~2e~2fetc");
        assert_eq!(file_stem(&OwnerId::new("é")), "~c3~a9");

        let dir = tempdir().unwrap();
        let store = FsStore::open(dir.path()).unwrap();
        let path = store.path_for(&OwnerId::new("../../x"));
        assert_eq!(path.parent(), Some(dir.path()));
    }

    #[test]
    fn purge_removes_document() {
        let dir = tempdir().unwrap();
        let store = FsStore::open(dir.path()).unwrap();
        let owner = OwnerId::new("bob");
        store.replace(&owner, Arc::new(aggregate("bob", &[("d1", 1.0)]))).unwrap();
        assert!(store.purge(&owner).unwrap());
        assert!(!store.purge(&owner).unwrap());
        assert!(store.get(&owner).unwrap().is_none());
    }

    #[test]
    fn writer_locks_are_released_after_use() {
        let dir = tempdir().unwrap();
        let store = FsStore::open(dir.path()).unwrap();
        for name in ["alice", "bob", "carol"] {
            let owner = OwnerId::new(name);
            store.replace(&owner, Arc::new(aggregate(name, &[("d1", 1.0)]))).unwrap();
            assert!(store.writers.is_empty());
        }
        assert!(store.purge(&OwnerId::new("bob")).unwrap());
        assert!(store.writers.is_empty());
    }

    #[test]
    fn concurrent_readers_only_see_whole_documents() {
        let dir = tempdir().unwrap();
        let store = FsStore::open(dir.path()).unwrap();
        let owner = OwnerId::new("alice");
        let gen_a = Arc::new(aggregate("alice", &[("a1", 1.0), ("a2", 2.0)]));
        let gen_b = Arc::new(aggregate("alice", &[("b1", 10.0), ("b2", 20.0), ("b3", 30.0)]));
        store.replace(&owner, Arc::clone(&gen_a)).unwrap();

        std::thread::scope(|scope| {
            for _ in 0..2 {
                scope.spawn(|| {
                    for i in 0..50 {
                        let next = if i % 2 == 0 { &gen_b } else { &gen_a };
                        store.replace(&owner, Arc::clone(next)).unwrap();
                    }
                });
            }
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..100 {
                        let seen = store.get(&owner).unwrap().unwrap();
                        assert!(seen.same_content(&gen_a) || seen.same_content(&gen_b));
                    }
                });
            }
        });

        let last = store.get(&owner).unwrap().unwrap();
        assert!(last.same_content(&gen_a) || last.same_content(&gen_b));
    }

    #[test]
    fn garbage_document_is_reported_corrupt() {
        let dir = tempdir().unwrap();
        let store = FsStore::open(dir.path()).unwrap();
        let owner = OwnerId::new("carol");
        fs::write(store.path_for(&owner), b"{ not json").unwrap();
        assert!(matches!(store.get(&owner), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn document_with_duplicate_labels_is_reported_corrupt() {
        let dir = tempdir().unwrap();
        let store = FsStore::open(dir.path()).unwrap();
        let owner = OwnerId::new("dave");
        let agg = aggregate("dave", &[("d1", 1.0), ("d1", 2.0)]);
        fs::write(store.path_for(&owner), serde_json::to_vec(&agg).unwrap()).unwrap();
        let err = store.get(&owner).unwrap_err();
        assert!(err.to_string().contains("duplicate sales label `d1`"));
    }
}
