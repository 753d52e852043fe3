//! Per-document write locks.
//!
//! Entries live only while someone holds or waits for the lock, so the
//! table stays as small as the number of in-flight writes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-document async locks keyed by file path.
///
/// Writers to one document are serialized so the last writer wins with a
/// complete file. Readers never lock; atomic rename already gives them a
/// consistent view.
#[derive(Debug, Default)]
pub struct DocumentLocks {
    inner: DashMap<PathBuf, Arc<Mutex<()>>>,
}

/// Exclusive access to one document. Releasing it prunes the table entry
/// when no other task is waiting on the same path.
#[derive(Debug)]
pub struct DocumentGuard<'a> {
    locks: &'a DocumentLocks,
    path: PathBuf,
    guard: Option<OwnedMutexGuard<()>>,
}

impl DocumentLocks {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to the document at `path`.
    pub async fn acquire(&self, path: &Path) -> DocumentGuard<'_> {
        // Clone the Arc out so the map shard is not held across the await
        let lock = self
            .inner
            .entry(path.to_path_buf())
            .or_default()
            .clone();

        DocumentGuard {
            locks: self,
            path: path.to_path_buf(),
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Number of documents currently locked or awaited.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True when no document is locked.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Drop for DocumentGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // The map's own Arc is the last one: nobody holds or waits for it
        self.locks
            .inner
            .remove_if(&self.path, |_, lock| Arc::strong_count(lock) == 1);
    }
}
