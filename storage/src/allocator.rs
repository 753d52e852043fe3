//! Document ID allocation.
//!
//! Each collection keeps a persisted counter in `.next_id`. The counter only
//! moves forward, so an ID handed out once is never handed out again, even
//! after the document is deleted or the process restarts. Allocation for one
//! collection is serialized by an async mutex held from reading the counter
//! until the advanced counter is on disk.
//!
//! Two processes sharing one root can still race on the counter file; that
//! setup is unsupported.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use common::{CollectionName, DocumentId, StoreError, StoreResult};

use crate::codec::{self, Encoding};
use crate::paths::{StorePaths, STRUCTURED_EXTENSION};

/// Hands out unique, never-reused document IDs per collection.
#[derive(Debug)]
pub struct IdAllocator {
    paths: StorePaths,
    // None until the counter has been loaded from disk
    counters: DashMap<CollectionName, Arc<Mutex<Option<u64>>>>,
}

impl IdAllocator {
    /// Create an allocator over `paths`. Counters load lazily.
    pub fn new(paths: StorePaths) -> Self {
        Self {
            paths,
            counters: DashMap::new(),
        }
    }

    /// Allocate the next ID for `collection`.
    ///
    /// The collection directory must already exist. IDs whose document file
    /// is already present in either encoding are skipped, so explicit writes
    /// under numeric IDs never collide with allocated ones.
    pub async fn allocate(&self, collection: &CollectionName) -> StoreResult<DocumentId> {
        let slot = self
            .counters
            .entry(collection.clone())
            .or_default()
            .clone();
        let mut counter = slot.lock().await;

        let mut next = match *counter {
            Some(next) => next,
            None => self.load_counter(collection).await?,
        };

        loop {
            let candidate = DocumentId::from_counter(next);
            if !self.is_taken(collection, &candidate).await? {
                break;
            }
            tracing::debug!(
                collection = %collection,
                id = %candidate,
                "Skipping ID already present on disk"
            );
            next = next.checked_add(1).ok_or_else(|| exhausted(collection))?;
        }

        let allocated = next;
        let following = allocated.checked_add(1).ok_or_else(|| exhausted(collection))?;
        self.persist_counter(collection, following).await?;
        *counter = Some(following);

        tracing::debug!(collection = %collection, id = allocated, "Allocated document ID");
        Ok(DocumentId::from_counter(allocated))
    }

    /// Read the persisted counter, or seed it from the directory contents.
    async fn load_counter(&self, collection: &CollectionName) -> StoreResult<u64> {
        let path = self.paths.counter_path(collection);
        if let Some(bytes) = codec::read_file(&path).await? {
            let text = String::from_utf8_lossy(&bytes);
            return text.trim().parse::<u64>().map_err(|e| {
                StoreError::decode(
                    collection.as_str(),
                    crate::paths::COUNTER_FILE,
                    format!("invalid allocator counter {:?}: {}", text.trim(), e),
                )
            });
        }

        let seeded = match self.highest_numeric_id(collection).await? {
            Some(highest) => highest.checked_add(1).ok_or_else(|| exhausted(collection))?,
            None => 1,
        };
        tracing::info!(
            collection = %collection,
            next_id = seeded,
            "Seeded allocator counter from collection contents"
        );
        Ok(seeded)
    }

    async fn persist_counter(&self, collection: &CollectionName, next: u64) -> StoreResult<()> {
        let path = self.paths.counter_path(collection);
        codec::write_atomic(&path, next.to_string().as_bytes()).await
    }

    async fn is_taken(&self, collection: &CollectionName, id: &DocumentId) -> StoreResult<bool> {
        for encoding in [Encoding::Structured, Encoding::Binary] {
            let path = self.paths.document_path(collection, id, encoding)?;
            match tokio::fs::try_exists(&path).await {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(e) => return Err(StoreError::io(&path, e)),
            }
        }
        Ok(false)
    }

    /// Largest purely numeric document ID currently on disk, in either encoding.
    async fn highest_numeric_id(&self, collection: &CollectionName) -> StoreResult<Option<u64>> {
        let dir = self.paths.collection_dir(collection);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&dir, e)),
        };

        let mut highest = None;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&dir, e))?
        {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let stem = name
                .strip_suffix(STRUCTURED_EXTENSION)
                .and_then(|s| s.strip_suffix('.'))
                .unwrap_or(name);

            if let Some(n) = DocumentId::parse(stem).ok().and_then(|id| id.as_number()) {
                highest = Some(highest.map_or(n, |h: u64| h.max(n)));
            }
        }
        Ok(highest)
    }
}

fn exhausted(collection: &CollectionName) -> StoreError {
    StoreError::validation(
        "id",
        format!("ID space of collection {} is exhausted", collection),
    )
}
