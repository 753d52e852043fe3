//! The [`DocumentStore`] facade: every document operation the request
//! boundary exposes, built from the path resolver, codec, allocator, lock
//! table and query engine.

use std::path::{Path, PathBuf};

use serde_json::Value;

use common::{CollectionName, DocumentId, StoreError, StoreResult};

use crate::allocator::IdAllocator;
use crate::codec::{self, Encoding};
use crate::config::StoreConfig;
use crate::locks::DocumentLocks;
use crate::paths::StorePaths;
use crate::query::{self, Filter};

/// Document store rooted at one directory.
///
/// `DocumentStore` is `Send + Sync`; share it behind an `Arc`. Every
/// operation creates the target collection on first touch, so callers never
/// see a "collection does not exist" failure.
#[derive(Debug)]
pub struct DocumentStore {
    config: StoreConfig,
    paths: StorePaths,
    allocator: IdAllocator,
    locks: DocumentLocks,
}

impl DocumentStore {
    /// Open a store, creating the root directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the root cannot be created.
    pub async fn open(config: StoreConfig) -> StoreResult<Self> {
        let paths = StorePaths::new(&config.root);
        paths.ensure_root().await?;

        tracing::info!(
            app = %config.app_name,
            root = %paths.root().display(),
            "Document store opened"
        );

        Ok(Self {
            allocator: IdAllocator::new(paths.clone()),
            locks: DocumentLocks::new(),
            paths,
            config,
        })
    }

    /// The configuration this store was opened with.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The store root.
    pub fn root(&self) -> &Path {
        self.paths.root()
    }

    /// Ensure the root exists and return it. Safe to call repeatedly.
    pub async fn init(&self) -> StoreResult<PathBuf> {
        self.paths.ensure_root().await.map(Path::to_path_buf)
    }

    /// Create a collection directory if absent.
    pub async fn ensure_collection(&self, collection: &CollectionName) -> StoreResult<PathBuf> {
        self.paths.ensure_collection(collection).await
    }

    /// Create or fully replace a document.
    ///
    /// Structured payloads may be any JSON value. Binary payloads must be a
    /// base64 string; the decoded bytes are what lands on disk.
    pub async fn write(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        payload: &Value,
        encoding: Encoding,
    ) -> StoreResult<()> {
        let bytes = codec::encode(payload, encoding)?;
        self.ensure_collection(collection).await?;
        self.put(collection, id, &bytes, encoding).await
    }

    /// Store a document under a freshly allocated ID and return that ID.
    ///
    /// A structured object without an `id` field gets one holding the
    /// allocated ID as a string.
    pub async fn add(
        &self,
        collection: &CollectionName,
        mut payload: Value,
        encoding: Encoding,
    ) -> StoreResult<DocumentId> {
        // Reject bad payloads before an ID is burned
        codec::encode(&payload, encoding)?;
        self.ensure_collection(collection).await?;

        let id = self.allocator.allocate(collection).await?;
        if encoding == Encoding::Structured {
            if let Value::Object(map) = &mut payload {
                map.entry("id")
                    .or_insert_with(|| Value::String(id.as_str().to_string()));
            }
        }

        let bytes = codec::encode(&payload, encoding)?;
        self.put(collection, &id, &bytes, encoding).await?;
        Ok(id)
    }

    /// Read a document back in the encoding it was written with.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` if no file exists for `id` in that encoding.
    pub async fn read(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        encoding: Encoding,
    ) -> StoreResult<Value> {
        self.ensure_collection(collection).await?;
        let path = self.paths.document_path(collection, id, encoding)?;

        match codec::read_file(&path).await? {
            Some(bytes) => codec::decode(collection, id, &bytes, encoding),
            None => Err(StoreError::not_found(collection.as_str(), id.as_str())),
        }
    }

    /// Remove a document.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` if no file exists for `id` in that encoding.
    pub async fn delete(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        encoding: Encoding,
    ) -> StoreResult<()> {
        self.ensure_collection(collection).await?;
        let path = self.paths.document_path(collection, id, encoding)?;

        let _guard = self.locks.acquire(&path).await;
        if codec::remove_file(&path).await? {
            tracing::debug!(collection = %collection, id = %id, "Document deleted");
            Ok(())
        } else {
            Err(StoreError::not_found(collection.as_str(), id.as_str()))
        }
    }

    /// Every structured document in a collection. Order is unspecified.
    pub async fn list(&self, collection: &CollectionName) -> StoreResult<Vec<Value>> {
        self.ensure_collection(collection).await?;
        query::list_all(&self.paths, collection).await
    }

    /// Whether a document file exists in the given encoding.
    pub async fn exists(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        encoding: Encoding,
    ) -> StoreResult<bool> {
        self.ensure_collection(collection).await?;
        query::exists(&self.paths, collection, id, encoding).await
    }

    /// Structured documents matching every clause of `filter`.
    ///
    /// # Errors
    ///
    /// `StoreError::Validation` if a clause is malformed.
    pub async fn search(
        &self,
        collection: &CollectionName,
        filter: &Filter,
    ) -> StoreResult<Vec<Value>> {
        self.ensure_collection(collection).await?;
        query::search(&self.paths, collection, filter).await
    }

    async fn put(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        bytes: &[u8],
        encoding: Encoding,
    ) -> StoreResult<()> {
        let path = self.paths.document_path(collection, id, encoding)?;
        let _guard = self.locks.acquire(&path).await;
        codec::write_atomic(&path, bytes).await?;

        tracing::debug!(
            collection = %collection,
            id = %id,
            bytes = bytes.len(),
            binary = encoding == Encoding::Binary,
            "Document written"
        );
        Ok(())
    }
}
