//! Traits for native messaging integration.
//!
//! Routes never hold a concrete store. They talk to a [`StoreProvider`], which
//! [`DocumentStore`] implements and tests can replace with a mock.

use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use storage::{CollectionName, DocumentId, DocumentStore, Encoding, Filter, StoreResult};

/// Backend that native messaging routes operate on.
///
/// Each method mirrors one document operation. Errors come back as
/// [`storage::StoreError`] and are shaped into envelopes by the router.
#[async_trait]
pub trait StoreProvider: Send + Sync + 'static {
    /// Ensure the root exists and return it.
    async fn init(&self) -> StoreResult<PathBuf>;

    /// The root directory, without touching the filesystem.
    fn root_path(&self) -> PathBuf;

    /// Create or fully replace a document.
    async fn write(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        payload: &Value,
        encoding: Encoding,
    ) -> StoreResult<()>;

    /// Store a document under a newly allocated ID.
    async fn add(
        &self,
        collection: &CollectionName,
        payload: Value,
        encoding: Encoding,
    ) -> StoreResult<DocumentId>;

    /// Read a document.
    async fn read(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        encoding: Encoding,
    ) -> StoreResult<Value>;

    /// Remove a document.
    async fn delete(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        encoding: Encoding,
    ) -> StoreResult<()>;

    /// All structured documents in a collection.
    async fn list(&self, collection: &CollectionName) -> StoreResult<Vec<Value>>;

    /// Whether a document exists.
    async fn exists(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        encoding: Encoding,
    ) -> StoreResult<bool>;

    /// Structured documents matching a filter.
    async fn search(&self, collection: &CollectionName, filter: &Filter) -> StoreResult<Vec<Value>>;
}

#[async_trait]
impl StoreProvider for DocumentStore {
    async fn init(&self) -> StoreResult<PathBuf> {
        DocumentStore::init(self).await
    }

    fn root_path(&self) -> PathBuf {
        self.root().to_path_buf()
    }

    async fn write(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        payload: &Value,
        encoding: Encoding,
    ) -> StoreResult<()> {
        DocumentStore::write(self, collection, id, payload, encoding).await
    }

    async fn add(
        &self,
        collection: &CollectionName,
        payload: Value,
        encoding: Encoding,
    ) -> StoreResult<DocumentId> {
        DocumentStore::add(self, collection, payload, encoding).await
    }

    async fn read(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        encoding: Encoding,
    ) -> StoreResult<Value> {
        DocumentStore::read(self, collection, id, encoding).await
    }

    async fn delete(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        encoding: Encoding,
    ) -> StoreResult<()> {
        DocumentStore::delete(self, collection, id, encoding).await
    }

    async fn list(&self, collection: &CollectionName) -> StoreResult<Vec<Value>> {
        DocumentStore::list(self, collection).await
    }

    async fn exists(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        encoding: Encoding,
    ) -> StoreResult<bool> {
        DocumentStore::exists(self, collection, id, encoding).await
    }

    async fn search(&self, collection: &CollectionName, filter: &Filter) -> StoreResult<Vec<Value>> {
        DocumentStore::search(self, collection, filter).await
    }
}

// Lets `Arc<dyn StoreProvider>` be passed where a concrete `S: StoreProvider` is expected
#[async_trait]
impl StoreProvider for std::sync::Arc<dyn StoreProvider> {
    async fn init(&self) -> StoreResult<PathBuf> {
        (**self).init().await
    }

    fn root_path(&self) -> PathBuf {
        (**self).root_path()
    }

    async fn write(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        payload: &Value,
        encoding: Encoding,
    ) -> StoreResult<()> {
        (**self).write(collection, id, payload, encoding).await
    }

    async fn add(
        &self,
        collection: &CollectionName,
        payload: Value,
        encoding: Encoding,
    ) -> StoreResult<DocumentId> {
        (**self).add(collection, payload, encoding).await
    }

    async fn read(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        encoding: Encoding,
    ) -> StoreResult<Value> {
        (**self).read(collection, id, encoding).await
    }

    async fn delete(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        encoding: Encoding,
    ) -> StoreResult<()> {
        (**self).delete(collection, id, encoding).await
    }

    async fn list(&self, collection: &CollectionName) -> StoreResult<Vec<Value>> {
        (**self).list(collection).await
    }

    async fn exists(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        encoding: Encoding,
    ) -> StoreResult<bool> {
        (**self).exists(collection, id, encoding).await
    }

    async fn search(&self, collection: &CollectionName, filter: &Filter) -> StoreResult<Vec<Value>> {
        (**self).search(collection, filter).await
    }
}
