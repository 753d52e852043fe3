//! Path resolution and collection directory management.
//!
//! Layout:
//! - `<root>/<collection>/` - one directory per collection
//! - `<root>/<collection>/<id>.json` - structured documents
//! - `<root>/<collection>/<id>` - binary documents
//! - `<root>/<collection>/.next_id` - allocator counter

use std::path::{Path, PathBuf};

use common::{CollectionName, DocumentId, StoreError, StoreResult};

use crate::codec::Encoding;

/// File extension for structured documents.
pub const STRUCTURED_EXTENSION: &str = "json";

/// File name of the per-collection allocator counter.
pub const COUNTER_FILE: &str = ".next_id";

/// Maps collections and documents onto the filesystem below one root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    root: PathBuf,
}

impl StorePaths {
    /// Create a resolver for `root`. Nothing is touched on disk.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The store root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of a collection.
    pub fn collection_dir(&self, collection: &CollectionName) -> PathBuf {
        self.root.join(collection.as_str())
    }

    /// File holding a document in the given encoding.
    ///
    /// # Errors
    ///
    /// `StoreError::Validation` for a binary ID ending in `.json`: its file
    /// would be the same as a structured document's and would show up in
    /// listings.
    pub fn document_path(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        encoding: Encoding,
    ) -> StoreResult<PathBuf> {
        let dir = self.collection_dir(collection);
        match encoding {
            Encoding::Structured => Ok(dir.join(format!("{}.{}", id, STRUCTURED_EXTENSION))),
            Encoding::Binary if has_structured_extension(id.as_str()) => Err(StoreError::validation(
                "id",
                format!("binary document IDs must not end in .{}", STRUCTURED_EXTENSION),
            )),
            Encoding::Binary => Ok(dir.join(id.as_str())),
        }
    }

    /// Allocator counter file of a collection.
    pub fn counter_path(&self, collection: &CollectionName) -> PathBuf {
        self.collection_dir(collection).join(COUNTER_FILE)
    }

    /// Create the root directory if absent.
    pub async fn ensure_root(&self) -> StoreResult<&Path> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StoreError::io(&self.root, e))?;
        Ok(&self.root)
    }

    /// Create the collection directory (and the root) if absent.
    ///
    /// Idempotent: an existing directory is not an error.
    pub async fn ensure_collection(&self, collection: &CollectionName) -> StoreResult<PathBuf> {
        let dir = self.collection_dir(collection);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoreError::io(&dir, e))?;
        tracing::trace!(collection = %collection, path = %dir.display(), "Collection ready");
        Ok(dir)
    }
}

/// Case-insensitive so `a.JSON` cannot alias `a.json` on case-folding filesystems.
fn has_structured_extension(name: &str) -> bool {
    name.rsplit_once('.')
        .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case(STRUCTURED_EXTENSION))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> (CollectionName, DocumentId) {
        (
            CollectionName::parse("images").unwrap(),
            DocumentId::parse("x-ray-1").unwrap(),
        )
    }

    #[test]
    fn test_document_layout() {
        let paths = StorePaths::new("/data/store");
        let (collection, id) = names();

        assert_eq!(
            paths.document_path(&collection, &id, Encoding::Structured).unwrap(),
            PathBuf::from("/data/store/images/x-ray-1.json")
        );
        assert_eq!(
            paths.document_path(&collection, &id, Encoding::Binary).unwrap(),
            PathBuf::from("/data/store/images/x-ray-1")
        );
        assert_eq!(
            paths.counter_path(&collection),
            PathBuf::from("/data/store/images/.next_id")
        );
    }

    #[test]
    fn test_binary_ids_cannot_alias_structured_files() {
        let paths = StorePaths::new("/data/store");
        let (collection, _) = names();

        for raw in ["a.json", "scan.JSON", "a.json.json"] {
            let id = DocumentId::parse(raw).unwrap();
            let err = paths
                .document_path(&collection, &id, Encoding::Binary)
                .unwrap_err();
            assert_eq!(err.kind(), common::ErrorKind::Validation, "{}", raw);
            assert!(paths.document_path(&collection, &id, Encoding::Structured).is_ok());
        }

        let dotted = DocumentId::parse("scan.v2.png").unwrap();
        assert_eq!(
            paths.document_path(&collection, &dotted, Encoding::Binary).unwrap(),
            PathBuf::from("/data/store/images/scan.v2.png")
        );
    }

    #[tokio::test]
    async fn test_ensure_collection_creates_root_and_is_idempotent() {
        let temp = tempfile::TempDir::new().unwrap();
        let paths = StorePaths::new(temp.path().join("nested").join("root"));
        let (collection, _) = names();

        let dir = paths.ensure_collection(&collection).await.unwrap();
        assert!(dir.is_dir());
        assert!(paths.root().is_dir());

        let again = paths.ensure_collection(&collection).await.unwrap();
        assert_eq!(dir, again);
    }

    #[tokio::test]
    async fn test_ensure_collection_reports_io_failure() {
        let temp = tempfile::TempDir::new().unwrap();
        let blocker = temp.path().join("root");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let paths = StorePaths::new(&blocker);
        let (collection, _) = names();
        let err = paths.ensure_collection(&collection).await.unwrap_err();
        assert_eq!(err.kind(), common::ErrorKind::Io);
    }
}
