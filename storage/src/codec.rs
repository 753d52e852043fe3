//! Conversion between wire values and on-disk bytes.
//!
//! Structured documents cross the wire as JSON values and are stored as
//! pretty-printed JSON. Binary documents cross the wire as base64 text and
//! are stored as raw bytes; the base64 <-> bytes conversion happens here and
//! nowhere else.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;

use common::{CollectionName, DocumentId, StoreError, StoreResult};

/// Physical encoding of a document, chosen by the caller at write time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Encoding {
    /// Pretty-printed JSON in `<id>.json`
    #[default]
    Structured,
    /// Raw bytes in `<id>`
    Binary,
}

impl Encoding {
    /// Map the wire `binary` flag to an encoding.
    pub fn from_flag(binary: bool) -> Self {
        if binary {
            Self::Binary
        } else {
            Self::Structured
        }
    }
}

/// Turn a wire payload into the bytes stored on disk.
pub fn encode(payload: &Value, encoding: Encoding) -> StoreResult<Vec<u8>> {
    match encoding {
        Encoding::Structured => serde_json::to_vec_pretty(payload)
            .map_err(|e| StoreError::validation("payload", e.to_string())),
        Encoding::Binary => {
            let text = payload.as_str().ok_or_else(|| {
                StoreError::validation("payload", "binary payload must be a base64 string")
            })?;
            STANDARD
                .decode(text)
                .map_err(|e| StoreError::validation("payload", format!("invalid base64: {}", e)))
        }
    }
}

/// Turn stored bytes back into a wire value.
pub fn decode(
    collection: &CollectionName,
    id: &DocumentId,
    bytes: &[u8],
    encoding: Encoding,
) -> StoreResult<Value> {
    match encoding {
        Encoding::Structured => serde_json::from_slice(bytes)
            .map_err(|e| StoreError::decode(collection.as_str(), id.as_str(), e.to_string())),
        Encoding::Binary => Ok(Value::String(STANDARD.encode(bytes))),
    }
}

/// Read a file, mapping absence to `None`.
pub(crate) async fn read_file(path: &Path) -> StoreResult<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

/// Replace `path` with `bytes` so readers see either the old or the new
/// content, never a partial write.
///
/// Content goes to a dot-prefixed sibling first and is then renamed over the
/// target. The temp file lives in the same directory so the rename never
/// crosses filesystems.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let dir = path
        .parent()
        .ok_or_else(|| StoreError::validation("path", "document path has no parent"))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| StoreError::validation("path", "document path has no file name"))?;
    let temp = dir.join(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4().simple()));

    if let Err(e) = tokio::fs::write(&temp, bytes).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(StoreError::io(&temp, e));
    }

    if let Err(e) = tokio::fs::rename(&temp, path).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(StoreError::io(path, e));
    }

    Ok(())
}

/// Remove a file, mapping absence to `false`.
pub(crate) async fn remove_file(path: &Path) -> StoreResult<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StoreError::io(path, e)),
    }
}
