//! Common types shared across the document store crates.
//!
//! This crate sits at the bottom of the dependency hierarchy:
//! - Has NO dependencies on other workspace crates
//! - Provides the error taxonomy used by `storage` and the request boundary
//! - Provides validated newtypes for collection names and document IDs

pub mod errors;
pub mod platform;

pub use errors::{ErrorKind, StoreError, StoreResult};

use serde::{Deserialize, Serialize};

/// Longest accepted collection name or document ID, in bytes.
pub const MAX_NAME_LEN: usize = 128;

/// Check that `value` is usable as a single path component.
///
/// Names must be non-empty, at most [`MAX_NAME_LEN`] bytes, use only ASCII
/// alphanumerics, `-`, `_` and `.`, and must not start with `.`. Dot-prefixed
/// names are reserved for store metadata and temp files.
pub fn validate_name(field: &str, value: &str) -> StoreResult<()> {
    if value.is_empty() {
        return Err(StoreError::validation(field, "cannot be empty"));
    }

    if value.len() > MAX_NAME_LEN {
        return Err(StoreError::validation(
            field,
            format!("must be at most {} bytes, got {}", MAX_NAME_LEN, value.len()),
        ));
    }

    if value.starts_with('.') {
        return Err(StoreError::validation(field, "cannot start with '.'"));
    }

    if let Some(bad) = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(StoreError::validation(
            field,
            format!("contains invalid character {:?}", bad),
        ));
    }

    Ok(())
}

/// Name of a collection; maps to one directory under the store root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CollectionName(String);

impl CollectionName {
    /// Validate and wrap a collection name.
    pub fn parse(name: impl Into<String>) -> StoreResult<Self> {
        let name = name.into();
        validate_name("collection", &name)?;
        Ok(Self(name))
    }

    /// Get the inner string reference
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CollectionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for CollectionName {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<CollectionName> for String {
    fn from(name: CollectionName) -> Self {
        name.0
    }
}

/// Identifier of a document, unique within its collection.
///
/// Callers hold IDs as strings or as numbers. Both spellings are accepted on
/// the wire and normalize to the same decimal text, so `7` and `"7"` address
/// one document. IDs always serialize as strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawId", into = "String")]
pub struct DocumentId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Unsigned(u64),
}

impl DocumentId {
    /// Validate and wrap a document ID.
    pub fn parse(id: impl Into<String>) -> StoreResult<Self> {
        let id = id.into();
        validate_name("id", &id)?;
        Ok(Self(id))
    }

    /// ID produced by the allocator counter.
    pub fn from_counter(value: u64) -> Self {
        Self(value.to_string())
    }

    /// Numeric reading of this ID, if it is a plain decimal number.
    pub fn as_number(&self) -> Option<u64> {
        if self.0.chars().all(|c| c.is_ascii_digit()) {
            self.0.parse().ok()
        } else {
            None
        }
    }

    /// Get the inner string reference
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<RawId> for DocumentId {
    type Error = StoreError;

    fn try_from(raw: RawId) -> Result<Self, Self::Error> {
        match raw {
            RawId::Text(text) => Self::parse(text),
            RawId::Unsigned(n) => Ok(Self::from_counter(n)),
        }
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.0
    }
}
