//! Error taxonomy for document store operations.
//!
//! Four kinds of failure exist below the request boundary. `NotFound` is an
//! expected branch outcome; the other three describe something the caller
//! (or an operator) has to look at.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors produced by the storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested document does not exist.
    #[error("not found")]
    NotFound {
        /// Collection that was searched
        collection: String,
        /// Identifier that was not present
        id: String,
    },

    /// Permission, disk, or path failure from the filesystem.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// Path the operation was touching
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Stored content could not be parsed back into a structured value.
    #[error("Failed to decode document '{id}' in collection '{collection}': {message}")]
    Decode {
        /// Collection holding the corrupt document
        collection: String,
        /// Identifier of the corrupt document
        id: String,
        /// Parser message
        message: String,
    },

    /// Malformed arguments.
    #[error("Validation error in field '{field}': {message}")]
    Validation {
        /// Argument that failed validation
        field: String,
        /// What was wrong with it
        message: String,
    },
}

/// Coarse classification of a [`StoreError`], used for logging and wire codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// See [`StoreError::NotFound`]
    NotFound,
    /// See [`StoreError::Io`]
    Io,
    /// See [`StoreError::Decode`]
    Decode,
    /// See [`StoreError::Validation`]
    Validation,
}

impl StoreError {
    /// Create a not-found error.
    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Wrap an I/O error with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a decode error.
    pub fn decode(
        collection: impl Into<String>,
        id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Decode {
            collection: collection.into(),
            id: id.into(),
            message: message.into(),
        }
    }

    /// Create a validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Io { .. } => ErrorKind::Io,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::Validation { .. } => ErrorKind::Validation,
        }
    }

    /// True for the expected not-found branch.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
