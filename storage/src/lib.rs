//! Embedded document storage on the local filesystem.
//!
//! Documents live one per file below a single root directory, grouped into
//! collections (one directory each). Structured documents are pretty-printed
//! JSON; binary documents are raw bytes that cross the API as base64 text.
//!
//! # Architecture
//!
//! - [`paths`] maps collections and IDs onto the filesystem
//! - [`codec`] converts between wire values and stored bytes and performs
//!   atomic replace
//! - [`allocator`] hands out never-reused IDs from a persisted counter
//! - [`locks`] serializes writers to one document
//! - [`query`] lists collections and evaluates declarative filters
//! - [`DocumentStore`] ties these together
//!
//! # Concurrency Safety
//!
//! `DocumentStore` is thread-safe and is meant to be shared in an `Arc`
//! across tokio tasks. Only one process may own a root at a time.
//!
//! ```no_run
//! use std::sync::Arc;
//! use serde_json::json;
//! use storage::{CollectionName, DocumentId, DocumentStore, Encoding, StoreConfig};
//!
//! # async fn example() -> storage::StoreResult<()> {
//! let store = Arc::new(DocumentStore::open(StoreConfig::default()).await?);
//! let patients = CollectionName::parse("patients")?;
//! let id = DocumentId::parse("1")?;
//!
//! store.write(&patients, &id, &json!({"name": "Amina"}), Encoding::Structured).await?;
//! let doc = store.read(&patients, &id, Encoding::Structured).await?;
//! assert_eq!(doc["name"], "Amina");
//! # Ok(())
//! # }
//! ```

pub mod allocator;
pub mod codec;
mod config;
pub mod locks;
pub mod paths;
pub mod query;
mod store;

pub use codec::Encoding;
pub use config::{StoreConfig, DEFAULT_APP_NAME};
pub use paths::StorePaths;
pub use query::{Clause, Filter, Operator};
pub use store::DocumentStore;

// Re-export commonly used types for convenience
pub use common::{CollectionName, DocumentId, ErrorKind, StoreError, StoreResult};
