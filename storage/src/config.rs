use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application name used when none is configured.
pub const DEFAULT_APP_NAME: &str = "docstore";

/// Configuration for a [`DocumentStore`](crate::DocumentStore).
///
/// Built once at startup and handed to the store; the root never changes
/// for the lifetime of the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Application name, used to derive the default root
    pub app_name: String,

    /// Directory holding every collection
    pub root: PathBuf,
}

impl StoreConfig {
    /// Resolve the root from the environment for `app_name`.
    pub fn from_env(app_name: impl Into<String>) -> Self {
        let app_name = app_name.into();
        let root = common::platform::resolve_root(&app_name);
        Self { app_name, root }
    }

    /// Use an explicit root directory.
    pub fn with_root(app_name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            app_name: app_name.into(),
            root: root.into(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::from_env(DEFAULT_APP_NAME)
    }
}
