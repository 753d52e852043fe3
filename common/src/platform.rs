//! Platform-specific utilities for the store root directory.
//!
//! Provides cross-platform resolution of the private directory that holds
//! every collection for one installation.

use std::env;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the resolved root.
pub const ROOT_ENV_VAR: &str = "DOCSTORE_ROOT";

/// Resolve the store root for an application.
///
/// Pure function of the environment:
/// 1. `$DOCSTORE_ROOT` when set and non-empty
/// 2. the platform data directory, e.g.
///    - **Windows**: `%APPDATA%\<app_name>\store\`
///    - **macOS**: `~/Library/Application Support/<app_name>/store/`
///    - **Linux**: `$XDG_DATA_HOME/<app_name>/store/` or `~/.local/share/<app_name>/store/`
/// 3. `./<app_name>/store` as a last resort
///
/// # Examples
///
/// ```
/// use common::platform::resolve_root;
///
/// let root = resolve_root("docstore");
/// assert!(root.ends_with("store") || std::env::var_os("DOCSTORE_ROOT").is_some());
/// ```
pub fn resolve_root(app_name: &str) -> PathBuf {
    if let Some(explicit) = env::var_os(ROOT_ENV_VAR).filter(|v| !v.is_empty()) {
        let root = PathBuf::from(explicit);
        tracing::debug!(root = %root.display(), "Store root taken from {}", ROOT_ENV_VAR);
        return root;
    }

    let base = dirs::data_dir().unwrap_or_else(|| {
        tracing::warn!("No platform data directory; falling back to the working directory");
        PathBuf::from(".")
    });
    base.join(app_name).join("store")
}

/// Ensure a directory exists, creating it and its parents if necessary.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
///
/// # Examples
///
/// ```no_run
/// use common::platform::{resolve_root, ensure_directory};
///
/// let root = resolve_root("docstore");
/// ensure_directory(&root)?;
/// # Ok::<(), std::io::Error>(())
/// ```
pub fn ensure_directory(path: &Path) -> std::io::Result<()> {
    // create_dir_all already tolerates an existing directory
    std::fs::create_dir_all(path)
}
