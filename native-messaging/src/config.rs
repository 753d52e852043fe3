//! Configuration management for the native messaging host.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use storage::{StoreConfig, DEFAULT_APP_NAME};

/// Default maximum frame size (1 MiB, the browser's host-to-extension limit).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1_048_576;

/// Largest frame the protocol accepts in either direction (64 MiB).
pub const HARD_MAX_MESSAGE_SIZE: usize = 64 * 1_048_576;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Configuration for the native messaging host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NativeMessagingConfig {
    /// Maximum message size in bytes
    pub max_message_size: usize,

    /// Enable request/response logging
    pub enable_logging: bool,

    /// Log level for the host
    pub log_level: String,

    /// Enable development mode features
    pub dev_mode: bool,

    /// Where the document store lives
    pub store: StoreSection,
}

/// Store location settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Application name used to derive the default root
    pub app_name: String,

    /// Explicit root directory; overrides the derived one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}

impl Default for NativeMessagingConfig {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            enable_logging: true,
            log_level: "info".to_string(),
            dev_mode: false,
            store: StoreSection::default(),
        }
    }
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            root: None,
        }
    }
}

impl StoreSection {
    /// Resolve the store configuration, consulting the environment only
    /// when no explicit root is set.
    pub fn to_store_config(&self) -> StoreConfig {
        match &self.root {
            Some(root) => StoreConfig::with_root(&self.app_name, root),
            None => StoreConfig::from_env(&self.app_name),
        }
    }
}

impl NativeMessagingConfig {
    /// Load configuration from a file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file (JSON or TOML)
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let config = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::from_str(&content)?
        } else {
            // Default to JSON
            serde_json::from_str(&content)?
        };

        Ok(config)
    }

    /// Save configuration to a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();

        let content = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::to_string_pretty(self)?
        } else {
            serde_json::to_string_pretty(self)?
        };

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_message_size == 0 {
            return Err(anyhow::anyhow!("max_message_size must be greater than 0"));
        }

        if self.max_message_size > HARD_MAX_MESSAGE_SIZE {
            return Err(anyhow::anyhow!(
                "max_message_size cannot exceed {} bytes",
                HARD_MAX_MESSAGE_SIZE
            ));
        }

        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(anyhow::anyhow!(
                "log_level must be one of {}, got '{}'",
                LOG_LEVELS.join(", "),
                self.log_level
            ));
        }

        common::validate_name("store.app_name", &self.store.app_name)?;

        if let Some(root) = &self.store.root {
            if root.as_os_str().is_empty() {
                return Err(anyhow::anyhow!("store.root cannot be empty"));
            }
        }

        Ok(())
    }
}
