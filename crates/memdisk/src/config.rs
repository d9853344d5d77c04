//! Memory disk configuration.
//!
//! Configs are plain serde structs so they can be embedded in a larger
//! storage config or loaded on their own from TOML:
//!
//! ```toml
//! name = "scratch"
//! capacity = 1048576
//! keep_free_bytes = 4096
//! enforce_read_only = true
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name used when none is configured.
pub const DEFAULT_DISK_NAME: &str = "memory";

/// Errors from loading a config.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// TOML could not be parsed into a config.
    #[error("invalid memory disk config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Parsed, but the values do not make sense together.
    #[error("invalid memory disk config: {0}")]
    Invalid(String),
}

/// Configuration for a memory disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryDiskConfig {
    /// Disk name, also used in the `memory://<name>/` display path.
    pub name: String,

    /// Capacity in bytes. `None` means unbounded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u64>,

    /// Bytes subtracted from available space.
    pub keep_free_bytes: u64,

    /// Refuse writes and truncates on files marked read-only.
    pub enforce_read_only: bool,
}

impl Default for MemoryDiskConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_DISK_NAME.to_string(),
            capacity: None,
            keep_free_bytes: 0,
            enforce_read_only: false,
        }
    }
}

impl MemoryDiskConfig {
    /// Create a default config with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Parse a config from a TOML table.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::Invalid("name must not be empty".into()));
        }
        if self.name.contains('/') {
            return Err(ConfigError::Invalid(format!(
                "name must not contain '/': {}",
                self.name
            )));
        }
        if let Some(capacity) = self.capacity {
            if self.keep_free_bytes > capacity {
                return Err(ConfigError::Invalid(format!(
                    "keep_free_bytes ({}) exceeds capacity ({})",
                    self.keep_free_bytes, capacity
                )));
            }
        }
        Ok(())
    }

    /// Set a capacity limit.
    pub fn with_capacity(mut self, bytes: u64) -> Self {
        self.capacity = Some(bytes);
        self
    }

    /// Set the bytes kept free.
    pub fn with_keep_free_bytes(mut self, bytes: u64) -> Self {
        self.keep_free_bytes = bytes;
        self
    }

    /// Enable or disable read-only enforcement.
    pub fn with_enforce_read_only(mut self, enforce: bool) -> Self {
        self.enforce_read_only = enforce;
        self
    }
}
