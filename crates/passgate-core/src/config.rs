//! Configuration types and loading for passgate.
//!
//! Configuration is loaded from `~/.config/passgate/config.toml`.
//!
//! # Error Handling
//!
//! - If the config file doesn't exist, default values are returned.
//! - If the config file exists but is invalid, an error is returned (fail fast).
//!
//! # Example Configuration
//!
//! ```toml
//! [confirm]
//! no_confirm = false          # skip recipient confirmation
//!
//! [clipboard]
//! timeout = 45                # seconds until the copied secret is cleared
//!
//! [gpg]
//! binary = "gpg2"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Main configuration struct.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Confirmation behaviour.
    pub confirm: ConfirmConfig,
    /// Clipboard guard settings.
    pub clipboard: ClipboardConfig,
    /// Key ring backend settings.
    pub gpg: GpgConfig,
}

/// Configuration for confirmation prompts.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ConfirmConfig {
    /// Skip recipient confirmation entirely (default: false).
    pub no_confirm: bool,
}

/// Configuration for the clipboard guard.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClipboardConfig {
    /// Seconds before a copied secret is cleared (default: 45).
    pub timeout: u64,
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        Self { timeout: 45 }
    }
}

/// Configuration for the gpg key ring.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GpgConfig {
    /// Name or path of the gpg executable (default: `gpg`).
    pub binary: String,
}

impl Default for GpgConfig {
    fn default() -> Self {
        Self {
            binary: "gpg".to_string(),
        }
    }
}

impl Config {
    /// Returns the default configuration file path.
    ///
    /// Returns `~/.config/passgate/config.toml` using `dirs::config_dir()`,
    /// or `None` if the config directory cannot be determined.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("passgate").join("config.toml"))
    }

    /// Load configuration from the default path.
    ///
    /// - Returns `Ok(Config::default())` if no config file exists.
    /// - Returns `Err` if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific path.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }
}
