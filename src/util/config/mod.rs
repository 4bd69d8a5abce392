//! Lunar configuration system
//!
//! # Configuration lookup
//!
//! ```text
//! Priority (high -> low):
//! 1. CLI arguments
//! 2. Explicit config file (--config)
//! 3. User-level (~/.config/lunar/config.toml)
//! 4. Default values
//! ```
//!
//! # Example file
//!
//! ```toml
//! [scheduler]
//! max_steps = 100000
//! idle_timeout_ms = 5
//!
//! [futures]
//! id_limit = 4096
//! destroy_policy = "abandon"
//!
//! [log]
//! level = "debug"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::runtime::{DestroyPolicy, SchedulerConfig};
use crate::util::logger::LogLevel;

/// Runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RuntimeConfig {
    /// Scheduler settings
    #[serde(default)]
    pub scheduler: SchedulerSection,
    /// Future store settings
    #[serde(default)]
    pub futures: FuturesSection,
    /// Log settings
    #[serde(default)]
    pub log: LogSection,
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchedulerSection {
    /// Step budget per run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<u64>,
    /// Wait slice for remote submissions, in milliseconds
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
}

fn default_idle_timeout_ms() -> u64 {
    1
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            max_steps: None,
            idle_timeout_ms: 1,
        }
    }
}

/// Future store configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FuturesSection {
    /// Exclusive bound of the identifier space
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_limit: Option<u64>,
    /// What destroying a pending future does
    #[serde(default)]
    pub destroy_policy: DestroyPolicy,
}

/// Log configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LogSection {
    /// Minimum level
    #[serde(default)]
    pub level: LogLevel,
}

impl RuntimeConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Render as pretty TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// The scheduler settings this configuration describes
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            max_steps: self.scheduler.max_steps,
            idle_timeout: Duration::from_millis(self.scheduler.idle_timeout_ms),
            id_limit: self.futures.id_limit,
            destroy_policy: self.futures.destroy_policy,
        }
    }
}

/// Get the user config directory
pub fn get_config_dir() -> Option<PathBuf> {
    // Try XDG config directory on Unix
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config).join("lunar"));
    }

    // Fallback to ~/.config/lunar
    if let Ok(home) = std::env::var("HOME") {
        return Some(PathBuf::from(home).join(".config").join("lunar"));
    }

    // On Windows, try %APPDATA%
    if let Ok(appdata) = std::env::var("APPDATA") {
        return Some(PathBuf::from(appdata).join("lunar"));
    }

    None
}

/// Get the user config file path (~/.config/lunar/config.toml)
pub fn get_config_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join("config.toml"))
}

/// Load configuration from a file
pub fn load_config_file(path: &Path) -> Result<RuntimeConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    RuntimeConfig::from_toml_str(&content)
}

/// Load configuration
///
/// An explicit path must exist. Without one, the user-level file is used if
/// present, else defaults.
pub fn load_config(path: Option<&Path>) -> Result<RuntimeConfig, ConfigError> {
    if let Some(path) = path {
        return load_config_file(path);
    }

    match get_config_path() {
        Some(path) if path.exists() => load_config_file(&path),
        _ => Ok(RuntimeConfig::default()),
    }
}

/// Save configuration to a file, creating parent directories
pub fn save_config(
    config: &RuntimeConfig,
    path: &Path,
) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            fs::create_dir_all(dir)?;
        }
    }

    fs::write(path, config.to_toml_string()?)?;
    Ok(())
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Config serialize error: {0}")]
    SerializeError(#[from] toml::ser::Error),
}
