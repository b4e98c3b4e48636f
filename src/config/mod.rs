//! Configuration for TempLab
//!
//! Runtime configuration is a single TOML file with sections for the
//! serial link, the measurement engine, and the plot display. The file
//! lives in the platform-appropriate config location:
//! - **Linux**: `~/.config/dev.templab/config.toml`
//! - **macOS**: `~/Library/Application Support/dev.templab/config.toml`
//! - **Windows**: `%APPDATA%\dev.templab\config.toml`
//!
//! Every field has a default, so a partial file (or none at all) works.
//!
//! # Example
//!
//! ```ignore
//! use templab::config::AppConfig;
//!
//! let config = AppConfig::load_or_default();
//! println!("measuring for {}s", config.measurement.duration_s);
//! ```

use crate::error::{Result, TempLabError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for config directories
pub const APP_ID: &str = "dev.templab";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Get the application config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID))
}

/// Get the path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join(CONFIG_FILE))
}

/// Ensure the config directory exists
pub fn ensure_config_dir() -> Result<PathBuf> {
    let dir = config_dir()
        .ok_or_else(|| TempLabError::Config("Could not determine config directory".to_string()))?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            TempLabError::Config(format!("Failed to create config directory: {}", e))
        })?;
    }

    Ok(dir)
}

// ==================== Serial ====================

/// Serial link configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Baud rate for the device link
    pub baud_rate: u32,

    /// How long to wait for the device hello after opening the port
    pub handshake_timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            handshake_timeout_ms: 3000,
        }
    }
}

// ==================== Measurement ====================

/// Measurement engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasurementConfig {
    /// Planned measurement length in seconds
    pub duration_s: f64,

    /// Silence on the data stream longer than this is a stall
    pub no_data_timeout_s: f64,

    /// Watchdog tick period (also the progress update cadence)
    pub watchdog_period_ms: u64,

    /// Whether a stall ends the measurement instead of only reporting it
    pub auto_stop_on_stall: bool,
}

impl Default for MeasurementConfig {
    fn default() -> Self {
        Self {
            duration_s: 10.0,
            no_data_timeout_s: 5.0,
            watchdog_period_ms: 100,
            auto_stop_on_stall: false,
        }
    }
}

// ==================== Display ====================

/// Plot display configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Width of the sliding time window in seconds
    pub time_window_s: f64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { time_window_s: 60.0 }
    }
}

// ==================== App Config ====================

/// Top-level application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub serial: SerialConfig,
    pub measurement: MeasurementConfig,
    pub display: DisplayConfig,
}

impl AppConfig {
    /// Load configuration from an explicit path
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            TempLabError::Config(format!(
                "Failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        toml::from_str(&content)
            .map_err(|e| TempLabError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load from the default location
    pub fn load() -> Result<Self> {
        let path = config_path()
            .ok_or_else(|| TempLabError::Config("Could not determine config path".to_string()))?;
        Self::load_from(path)
    }

    /// Load from the default location, falling back to defaults
    pub fn load_or_default() -> Self {
        match config_path() {
            Some(path) if path.exists() => Self::load().unwrap_or_else(|e| {
                tracing::warn!("Failed to load config, using defaults: {}", e);
                Self::default()
            }),
            _ => Self::default(),
        }
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| TempLabError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path.as_ref(), content).map_err(|e| {
            TempLabError::Config(format!(
                "Failed to write {}: {}",
                path.as_ref().display(),
                e
            ))
        })
    }

    /// Save to the default location, creating the directory if needed
    pub fn save(&self) -> Result<()> {
        let dir = ensure_config_dir()?;
        self.save_to(dir.join(CONFIG_FILE))
    }
}
