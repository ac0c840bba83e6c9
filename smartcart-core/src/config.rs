//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/smartcart/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/smartcart/` (~/.config/smartcart/)
//! - Data: `$XDG_DATA_HOME/smartcart/` (~/.local/share/smartcart/)
//! - State/Logs: `$XDG_STATE_HOME/smartcart/` (~/.local/state/smartcart/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Largest batch a single import transaction may hold.
pub const MAX_BATCH_SIZE: usize = 500;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Record store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Analytics configuration
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Record store configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Override for the SQLite store location
    pub path: Option<PathBuf>,

    /// Records written per import transaction
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            batch_size: default_batch_size(),
        }
    }
}

impl StoreConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(Error::Config(format!(
                "store.batch_size must be between 1 and {}",
                MAX_BATCH_SIZE
            )));
        }
        Ok(())
    }
}

fn default_batch_size() -> usize {
    100
}

/// Analytics configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AnalyticsConfig {
    /// Items with stock strictly below this are reported as low stock
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i64,

    /// Days covered when the CLI is run without `--from`/`--to`
    #[serde(default = "default_range_days")]
    pub default_range_days: u32,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            low_stock_threshold: default_low_stock_threshold(),
            default_range_days: default_range_days(),
        }
    }
}

fn default_low_stock_threshold() -> i64 {
    10
}

fn default_range_days() -> u32 {
    7
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.store.validate()?;
        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/smartcart/config.toml` (~/.config/smartcart/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("smartcart").join("config.toml")
    }

    /// Returns the data directory path (for the SQLite store)
    ///
    /// `$XDG_DATA_HOME/smartcart/` (~/.local/share/smartcart/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("smartcart")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/smartcart/` (~/.local/state/smartcart/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("smartcart")
    }

    /// Returns the default store file path
    ///
    /// `$XDG_DATA_HOME/smartcart/store.db` (~/.local/share/smartcart/store.db)
    pub fn default_store_path() -> PathBuf {
        Self::data_dir().join("store.db")
    }

    /// Store path, honoring the `[store] path` override
    pub fn store_path(&self) -> PathBuf {
        self.store
            .path
            .clone()
            .unwrap_or_else(Self::default_store_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.store.path.is_none());
        assert_eq!(config.store.batch_size, 100);
        assert_eq!(config.analytics.low_stock_threshold, 10);
        assert_eq!(config.analytics.default_range_days, 7);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[store]
path = "/tmp/smartcart-test.db"
batch_size = 50

[analytics]
low_stock_threshold = 25

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.store_path(), PathBuf::from("/tmp/smartcart-test.db"));
        assert_eq!(config.store.batch_size, 50);
        assert_eq!(config.analytics.low_stock_threshold, 25);
        assert_eq!(config.analytics.default_range_days, 7);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_store_config_validation() {
        assert!(StoreConfig::default().validate().is_ok());

        let config = StoreConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = StoreConfig {
            batch_size: MAX_BATCH_SIZE + 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_rejects_bad_batch_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[store]\nbatch_size = 0\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
