//! Configuration management for Sema.
//!
//! Configuration is loaded from multiple sources with the following priority:
//! 1. Environment variables (highest priority)
//! 2. Project-local `sema.toml` file
//! 3. User config `~/.config/sema/config.toml`
//! 4. Built-in defaults (lowest priority)

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

mod defaults;

pub use defaults::*;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Catalog source configuration.
    pub catalog: CatalogConfig,

    /// Shared graph store configuration.
    pub store: StoreConfig,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Searches for config in order:
    /// 1. `./sema.toml` (project local)
    /// 2. `~/.config/sema/config.toml` (user config)
    /// 3. Falls back to defaults
    pub fn load() -> Result<Self, ConfigError> {
        if Path::new("sema.toml").exists() {
            return Self::from_file("sema.toml");
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("sema").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        let mut config = Self::default();
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("SEMA_CATALOG_PATH") {
            self.catalog.path = path;
        }
        if let Ok(path) = std::env::var("SEMA_STORE_PATH") {
            self.store.path = path;
        }
        if let Ok(size) = std::env::var("SEMA_STORE_BATCH_SIZE") {
            if let Ok(n) = size.parse() {
                self.store.batch_size = n;
            }
        }
        if let Ok(secs) = std::env::var("SEMA_IO_TIMEOUT_SECS") {
            if let Ok(n) = secs.parse() {
                self.catalog.timeout_secs = Some(n);
                self.store.timeout_secs = Some(n);
            }
        }
    }
}

/// Catalog source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Path of the catalog database.
    pub path: String,

    /// Namespace holding the catalog relations.
    pub namespace: String,

    /// Database holding the catalog relations.
    pub database: String,

    /// Deadline applied to each catalog read, in seconds.
    pub timeout_secs: Option<u64>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_CATALOG_PATH.to_string(),
            namespace: DEFAULT_CATALOG_NAMESPACE.to_string(),
            database: DEFAULT_CATALOG_DATABASE.to_string(),
            timeout_secs: None,
        }
    }
}

impl CatalogConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Shared graph store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path of the graph store database.
    pub path: String,

    /// Namespace holding the stored graphs.
    pub namespace: String,

    /// Database holding the stored graphs.
    pub database: String,

    /// Records per persist batch.
    pub batch_size: usize,

    /// Deadline applied to each store operation, in seconds.
    pub timeout_secs: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_STORE_PATH.to_string(),
            namespace: DEFAULT_STORE_NAMESPACE.to_string(),
            database: DEFAULT_STORE_DATABASE.to_string(),
            batch_size: DEFAULT_WRITE_BATCH_SIZE,
            timeout_secs: None,
        }
    }
}

impl StoreConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.catalog.path, DEFAULT_CATALOG_PATH);
        assert_eq!(config.store.batch_size, DEFAULT_WRITE_BATCH_SIZE);
        assert!(config.store.timeout().is_none());
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
[catalog]
path = "/data/catalog.db"
timeout_secs = 30

[store]
path = "/data/graphs.db"
batch_size = 100
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.catalog.path, "/data/catalog.db");
        assert_eq!(config.catalog.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.store.batch_size, 100);
        assert_eq!(config.store.database, DEFAULT_STORE_DATABASE);
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[catalog]"));
        assert!(toml_str.contains("[store]"));
    }
}
