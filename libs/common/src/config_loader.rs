//! Configuration loading
//!
//! Priority (lowest to highest): built-in defaults, YAML file, `CATSYNC_*`
//! environment variables, then whatever the CLI overrides on top.

use crate::logging::LogFormat;
use crate::sqlite::SqliteSettings;
use errors::CatalogError;
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Environment variable prefix, e.g. `CATSYNC_DATABASE_URL`
pub const ENV_PREFIX: &str = "CATSYNC_";

/// Config file read from the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "catsync.yaml";

pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/catalog.db";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Store connection string
    pub database_url: String,
    /// Directory holding `Products/` (or the `Products/` directory itself)
    pub source_root: PathBuf,
    /// Concurrent unit transactions per run
    pub workers: usize,
    /// Per-unit transaction timeout
    pub unit_timeout_secs: u64,
    /// Age after which a leftover run lock is taken over
    pub lock_stale_secs: u64,
    pub busy_timeout_secs: u64,
    pub max_connections: u32,
    pub log_level: String,
    pub log_format: LogFormat,
    /// Also write daily log files here
    pub log_dir: Option<PathBuf>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            source_root: PathBuf::from("."),
            workers: 4,
            unit_timeout_secs: 30,
            lock_stale_secs: 900,
            busy_timeout_secs: 5,
            max_connections: 4,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            log_dir: None,
        }
    }
}

impl CatalogConfig {
    /// Load from defaults, an optional YAML file and the environment
    ///
    /// An explicitly named file must exist; the default `catsync.yaml` is
    /// optional.
    pub fn load(config_file: Option<&Path>) -> Result<Self, CatalogError> {
        let file = match config_file {
            Some(path) => {
                if !path.exists() {
                    return Err(errors::config_error!(
                        "config file not found: {}",
                        path.display()
                    ));
                }
                path.to_path_buf()
            },
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        debug!("Loading configuration (file: {})", file.display());

        Self::from_figment(
            Figment::from(Serialized::defaults(Self::default()))
                .merge(Yaml::file(file))
                .merge(Env::prefixed(ENV_PREFIX)),
        )
    }

    /// Extract and check a configuration from an arbitrary provider stack
    pub fn from_figment(figment: Figment) -> Result<Self, CatalogError> {
        let config: Self = figment
            .extract()
            .map_err(|e| errors::config_error!("failed to load configuration: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.database_url.trim().is_empty() {
            return Err(errors::config_error!("database_url must not be empty"));
        }
        if self.workers == 0 {
            return Err(errors::config_error!("workers must be at least 1"));
        }
        if self.max_connections == 0 {
            return Err(errors::config_error!("max_connections must be at least 1"));
        }
        if self.unit_timeout_secs == 0 {
            return Err(errors::config_error!("unit_timeout_secs must be at least 1"));
        }
        Ok(())
    }

    /// Worker count capped by the pool size
    pub fn effective_workers(&self) -> usize {
        self.workers.min(self.max_connections as usize).max(1)
    }

    pub fn unit_timeout(&self) -> Duration {
        Duration::from_secs(self.unit_timeout_secs)
    }

    pub fn lock_stale_after(&self) -> Duration {
        Duration::from_secs(self.lock_stale_secs)
    }

    pub fn sqlite_settings(&self) -> SqliteSettings {
        SqliteSettings {
            max_connections: self.max_connections,
            busy_timeout: Duration::from_secs(self.busy_timeout_secs),
            ..SqliteSettings::default()
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    fn defaults() -> Figment {
        Figment::from(Serialized::defaults(CatalogConfig::default()))
    }

    #[test]
    fn defaults_are_valid() {
        let config = CatalogConfig::from_figment(defaults()).unwrap();
        assert_eq!(config, CatalogConfig::default());
        assert_eq!(config.effective_workers(), 4);
    }

    #[test]
    fn yaml_overrides_defaults() {
        let yaml = r#"
database_url: "sqlite://var/catalog.db"
source_root: "/srv/catalog"
workers: 16
max_connections: 2
log_format: json
"#;
        let config = CatalogConfig::from_figment(defaults().merge(Yaml::string(yaml))).unwrap();
        assert_eq!(config.database_url, "sqlite://var/catalog.db");
        assert_eq!(config.source_root, PathBuf::from("/srv/catalog"));
        assert_eq!(config.log_format, LogFormat::Json);
        // capped by the pool
        assert_eq!(config.effective_workers(), 2);
        // untouched keys keep their defaults
        assert_eq!(config.unit_timeout_secs, 30);
    }

    #[test]
    fn zero_workers_rejected() {
        let err = CatalogConfig::from_figment(defaults().merge(Yaml::string("workers: 0")))
            .unwrap_err();
        assert!(err.to_string().contains("workers must be at least 1"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.yaml");
        assert!(CatalogConfig::load(Some(&missing)).is_err());
    }

    #[test]
    fn explicit_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("catsync.yaml");
        std::fs::write(&file, "lock_stale_secs: 60\n").unwrap();

        let config = CatalogConfig::load(Some(&file)).unwrap();
        assert_eq!(config.lock_stale_after(), Duration::from_secs(60));
    }
}
