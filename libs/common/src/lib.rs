//! Shared bootstrap for the catalog tools
//!
//! Provides the pieces every command needs before it touches the catalog:
//! - logging setup
//! - layered configuration (defaults, YAML, environment)
//! - SQLite pool construction
//! - shutdown signal handling

pub mod config_loader;
pub mod logging;
pub mod shutdown;
pub mod sqlite;

pub use config_loader::{CatalogConfig, DEFAULT_CONFIG_FILE, DEFAULT_DATABASE_URL, ENV_PREFIX};
pub use logging::{LogConfig, LogFormat};
pub use sqlite::{database_file, SqliteClient, SqlitePool, SqliteSettings};

// Re-export common dependencies
pub use tokio_util::sync::CancellationToken;
