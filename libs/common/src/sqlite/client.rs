use errors::ConnectionError;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    SqlitePool as SqlxSqlitePool,
};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

pub type SqlitePool = SqlxSqlitePool;

/// Pool and connection tuning
#[derive(Debug, Clone)]
pub struct SqliteSettings {
    pub max_connections: u32,
    /// How long a writer waits on a locked database before failing
    pub busy_timeout: Duration,
    pub acquire_timeout: Duration,
    /// Create the database file (not its directory) when missing
    pub create_if_missing: bool,
}

impl Default for SqliteSettings {
    fn default() -> Self {
        Self {
            max_connections: 4,
            busy_timeout: Duration::from_secs(5),
            acquire_timeout: Duration::from_secs(10),
            create_if_missing: true,
        }
    }
}

/// Filesystem path of a `sqlite:` URL, `None` for in-memory databases
pub fn database_file(url: &str) -> Option<PathBuf> {
    let rest = url.strip_prefix("sqlite://").or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path == ":memory:" {
        return None;
    }
    Some(PathBuf::from(path))
}

#[derive(Clone)]
pub struct SqliteClient {
    pool: SqlitePool,
    target: String,
}

impl SqliteClient {
    /// Open a pool against a `sqlite:` connection string
    ///
    /// Fails with [`ConnectionError`] when the URL is malformed or the database
    /// cannot be opened. Nothing is written to the store here.
    pub async fn connect(url: &str, settings: &SqliteSettings) -> Result<Self, ConnectionError> {
        let fail = |reason: String| ConnectionError {
            target: url.to_string(),
            reason,
        };

        if !url.starts_with("sqlite:") {
            return Err(fail(
                "invalid connection string: expected a sqlite: URL".to_string(),
            ));
        }

        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| fail(format!("invalid connection string: {}", e)))?
            .journal_mode(SqliteJournalMode::Wal) // Enable WAL for concurrent reads
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(settings.busy_timeout)
            .foreign_keys(true) // ON DELETE CASCADE for alias/pattern rows
            .create_if_missing(settings.create_if_missing);

        debug!("Connecting to {}", url);

        let pool = SqlitePoolOptions::new()
            .max_connections(settings.max_connections.max(1))
            .acquire_timeout(settings.acquire_timeout)
            .connect_with(options)
            .await
            .map_err(|e| fail(e.to_string()))?;

        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(|e| fail(e.to_string()))?;

        info!("SQLite store connected: {}", url);

        Ok(Self {
            pool,
            target: url.to_string(),
        })
    }

    /// Create from an existing pool
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self {
            pool,
            target: "from_pool".to_string(),
        }
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Connection string this client was opened with
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Check if database is accessible
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
