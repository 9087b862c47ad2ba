//! Store adapter
//!
//! Every write goes through a transaction scoped to one unit of work: one
//! product with its children, one filter set, or one prune deletion.

pub mod changelog;
pub mod filters;
pub mod lock;
pub mod products;
pub mod schema;

pub use changelog::{RunKind, RunRecord, RunStatus, RunTotals, StoredChange};
pub use lock::LockGuard;
pub use products::ProductRow;

use crate::reconciler::StoreSnapshot;
use serde::Serialize;
use sqlx::SqlitePool;

/// Timestamp text used for rows written from Rust; same shape as the
/// `strftime('%Y-%m-%dT%H:%M:%fZ')` defaults
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

pub(crate) fn now_timestamp() -> String {
    chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Row counts for `status`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub products: i64,
    pub active_products: i64,
    pub aliases: i64,
    pub fuzzy_patterns: i64,
    pub reject_keywords: i64,
    pub boost_keywords: i64,
}

#[derive(Debug, Clone)]
pub struct CatalogStore {
    pool: SqlitePool,
}

impl CatalogStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn init_schema(&self) -> Result<(), sqlx::Error> {
        schema::init_schema(&self.pool).await
    }

    /// Identities and hashes of everything currently stored
    /// Whether the catalog tables exist yet
    pub async fn has_schema(&self) -> Result<bool, sqlx::Error> {
        let tables: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('products', 'filter_keywords')",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(tables == 2)
    }

    pub async fn snapshot(&self) -> Result<StoreSnapshot, sqlx::Error> {
        Ok(StoreSnapshot {
            products: self.product_hashes().await?,
            filters: self.filter_hashes().await?,
        })
    }

    pub async fn counts(&self) -> Result<StoreCounts, sqlx::Error> {
        let (products, active_products): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(active), 0) FROM products",
        )
        .fetch_one(&self.pool)
        .await?;
        let aliases: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM product_aliases")
            .fetch_one(&self.pool)
            .await?;
        let fuzzy_patterns: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM product_fuzzy_patterns")
            .fetch_one(&self.pool)
            .await?;
        let (reject_keywords, boost_keywords): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(filter_type = 'reject'), 0),
                COALESCE(SUM(filter_type = 'boost'), 0)
            FROM filter_keywords
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(StoreCounts {
            products,
            active_products,
            aliases,
            fuzzy_patterns,
            reject_keywords,
            boost_keywords,
        })
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
pub(crate) mod test_support {
    use super::CatalogStore;
    use common::{SqliteClient, SqliteSettings};
    use tempfile::TempDir;

    /// A fresh file-backed store with no tables yet
    pub async fn bare_store() -> (TempDir, CatalogStore) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("catalog.db").display());
        let client = SqliteClient::connect(&url, &SqliteSettings::default())
            .await
            .unwrap();
        (dir, CatalogStore::new(client.pool().clone()))
    }

    /// A fresh file-backed store with the schema applied
    pub async fn temp_store() -> (TempDir, CatalogStore) {
        let (dir, store) = bare_store().await;
        store.init_schema().await.unwrap();
        (dir, store)
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::test_support::{bare_store, temp_store};

    #[tokio::test]
    async fn schema_presence_is_detected() {
        let (_dir, store) = bare_store().await;
        assert!(!store.has_schema().await.unwrap());
        store.init_schema().await.unwrap();
        assert!(store.has_schema().await.unwrap());
    }

    #[tokio::test]
    async fn empty_store_counts_zero() {
        let (_dir, store) = temp_store().await;
        // schema creation is repeatable
        store.init_schema().await.unwrap();

        let counts = store.counts().await.unwrap();
        assert_eq!(counts, Default::default());
        assert!(store.snapshot().await.unwrap().products.is_empty());
    }

    #[test]
    fn timestamps_have_millisecond_precision() {
        let ts = super::now_timestamp();
        // 2026-01-05T08:30:12.123Z
        assert_eq!(ts.len(), 24);
        assert!(ts.ends_with('Z'));
    }
}
