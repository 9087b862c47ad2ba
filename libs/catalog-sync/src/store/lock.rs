//! Run lock
//!
//! One sync or prune run writes to a store at a time. The lock is a single row
//! in `sync_lock`; a row older than the stale age is assumed to belong to a
//! crashed run and is taken over.

use super::{now_timestamp, CatalogStore, TIMESTAMP_FORMAT};
use chrono::Utc;
use errors::{CatalogError, CatalogResult};
use std::time::Duration;
use tracing::{debug, warn};

/// Proof that this run holds the store lock
///
/// Must be released explicitly; a guard that is dropped leaves the row behind
/// until it goes stale.
#[derive(Debug)]
#[must_use = "release the lock when the run ends"]
pub struct LockGuard {
    store: CatalogStore,
    holder: String,
}

impl LockGuard {
    pub fn holder(&self) -> &str {
        &self.holder
    }

    pub async fn release(self) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM sync_lock WHERE id = 1 AND holder = ?")
            .bind(&self.holder)
            .execute(self.store.pool())
            .await?;
        debug!("Released store lock {}", self.holder);
        Ok(())
    }
}

/// Timestamps at or before this instant are stale
fn stale_cutoff(stale_after: Duration) -> String {
    chrono::Duration::from_std(stale_after)
        .ok()
        .and_then(|age| Utc::now().checked_sub_signed(age))
        .map(|at| at.format(TIMESTAMP_FORMAT).to_string())
        // nothing sorts before the empty string, so no lock ever goes stale
        .unwrap_or_default()
}

impl CatalogStore {
    /// Take the run lock for `holder`
    ///
    /// A single upsert claims a free row or replaces a stale one, so a busy
    /// store waits out the busy timeout instead of failing early. Fails with
    /// [`CatalogError::RunLocked`] while another live run holds it.
    pub async fn acquire_lock(&self, holder: &str, stale_after: Duration) -> CatalogResult<LockGuard> {
        let previous: Option<(String, String)> =
            sqlx::query_as("SELECT holder, acquired_at FROM sync_lock WHERE id = 1")
                .fetch_optional(self.pool())
                .await?;

        let claimed = sqlx::query(
            r#"
            INSERT INTO sync_lock (id, holder, acquired_at) VALUES (1, ?1, ?2)
            ON CONFLICT(id) DO UPDATE SET
                holder = excluded.holder,
                acquired_at = excluded.acquired_at
            WHERE julianday(sync_lock.acquired_at) IS NULL
               OR sync_lock.acquired_at <= ?3
            "#,
        )
        .bind(holder)
        .bind(now_timestamp())
        .bind(stale_cutoff(stale_after))
        .execute(self.pool())
        .await?
        .rows_affected();

        if claimed == 0 {
            let current: Option<(String, String)> =
                sqlx::query_as("SELECT holder, acquired_at FROM sync_lock WHERE id = 1")
                    .fetch_optional(self.pool())
                    .await?;
            let (holder, since) = current.or(previous).unwrap_or_default();
            return Err(CatalogError::RunLocked { holder, since });
        }

        if let Some((other, since)) = previous {
            warn!("Took over stale store lock held by {} since {}", other, since);
        }
        debug!("Acquired store lock {}", holder);
        Ok(LockGuard {
            store: self.clone(),
            holder: holder.to_string(),
        })
    }
}
