//! `sync_runs` / `sync_changes` persistence

use super::{now_timestamp, CatalogStore};
use crate::changelog::ChangeEntry;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunKind {
    Sync,
    Prune,
}

impl RunKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::Prune => "prune",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    /// Every unit applied
    Completed,
    /// At least one unit failed
    Partial,
    Cancelled,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Partial => "partial",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final counters written to a `sync_runs` row
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunTotals {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
    pub orphaned: usize,
    pub failed: usize,
    pub skipped: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct RunRecord {
    pub id: String,
    pub kind: String,
    pub source_root: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub status: String,
    pub created: i64,
    pub updated: i64,
    pub unchanged: i64,
    pub deleted: i64,
    pub orphaned: i64,
    pub failed: i64,
    pub skipped: i64,
    pub rejected: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct StoredChange {
    pub entity: String,
    pub identity: String,
    pub operation: String,
    pub outcome: String,
    pub detail: Option<String>,
    pub recorded_at: String,
}

impl CatalogStore {
    pub async fn begin_run(
        &self,
        run_id: &str,
        kind: RunKind,
        source_root: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO sync_runs (id, kind, source_root, started_at, status) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(run_id)
        .bind(kind.as_str())
        .bind(source_root)
        .bind(now_timestamp())
        .bind(RunStatus::Running.as_str())
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Append one entry; unchanged units are not stored
    pub async fn record_change(&self, run_id: &str, entry: &ChangeEntry) -> Result<(), sqlx::Error> {
        if !entry.operation.is_logged() {
            return Ok(());
        }
        sqlx::query(
            r#"
            INSERT INTO sync_changes (run_id, entity, identity, operation, outcome, detail, recorded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(run_id)
        .bind(entry.entity.as_str())
        .bind(&entry.identity)
        .bind(entry.operation.as_str())
        .bind(entry.outcome.as_str())
        .bind(entry.outcome.detail())
        .bind(&entry.recorded_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn finish_run(
        &self,
        run_id: &str,
        status: RunStatus,
        totals: &RunTotals,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE sync_runs SET
                finished_at = ?, status = ?,
                created = ?, updated = ?, unchanged = ?, deleted = ?,
                orphaned = ?, failed = ?, skipped = ?, rejected = ?
            WHERE id = ?
            "#,
        )
        .bind(now_timestamp())
        .bind(status.as_str())
        .bind(totals.created as i64)
        .bind(totals.updated as i64)
        .bind(totals.unchanged as i64)
        .bind(totals.deleted as i64)
        .bind(totals.orphaned as i64)
        .bind(totals.failed as i64)
        .bind(totals.skipped as i64)
        .bind(totals.rejected as i64)
        .bind(run_id)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Most recent runs first
    pub async fn recent_runs(&self, limit: u32) -> Result<Vec<RunRecord>, sqlx::Error> {
        sqlx::query_as::<_, RunRecord>(
            r#"
            SELECT id, kind, source_root, started_at, finished_at, status,
                   created, updated, unchanged, deleted, orphaned, failed, skipped, rejected
            FROM sync_runs
            ORDER BY started_at DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
    }

    pub async fn changes_for_run(&self, run_id: &str) -> Result<Vec<StoredChange>, sqlx::Error> {
        sqlx::query_as::<_, StoredChange>(
            r#"
            SELECT entity, identity, operation, outcome, detail, recorded_at
            FROM sync_changes
            WHERE run_id = ?
            ORDER BY id
            "#,
        )
        .bind(run_id)
        .fetch_all(self.pool())
        .await
    }
}
