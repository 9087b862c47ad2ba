//! Sync engine
//!
//! Drives one run end to end: load and validate the tree, take the store lock,
//! diff against a snapshot, apply each unit in its own transaction and record
//! every outcome. A failing unit never stops the run; only connection, lock
//! and source-root problems do.

use crate::changelog::{ChangeEntry, ChangeLog, EntityKind, Operation, Outcome};
use crate::loader::DEFAULT_LOAD_CONCURRENCY;
use crate::reconciler::{reconcile, FilterUnit, PlanOp, ProductUnit, StoreSnapshot, SyncPlan};
use crate::store::{CatalogStore, RunKind, RunStatus, RunTotals};
use crate::summary::SyncSummary;
use crate::validator::{self, ValidatedBatch};
use crate::Result;
use catalog_model::{FilterKeyword, FilterType};
use common::CatalogConfig;
use errors::{CatalogError, SyncError};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Product units applied at once
    pub workers: usize,
    /// Upper bound for one unit transaction
    pub unit_timeout: Duration,
    /// Age after which a leftover lock is taken over
    pub lock_stale_after: Duration,
    /// Plan only; the store is read but never written, not even its schema
    pub dry_run: bool,
    /// Files read at once while loading
    pub load_concurrency: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            workers: 4,
            unit_timeout: Duration::from_secs(30),
            lock_stale_after: Duration::from_secs(900),
            dry_run: false,
            load_concurrency: DEFAULT_LOAD_CONCURRENCY,
        }
    }
}

impl SyncOptions {
    pub fn from_config(config: &CatalogConfig) -> Self {
        Self {
            workers: config.effective_workers(),
            unit_timeout: config.unit_timeout(),
            lock_stale_after: config.lock_stale_after(),
            ..Self::default()
        }
    }
}

/// Result of `prune`, confirmed or not
#[derive(Debug, Clone, Default, Serialize)]
pub struct PruneReport {
    /// `None` unless the deletion was confirmed
    pub run_id: Option<String>,
    pub confirmed: bool,
    pub cancelled: bool,
    pub orphaned_products: Vec<String>,
    pub orphaned_filters: Vec<String>,
    pub deleted: usize,
    pub skipped: usize,
    pub failures: Vec<SyncError>,
}

impl PruneReport {
    pub fn orphan_count(&self) -> usize {
        self.orphaned_products.len() + self.orphaned_filters.len()
    }

    pub fn is_success(&self) -> bool {
        !self.cancelled && self.failures.is_empty()
    }
}

pub struct SyncEngine {
    store: CatalogStore,
    options: SyncOptions,
}

impl SyncEngine {
    pub fn new(store: CatalogStore, options: SyncOptions) -> Self {
        Self { store, options }
    }

    /// Snapshot for a plan-only pass; a store without tables reads as empty
    async fn read_only_snapshot(&self) -> Result<StoreSnapshot> {
        if self.store.has_schema().await? {
            Ok(self.store.snapshot().await?)
        } else {
            Ok(StoreSnapshot::default())
        }
    }

    /// Load and validate without touching the store
    pub async fn validate(&self, root: &Path) -> Result<ValidatedBatch> {
        validator::load_and_validate(root, self.options.load_concurrency).await
    }

    /// Run a sync against the source tree at `root`
    ///
    /// Returns a summary even when units fail; the caller decides the exit
    /// status from [`SyncSummary::is_success`].
    pub async fn run(&self, root: &Path, cancel: &CancellationToken) -> Result<SyncSummary> {
        let batch = self.validate(root).await?;

        if self.options.dry_run {
            let snapshot = self.read_only_snapshot().await?;
            let plan = reconcile(&batch, &snapshot);
            info!(
                "Dry run: {} to create, {} to update, {} unchanged, {} orphaned",
                plan.product_count(PlanOp::Create) + plan.filter_count(PlanOp::Create),
                plan.product_count(PlanOp::Update) + plan.filter_count(PlanOp::Update),
                plan.product_count(PlanOp::Unchanged) + plan.filter_count(PlanOp::Unchanged),
                plan.orphaned_products.len() + plan.orphaned_filters.len()
            );
            return Ok(SyncSummary::planned(&batch, &plan));
        }

        self.store.init_schema().await?;
        let run_id = Uuid::new_v4().to_string();
        let lock = self
            .store
            .acquire_lock(&run_id, self.options.lock_stale_after)
            .await?;

        let result = self.apply(&run_id, root, &batch, cancel).await;

        if let Err(e) = lock.release().await {
            warn!("Failed to release store lock {}: {}", run_id, e);
        }
        result
    }

    async fn apply(
        &self,
        run_id: &str,
        root: &Path,
        batch: &ValidatedBatch,
        cancel: &CancellationToken,
    ) -> Result<SyncSummary> {
        // snapshot only once the lock is held
        let snapshot = self.store.snapshot().await?;
        let plan = reconcile(batch, &snapshot);

        self.store
            .begin_run(run_id, RunKind::Sync, &root.display().to_string())
            .await?;
        info!(
            "Sync run {} started: {} products, {} filter keywords",
            run_id,
            plan.products.len(),
            plan.filters.len()
        );

        let mut log = ChangeLog::new();
        self.report_orphans(run_id, &plan, &mut log).await;

        let workers = self.options.workers.max(1);
        let results: Vec<(ChangeEntry, bool)> = stream::iter(&plan.products)
            .map(|unit| self.apply_product_unit(run_id, unit, cancel))
            .buffer_unordered(workers)
            .collect()
            .await;
        push_all(&mut log, results);

        for filter_type in FilterType::ALL {
            let units: Vec<&FilterUnit> = plan
                .filters
                .iter()
                .filter(|u| u.keyword.filter_type == filter_type)
                .collect();
            let results = self.apply_filter_units(run_id, filter_type, &units, cancel).await;
            push_all(&mut log, results);
        }

        let mut summary = SyncSummary::from_batch(batch, &plan);
        summary.run_id = Some(run_id.to_string());
        summary.cancelled = cancel.is_cancelled();
        summary.absorb(&log);

        let status = summary.status();
        if let Err(e) = self
            .store
            .finish_run(run_id, status, &summary.totals())
            .await
        {
            warn!("Failed to close run {}: {}", run_id, e);
            summary.unpersisted_changes += 1;
        }

        info!(
            "Sync run {} {}: products {} created, {} updated, {} unchanged, {} failed, {} skipped; {} rejected, {} orphaned",
            run_id,
            status,
            summary.products.created,
            summary.products.updated,
            summary.products.unchanged,
            summary.products.failed,
            summary.products.skipped,
            summary.rejected(),
            summary.orphaned()
        );
        Ok(summary)
    }

    async fn report_orphans(&self, run_id: &str, plan: &SyncPlan, log: &mut ChangeLog) {
        let orphans = plan
            .orphaned_products
            .iter()
            .map(|identity| (EntityKind::Product, identity.to_string()))
            .chain(
                plan.orphaned_filters
                    .iter()
                    .map(|key| (EntityKind::Filter, key.to_string())),
            );

        for (entity, identity) in orphans {
            warn!("Orphaned {} {} is no longer in the source tree", entity, identity);
            let entry = ChangeEntry::new(entity, identity, Operation::Orphaned, Outcome::Reported);
            let result = self.persist(run_id, entry).await;
            push_all(log, [result]);
        }
    }

    async fn apply_product_unit(
        &self,
        run_id: &str,
        unit: &ProductUnit,
        cancel: &CancellationToken,
    ) -> (ChangeEntry, bool) {
        let identity = unit.record.identity.to_string();

        if cancel.is_cancelled() {
            let entry = ChangeEntry::new(EntityKind::Product, identity, Operation::Skipped, Outcome::Skipped);
            return self.persist(run_id, entry).await;
        }

        let operation = match unit.op {
            PlanOp::Create => Operation::Create,
            PlanOp::Update => Operation::Update,
            PlanOp::Unchanged => {
                debug!("Unchanged: {}", identity);
                let entry =
                    ChangeEntry::new(EntityKind::Product, identity, Operation::Unchanged, Outcome::Applied);
                return (entry, true);
            },
        };

        let outcome = self
            .with_timeout(&identity, self.store.apply_product(&unit.record, &unit.hash))
            .await
            .map(|product_id| {
                debug!("{} {} (id {})", operation, identity, product_id);
            });
        let outcome = match outcome {
            Ok(()) => Outcome::Applied,
            Err(e) => {
                warn!("Product {} from {} failed: {}", identity, unit.source.display(), e.error);
                Outcome::Failed(e.error)
            },
        };

        let entry = ChangeEntry::new(EntityKind::Product, identity, operation, outcome);
        self.persist(run_id, entry).await
    }

    /// One transaction for every written keyword of `filter_type`
    async fn apply_filter_units(
        &self,
        run_id: &str,
        filter_type: FilterType,
        units: &[&FilterUnit],
        cancel: &CancellationToken,
    ) -> Vec<(ChangeEntry, bool)> {
        let mut results = Vec::with_capacity(units.len());
        let (writes, unchanged): (Vec<&FilterUnit>, Vec<&FilterUnit>) =
            units.iter().copied().partition(|u| u.op.is_write());

        if cancel.is_cancelled() {
            for unit in units {
                let entry = ChangeEntry::new(
                    EntityKind::Filter,
                    unit.keyword.key().to_string(),
                    Operation::Skipped,
                    Outcome::Skipped,
                );
                results.push(self.persist(run_id, entry).await);
            }
            return results;
        }

        for unit in unchanged {
            results.push((
                ChangeEntry::new(
                    EntityKind::Filter,
                    unit.keyword.key().to_string(),
                    Operation::Unchanged,
                    Outcome::Applied,
                ),
                true,
            ));
        }

        if writes.is_empty() {
            return results;
        }

        let keywords: Vec<&FilterKeyword> = writes.iter().map(|u| &u.keyword).collect();
        let label = format!("{} filter set", filter_type);
        let outcome = match self
            .with_timeout(&label, self.store.apply_filter_set(filter_type, &keywords))
            .await
        {
            Ok(count) => {
                debug!("Applied {} {} keywords", count, filter_type);
                Outcome::Applied
            },
            Err(e) => {
                warn!("{}", e);
                Outcome::Failed(e.error)
            },
        };

        for unit in writes {
            let operation = if unit.op == PlanOp::Create {
                Operation::Create
            } else {
                Operation::Update
            };
            let entry = ChangeEntry::new(
                EntityKind::Filter,
                unit.keyword.key().to_string(),
                operation,
                outcome.clone(),
            );
            results.push(self.persist(run_id, entry).await);
        }
        results
    }

    /// Bound a unit transaction; a timed-out transaction is dropped and rolls back
    async fn with_timeout<T, F>(&self, item: &str, work: F) -> std::result::Result<T, SyncError>
    where
        F: Future<Output = std::result::Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.options.unit_timeout, work).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(SyncError::new(item, e)),
            Err(_) => Err(SyncError::timeout(item, self.options.unit_timeout)),
        }
    }

    /// Write an entry to `sync_changes`; the flag reports whether it stuck
    async fn persist(&self, run_id: &str, entry: ChangeEntry) -> (ChangeEntry, bool) {
        match self.store.record_change(run_id, &entry).await {
            Ok(()) => (entry, true),
            Err(e) => {
                warn!(
                    "Change log write failed for {} {}: {}",
                    entry.entity, entry.identity, e
                );
                (entry, false)
            },
        }
    }

    /// Delete stored rows that no source file claims
    ///
    /// Without `confirm` only reports what would go. Refuses to run when any
    /// source file failed to parse, or when the tree claims no product at all.
    pub async fn prune(
        &self,
        root: &Path,
        confirm: bool,
        cancel: &CancellationToken,
    ) -> Result<PruneReport> {
        let batch = self.validate(root).await?;

        let unreadable = batch.parse_errors().count();
        if unreadable > 0 {
            return Err(CatalogError::Refused(format!(
                "{} source file(s) could not be parsed; fix them before pruning",
                unreadable
            )));
        }
        if batch.claimed.is_empty() {
            return Err(CatalogError::Refused(format!(
                "no product files found under {}",
                root.display()
            )));
        }

        if !confirm {
            let plan = reconcile(&batch, &self.read_only_snapshot().await?);
            info!(
                "Prune dry run: {} products and {} filter keywords would be deleted",
                plan.orphaned_products.len(),
                plan.orphaned_filters.len()
            );
            return Ok(report_for(&plan, None, false));
        }

        self.store.init_schema().await?;

        let run_id = Uuid::new_v4().to_string();
        let lock = self
            .store
            .acquire_lock(&run_id, self.options.lock_stale_after)
            .await?;

        let result = self.delete_orphans(&run_id, root, &batch, cancel).await;

        if let Err(e) = lock.release().await {
            warn!("Failed to release store lock {}: {}", run_id, e);
        }
        result
    }

    async fn delete_orphans(
        &self,
        run_id: &str,
        root: &Path,
        batch: &ValidatedBatch,
        cancel: &CancellationToken,
    ) -> Result<PruneReport> {
        let plan = reconcile(batch, &self.store.snapshot().await?);
        self.store
            .begin_run(run_id, RunKind::Prune, &root.display().to_string())
            .await?;

        let mut report = report_for(&plan, Some(run_id), true);
        let mut log = ChangeLog::new();

        for identity in &plan.orphaned_products {
            let entry = if cancel.is_cancelled() {
                ChangeEntry::new(EntityKind::Product, identity.to_string(), Operation::Skipped, Outcome::Skipped)
            } else {
                let label = identity.to_string();
                let outcome = match self
                    .with_timeout(&label, self.store.delete_product(identity))
                    .await
                {
                    Ok(_) => {
                        info!("Deleted product {}", identity);
                        Outcome::Applied
                    },
                    Err(e) => {
                        warn!("{}", e);
                        Outcome::Failed(e.error)
                    },
                };
                ChangeEntry::new(EntityKind::Product, label, Operation::Delete, outcome)
            };
            push_all(&mut log, [self.persist(run_id, entry).await]);
        }

        for key in &plan.orphaned_filters {
            let entry = if cancel.is_cancelled() {
                ChangeEntry::new(EntityKind::Filter, key.to_string(), Operation::Skipped, Outcome::Skipped)
            } else {
                let label = key.to_string();
                let outcome = match self.with_timeout(&label, self.store.delete_filter(key)).await {
                    Ok(_) => {
                        info!("Deleted filter keyword {}", key);
                        Outcome::Applied
                    },
                    Err(e) => {
                        warn!("{}", e);
                        Outcome::Failed(e.error)
                    },
                };
                ChangeEntry::new(EntityKind::Filter, label, Operation::Delete, outcome)
            };
            push_all(&mut log, [self.persist(run_id, entry).await]);
        }

        for entry in log.entries() {
            match (&entry.operation, &entry.outcome) {
                (_, Outcome::Failed(reason)) => report.failures.push(SyncError::new(
                    format!("{} {}", entry.entity, entry.identity),
                    reason,
                )),
                (Operation::Skipped, _) => report.skipped += 1,
                (Operation::Delete, Outcome::Applied) => report.deleted += 1,
                _ => {},
            }
        }
        report.cancelled = cancel.is_cancelled();

        let status = if report.cancelled {
            RunStatus::Cancelled
        } else if report.failures.is_empty() {
            RunStatus::Completed
        } else {
            RunStatus::Partial
        };
        let totals = RunTotals {
            deleted: report.deleted,
            failed: report.failures.len(),
            skipped: report.skipped,
            ..RunTotals::default()
        };
        if let Err(e) = self.store.finish_run(run_id, status, &totals).await {
            warn!("Failed to close run {}: {}", run_id, e);
        }

        info!(
            "Prune run {} {}: {} deleted, {} failed, {} skipped",
            run_id,
            status,
            report.deleted,
            report.failures.len(),
            report.skipped
        );
        Ok(report)
    }
}

fn push_all(log: &mut ChangeLog, results: impl IntoIterator<Item = (ChangeEntry, bool)>) {
    for (entry, persisted) in results {
        if !persisted {
            log.mark_unpersisted();
        }
        log.push(entry);
    }
}

fn report_for(plan: &SyncPlan, run_id: Option<&str>, confirmed: bool) -> PruneReport {
    PruneReport {
        run_id: run_id.map(str::to_string),
        confirmed,
        orphaned_products: plan.orphaned_products.iter().map(ToString::to_string).collect(),
        orphaned_filters: plan.orphaned_filters.iter().map(ToString::to_string).collect(),
        ..PruneReport::default()
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::store::test_support::{bare_store, temp_store};
    use std::fs;

    fn write(root: &Path, rel: &str, body: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    fn product(brand: &str, model: &str) -> String {
        format!(
            "brand: {brand}\nmodel: {model}\nfull_name: {brand} {model}\npricing:\n  buy_min: 10\n  buy_max: 20\n  sell_target: 30\n"
        )
    }

    #[tokio::test]
    async fn dry_run_writes_nothing() {
        let (_db, store) = temp_store().await;
        let src = tempfile::tempdir().unwrap();
        write(src.path(), "Products/Cameras/Canon/600D.yml", &product("Canon", "600D"));

        let engine = SyncEngine::new(
            store.clone(),
            SyncOptions {
                dry_run: true,
                ..SyncOptions::default()
            },
        );
        let summary = engine.run(src.path(), &CancellationToken::new()).await.unwrap();

        assert!(summary.dry_run);
        assert_eq!(summary.run_id, None);
        assert_eq!(summary.products.created, 1);
        assert_eq!(store.counts().await.unwrap().products, 0);
        assert!(store.recent_runs(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn dry_run_on_a_fresh_database_creates_no_tables() {
        let (_db, store) = bare_store().await;
        let src = tempfile::tempdir().unwrap();
        write(src.path(), "Products/Cameras/Canon/600D.yml", &product("Canon", "600D"));
        write(src.path(), "Products/Cameras/Matching/filters_reject.yml", "- broken\n");

        let engine = SyncEngine::new(
            store.clone(),
            SyncOptions {
                dry_run: true,
                ..SyncOptions::default()
            },
        );
        let summary = engine.run(src.path(), &CancellationToken::new()).await.unwrap();
        assert_eq!(summary.products.created, 1);
        assert_eq!(summary.filters.created, 1);

        let preview = engine
            .prune(src.path(), false, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(preview.orphan_count(), 0);

        let tables: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(tables, 0);
    }

    #[tokio::test]
    async fn held_lock_aborts_the_run() {
        let (_db, store) = temp_store().await;
        let src = tempfile::tempdir().unwrap();
        write(src.path(), "Products/Cameras/Canon/600D.yml", &product("Canon", "600D"));

        let guard = store
            .acquire_lock("other-run", Duration::from_secs(3600))
            .await
            .unwrap();

        let engine = SyncEngine::new(store.clone(), SyncOptions::default());
        let err = engine
            .run(src.path(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::RunLocked { .. }));
        assert_eq!(store.counts().await.unwrap().products, 0);

        guard.release().await.unwrap();
    }

    #[tokio::test]
    async fn missing_source_root_is_fatal() {
        let (_db, store) = temp_store().await;
        let engine = SyncEngine::new(store, SyncOptions::default());
        let err = engine
            .run(Path::new("/definitely/not/here"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::SourceRoot { .. }));
    }
}
