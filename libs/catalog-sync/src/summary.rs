//! Run summary returned to the caller

use crate::changelog::{ChangeLog, EntityKind, Operation};
use crate::reconciler::{PlanOp, SyncPlan};
use crate::store::{RunStatus, RunTotals};
use crate::validator::{Rejection, ValidatedBatch, ValidationWarning};
use catalog_model::{FilterKey, Identity};
use errors::SyncError;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OpCounts {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl OpCounts {
    pub fn total(&self) -> usize {
        self.created + self.updated + self.unchanged + self.failed + self.skipped
    }

    pub(crate) fn record(&mut self, op: PlanOp) {
        match op {
            PlanOp::Create => self.created += 1,
            PlanOp::Update => self.updated += 1,
            PlanOp::Unchanged => self.unchanged += 1,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncSummary {
    /// `None` for dry runs, which never open a run
    pub run_id: Option<String>,
    pub dry_run: bool,
    pub cancelled: bool,
    pub documents_read: usize,
    pub products: OpCounts,
    pub filters: OpCounts,
    pub orphaned_products: Vec<String>,
    pub orphaned_filters: Vec<String>,
    pub failures: Vec<SyncError>,
    pub rejections: Vec<Rejection>,
    pub warnings: Vec<ValidationWarning>,
    /// Change log entries that could not be written durably
    pub unpersisted_changes: usize,
}

impl SyncSummary {
    /// Summary of a plan that is not applied
    pub fn planned(batch: &ValidatedBatch, plan: &SyncPlan) -> Self {
        let mut summary = Self::from_batch(batch, plan);
        summary.dry_run = true;
        for unit in &plan.products {
            summary.products.record(unit.op);
        }
        for unit in &plan.filters {
            summary.filters.record(unit.op);
        }
        summary
    }

    /// Rejections, warnings and orphans; counters are filled in by the caller
    pub(crate) fn from_batch(batch: &ValidatedBatch, plan: &SyncPlan) -> Self {
        Self {
            documents_read: batch.documents_read,
            orphaned_products: plan.orphaned_products.iter().map(Identity::to_string).collect(),
            orphaned_filters: plan.orphaned_filters.iter().map(FilterKey::to_string).collect(),
            rejections: batch.rejections.clone(),
            warnings: batch.warnings.clone(),
            ..Self::default()
        }
    }

    /// Fill counters and failures from a finished change log
    pub(crate) fn absorb(&mut self, log: &ChangeLog) {
        for entry in log.entries() {
            let counts = match entry.entity {
                EntityKind::Product => &mut self.products,
                EntityKind::Filter => &mut self.filters,
            };
            if entry.is_failure() {
                counts.failed += 1;
                let reason = entry.outcome.detail().unwrap_or_default();
                self.failures.push(SyncError::new(
                    format!("{} {}", entry.entity, entry.identity),
                    reason,
                ));
                continue;
            }
            match entry.operation {
                Operation::Create => counts.created += 1,
                Operation::Update => counts.updated += 1,
                Operation::Unchanged => counts.unchanged += 1,
                Operation::Skipped => counts.skipped += 1,
                Operation::Delete | Operation::Orphaned => {},
            }
        }
        self.unpersisted_changes = log.unpersisted();
    }

    pub fn rejected(&self) -> usize {
        self.rejections.len()
    }

    pub fn failed(&self) -> usize {
        self.products.failed + self.filters.failed
    }

    pub fn orphaned(&self) -> usize {
        self.orphaned_products.len() + self.orphaned_filters.len()
    }

    /// Nothing failed, nothing was rejected and the run finished
    pub fn is_success(&self) -> bool {
        !self.cancelled && self.failed() == 0 && self.rejections.is_empty()
    }

    pub fn status(&self) -> RunStatus {
        if self.cancelled {
            RunStatus::Cancelled
        } else if self.failed() > 0 {
            RunStatus::Partial
        } else {
            RunStatus::Completed
        }
    }

    pub(crate) fn totals(&self) -> RunTotals {
        RunTotals {
            created: self.products.created + self.filters.created,
            updated: self.products.updated + self.filters.updated,
            unchanged: self.products.unchanged + self.filters.unchanged,
            deleted: 0,
            orphaned: self.orphaned(),
            failed: self.failed(),
            skipped: self.products.skipped + self.filters.skipped,
            rejected: self.rejected(),
        }
    }
}
