//! Change log entries
//!
//! Each applied, failed or skipped unit produces one [`ChangeEntry`]. Entries
//! are written to `sync_changes` as they happen and also kept in memory so the
//! run summary is complete even when a durable write fails.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Product,
    Filter,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Filter => "filter",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a unit does to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
    /// Counted only; never written to `sync_changes`
    Unchanged,
    Delete,
    Orphaned,
    /// A unit that never started because the run was cancelled
    Skipped,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Unchanged => "unchanged",
            Self::Delete => "delete",
            Self::Orphaned => "orphaned",
            Self::Skipped => "skipped",
        }
    }

    /// Whether entries of this kind are persisted
    pub fn is_logged(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "lowercase")]
pub enum Outcome {
    Applied,
    Failed(String),
    Skipped,
    /// Observed and reported, nothing written (orphans)
    Reported,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Failed(_) => "failed",
            Self::Skipped => "skipped",
            Self::Reported => "reported",
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEntry {
    pub entity: EntityKind,
    /// `Brand Model` for products, `type:keyword` for filters
    pub identity: String,
    pub operation: Operation,
    pub outcome: Outcome,
    pub recorded_at: String,
}

impl ChangeEntry {
    pub fn new(
        entity: EntityKind,
        identity: impl Into<String>,
        operation: Operation,
        outcome: Outcome,
    ) -> Self {
        Self {
            entity,
            identity: identity.into(),
            operation,
            outcome,
            recorded_at: crate::store::now_timestamp(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, Outcome::Failed(_))
    }
}

/// Entries of one run, in the order they completed
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChangeLog {
    entries: Vec<ChangeEntry>,
    /// Entries that could not be written to the store
    unpersisted: usize,
}

impl ChangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ChangeEntry) {
        self.entries.push(entry);
    }

    pub fn mark_unpersisted(&mut self) {
        self.unpersisted += 1;
    }

    pub fn unpersisted(&self) -> usize {
        self.unpersisted
    }

    pub fn entries(&self) -> &[ChangeEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unchanged_is_not_persisted() {
        assert!(!Operation::Unchanged.is_logged());
        assert!(Operation::Orphaned.is_logged());
        assert!(Operation::Skipped.is_logged());
    }

    #[test]
    fn failures_carry_detail() {
        let mut log = ChangeLog::new();
        log.push(ChangeEntry::new(
            EntityKind::Product,
            "Canon 600D",
            Operation::Create,
            Outcome::Applied,
        ));
        log.push(ChangeEntry::new(
            EntityKind::Product,
            "Nikon D7000",
            Operation::Update,
            Outcome::Failed("constraint failed".to_string()),
        ));

        let failures: Vec<_> = log.entries().iter().filter(|e| e.is_failure()).collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].identity, "Nikon D7000");
        assert_eq!(failures[0].outcome.detail(), Some("constraint failed"));
        assert_eq!(Outcome::Reported.as_str(), "reported");
    }
}
