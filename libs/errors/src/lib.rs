//! Unified error handling for the catalog sync tools
//!
//! Two layers live here:
//! - per-item errors (`ParseError`, `ValidationError`, `DuplicateIdentityError`,
//!   `SyncError`) that a run collects into its summary and keeps going,
//! - `CatalogError`, the run-level error that aborts a command.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Per-item errors
// ============================================================================

/// A source file that could not be read or parsed as structured data
#[derive(Debug, Clone, Error, Serialize)]
#[error("{}: {message}", .path.display())]
pub struct ParseError {
    /// Source file
    pub path: PathBuf,
    /// Reader or YAML error text
    pub message: String,
}

impl ParseError {
    pub fn new(path: impl Into<PathBuf>, message: impl fmt::Display) -> Self {
        Self {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// One violated schema or business rule
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum Violation {
    #[error("missing required field `{0}`")]
    Missing(String),

    #[error("field `{0}` must not be empty")]
    Empty(String),

    #[error("field `{field}` must be {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },

    #[error("`{field}` must be non-negative (got {value})")]
    Negative { field: String, value: String },

    #[error("`{field}` has more than two decimal places ({value})")]
    TooPrecise { field: String, value: String },

    #[error("buy_min ({buy_min}) must not exceed buy_max ({buy_max})")]
    MinAboveMax { buy_min: String, buy_max: String },

    #[error("buy_max ({buy_max}) must be below sell_target ({sell_target})")]
    MaxNotBelowTarget {
        buy_max: String,
        sell_target: String,
    },

    #[error("`{field}[{index}]` must be a non-empty string")]
    BadListEntry { field: String, index: usize },

    #[error("document must be {expected}")]
    Shape { expected: &'static str },
}

impl Violation {
    /// Field the violation points at, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Missing(f) | Self::Empty(f) => Some(f),
            Self::WrongType { field, .. }
            | Self::Negative { field, .. }
            | Self::TooPrecise { field, .. }
            | Self::BadListEntry { field, .. } => Some(field),
            Self::MinAboveMax { .. } | Self::MaxNotBelowTarget { .. } => Some("pricing"),
            Self::Shape { .. } => None,
        }
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A record that parsed but broke one or more rules
#[derive(Debug, Clone, Error, Serialize)]
#[error("{}: {}", .path.display(), join_violations(.violations))]
pub struct ValidationError {
    /// Source file
    pub path: PathBuf,
    /// Identity label when brand and model were readable
    pub identity: Option<String>,
    /// Every violated rule, in check order
    pub violations: Vec<Violation>,
}

/// A source file whose identity is also claimed by another file
#[derive(Debug, Clone, Error, Serialize)]
#[error("{}: duplicate identity '{identity}' claimed by {}", .path.display(), display_paths(.paths))]
pub struct DuplicateIdentityError {
    pub identity: String,
    /// The rejected file
    pub path: PathBuf,
    /// Every file claiming the identity, this one included
    pub paths: Vec<PathBuf>,
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A unit of work that failed against the store
#[derive(Debug, Clone, Error, Serialize)]
#[error("{item}: {error}")]
pub struct SyncError {
    /// Item that caused the error
    pub item: String,
    /// Error message
    pub error: String,
}

impl SyncError {
    pub fn new(item: impl Into<String>, error: impl fmt::Display) -> Self {
        Self {
            item: item.into(),
            error: error.to_string(),
        }
    }

    pub fn timeout(item: impl Into<String>, limit: Duration) -> Self {
        Self {
            item: item.into(),
            error: format!("transaction timed out after {:?}", limit),
        }
    }
}

/// The store could not be reached
#[derive(Debug, Clone, Error)]
#[error("cannot connect to {target}: {reason}")]
pub struct ConnectionError {
    pub target: String,
    pub reason: String,
}

// ============================================================================
// CatalogError - run-level error
// ============================================================================

#[derive(Debug, Error)]
pub enum CatalogError {
    // ======================================
    // Fatal to the whole run
    // ======================================
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("Another sync run holds the store lock ({holder}, since {since})")]
    RunLocked { holder: String, since: String },

    #[error("Source root {}: {reason}", .path.display())]
    SourceRoot { path: PathBuf, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Refusing to continue: {0}")]
    Refused(String),

    // ======================================
    // Per-item errors raised in one-shot APIs
    // ======================================
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Duplicate(#[from] DuplicateIdentityError),

    #[error("Sync failed: {0}")]
    Sync(#[from] SyncError),
}

/// Result type alias using CatalogError
pub type CatalogResult<T> = Result<T, CatalogError>;

impl CatalogError {
    /// Whether the error stops the run rather than a single item
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Connection(_)
                | Self::RunLocked { .. }
                | Self::SourceRoot { .. }
                | Self::Config(_)
                | Self::Database(_)
                | Self::Io(_)
                | Self::Serialization(_)
                | Self::Refused(_)
        )
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for CatalogError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::CatalogError::Config($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::CatalogError::Config(format!($fmt, $($arg)*))
    };
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn timeout_names_the_limit() {
        let err = SyncError::timeout("Canon 600D", Duration::from_millis(150));
        assert_eq!(err.error, "transaction timed out after 150ms");
        let err = SyncError::timeout("Canon 600D", Duration::from_secs(30));
        assert_eq!(err.error, "transaction timed out after 30s");
    }

    #[test]
    fn validation_error_lists_every_violation() {
        let err = ValidationError {
            path: PathBuf::from("Products/Cameras/Canon/600D.yml"),
            identity: Some("Canon 600D".to_string()),
            violations: vec![
                Violation::Missing("full_name".to_string()),
                Violation::MaxNotBelowTarget {
                    buy_max: "100.00".to_string(),
                    sell_target: "90.00".to_string(),
                },
            ],
        };

        let text = err.to_string();
        assert!(text.starts_with("Products/Cameras/Canon/600D.yml: "));
        assert!(text.contains("missing required field `full_name`"));
        assert!(text.contains("buy_max (100.00) must be below sell_target (90.00)"));
    }

    #[test]
    fn duplicate_error_names_all_paths() {
        let err = DuplicateIdentityError {
            identity: "Canon 600D".to_string(),
            path: PathBuf::from("b/600d.yml"),
            paths: vec![PathBuf::from("a/600D.yml"), PathBuf::from("b/600d.yml")],
        };
        assert_eq!(
            err.to_string(),
            "b/600d.yml: duplicate identity 'Canon 600D' claimed by a/600D.yml, b/600d.yml"
        );
    }

    #[test]
    fn fatal_classification() {
        let conn = CatalogError::from(ConnectionError {
            target: "sqlite://missing/dir/catalog.db".to_string(),
            reason: "unable to open database file".to_string(),
        });
        assert!(conn.is_fatal());

        let item = CatalogError::from(SyncError::new("Canon 600D", "constraint failed"));
        assert!(!item.is_fatal());
    }

    #[test]
    fn config_error_macro_formats() {
        let err = config_error!("workers must be at least {}", 1);
        assert_eq!(err.to_string(), "Configuration error: workers must be at least 1");
    }
}
