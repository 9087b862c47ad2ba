//! Record loader
//!
//! Reads every discovered file concurrently and parses it as YAML. A file that
//! cannot be read or parsed becomes a [`LoadFailure`]; the rest of the tree is
//! still loaded.

use crate::source::{self, SourceFile, SourceKind};
use crate::Result;
use errors::ParseError;
use futures::stream::{self, StreamExt};
use serde_yaml::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default number of files read at once
pub const DEFAULT_LOAD_CONCURRENCY: usize = 16;

/// A parsed source file
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub source: SourceFile,
    pub body: Value,
}

/// A file that could not be turned into a document
#[derive(Debug, Clone)]
pub struct LoadFailure {
    /// `None` when the directory walk itself failed
    pub source: Option<SourceFile>,
    pub error: ParseError,
}

#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub documents: Vec<RawDocument>,
    pub errors: Vec<LoadFailure>,
}

impl LoadOutcome {
    pub fn total_files(&self) -> usize {
        self.documents.len() + self.errors.len()
    }
}

pub struct RecordLoader {
    products_dir: PathBuf,
    concurrency: usize,
}

impl RecordLoader {
    /// Fails only when `root` is missing or not a directory
    pub fn new(root: &Path) -> Result<Self> {
        Ok(Self {
            products_dir: source::resolve_products_dir(root)?,
            concurrency: DEFAULT_LOAD_CONCURRENCY,
        })
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Load and parse the whole tree
    ///
    /// Documents and failures are both returned sorted by path so two loads of
    /// the same tree produce the same order.
    pub async fn load(&self) -> LoadOutcome {
        let (files, walk_errors) = source::discover(&self.products_dir);
        debug!(
            "Discovered {} source files under {}",
            files.len(),
            self.products_dir.display()
        );

        let mut outcome = LoadOutcome {
            documents: Vec::with_capacity(files.len()),
            errors: walk_errors
                .into_iter()
                .map(|error| LoadFailure {
                    source: None,
                    error,
                })
                .collect(),
        };

        let results: Vec<std::result::Result<RawDocument, LoadFailure>> = stream::iter(files)
            .map(read_document)
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for result in results {
            match result {
                Ok(doc) => outcome.documents.push(doc),
                Err(failure) => {
                    warn!("{}", failure.error);
                    outcome.errors.push(failure);
                },
            }
        }

        outcome
            .documents
            .sort_by(|a, b| a.source.path.cmp(&b.source.path));
        outcome.errors.sort_by(|a, b| a.error.path.cmp(&b.error.path));

        info!(
            "Loaded {} documents ({} unreadable)",
            outcome.documents.len(),
            outcome.errors.len()
        );
        outcome
    }
}

async fn read_document(source: SourceFile) -> std::result::Result<RawDocument, LoadFailure> {
    let fail = |source: SourceFile, message: String| LoadFailure {
        error: ParseError::new(&source.path, message),
        source: Some(source),
    };

    let text = match tokio::fs::read_to_string(&source.path).await {
        Ok(text) => text,
        Err(e) => return Err(fail(source, format!("cannot read file: {}", e))),
    };

    let body: Value = match serde_yaml::from_str(&text) {
        Ok(body) => body,
        Err(e) => return Err(fail(source, format!("invalid YAML: {}", e))),
    };

    if let Some(expected) = shape_mismatch(&source.kind, &body) {
        return Err(fail(source, format!("expected {}", expected)));
    }

    Ok(RawDocument { source, body })
}

/// Top-level shape a file must have to be a document at all
fn shape_mismatch(kind: &SourceKind, body: &Value) -> Option<&'static str> {
    match kind {
        SourceKind::Product { .. } if !body.is_mapping() => Some("a mapping of product fields"),
        SourceKind::Filter { .. } if !(body.is_mapping() || body.is_sequence()) => {
            Some("a keyword list or mapping")
        },
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, rel: &str, body: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    #[tokio::test]
    async fn bad_files_do_not_stop_the_load() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "Products/Cameras/Canon/600D.yml", "brand: Canon\nmodel: 600D\n");
        write(root, "Products/Cameras/Canon/700D.yml", "brand: [unclosed\n");
        write(root, "Products/Cameras/Canon/800D.yml", "- just\n- a list\n");
        write(root, "Products/Cameras/Matching/filters_reject.yml", "- broken\n");

        let outcome = RecordLoader::new(root).unwrap().load().await;

        assert_eq!(outcome.documents.len(), 2);
        assert_eq!(outcome.errors.len(), 2);
        assert_eq!(outcome.total_files(), 4);

        let failed: Vec<_> = outcome
            .errors
            .iter()
            .map(|f| f.error.path.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(failed, vec!["700D.yml", "800D.yml"]);
        assert!(outcome.errors[0].error.message.starts_with("invalid YAML"));
        assert!(outcome.errors[0].source.is_some());
    }

    #[tokio::test]
    async fn missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(RecordLoader::new(&dir.path().join("absent")).is_err());
    }
}
