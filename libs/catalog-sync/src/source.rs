//! Source tree layout
//!
//! ```text
//! Products/
//! ├── Cameras/
//! │   ├── Canon/600D.yml             product file
//! │   ├── Nikon/D7000.yaml           product file
//! │   └── Matching/
//! │       ├── filters_reject.yml     shared reject keywords
//! │       └── filters_boost.yml      shared boost keywords
//! └── Lenses/...
//! ```

use crate::Result;
use catalog_model::{FilterType, Identity};
use errors::{CatalogError, ParseError};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Directory name holding the shared filter lists of a category
pub const MATCHING_DIR: &str = "Matching";

const PRODUCTS_DIR: &str = "Products";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    Product {
        category: String,
        brand_dir: String,
        model_stem: String,
    },
    Filter {
        category: String,
        filter_type: FilterType,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub kind: SourceKind,
}

impl SourceFile {
    /// Identity implied by the file location (`<Brand>/<Model>.yml`)
    ///
    /// Used only to keep unparseable files from looking like removed ones.
    pub fn identity_hint(&self) -> Option<Identity> {
        match &self.kind {
            SourceKind::Product {
                brand_dir,
                model_stem,
                ..
            } => Some(Identity::new(brand_dir, model_stem)),
            SourceKind::Filter { .. } => None,
        }
    }

    pub fn category(&self) -> &str {
        match &self.kind {
            SourceKind::Product { category, .. } | SourceKind::Filter { category, .. } => category,
        }
    }

    pub fn filter_type(&self) -> Option<FilterType> {
        match &self.kind {
            SourceKind::Filter { filter_type, .. } => Some(*filter_type),
            SourceKind::Product { .. } => None,
        }
    }
}

/// Find the `Products/` directory for a source root
///
/// Accepts the directory containing `Products/` or any directory laid out like
/// it (including `Products/` itself).
pub fn resolve_products_dir(root: &Path) -> Result<PathBuf> {
    if !root.exists() {
        return Err(CatalogError::SourceRoot {
            path: root.to_path_buf(),
            reason: "does not exist".to_string(),
        });
    }
    if !root.is_dir() {
        return Err(CatalogError::SourceRoot {
            path: root.to_path_buf(),
            reason: "is not a directory".to_string(),
        });
    }

    let nested = root.join(PRODUCTS_DIR);
    if nested.is_dir() {
        Ok(nested)
    } else {
        Ok(root.to_path_buf())
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yml") | Some("yaml")
    )
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Classify a file by its position under `Products/`
fn classify(products_dir: &Path, path: &Path) -> Option<SourceKind> {
    if !is_yaml(path) {
        return None;
    }
    let relative = path.strip_prefix(products_dir).ok()?;
    let parts: Vec<&str> = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;

    let [category, dir, file] = parts.as_slice() else {
        return None;
    };
    if parts.iter().any(|p| is_hidden(p)) {
        return None;
    }
    let stem = Path::new(file).file_stem()?.to_str()?;

    if *dir == MATCHING_DIR {
        FilterType::from_file_stem(stem).map(|filter_type| SourceKind::Filter {
            category: category.to_string(),
            filter_type,
        })
    } else {
        Some(SourceKind::Product {
            category: category.to_string(),
            brand_dir: dir.to_string(),
            model_stem: stem.to_string(),
        })
    }
}

/// Walk the tree and return every recognised source file, sorted by path
///
/// Directory entries that cannot be read are reported as parse errors.
pub fn discover(products_dir: &Path) -> (Vec<SourceFile>, Vec<ParseError>) {
    let mut files = Vec::new();
    let mut errors = Vec::new();

    for entry in WalkDir::new(products_dir)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| products_dir.to_path_buf());
                errors.push(ParseError::new(path, e));
                continue;
            },
        };
        if !entry.file_type().is_file() {
            continue;
        }

        match classify(products_dir, entry.path()) {
            Some(kind) => files.push(SourceFile {
                path: entry.path().to_path_buf(),
                kind,
            }),
            None => debug!("Ignoring {:?}", entry.path()),
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    (files, errors)
}
