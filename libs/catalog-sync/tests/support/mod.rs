//! Shared fixtures for the catalog-sync integration tests

#![allow(dead_code)]

use catalog_sync::store::CatalogStore;
use catalog_sync::{SyncEngine, SyncOptions};
use common::{SqliteClient, SqliteSettings};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const CANON_600D: &str = r#"
brand: Canon
model: 600D
full_name: Canon EOS 600D
category: Cameras
pricing:
  buy_min: 70
  buy_max: 100
  sell_target: 150
active: true
aliases:
  - 600d
  - eos 600d
fuzzy_patterns:
  - eos 600 d
"#;

pub const NIKON_D7000: &str = r#"
brand: Nikon
model: D7000
full_name: Nikon D7000
pricing:
  buy_min: 120
  buy_max: 180
  sell_target: 260
aliases: [d7000]
"#;

/// A source tree plus a file-backed store
pub struct Fixture {
    pub source: TempDir,
    pub db: TempDir,
    pub store: CatalogStore,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_settings(SqliteSettings::default()).await
    }

    pub async fn with_settings(settings: SqliteSettings) -> Self {
        let source = tempfile::tempdir().unwrap();
        let db = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", db.path().join("catalog.db").display());
        let client = SqliteClient::connect(&url, &settings).await.unwrap();
        let store = CatalogStore::new(client.pool().clone());
        store.init_schema().await.unwrap();
        Self { source, db, store }
    }

    pub fn root(&self) -> &Path {
        self.source.path()
    }

    /// Write `body` at `Products/<rel>`
    pub fn write(&self, rel: &str, body: &str) -> PathBuf {
        let path = self.source.path().join("Products").join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, body).unwrap();
        path
    }

    pub fn remove(&self, rel: &str) {
        fs::remove_file(self.source.path().join("Products").join(rel)).unwrap();
    }

    pub fn engine(&self) -> SyncEngine {
        self.engine_with(SyncOptions::default())
    }

    pub fn engine_with(&self, options: SyncOptions) -> SyncEngine {
        SyncEngine::new(self.store.clone(), options)
    }
}
