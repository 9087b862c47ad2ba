//! Catalog sync engine
//!
//! Mirrors the YAML product tree (`Products/<Category>/<Brand>/<Model>.yml`
//! plus `Products/<Category>/Matching/filters_*.yml`) into a SQLite store.
//!
//! One run goes through these stages:
//! 1. [`loader`] walks the tree and parses every file
//! 2. [`validator`] turns documents into records and rejects bad ones
//! 3. [`reconciler`] compares records against a store snapshot
//! 4. [`engine`] applies each unit in its own transaction and records the
//!    outcome through [`changelog`]
//!
//! ```no_run
//! use catalog_sync::{SyncEngine, SyncOptions, store::CatalogStore};
//! use common::{CancellationToken, SqliteClient, SqliteSettings};
//!
//! # async fn run() -> errors::CatalogResult<()> {
//! let client = SqliteClient::connect("sqlite://data/catalog.db", &SqliteSettings::default()).await?;
//! let engine = SyncEngine::new(CatalogStore::new(client.pool().clone()), SyncOptions::default());
//! let summary = engine.run("catalog".as_ref(), &CancellationToken::new()).await?;
//! println!("{} products created", summary.products.created);
//! # Ok(())
//! # }
//! ```

pub mod changelog;
pub mod engine;
pub mod loader;
pub mod reconciler;
pub mod source;
pub mod store;
pub mod summary;
pub mod validator;

pub use changelog::{ChangeEntry, ChangeLog, EntityKind, Operation, Outcome};
pub use engine::{PruneReport, SyncEngine, SyncOptions};
pub use loader::{LoadFailure, LoadOutcome, RawDocument, RecordLoader};
pub use reconciler::{reconcile, PlanOp, StoreSnapshot, SyncPlan};
pub use source::{SourceFile, SourceKind};
pub use summary::{OpCounts, SyncSummary};
pub use validator::{ValidatedBatch, ValidatedProduct};

pub type Result<T> = errors::CatalogResult<T>;
