//! Store schema
//!
//! All statements are idempotent so `init_schema` runs at the start of every
//! command that touches the store.

use sqlx::SqlitePool;
use tracing::debug;

/// Products keyed by the lowercased identity; display casing kept in
/// `brand` / `model`. Prices are canonical two-digit decimal text.
pub const PRODUCTS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS products (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        brand TEXT NOT NULL,
        model TEXT NOT NULL,
        brand_key TEXT NOT NULL,
        model_key TEXT NOT NULL,
        full_name TEXT NOT NULL,
        category TEXT NOT NULL,
        buy_price_min TEXT NOT NULL,
        buy_price_max TEXT NOT NULL,
        sell_target TEXT NOT NULL,
        active INTEGER NOT NULL DEFAULT 1 CHECK(active IN (0, 1)),
        content_hash TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
        updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
        UNIQUE(brand_key, model_key)
    )
"#;

pub const PRODUCT_ALIASES_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS product_aliases (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        product_id INTEGER NOT NULL REFERENCES products(id) ON DELETE CASCADE,
        alias TEXT NOT NULL,
        position INTEGER NOT NULL
    )
"#;

pub const PRODUCT_FUZZY_PATTERNS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS product_fuzzy_patterns (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        product_id INTEGER NOT NULL REFERENCES products(id) ON DELETE CASCADE,
        pattern TEXT NOT NULL,
        position INTEGER NOT NULL
    )
"#;

pub const FILTER_KEYWORDS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS filter_keywords (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        keyword TEXT NOT NULL,
        filter_type TEXT NOT NULL CHECK(filter_type IN ('reject', 'boost')),
        description TEXT,
        content_hash TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
        updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
        UNIQUE(keyword, filter_type)
    )
"#;

pub const SYNC_RUNS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS sync_runs (
        id TEXT PRIMARY KEY,
        kind TEXT NOT NULL CHECK(kind IN ('sync', 'prune')),
        source_root TEXT NOT NULL,
        started_at TEXT NOT NULL,
        finished_at TEXT,
        status TEXT NOT NULL
            CHECK(status IN ('running', 'completed', 'partial', 'cancelled')),
        created INTEGER NOT NULL DEFAULT 0,
        updated INTEGER NOT NULL DEFAULT 0,
        unchanged INTEGER NOT NULL DEFAULT 0,
        deleted INTEGER NOT NULL DEFAULT 0,
        orphaned INTEGER NOT NULL DEFAULT 0,
        failed INTEGER NOT NULL DEFAULT 0,
        skipped INTEGER NOT NULL DEFAULT 0,
        rejected INTEGER NOT NULL DEFAULT 0
    )
"#;

pub const SYNC_CHANGES_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS sync_changes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        run_id TEXT NOT NULL REFERENCES sync_runs(id) ON DELETE CASCADE,
        entity TEXT NOT NULL CHECK(entity IN ('product', 'filter')),
        identity TEXT NOT NULL,
        operation TEXT NOT NULL
            CHECK(operation IN ('create', 'update', 'delete', 'orphaned', 'skipped')),
        outcome TEXT NOT NULL
            CHECK(outcome IN ('applied', 'failed', 'skipped', 'reported')),
        detail TEXT,
        recorded_at TEXT NOT NULL
    )
"#;

/// At most one row: the run currently allowed to write
pub const SYNC_LOCK_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS sync_lock (
        id INTEGER PRIMARY KEY CHECK(id = 1),
        holder TEXT NOT NULL,
        acquired_at TEXT NOT NULL
    )
"#;

const TABLES: &[&str] = &[
    PRODUCTS_TABLE,
    PRODUCT_ALIASES_TABLE,
    PRODUCT_FUZZY_PATTERNS_TABLE,
    FILTER_KEYWORDS_TABLE,
    SYNC_RUNS_TABLE,
    SYNC_CHANGES_TABLE,
    SYNC_LOCK_TABLE,
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_product_aliases_product ON product_aliases(product_id)",
    "CREATE INDEX IF NOT EXISTS idx_product_fuzzy_patterns_product ON product_fuzzy_patterns(product_id)",
    "CREATE INDEX IF NOT EXISTS idx_products_category ON products(category)",
    "CREATE INDEX IF NOT EXISTS idx_filter_keywords_type ON filter_keywords(filter_type)",
    "CREATE INDEX IF NOT EXISTS idx_sync_changes_run ON sync_changes(run_id)",
    "CREATE INDEX IF NOT EXISTS idx_sync_runs_started ON sync_runs(started_at)",
];

// Only fire when the statement left updated_at alone, so the inner UPDATE
// does not retrigger.
const TRIGGERS: &[&str] = &[
    r#"
    CREATE TRIGGER IF NOT EXISTS trg_products_updated_at
    AFTER UPDATE ON products
    FOR EACH ROW WHEN NEW.updated_at = OLD.updated_at
    BEGIN
        UPDATE products
        SET updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = NEW.id;
    END
    "#,
    r#"
    CREATE TRIGGER IF NOT EXISTS trg_filter_keywords_updated_at
    AFTER UPDATE ON filter_keywords
    FOR EACH ROW WHEN NEW.updated_at = OLD.updated_at
    BEGIN
        UPDATE filter_keywords
        SET updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = NEW.id;
    END
    "#,
];

/// Create every table, index and trigger that does not exist yet
pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for statement in TABLES.iter().chain(INDEXES).chain(TRIGGERS) {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    debug!(
        "Schema ready ({} tables, {} indexes, {} triggers)",
        TABLES.len(),
        INDEXES.len(),
        TRIGGERS.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_identity_is_unique_on_keys() {
        assert!(PRODUCTS_TABLE.contains("UNIQUE(brand_key, model_key)"));
        assert!(PRODUCTS_TABLE.contains("buy_price_min TEXT NOT NULL"));
    }

    #[test]
    fn children_cascade_with_parent() {
        for table in [PRODUCT_ALIASES_TABLE, PRODUCT_FUZZY_PATTERNS_TABLE] {
            assert!(table.contains("REFERENCES products(id) ON DELETE CASCADE"));
        }
    }

    #[test]
    fn filter_keywords_constraints() {
        assert!(FILTER_KEYWORDS_TABLE.contains("UNIQUE(keyword, filter_type)"));
        assert!(FILTER_KEYWORDS_TABLE.contains("CHECK(filter_type IN ('reject', 'boost'))"));
    }
}
