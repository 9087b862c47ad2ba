//! Product rows and their child collections

use super::CatalogStore;
use catalog_model::{format_price, ContentHash, Identity, ProductRecord};
use serde::Serialize;
use sqlx::{Sqlite, Transaction};
use std::collections::HashMap;

/// A product row as stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub brand: String,
    pub model: String,
    pub full_name: String,
    pub category: String,
    pub buy_price_min: String,
    pub buy_price_max: String,
    pub sell_target: String,
    pub active: bool,
    pub content_hash: String,
    pub created_at: String,
    pub updated_at: String,
}

impl ProductRow {
    pub fn identity(&self) -> Identity {
        Identity::new(&self.brand, &self.model)
    }
}

const UPSERT_PRODUCT: &str = r#"
    INSERT INTO products (
        brand, model, brand_key, model_key, full_name, category,
        buy_price_min, buy_price_max, sell_target, active, content_hash
    )
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT(brand_key, model_key) DO UPDATE SET
        brand = excluded.brand,
        model = excluded.model,
        full_name = excluded.full_name,
        category = excluded.category,
        buy_price_min = excluded.buy_price_min,
        buy_price_max = excluded.buy_price_max,
        sell_target = excluded.sell_target,
        active = excluded.active,
        content_hash = excluded.content_hash
    RETURNING id
"#;

async fn replace_children(
    tx: &mut Transaction<'_, Sqlite>,
    product_id: i64,
    table: &str,
    column: &str,
    values: &[String],
) -> Result<(), sqlx::Error> {
    sqlx::query(&format!("DELETE FROM {} WHERE product_id = ?", table))
        .bind(product_id)
        .execute(&mut **tx)
        .await?;

    let insert = format!(
        "INSERT INTO {} (product_id, {}, position) VALUES (?, ?, ?)",
        table, column
    );
    for (position, value) in values.iter().enumerate() {
        sqlx::query(&insert)
            .bind(product_id)
            .bind(value)
            .bind(position as i64)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

impl CatalogStore {
    /// Upsert one product and replace its aliases and fuzzy patterns
    ///
    /// Runs in a single transaction; an error leaves the store as it was.
    /// Returns the product id.
    pub async fn apply_product(
        &self,
        record: &ProductRecord,
        hash: &ContentHash,
    ) -> Result<i64, sqlx::Error> {
        let (brand_key, model_key) = record.identity.key();
        let mut tx = self.pool().begin().await?;

        let product_id: i64 = sqlx::query_scalar(UPSERT_PRODUCT)
            .bind(record.identity.brand())
            .bind(record.identity.model())
            .bind(&brand_key)
            .bind(&model_key)
            .bind(&record.full_name)
            .bind(&record.category)
            .bind(format_price(record.pricing.buy_min))
            .bind(format_price(record.pricing.buy_max))
            .bind(format_price(record.pricing.sell_target))
            .bind(record.active)
            .bind(hash.as_str())
            .fetch_one(&mut *tx)
            .await?;

        replace_children(&mut tx, product_id, "product_aliases", "alias", &record.aliases).await?;
        replace_children(
            &mut tx,
            product_id,
            "product_fuzzy_patterns",
            "pattern",
            &record.fuzzy_patterns,
        )
        .await?;

        tx.commit().await?;
        Ok(product_id)
    }

    /// Delete a product; aliases and patterns go with it
    ///
    /// Returns whether a row was removed.
    pub async fn delete_product(&self, identity: &Identity) -> Result<bool, sqlx::Error> {
        let (brand_key, model_key) = identity.key();
        let mut tx = self.pool().begin().await?;
        let result = sqlx::query("DELETE FROM products WHERE brand_key = ? AND model_key = ?")
            .bind(brand_key)
            .bind(model_key)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn find_product(&self, identity: &Identity) -> Result<Option<ProductRow>, sqlx::Error> {
        let (brand_key, model_key) = identity.key();
        sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, brand, model, full_name, category,
                   buy_price_min, buy_price_max, sell_target, active,
                   content_hash, created_at, updated_at
            FROM products
            WHERE brand_key = ? AND model_key = ?
            "#,
        )
        .bind(brand_key)
        .bind(model_key)
        .fetch_optional(self.pool())
        .await
    }

    /// Aliases in stored order
    pub async fn aliases_of(&self, product_id: i64) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT alias FROM product_aliases WHERE product_id = ? ORDER BY position, id",
        )
        .bind(product_id)
        .fetch_all(self.pool())
        .await
    }

    /// Fuzzy patterns in stored order
    pub async fn fuzzy_patterns_of(&self, product_id: i64) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT pattern FROM product_fuzzy_patterns WHERE product_id = ? ORDER BY position, id",
        )
        .bind(product_id)
        .fetch_all(self.pool())
        .await
    }

    pub(crate) async fn product_hashes(&self) -> Result<HashMap<Identity, ContentHash>, sqlx::Error> {
        let rows: Vec<(String, String, String)> =
            sqlx::query_as("SELECT brand, model, content_hash FROM products")
                .fetch_all(self.pool())
                .await?;

        Ok(rows
            .into_iter()
            .map(|(brand, model, hash)| (Identity::new(brand, model), ContentHash::from_hex(hash)))
            .collect())
    }
}
