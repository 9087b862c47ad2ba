//! Filter keyword rows

use super::CatalogStore;
use catalog_model::{ContentHash, FilterKey, FilterKeyword, FilterType};
use std::collections::HashMap;
use tracing::warn;

const UPSERT_FILTER: &str = r#"
    INSERT INTO filter_keywords (keyword, filter_type, description, content_hash)
    VALUES (?, ?, ?, ?)
    ON CONFLICT(keyword, filter_type) DO UPDATE SET
        description = excluded.description,
        content_hash = excluded.content_hash
"#;

impl CatalogStore {
    /// Upsert one filter set in a single transaction
    ///
    /// Every keyword must share `filter_type`'s set; the first failure rolls
    /// the whole set back.
    pub async fn apply_filter_set(
        &self,
        filter_type: FilterType,
        keywords: &[&FilterKeyword],
    ) -> Result<usize, sqlx::Error> {
        let mut tx = self.pool().begin().await?;
        for keyword in keywords {
            debug_assert_eq!(keyword.filter_type, filter_type);
            sqlx::query(UPSERT_FILTER)
                .bind(&keyword.keyword)
                .bind(filter_type.as_str())
                .bind(keyword.description.as_deref())
                .bind(keyword.content_hash().to_string())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(keywords.len())
    }

    pub async fn delete_filter(&self, key: &FilterKey) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool().begin().await?;
        let result = sqlx::query("DELETE FROM filter_keywords WHERE keyword = ? AND filter_type = ?")
            .bind(&key.keyword)
            .bind(key.filter_type.as_str())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    /// Stored keywords of one type, sorted
    pub async fn list_filters(&self, filter_type: FilterType) -> Result<Vec<FilterKeyword>, sqlx::Error> {
        let rows: Vec<(String, Option<String>)> = sqlx::query_as(
            "SELECT keyword, description FROM filter_keywords WHERE filter_type = ? ORDER BY keyword",
        )
        .bind(filter_type.as_str())
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|(keyword, description)| FilterKeyword::new(keyword, filter_type, description))
            .collect())
    }

    pub(crate) async fn filter_hashes(&self) -> Result<HashMap<FilterKey, ContentHash>, sqlx::Error> {
        let rows: Vec<(String, String, String)> =
            sqlx::query_as("SELECT keyword, filter_type, content_hash FROM filter_keywords")
                .fetch_all(self.pool())
                .await?;

        let mut hashes = HashMap::with_capacity(rows.len());
        for (keyword, filter_type, hash) in rows {
            match filter_type.parse::<FilterType>() {
                Ok(filter_type) => {
                    hashes.insert(FilterKey::new(keyword, filter_type), ContentHash::from_hex(hash));
                },
                Err(e) => warn!("Skipping stored keyword '{}': {}", keyword, e),
            }
        }
        Ok(hashes)
    }
}
