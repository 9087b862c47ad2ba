//! Reconciler
//!
//! Pure diff between a validated batch and what the store holds. Nothing here
//! touches the database, so the same plan drives `sync`, `sync --dry-run` and
//! `prune`.

use crate::validator::ValidatedBatch;
use catalog_model::{ContentHash, FilterKey, FilterKeyword, Identity, ProductRecord};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Identities and content hashes currently stored
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    pub products: HashMap<Identity, ContentHash>,
    pub filters: HashMap<FilterKey, ContentHash>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanOp {
    Create,
    Update,
    Unchanged,
}

impl PlanOp {
    fn classify(stored: Option<&ContentHash>, hash: &ContentHash) -> Self {
        match stored {
            None => Self::Create,
            Some(stored) if stored == hash => Self::Unchanged,
            Some(_) => Self::Update,
        }
    }

    pub fn is_write(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

#[derive(Debug, Clone)]
pub struct ProductUnit {
    pub record: ProductRecord,
    pub source: PathBuf,
    pub op: PlanOp,
    pub hash: ContentHash,
}

#[derive(Debug, Clone)]
pub struct FilterUnit {
    pub keyword: FilterKeyword,
    pub op: PlanOp,
    pub hash: ContentHash,
}

#[derive(Debug, Clone, Default)]
pub struct SyncPlan {
    /// Sorted by identity
    pub products: Vec<ProductUnit>,
    /// Sorted by `(filter_type, keyword)`
    pub filters: Vec<FilterUnit>,
    /// Stored identities no source file claims
    pub orphaned_products: Vec<Identity>,
    /// Stored keywords missing from a cleanly read filter set
    pub orphaned_filters: Vec<FilterKey>,
}

impl SyncPlan {
    pub fn product_count(&self, op: PlanOp) -> usize {
        self.products.iter().filter(|u| u.op == op).count()
    }

    pub fn filter_count(&self, op: PlanOp) -> usize {
        self.filters.iter().filter(|u| u.op == op).count()
    }

    /// Whether applying the plan would write anything
    pub fn has_writes(&self) -> bool {
        self.products.iter().any(|u| u.op.is_write()) || self.filters.iter().any(|u| u.op.is_write())
    }
}

/// Classify every record in `batch` against `snapshot`
pub fn reconcile(batch: &ValidatedBatch, snapshot: &StoreSnapshot) -> SyncPlan {
    let mut products: Vec<ProductUnit> = batch
        .products
        .iter()
        .map(|product| {
            let hash = product.record.content_hash();
            ProductUnit {
                op: PlanOp::classify(snapshot.products.get(&product.record.identity), &hash),
                record: product.record.clone(),
                source: product.source.clone(),
                hash,
            }
        })
        .collect();
    products.sort_by(|a, b| a.record.identity.cmp(&b.record.identity));

    let mut filters: Vec<FilterUnit> = batch
        .filters
        .iter()
        .map(|keyword| {
            let hash = keyword.content_hash();
            FilterUnit {
                op: PlanOp::classify(snapshot.filters.get(&keyword.key()), &hash),
                keyword: keyword.clone(),
                hash,
            }
        })
        .collect();
    filters.sort_by_key(|u| u.keyword.key());

    let mut orphaned_products: Vec<Identity> = snapshot
        .products
        .keys()
        .filter(|identity| !batch.claimed.contains(identity))
        .cloned()
        .collect();
    orphaned_products.sort();

    let listed: std::collections::HashSet<FilterKey> =
        batch.filters.iter().map(FilterKeyword::key).collect();
    let mut orphaned_filters: Vec<FilterKey> = snapshot
        .filters
        .keys()
        .filter(|key| !batch.suppressed_filter_types.contains(&key.filter_type))
        .filter(|key| !listed.contains(key))
        .cloned()
        .collect();
    orphaned_filters.sort();

    SyncPlan {
        products,
        filters,
        orphaned_products,
        orphaned_filters,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::ValidatedProduct;
    use catalog_model::{FilterType, Pricing};
    use rust_decimal::Decimal;

    fn record(brand: &str, model: &str, sell: i64) -> ProductRecord {
        ProductRecord {
            identity: Identity::new(brand, model),
            full_name: format!("{} {}", brand, model),
            category: "Cameras".to_string(),
            pricing: Pricing::new(Decimal::from(70), Decimal::from(100), Decimal::from(sell)),
            active: true,
            aliases: vec![],
            fuzzy_patterns: vec![],
        }
    }

    fn batch(records: Vec<ProductRecord>, filters: Vec<FilterKeyword>) -> ValidatedBatch {
        let claimed = records.iter().map(|r| r.identity.clone()).collect();
        ValidatedBatch {
            products: records
                .into_iter()
                .map(|record| ValidatedProduct {
                    source: PathBuf::from(format!("{}.yml", record.identity.model())),
                    record,
                })
                .collect(),
            filters,
            claimed,
            ..ValidatedBatch::default()
        }
    }

    #[test]
    fn three_way_classification() {
        let unchanged = record("Canon", "600D", 150);
        let changed = record("Canon", "700D", 150);

        let mut snapshot = StoreSnapshot::default();
        snapshot
            .products
            .insert(Identity::new("CANON", "600d"), unchanged.content_hash());
        snapshot
            .products
            .insert(changed.identity.clone(), record("Canon", "700D", 140).content_hash());
        snapshot
            .products
            .insert(Identity::new("Nikon", "D7000"), record("Nikon", "D7000", 150).content_hash());

        let plan = reconcile(
            &batch(vec![changed, record("Sony", "A7", 150), unchanged], vec![]),
            &snapshot,
        );

        let ops: Vec<_> = plan
            .products
            .iter()
            .map(|u| (u.record.identity.model().to_string(), u.op))
            .collect();
        assert_eq!(
            ops,
            vec![
                ("600D".to_string(), PlanOp::Unchanged),
                ("700D".to_string(), PlanOp::Update),
                ("A7".to_string(), PlanOp::Create),
            ]
        );
        assert_eq!(plan.orphaned_products, vec![Identity::new("Nikon", "D7000")]);
        assert!(plan.has_writes());
    }

    #[test]
    fn claimed_but_invalid_is_not_orphaned() {
        let mut snapshot = StoreSnapshot::default();
        snapshot
            .products
            .insert(Identity::new("Canon", "600D"), record("Canon", "600D", 150).content_hash());

        let mut batch = batch(vec![], vec![]);
        batch.claimed.insert(Identity::new("canon", "600d"));

        let plan = reconcile(&batch, &snapshot);
        assert!(plan.orphaned_products.is_empty());
        assert!(!plan.has_writes());
    }

    #[test]
    fn filter_orphans_respect_suppression() {
        let broken = FilterKeyword::new("broken", FilterType::Reject, None);
        let mut snapshot = StoreSnapshot::default();
        snapshot.filters.insert(broken.key(), broken.content_hash());
        snapshot
            .filters
            .insert(FilterKey::new("parts", FilterType::Reject), broken.content_hash());
        snapshot
            .filters
            .insert(FilterKey::new("mint", FilterType::Boost), broken.content_hash());

        let mut batch = batch(vec![], vec![broken]);
        let plan = reconcile(&batch, &snapshot);
        assert_eq!(plan.filter_count(PlanOp::Unchanged), 1);
        assert_eq!(
            plan.orphaned_filters,
            vec![
                FilterKey::new("parts", FilterType::Reject),
                FilterKey::new("mint", FilterType::Boost),
            ]
        );

        batch.suppressed_filter_types.insert(FilterType::Boost);
        let plan = reconcile(&batch, &snapshot);
        assert_eq!(
            plan.orphaned_filters,
            vec![FilterKey::new("parts", FilterType::Reject)]
        );
    }
}
