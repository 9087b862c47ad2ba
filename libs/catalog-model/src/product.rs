//! Validated product records

use crate::hash::{ContentHash, ContentHasher};
use crate::identity::Identity;
use crate::pricing::{format_price, Pricing};
use serde::Serialize;
use std::collections::HashSet;

/// A camera product as it should exist in the store
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRecord {
    pub identity: Identity,
    pub full_name: String,
    /// Informational only, not checked against any list
    pub category: String,
    pub pricing: Pricing,
    pub active: bool,
    /// Canonical alternative names, in source order
    pub aliases: Vec<String>,
    /// Typo and formatting variants, in source order
    pub fuzzy_patterns: Vec<String>,
}

impl ProductRecord {
    /// Digest over every field that affects matching or pricing
    pub fn content_hash(&self) -> ContentHash {
        let mut hasher = ContentHasher::new("product");
        hasher
            .field("brand", self.identity.brand())
            .field("model", self.identity.model())
            .field("full_name", &self.full_name)
            .field("category", &self.category)
            .field("buy_min", &format_price(self.pricing.buy_min))
            .field("buy_max", &format_price(self.pricing.buy_max))
            .field("sell_target", &format_price(self.pricing.sell_target))
            .field("active", if self.active { "true" } else { "false" })
            .list("aliases", &self.aliases)
            .list("fuzzy_patterns", &self.fuzzy_patterns);
        hasher.finish()
    }
}

/// Drop case-insensitive duplicates, keeping the first occurrence
///
/// Returns the kept values in order and the dropped ones.
pub fn collapse_duplicates<I>(values: I) -> (Vec<String>, Vec<String>)
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    let mut kept = Vec::new();
    let mut dropped = Vec::new();
    for value in values {
        if seen.insert(value.to_lowercase()) {
            kept.push(value);
        } else {
            dropped.push(value);
        }
    }
    (kept, dropped)
}
