//! Product identity
//!
//! A product is identified by its `(brand, model)` pair. Comparison, hashing and
//! ordering use the trimmed, lowercased pair; the display casing is kept as
//! written in the source file.

use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Serialize)]
pub struct Identity {
    brand: String,
    model: String,
}

impl Identity {
    pub fn new(brand: impl AsRef<str>, model: impl AsRef<str>) -> Self {
        Self {
            brand: brand.as_ref().trim().to_string(),
            model: model.as_ref().trim().to_string(),
        }
    }

    pub fn brand(&self) -> &str {
        &self.brand
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Normalized comparison key
    pub fn key(&self) -> (String, String) {
        (self.brand.to_lowercase(), self.model.to_lowercase())
    }
}

impl PartialEq for Identity {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Identity {}

impl Hash for Identity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for Identity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Identity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.brand, self.model)
    }
}
