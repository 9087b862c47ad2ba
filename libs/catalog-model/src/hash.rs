//! Content hashes
//!
//! A SHA-256 digest over a canonical, length-prefixed encoding of named fields.
//! Field order is fixed by the caller, so the same record always produces the
//! same hash regardless of how its source file was formatted.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

/// Lowercase hex SHA-256 digest
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ContentHash(String);

impl ContentHash {
    /// Wrap a digest read back from the store
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Incremental builder for a [`ContentHash`]
pub(crate) struct ContentHasher {
    inner: Sha256,
}

impl ContentHasher {
    pub(crate) fn new(kind: &str) -> Self {
        let mut hasher = Self {
            inner: Sha256::new(),
        };
        hasher.field("kind", kind);
        hasher
    }

    pub(crate) fn field(&mut self, name: &str, value: &str) -> &mut Self {
        self.chunk(name.as_bytes());
        self.chunk(value.as_bytes());
        self
    }

    pub(crate) fn list(&mut self, name: &str, values: &[String]) -> &mut Self {
        self.field(name, &values.len().to_string());
        for value in values {
            self.chunk(value.as_bytes());
        }
        self
    }

    fn chunk(&mut self, bytes: &[u8]) {
        self.inner.update((bytes.len() as u64).to_le_bytes());
        self.inner.update(bytes);
    }

    pub(crate) fn finish(self) -> ContentHash {
        ContentHash(hex::encode(self.inner.finalize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_boundaries_are_unambiguous() {
        let mut a = ContentHasher::new("t");
        a.field("x", "ab").field("y", "c");
        let mut b = ContentHasher::new("t");
        b.field("x", "a").field("y", "bc");
        assert_ne!(a.finish(), b.finish());
    }

    #[test]
    fn list_order_matters() {
        let mut a = ContentHasher::new("t");
        a.list("aliases", &["a".to_string(), "b".to_string()]);
        let mut b = ContentHasher::new("t");
        b.list("aliases", &["b".to_string(), "a".to_string()]);
        assert_ne!(a.finish(), b.finish());
    }
}
