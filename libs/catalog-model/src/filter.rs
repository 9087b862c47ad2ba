//! Shared listing filter keywords
//!
//! Keywords are global: they are not owned by any product. A `reject` keyword
//! disqualifies a listing, a `boost` keyword raises match confidence.

use crate::hash::{ContentHash, ContentHasher};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    Reject,
    Boost,
}

impl FilterType {
    pub const ALL: [FilterType; 2] = [FilterType::Reject, FilterType::Boost];

    /// Value stored in the `filter_type` column
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reject => "reject",
            Self::Boost => "boost",
        }
    }

    /// File stem of the source list, e.g. `filters_reject`
    pub fn file_stem(&self) -> &'static str {
        match self {
            Self::Reject => "filters_reject",
            Self::Boost => "filters_boost",
        }
    }

    pub fn from_file_stem(stem: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.file_stem() == stem)
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
#[error("unknown filter type '{0}' (expected reject or boost)")]
pub struct UnknownFilterType(pub String);

impl FromStr for FilterType {
    type Err = UnknownFilterType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "boost" => Ok(Self::Boost),
            other => Err(UnknownFilterType(other.to_string())),
        }
    }
}

/// Unique key of a filter entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FilterKey {
    pub filter_type: FilterType,
    pub keyword: String,
}

impl FilterKey {
    pub fn new(keyword: impl AsRef<str>, filter_type: FilterType) -> Self {
        Self {
            filter_type,
            keyword: normalize_keyword(keyword.as_ref()),
        }
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.filter_type, self.keyword)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterKeyword {
    pub keyword: String,
    pub filter_type: FilterType,
    pub description: Option<String>,
}

impl FilterKeyword {
    pub fn new(keyword: impl AsRef<str>, filter_type: FilterType, description: Option<String>) -> Self {
        Self {
            keyword: normalize_keyword(keyword.as_ref()),
            filter_type,
            description: description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
        }
    }

    pub fn key(&self) -> FilterKey {
        FilterKey {
            filter_type: self.filter_type,
            keyword: self.keyword.clone(),
        }
    }

    pub fn content_hash(&self) -> ContentHash {
        let mut hasher = ContentHasher::new("filter_keyword");
        hasher
            .field("keyword", &self.keyword)
            .field("filter_type", self.filter_type.as_str())
            .field("description", self.description.as_deref().unwrap_or(""));
        hasher.finish()
    }
}

fn normalize_keyword(keyword: &str) -> String {
    keyword.trim().to_lowercase()
}
