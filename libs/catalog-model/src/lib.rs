//! Catalog Model Library
//!
//! Pure data types for the camera catalog. No database or IO dependencies.
//!
//! # Modules
//!
//! - `identity`: the case-insensitive `(brand, model)` identity pair
//! - `pricing`: exact two-decimal price triples and their ordering rules
//! - `product`: validated product records
//! - `filter`: shared reject / boost keywords
//! - `hash`: content hashes used to detect no-op syncs
//!
//! # Example
//!
//! ```
//! use catalog_model::{Identity, Pricing, ProductRecord};
//! use rust_decimal::Decimal;
//!
//! let record = ProductRecord {
//!     identity: Identity::new("Canon", "600D"),
//!     full_name: "Canon EOS 600D".to_string(),
//!     category: "Cameras".to_string(),
//!     pricing: Pricing::new(Decimal::from(70), Decimal::from(100), Decimal::from(150)),
//!     active: true,
//!     aliases: vec!["600d".to_string(), "eos 600d".to_string()],
//!     fuzzy_patterns: vec![],
//! };
//!
//! assert_eq!(record.identity, Identity::new("CANON", "600d"));
//! assert_eq!(record.pricing.sell_target.to_string(), "150.00");
//! assert_eq!(record.content_hash().as_str().len(), 64);
//! ```

pub mod filter;
pub mod hash;
pub mod identity;
pub mod pricing;
pub mod product;

// Re-exports for convenience
pub use filter::{FilterKey, FilterKeyword, FilterType, UnknownFilterType};
pub use hash::ContentHash;
pub use identity::Identity;
pub use pricing::{format_price, has_excess_precision, Pricing, PRICE_SCALE};
pub use product::{collapse_duplicates, ProductRecord};
