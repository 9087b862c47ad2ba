//! Validator
//!
//! Turns raw YAML documents into [`ProductRecord`]s and [`FilterKeyword`]s.
//! Every rule is checked so one rejection lists every problem in the file.
//! Product identities claimed by more than one file are rejected as a group.

use crate::loader::{LoadOutcome, RawDocument, RecordLoader};
use crate::source::SourceKind;
use crate::Result;
use catalog_model::{
    collapse_duplicates, has_excess_precision, FilterKey, FilterKeyword, FilterType, Identity,
    Pricing, ProductRecord,
};
use errors::{DuplicateIdentityError, ParseError, ValidationError, Violation};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info, warn};

const PRODUCT_KEYS: &[&str] = &[
    "brand",
    "model",
    "full_name",
    "category",
    "pricing",
    "active",
    "aliases",
    "fuzzy_patterns",
];
const PRICING_KEYS: &[&str] = &["buy_min", "buy_max", "sell_target"];
const FILTER_FILE_KEYS: &[&str] = &["description", "keywords"];

/// Non-fatal finding about an accepted file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationWarning {
    pub path: PathBuf,
    pub message: String,
}

impl ValidationWarning {
    fn new(path: &Path, message: impl Into<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

/// Why a source file was kept out of the store
#[derive(Debug, Clone, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rejection {
    #[error(transparent)]
    Parse(ParseError),
    #[error(transparent)]
    Invalid(ValidationError),
    #[error(transparent)]
    Duplicate(DuplicateIdentityError),
}

impl Rejection {
    pub fn path(&self) -> &Path {
        match self {
            Self::Parse(e) => &e.path,
            Self::Invalid(e) => &e.path,
            Self::Duplicate(e) => &e.path,
        }
    }
}

/// A product that passed every check
#[derive(Debug, Clone)]
pub struct ValidatedProduct {
    pub record: ProductRecord,
    pub source: PathBuf,
}

#[derive(Debug, Default)]
pub struct ValidatedBatch {
    /// Sorted by identity
    pub products: Vec<ValidatedProduct>,
    /// Sorted by `(filter_type, keyword)`
    pub filters: Vec<FilterKeyword>,
    /// Sorted by path
    pub rejections: Vec<Rejection>,
    pub warnings: Vec<ValidationWarning>,
    /// Every identity the tree claims, valid or not
    pub claimed: HashSet<Identity>,
    /// Filter types with at least one unusable file
    pub suppressed_filter_types: BTreeSet<FilterType>,
    pub documents_read: usize,
}

impl ValidatedBatch {
    pub fn parse_errors(&self) -> impl Iterator<Item = &ParseError> {
        self.rejections.iter().filter_map(|r| match r {
            Rejection::Parse(e) => Some(e),
            _ => None,
        })
    }

    pub fn validation_errors(&self) -> impl Iterator<Item = &ValidationError> {
        self.rejections.iter().filter_map(|r| match r {
            Rejection::Invalid(e) => Some(e),
            _ => None,
        })
    }

    pub fn duplicate_errors(&self) -> impl Iterator<Item = &DuplicateIdentityError> {
        self.rejections.iter().filter_map(|r| match r {
            Rejection::Duplicate(e) => Some(e),
            _ => None,
        })
    }

    pub fn is_clean(&self) -> bool {
        self.rejections.is_empty()
    }
}

// ============================================================================
// Field readers
// ============================================================================

/// Collects violations while reading one document
struct Checker<'a> {
    path: &'a Path,
    violations: Vec<Violation>,
    warnings: Vec<ValidationWarning>,
}

impl<'a> Checker<'a> {
    fn new(path: &'a Path) -> Self {
        Self {
            path,
            violations: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(ValidationWarning::new(self.path, message));
    }

    fn unknown_keys(&mut self, map: &Mapping, known: &[&str], scope: &str) {
        for key in map.keys() {
            let name = scalar_text(key).unwrap_or_else(|| format!("{:?}", key));
            if !known.contains(&name.as_str()) {
                self.warn(format!("unknown key `{}{}` ignored", scope, name));
            }
        }
    }

    /// Required non-empty text; numbers are accepted and stringified
    fn required_text(&mut self, map: &Mapping, field: &str) -> Option<String> {
        match map.get(field) {
            None | Some(Value::Null) => {
                self.violations.push(Violation::Missing(field.to_string()));
                None
            },
            Some(value) => match scalar_text(value) {
                Some(text) if text.is_empty() => {
                    self.violations.push(Violation::Empty(field.to_string()));
                    None
                },
                Some(text) => Some(text),
                None => {
                    self.violations.push(Violation::WrongType {
                        field: field.to_string(),
                        expected: "a string",
                    });
                    None
                },
            },
        }
    }

    fn optional_text(&mut self, map: &Mapping, field: &str) -> Option<String> {
        match map.get(field) {
            None | Some(Value::Null) => None,
            Some(value) => match scalar_text(value) {
                Some(text) if text.is_empty() => None,
                Some(text) => Some(text),
                None => {
                    self.violations.push(Violation::WrongType {
                        field: field.to_string(),
                        expected: "a string",
                    });
                    None
                },
            },
        }
    }

    fn flag(&mut self, map: &Mapping, field: &str, default: bool) -> bool {
        match map.get(field) {
            None | Some(Value::Null) => default,
            Some(Value::Bool(b)) => *b,
            Some(_) => {
                self.violations.push(Violation::WrongType {
                    field: field.to_string(),
                    expected: "a boolean",
                });
                default
            },
        }
    }

    /// Optional list of non-empty strings, case-insensitive duplicates collapsed
    fn string_list(&mut self, map: &Mapping, field: &str) -> Vec<String> {
        let items = match map.get(field) {
            None | Some(Value::Null) => return Vec::new(),
            Some(Value::Sequence(items)) => items,
            Some(_) => {
                self.violations.push(Violation::WrongType {
                    field: field.to_string(),
                    expected: "a list of strings",
                });
                return Vec::new();
            },
        };

        let mut values = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            match scalar_text(item) {
                Some(text) if !text.is_empty() => values.push(text),
                _ => self.violations.push(Violation::BadListEntry {
                    field: field.to_string(),
                    index,
                }),
            }
        }

        let (kept, dropped) = collapse_duplicates(values);
        for value in dropped {
            self.warn(format!("duplicate {} entry '{}' collapsed", field, value));
        }
        kept
    }

    fn price(&mut self, pricing: &Mapping, name: &str) -> Option<Decimal> {
        let field = format!("pricing.{}", name);
        let value = match pricing.get(name) {
            None | Some(Value::Null) => {
                self.violations.push(Violation::Missing(field));
                return None;
            },
            Some(Value::Number(n)) => number_to_decimal(n),
            Some(_) => None,
        };

        let Some(value) = value else {
            self.violations.push(Violation::WrongType {
                field,
                expected: "a number",
            });
            return None;
        };

        let mut ok = true;
        if value.is_sign_negative() && !value.is_zero() {
            self.violations.push(Violation::Negative {
                field: field.clone(),
                value: value.to_string(),
            });
            ok = false;
        }
        if has_excess_precision(value) {
            self.violations.push(Violation::TooPrecise {
                field,
                value: value.to_string(),
            });
            ok = false;
        }
        ok.then_some(value)
    }

    fn pricing(&mut self, map: &Mapping) -> Option<Pricing> {
        let pricing = match map.get("pricing") {
            None | Some(Value::Null) => {
                self.violations.push(Violation::Missing("pricing".to_string()));
                return None;
            },
            Some(Value::Mapping(pricing)) => pricing,
            Some(_) => {
                self.violations.push(Violation::WrongType {
                    field: "pricing".to_string(),
                    expected: "a mapping",
                });
                return None;
            },
        };

        self.unknown_keys(pricing, PRICING_KEYS, "pricing.");
        let buy_min = self.price(pricing, "buy_min");
        let buy_max = self.price(pricing, "buy_max");
        let sell_target = self.price(pricing, "sell_target");

        let pricing = Pricing::new(buy_min?, buy_max?, sell_target?);
        let ordering = pricing.ordering_violations();
        if ordering.is_empty() {
            Some(pricing)
        } else {
            self.violations.extend(ordering);
            None
        }
    }
}

/// Strings are trimmed; numbers are rendered as written
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number_to_decimal(n: &serde_yaml::Number) -> Option<Decimal> {
    if let Some(i) = n.as_i64() {
        return Some(Decimal::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Some(Decimal::from(u));
    }
    // f64 Display is the shortest text that reads back to the same float
    let f = n.as_f64().filter(|f| f.is_finite())?;
    Decimal::from_str(&f.to_string()).ok()
}

// ============================================================================
// Products
// ============================================================================

/// Identity readable from a document, whether or not the rest is valid
fn declared_identity(doc: &RawDocument) -> Option<Identity> {
    let map = doc.body.as_mapping()?;
    let brand = map.get("brand").and_then(scalar_text)?;
    let model = map.get("model").and_then(scalar_text)?;
    if brand.is_empty() || model.is_empty() {
        return None;
    }
    Some(Identity::new(brand, model))
}

/// Validate one product document
pub fn validate_product(
    doc: &RawDocument,
) -> std::result::Result<(ProductRecord, Vec<ValidationWarning>), ValidationError> {
    let path = doc.source.path.as_path();
    let reject = |violations: Vec<Violation>| ValidationError {
        path: path.to_path_buf(),
        identity: declared_identity(doc).map(|i| i.to_string()),
        violations,
    };

    let Some(map) = doc.body.as_mapping() else {
        return Err(reject(vec![Violation::Shape {
            expected: "a mapping of product fields",
        }]));
    };

    let mut check = Checker::new(path);
    check.unknown_keys(map, PRODUCT_KEYS, "");

    let brand = check.required_text(map, "brand");
    let model = check.required_text(map, "model");
    let full_name = check.required_text(map, "full_name");
    let category = check.optional_text(map, "category");
    let pricing = check.pricing(map);
    let active = check.flag(map, "active", true);
    let aliases = check.string_list(map, "aliases");
    let fuzzy_patterns = check.string_list(map, "fuzzy_patterns");

    if !check.violations.is_empty() {
        return Err(reject(check.violations));
    }

    let (Some(brand), Some(model), Some(full_name), Some(pricing)) =
        (brand, model, full_name, pricing)
    else {
        // every None above pushed a violation
        return Err(reject(vec![Violation::Shape {
            expected: "a complete product",
        }]));
    };

    let category = category.unwrap_or_else(|| doc.source.category().to_string());

    if let SourceKind::Product { brand_dir, .. } = &doc.source.kind {
        if brand.to_lowercase() != brand_dir.trim().to_lowercase() {
            check.warn(format!(
                "brand '{}' does not match directory '{}'",
                brand, brand_dir
            ));
        }
    }

    let record = ProductRecord {
        identity: Identity::new(brand, model),
        full_name,
        category,
        pricing,
        active,
        aliases,
        fuzzy_patterns,
    };
    Ok((record, check.warnings))
}

// ============================================================================
// Filters
// ============================================================================

/// Validate one filter file
///
/// Accepts a flat list (`- broken` or `- {keyword, description}`) or the
/// mapping form `{description, keywords: [...]}`, where the file description
/// applies to entries without their own.
pub fn validate_filters(
    doc: &RawDocument,
    filter_type: FilterType,
) -> std::result::Result<(Vec<FilterKeyword>, Vec<ValidationWarning>), ValidationError> {
    let path = doc.source.path.as_path();
    let mut check = Checker::new(path);

    let (entries, file_description) = match &doc.body {
        Value::Sequence(entries) => (entries.as_slice(), None),
        Value::Mapping(map) => {
            check.unknown_keys(map, FILTER_FILE_KEYS, "");
            let description = check.optional_text(map, "description");
            match map.get("keywords") {
                Some(Value::Sequence(entries)) => (entries.as_slice(), description),
                None | Some(Value::Null) => {
                    check.violations.push(Violation::Missing("keywords".to_string()));
                    (&[][..], description)
                },
                Some(_) => {
                    check.violations.push(Violation::WrongType {
                        field: "keywords".to_string(),
                        expected: "a list",
                    });
                    (&[][..], description)
                },
            }
        },
        _ => {
            check.violations.push(Violation::Shape {
                expected: "a keyword list or mapping",
            });
            (&[][..], None)
        },
    };

    let mut seen: HashSet<FilterKey> = HashSet::new();
    let mut keywords = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let (keyword, description) = match entry {
            Value::Mapping(item) => (
                item.get("keyword").and_then(scalar_text),
                item.get("description")
                    .and_then(scalar_text)
                    .filter(|d| !d.is_empty()),
            ),
            other => (scalar_text(other), None),
        };

        let Some(keyword) = keyword.filter(|k| !k.is_empty()) else {
            check.violations.push(Violation::BadListEntry {
                field: "keywords".to_string(),
                index,
            });
            continue;
        };

        let keyword = FilterKeyword::new(
            keyword,
            filter_type,
            description.or_else(|| file_description.clone()),
        );
        if seen.insert(keyword.key()) {
            keywords.push(keyword);
        } else {
            check.warn(format!("duplicate keyword '{}' collapsed", keyword.keyword));
        }
    }

    if check.violations.is_empty() {
        Ok((keywords, check.warnings))
    } else {
        Err(ValidationError {
            path: path.to_path_buf(),
            identity: None,
            violations: check.violations,
        })
    }
}

// ============================================================================
// Batch
// ============================================================================

struct Claim {
    path: PathBuf,
    /// Index into the accepted products, `None` for an invalid claimant
    accepted: Option<usize>,
}

/// Validate a whole load, applying the cross-file identity check
pub fn validate_batch(outcome: LoadOutcome) -> ValidatedBatch {
    let mut batch = ValidatedBatch {
        documents_read: outcome.total_files(),
        ..ValidatedBatch::default()
    };

    for failure in outcome.errors {
        match &failure.source {
            Some(source) => {
                if let Some(hint) = source.identity_hint() {
                    batch.claimed.insert(hint);
                }
                if let Some(filter_type) = source.filter_type() {
                    batch.suppressed_filter_types.insert(filter_type);
                }
            },
            // unknown file; nothing can be assumed about what it held
            None => batch.suppressed_filter_types.extend(FilterType::ALL),
        }
        batch.rejections.push(Rejection::Parse(failure.error));
    }

    let mut accepted: Vec<Option<ValidatedProduct>> = Vec::new();
    let mut claims: BTreeMap<Identity, Vec<Claim>> = BTreeMap::new();
    let mut filters: BTreeMap<FilterKey, FilterKeyword> = BTreeMap::new();

    for doc in outcome.documents {
        match &doc.source.kind {
            SourceKind::Product { .. } => match validate_product(&doc) {
                Ok((record, warnings)) => {
                    batch.warnings.extend(warnings);
                    claims
                        .entry(record.identity.clone())
                        .or_default()
                        .push(Claim {
                            path: doc.source.path.clone(),
                            accepted: Some(accepted.len()),
                        });
                    batch.claimed.insert(record.identity.clone());
                    accepted.push(Some(ValidatedProduct {
                        record,
                        source: doc.source.path,
                    }));
                },
                Err(e) => {
                    debug!("Rejected {}", e);
                    match declared_identity(&doc) {
                        Some(identity) => {
                            batch.claimed.insert(identity.clone());
                            claims.entry(identity).or_default().push(Claim {
                                path: doc.source.path.clone(),
                                accepted: None,
                            });
                        },
                        None => {
                            if let Some(hint) = doc.source.identity_hint() {
                                batch.claimed.insert(hint);
                            }
                        },
                    }
                    batch.rejections.push(Rejection::Invalid(e));
                },
            },
            SourceKind::Filter { filter_type, .. } => {
                match validate_filters(&doc, *filter_type) {
                    Ok((keywords, warnings)) => {
                        batch.warnings.extend(warnings);
                        for keyword in keywords {
                            let key = keyword.key();
                            if filters.contains_key(&key) {
                                batch.warnings.push(ValidationWarning::new(
                                    &doc.source.path,
                                    format!("keyword '{}' already listed in another file", key),
                                ));
                            } else {
                                filters.insert(key, keyword);
                            }
                        }
                    },
                    Err(e) => {
                        batch.suppressed_filter_types.insert(*filter_type);
                        batch.rejections.push(Rejection::Invalid(e));
                    },
                }
            },
        }
    }

    for (identity, claimants) in claims {
        if claimants.len() < 2 {
            continue;
        }
        let paths: Vec<PathBuf> = claimants.iter().map(|c| c.path.clone()).collect();
        for claim in claimants {
            let Some(index) = claim.accepted else {
                continue;
            };
            if let Some(product) = accepted.get_mut(index).and_then(Option::take) {
                let err = DuplicateIdentityError {
                    identity: product.record.identity.to_string(),
                    path: claim.path,
                    paths: paths.clone(),
                };
                warn!("{}", err);
                batch.rejections.push(Rejection::Duplicate(err));
            }
        }
        debug!("Identity {} claimed {} times", identity, paths.len());
    }

    batch.products = accepted.into_iter().flatten().collect();
    batch
        .products
        .sort_by(|a, b| a.record.identity.cmp(&b.record.identity));
    batch.filters = filters.into_values().collect();
    batch.rejections.sort_by(|a, b| a.path().cmp(b.path()));

    for warning in &batch.warnings {
        warn!("{}", warning);
    }
    info!(
        "Validated {} files: {} products, {} filter keywords, {} rejected",
        batch.documents_read,
        batch.products.len(),
        batch.filters.len(),
        batch.rejections.len()
    );
    batch
}

/// Load the tree under `root` and validate it
pub async fn load_and_validate(root: &Path, concurrency: usize) -> Result<ValidatedBatch> {
    let loader = RecordLoader::new(root)?.with_concurrency(concurrency);
    Ok(validate_batch(loader.load().await))
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::source::SourceFile;

    fn product_doc(brand_dir: &str, file: &str, yaml: &str) -> RawDocument {
        RawDocument {
            source: SourceFile {
                path: PathBuf::from(format!("Products/Cameras/{}/{}", brand_dir, file)),
                kind: SourceKind::Product {
                    category: "Cameras".to_string(),
                    brand_dir: brand_dir.to_string(),
                    model_stem: file.trim_end_matches(".yml").to_string(),
                },
            },
            body: serde_yaml::from_str(yaml).unwrap(),
        }
    }

    fn filter_doc(filter_type: FilterType, yaml: &str) -> RawDocument {
        RawDocument {
            source: SourceFile {
                path: PathBuf::from(format!(
                    "Products/Cameras/Matching/{}.yml",
                    filter_type.file_stem()
                )),
                kind: SourceKind::Filter {
                    category: "Cameras".to_string(),
                    filter_type,
                },
            },
            body: serde_yaml::from_str(yaml).unwrap(),
        }
    }

    const CANON_600D: &str = r#"
brand: Canon
model: 600D
full_name: Canon EOS 600D
pricing:
  buy_min: 70
  buy_max: 100
  sell_target: 150
aliases: ["600d", "eos 600d"]
"#;

    #[test]
    fn accepts_a_complete_product() {
        let (record, warnings) =
            validate_product(&product_doc("Canon", "600D.yml", CANON_600D)).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(record.identity, Identity::new("canon", "600d"));
        assert_eq!(record.identity.brand(), "Canon");
        assert_eq!(record.category, "Cameras");
        assert!(record.active);
        assert_eq!(record.pricing.buy_min.to_string(), "70.00");
        assert_eq!(record.aliases, vec!["600d", "eos 600d"]);
        assert!(record.fuzzy_patterns.is_empty());
    }

    #[test]
    fn lists_every_violation() {
        let yaml = r#"
brand: "  "
model: 600D
pricing:
  buy_min: -5
  buy_max: 100.125
  sell_target: "lots"
active: "yes"
aliases: ["ok", ""]
"#;
        let err = validate_product(&product_doc("Canon", "600D.yml", yaml)).unwrap_err();
        let fields: Vec<_> = err.violations.iter().filter_map(|v| v.field()).collect();
        assert_eq!(
            fields,
            vec![
                "brand",
                "full_name",
                "pricing.buy_min",
                "pricing.buy_max",
                "pricing.sell_target",
                "active",
                "aliases",
            ]
        );
        assert_eq!(err.identity, None);
    }

    #[test]
    fn pricing_order_is_enforced() {
        let yaml = CANON_600D.replace("sell_target: 150", "sell_target: 100");
        let err = validate_product(&product_doc("Canon", "600D.yml", &yaml)).unwrap_err();
        assert_eq!(
            err.violations,
            vec![Violation::MaxNotBelowTarget {
                buy_max: "100.00".to_string(),
                sell_target: "100.00".to_string(),
            }]
        );
        assert_eq!(err.identity.as_deref(), Some("Canon 600D"));
    }

    #[test]
    fn fractional_prices_keep_their_digits() {
        let yaml = CANON_600D.replace("buy_min: 70", "buy_min: 70.5");
        let (record, _) = validate_product(&product_doc("Canon", "600D.yml", &yaml)).unwrap();
        assert_eq!(record.pricing.buy_min.to_string(), "70.50");
    }

    #[test]
    fn warnings_do_not_reject() {
        let yaml = format!(
            "{}\nnotes: keep dry\nfuzzy_patterns: [\"600 d\", \"600 D\"]\n",
            CANON_600D
        );
        let (record, warnings) =
            validate_product(&product_doc("Nikon", "600D.yml", &yaml)).unwrap();
        assert_eq!(record.fuzzy_patterns, vec!["600 d"]);
        let messages: Vec<_> = warnings.iter().map(|w| w.message.as_str()).collect();
        assert_eq!(messages.len(), 3);
        assert!(messages.iter().any(|m| m.contains("unknown key `notes`")));
        assert!(messages.iter().any(|m| m.contains("does not match directory")));
        assert!(messages.iter().any(|m| m.contains("duplicate fuzzy_patterns")));
    }

    #[test]
    fn filter_file_mapping_form() {
        let yaml = r#"
description: Listings to skip
keywords:
  - Broken
  - keyword: for parts
    description: Parts only
  - broken
"#;
        let (keywords, warnings) =
            validate_filters(&filter_doc(FilterType::Reject, yaml), FilterType::Reject).unwrap();
        assert_eq!(keywords.len(), 2);
        assert_eq!(keywords[0].keyword, "broken");
        assert_eq!(keywords[0].description.as_deref(), Some("Listings to skip"));
        assert_eq!(keywords[1].description.as_deref(), Some("Parts only"));
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn filter_file_rejects_empty_keywords() {
        let err = validate_filters(
            &filter_doc(FilterType::Boost, "- mint\n- \"\"\n"),
            FilterType::Boost,
        )
        .unwrap_err();
        assert_eq!(
            err.violations,
            vec![Violation::BadListEntry {
                field: "keywords".to_string(),
                index: 1,
            }]
        );
    }

    #[test]
    fn duplicate_identities_reject_every_claimant() {
        let outcome = LoadOutcome {
            documents: vec![
                product_doc("Canon", "600D.yml", CANON_600D),
                product_doc("Canon", "600d-copy.yml", &CANON_600D.replace("600D", "600d")),
                product_doc(
                    "Canon",
                    "700D.yml",
                    &CANON_600D.replace("600D", "700D"),
                ),
            ],
            errors: vec![],
        };

        let batch = validate_batch(outcome);
        assert_eq!(batch.products.len(), 1);
        assert_eq!(batch.products[0].record.identity.model(), "700D");

        let duplicates: Vec<_> = batch.duplicate_errors().collect();
        assert_eq!(duplicates.len(), 2);
        assert_eq!(duplicates[0].paths.len(), 2);
        assert!(batch.claimed.contains(&Identity::new("Canon", "600D")));
    }

    #[test]
    fn failed_filter_file_suppresses_its_type() {
        let outcome = LoadOutcome {
            documents: vec![
                filter_doc(FilterType::Reject, "keywords: broken\n"),
                filter_doc(FilterType::Boost, "- mint\n"),
            ],
            errors: vec![],
        };
        let batch = validate_batch(outcome);
        assert_eq!(
            batch.suppressed_filter_types,
            BTreeSet::from([FilterType::Reject])
        );
        assert_eq!(batch.filters.len(), 1);
        assert_eq!(batch.validation_errors().count(), 1);
    }
}
