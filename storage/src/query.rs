//! Listing and declarative search over a collection.
//!
//! A [`Filter`] is plain data: a list of clauses that must all hold. It is
//! interpreted entirely on the store side, so callers never ship code across
//! the request boundary.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use common::{CollectionName, DocumentId, StoreError, StoreResult};

use crate::codec::{self, Encoding};
use crate::paths::{StorePaths, STRUCTURED_EXTENSION};

/// Comparison applied by one [`Clause`].
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// Loose equality
    Eq,

    /// Loose inequality; also matches when the field is missing
    Ne,

    Gt,
    Gte,
    Lt,
    Lte,

    /// Case-insensitive substring for strings, loose membership for arrays
    Contains,

    /// Case-insensitive string prefix
    #[serde(alias = "startsWith")]
    StartsWith,

    /// Case-insensitive string suffix
    #[serde(alias = "endsWith")]
    EndsWith,

    /// Field loosely equals one element of the array value
    In,

    /// Field presence test; the value is a bool and defaults to true
    Exists,
}

/// One condition on one field of a document.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Clause {
    /// Dotted path into the document, e.g. `address.city` or `tags.0`
    pub field: String,

    /// The comparison operator
    pub op: Operator,

    /// Operand; may be omitted for `exists`
    #[serde(default)]
    pub value: Value,
}

impl Clause {
    /// Build a clause; nothing is checked until [`Clause::validate`].
    pub fn new(field: impl Into<String>, op: Operator, value: Value) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }

    /// Check the clause is well formed before it is run.
    pub fn validate(&self) -> StoreResult<()> {
        if self.field.is_empty() || self.field.split('.').any(str::is_empty) {
            return Err(StoreError::validation(
                "filter.field",
                format!("invalid field path {:?}", self.field),
            ));
        }

        let ok = match self.op {
            Operator::Eq | Operator::Ne | Operator::Contains => true,
            Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => {
                self.value.is_number() || self.value.is_string()
            }
            Operator::StartsWith | Operator::EndsWith => self.value.is_string(),
            Operator::In => self.value.is_array(),
            Operator::Exists => self.value.is_boolean() || self.value.is_null(),
        };

        if ok {
            Ok(())
        } else {
            Err(StoreError::validation(
                "filter.value",
                format!("{:?} cannot be used with operator {:?}", self.value, self.op),
            ))
        }
    }

    /// Evaluate the clause against one document.
    pub fn matches(&self, doc: &Value) -> bool {
        let found = lookup(doc, &self.field);

        match (self.op, found) {
            (Operator::Exists, found) => found.is_some() == self.value.as_bool().unwrap_or(true),
            (Operator::Ne, None) => true,
            (_, None) => false,
            (Operator::Eq, Some(v)) => loose_eq(v, &self.value),
            (Operator::Ne, Some(v)) => !loose_eq(v, &self.value),
            (Operator::Gt, Some(v)) => compare(v, &self.value) == Some(Ordering::Greater),
            (Operator::Gte, Some(v)) => matches!(
                compare(v, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            (Operator::Lt, Some(v)) => compare(v, &self.value) == Some(Ordering::Less),
            (Operator::Lte, Some(v)) => {
                matches!(compare(v, &self.value), Some(Ordering::Less | Ordering::Equal))
            }
            (Operator::Contains, Some(Value::Array(items))) => {
                items.iter().any(|item| loose_eq(item, &self.value))
            }
            (Operator::Contains, Some(v)) => text_test(v, &self.value, |h, n| h.contains(n)),
            (Operator::StartsWith, Some(v)) => text_test(v, &self.value, |h, n| h.starts_with(n)),
            (Operator::EndsWith, Some(v)) => text_test(v, &self.value, |h, n| h.ends_with(n)),
            (Operator::In, Some(v)) => self
                .value
                .as_array()
                .is_some_and(|options| options.iter().any(|o| loose_eq(v, o))),
        }
    }
}

/// Conjunction of clauses. The empty filter matches every document.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    /// Filter from a list of clauses.
    pub fn new(clauses: Vec<Clause>) -> Self {
        Self { clauses }
    }

    /// Builder-style helper adding one clause.
    pub fn and(mut self, field: impl Into<String>, op: Operator, value: Value) -> Self {
        self.clauses.push(Clause::new(field, op, value));
        self
    }

    /// The clauses, in the order they are evaluated.
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// True when the filter matches everything.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Validate every clause; the first malformed one is reported.
    pub fn validate(&self) -> StoreResult<()> {
        self.clauses.iter().try_for_each(Clause::validate)
    }

    /// True when every clause matches `doc`.
    pub fn matches(&self, doc: &Value) -> bool {
        self.clauses.iter().all(|clause| clause.matches(doc))
    }
}

/// Resolve a dotted path. Numeric segments index into arrays.
fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// Numbers compare numerically and a number equals a string holding it.
fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Number(_), Value::String(s)) | (Value::String(s), Value::Number(_)) => {
            let n = as_f64(a).or_else(|| as_f64(b));
            s.trim().parse::<f64>().ok() == n
        }
        _ => a == b,
    }
}

/// Ordering for the range operators. Mixed types have no ordering.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn text_test(haystack: &Value, needle: &Value, test: impl Fn(&str, &str) -> bool) -> bool {
    match (haystack, needle) {
        (Value::String(h), Value::String(n)) => test(&h.to_lowercase(), &n.to_lowercase()),
        _ => false,
    }
}

/// Decode every structured document in a collection.
///
/// Dot-prefixed entries, directories and binary documents are skipped. Files
/// removed while the scan runs are skipped too. A single corrupt document
/// fails the whole listing with a decode error naming it.
pub async fn list_all(paths: &StorePaths, collection: &CollectionName) -> StoreResult<Vec<Value>> {
    let dir = paths.collection_dir(collection);
    let mut entries = match tokio::fs::read_dir(&dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::io(&dir, e)),
    };

    let mut stems = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| StoreError::io(&dir, e))?
    {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if name.starts_with('.') {
            continue;
        }
        let Some(stem) = name
            .strip_suffix(STRUCTURED_EXTENSION)
            .and_then(|s| s.strip_suffix('.'))
        else {
            continue;
        };

        match entry.file_type().await {
            Ok(kind) if kind.is_file() => {}
            Ok(_) => continue,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(StoreError::io(entry.path(), e)),
        }

        // Files dropped in by hand may not be valid IDs; they are still listed
        stems.push(stem.to_string());
    }
    stems.sort();

    let mut documents = Vec::with_capacity(stems.len());
    for stem in stems {
        let path = dir.join(format!("{}.{}", stem, STRUCTURED_EXTENSION));
        let Some(bytes) = codec::read_file(&path).await? else {
            continue;
        };
        let value = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::decode(collection.as_str(), stem.as_str(), e.to_string()))?;
        documents.push(value);
    }

    tracing::debug!(collection = %collection, count = documents.len(), "Listed collection");
    Ok(documents)
}

/// Every structured document in `collection` that satisfies `filter`.
pub async fn search(
    paths: &StorePaths,
    collection: &CollectionName,
    filter: &Filter,
) -> StoreResult<Vec<Value>> {
    filter.validate()?;
    let documents = list_all(paths, collection).await?;
    let total = documents.len();
    let matched: Vec<Value> = documents.into_iter().filter(|doc| filter.matches(doc)).collect();

    tracing::debug!(
        collection = %collection,
        clauses = filter.clauses().len(),
        scanned = total,
        matched = matched.len(),
        "Search complete"
    );
    Ok(matched)
}

/// Presence check without reading the document.
pub async fn exists(
    paths: &StorePaths,
    collection: &CollectionName,
    id: &DocumentId,
    encoding: Encoding,
) -> StoreResult<bool> {
    let path = paths.document_path(collection, id, encoding)?;
    match tokio::fs::metadata(&path).await {
        Ok(meta) => Ok(meta.is_file()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StoreError::io(&path, e)),
    }
}
