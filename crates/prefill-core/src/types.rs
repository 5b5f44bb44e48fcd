//! Core types for the prefill engine
//!
//! Defines the values that flow through one resolution call:
//! - Raw hints as they arrive from a query string
//! - Classified parameters (direct or relational)
//! - Resolved entries and the final field map
//! - The edited-field exclusion set

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// A classified hint
///
/// Exactly one variant is active and `field` is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParsedParam {
    /// Value is written to the field as-is
    Direct {
        /// Target field on the new record
        field: String,
        /// Raw value, passed through unchanged
        value: Value,
    },
    /// Value identifies a row in a related collection by some other field
    Relational(RelationalParam),
}

impl ParsedParam {
    /// Field this parameter writes to
    #[inline]
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::Direct { field, .. } => field,
            Self::Relational(param) => &param.field,
        }
    }

    /// Check if this is a relational parameter
    #[inline]
    #[must_use]
    pub fn is_relational(&self) -> bool {
        matches!(self, Self::Relational(_))
    }
}

/// Relational hint, e.g. `program.abbreviation=ABC`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationalParam {
    /// Relation field on the new record (`program`)
    pub field: String,
    /// Field to match on in the related collection (`abbreviation`)
    pub lookup_field: String,
    /// Value to match (`"ABC"`)
    pub lookup_value: Value,
    /// Collection the relation points at
    ///
    /// The classifier only emits `Some`; the resolver still checks.
    pub related_collection: Option<String>,
}

impl RelationalParam {
    /// Create a relational parameter
    #[inline]
    #[must_use]
    pub fn new(
        field: impl Into<String>,
        lookup_field: impl Into<String>,
        lookup_value: impl Into<Value>,
        related_collection: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            lookup_field: lookup_field.into(),
            lookup_value: lookup_value.into(),
            related_collection: Some(related_collection.into()),
        }
    }
}

/// Successful resolution of one relational hint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedEntry {
    /// Relation field on the new record
    pub field: String,
    /// Primary-key value of the matched related item
    pub value: Value,
}

/// Final field map used to seed a new record
///
/// Keys are unique; iteration order carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrefillResult(HashMap<String, Value>);

impl PrefillResult {
    /// Create an empty result
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the value for a field
    #[inline]
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Check if a field is present
    #[inline]
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Number of prefilled fields
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if nothing was prefilled
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over field/value pairs
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Take the underlying map
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> HashMap<String, Value> {
        self.0
    }

    pub(crate) fn insert(&mut self, field: String, value: Value) -> Option<Value> {
        self.0.insert(field, value)
    }
}

impl From<PrefillResult> for HashMap<String, Value> {
    fn from(result: PrefillResult) -> Self {
        result.0
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for PrefillResult {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Raw key/value hints in arrival order
///
/// Query strings deliver every value as a string, or as an array of strings
/// when a key repeats. Values are never coerced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrefillHints(IndexMap<String, Value>);

impl PrefillHints {
    /// Create empty hints
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode an `application/x-www-form-urlencoded` query string
    ///
    /// A leading `?` is ignored. A key seen once maps to a string; a repeated
    /// key maps to an array of strings in order of appearance.
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut hints = Self::new();

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let value = Value::String(value.into_owned());
            match hints.0.get_mut(&*key) {
                Some(Value::Array(values)) => values.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
                None => {
                    hints.0.insert(key.into_owned(), value);
                }
            }
        }

        hints
    }

    /// Insert or replace a hint
    #[inline]
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Builder-style insert
    #[inline]
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Get a hint value
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Number of hints
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if there are no hints
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in arrival order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for PrefillHints {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Fields the user has already started editing
///
/// Anything that can answer "is this field edited?" works, so callers can
/// hand over their edit state without copying it.
pub trait EditedFields {
    /// Check if the field has in-progress edits
    fn contains_field(&self, field: &str) -> bool;
}

impl<V, S: std::hash::BuildHasher> EditedFields for HashMap<String, V, S> {
    fn contains_field(&self, field: &str) -> bool {
        self.contains_key(field)
    }
}

impl<V> EditedFields for BTreeMap<String, V> {
    fn contains_field(&self, field: &str) -> bool {
        self.contains_key(field)
    }
}

impl<V, S: std::hash::BuildHasher> EditedFields for IndexMap<String, V, S> {
    fn contains_field(&self, field: &str) -> bool {
        self.contains_key(field)
    }
}

impl<S: std::hash::BuildHasher> EditedFields for HashSet<String, S> {
    fn contains_field(&self, field: &str) -> bool {
        self.contains(field)
    }
}

impl EditedFields for BTreeSet<String> {
    fn contains_field(&self, field: &str) -> bool {
        self.contains(field)
    }
}

impl EditedFields for serde_json::Map<String, Value> {
    fn contains_field(&self, field: &str) -> bool {
        self.contains_key(field)
    }
}

impl<T: EditedFields + ?Sized> EditedFields for &T {
    fn contains_field(&self, field: &str) -> bool {
        (**self).contains_field(field)
    }
}

/// No edits at all
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEdits;

impl EditedFields for NoEdits {
    fn contains_field(&self, _field: &str) -> bool {
        false
    }
}
