//! Schema directories
//!
//! Read-only lookups the engine consults but never owns. Callers are expected
//! to have them fully loaded before resolution runs, so both traits are
//! synchronous.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Relation attached to a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationInfo {
    /// Collection the relation points at, if the relation names one
    pub related_collection: Option<String>,
}

impl RelationInfo {
    /// Relation to a known collection
    #[inline]
    #[must_use]
    pub fn to(related_collection: impl Into<String>) -> Self {
        Self {
            related_collection: Some(related_collection.into()),
        }
    }

    /// Relation without a related collection (e.g. unconfigured polymorphic)
    #[inline]
    #[must_use]
    pub fn dangling() -> Self {
        Self {
            related_collection: None,
        }
    }
}

/// Primary-key field of a collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryKeyInfo {
    /// Field name of the primary key
    pub field: String,
}

/// Lookup of relations by (collection, field)
pub trait RelationDirectory: Send + Sync {
    /// Relation attached to `field` on `collection`, if any
    fn relation_for_field(&self, collection: &str, field: &str) -> Option<RelationInfo>;
}

/// Lookup of primary-key fields by collection
pub trait FieldDirectory: Send + Sync {
    /// Primary-key field of `collection`, if configured
    fn primary_key_field(&self, collection: &str) -> Option<PrimaryKeyInfo>;
}

impl<T: RelationDirectory + ?Sized> RelationDirectory for std::sync::Arc<T> {
    fn relation_for_field(&self, collection: &str, field: &str) -> Option<RelationInfo> {
        (**self).relation_for_field(collection, field)
    }
}

impl<T: FieldDirectory + ?Sized> FieldDirectory for std::sync::Arc<T> {
    fn primary_key_field(&self, collection: &str) -> Option<PrimaryKeyInfo> {
        (**self).primary_key_field(collection)
    }
}

/// In-memory schema implementing both directories
///
/// # Example
///
/// ```rust
/// use prefill_core::{FieldDirectory, RelationDirectory, SchemaDirectory};
///
/// let schema = SchemaDirectory::new()
///     .with_relation("cases", "program", "programs")
///     .with_primary_key("programs", "id");
///
/// let relation = schema.relation_for_field("cases", "program").unwrap();
/// assert_eq!(relation.related_collection.as_deref(), Some("programs"));
/// assert_eq!(schema.primary_key_field("programs").unwrap().field, "id");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaDirectory {
    relations: HashMap<String, HashMap<String, RelationInfo>>,
    primary_keys: HashMap<String, PrimaryKeyInfo>,
}

impl SchemaDirectory {
    /// Create empty directory
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a relation from `collection.field` to `related`
    #[must_use]
    pub fn with_relation(
        self,
        collection: impl Into<String>,
        field: impl Into<String>,
        related: impl Into<String>,
    ) -> Self {
        self.with_relation_info(collection, field, RelationInfo::to(related))
    }

    /// Register an arbitrary relation record
    #[must_use]
    pub fn with_relation_info(
        mut self,
        collection: impl Into<String>,
        field: impl Into<String>,
        info: RelationInfo,
    ) -> Self {
        self.relations
            .entry(collection.into())
            .or_default()
            .insert(field.into(), info);
        self
    }

    /// Register the primary-key field of a collection
    #[must_use]
    pub fn with_primary_key(mut self, collection: impl Into<String>, field: impl Into<String>) -> Self {
        self.primary_keys.insert(
            collection.into(),
            PrimaryKeyInfo {
                field: field.into(),
            },
        );
        self
    }

    /// Number of registered relations across all collections
    #[must_use]
    pub fn relation_count(&self) -> usize {
        self.relations.values().map(HashMap::len).sum()
    }
}

impl RelationDirectory for SchemaDirectory {
    fn relation_for_field(&self, collection: &str, field: &str) -> Option<RelationInfo> {
        self.relations.get(collection)?.get(field).cloned()
    }
}

impl FieldDirectory for SchemaDirectory {
    fn primary_key_field(&self, collection: &str) -> Option<PrimaryKeyInfo> {
        self.primary_keys.get(collection).cloned()
    }
}
