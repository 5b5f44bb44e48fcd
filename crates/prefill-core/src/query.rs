//! Item query service abstraction
//!
//! The external store the resolver asks "which item in `programs` has
//! `abbreviation = ABC`?". Implementations must be Send + Sync so lookups can
//! run concurrently.

use crate::error::QueryError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single item returned by the store, field name to value
pub type Item = Map<String, Value>;

/// Comparison operator in a filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    /// Field equals value
    #[serde(rename = "_eq")]
    Equals,
}

impl FilterOp {
    /// Wire name of the operator
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "_eq",
        }
    }
}

/// Single-field filter expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    /// Field to compare
    pub field: String,
    /// Operator
    pub op: FilterOp,
    /// Value to compare against
    pub value: Value,
}

impl Filter {
    /// `field == value`
    #[inline]
    #[must_use]
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Equals,
            value: value.into(),
        }
    }

    /// Render to the wire shape `{ "<field>": { "_eq": <value> } }`
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut condition = Map::new();
        condition.insert(self.op.as_str().to_string(), self.value.clone());
        let mut filter = Map::new();
        filter.insert(self.field.clone(), Value::Object(condition));
        Value::Object(filter)
    }

    /// Check an item against this filter
    ///
    /// Used by in-memory stores; remote stores evaluate filters themselves.
    #[must_use]
    pub fn matches(&self, item: &Item) -> bool {
        match self.op {
            FilterOp::Equals => item.get(&self.field) == Some(&self.value),
        }
    }
}

/// Query against one collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemQuery {
    /// Filter expression
    pub filter: Filter,
    /// Fields to return for each item
    pub fields: Vec<String>,
    /// Maximum number of items
    pub limit: usize,
}

impl ItemQuery {
    /// Create a query with no field projection and a limit of one
    #[inline]
    #[must_use]
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            fields: Vec::new(),
            limit: 1,
        }
    }

    /// Project onto the given fields
    #[inline]
    #[must_use]
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// With result limit
    #[inline]
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// External store of items
///
/// Returns matching items in the store's default order, or an error on
/// transport failure.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ItemQueryService: Send + Sync {
    /// Run `query` against `collection`
    async fn query_items(&self, collection: &str, query: &ItemQuery) -> Result<Vec<Item>, QueryError>;
}

#[async_trait]
impl<T: ItemQueryService + ?Sized> ItemQueryService for std::sync::Arc<T> {
    async fn query_items(&self, collection: &str, query: &ItemQuery) -> Result<Vec<Item>, QueryError> {
        (**self).query_items(collection, query).await
    }
}
