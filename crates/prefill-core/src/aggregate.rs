//! Prefill aggregation
//!
//! One call takes the whole hint set through classify → resolve → merge:
//! 1. Drop hints whose owning field the user is already editing
//! 2. Classify the rest; direct values land in the result immediately
//! 3. Fan out every relational lookup and wait for all of them
//! 4. Merge the successful lookups
//!
//! Nothing here returns an error. A hint that cannot be used is simply
//! missing from the result.

use crate::classify::{classify, owning_field};
use crate::config::{Precedence, PrefillConfig};
use crate::directory::{FieldDirectory, RelationDirectory, SchemaDirectory};
use crate::error::Rejection;
use crate::query::ItemQueryService;
use crate::resolve::RelationResolver;
use crate::types::{EditedFields, ParsedParam, PrefillHints, PrefillResult, RelationalParam};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::sync::Arc;

/// Counters for one aggregation pass, emitted as a trace event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct PassStats {
    direct: usize,
    scheduled: usize,
    resolved: usize,
    skipped_edited: usize,
    rejected: usize,
    shadowed: usize,
}

/// The prefill resolution engine
///
/// Holds the three external collaborators and the configuration. Stateless
/// between calls: no caching, every call queries afresh.
///
/// # Example
///
/// ```rust,ignore
/// use prefill_core::{PrefillEngine, PrefillHints, SchemaDirectory, NoEdits};
/// use std::sync::Arc;
///
/// # async fn example(items: Arc<impl prefill_core::ItemQueryService>) {
/// let schema = SchemaDirectory::new()
///     .with_relation("cases", "program", "programs")
///     .with_primary_key("programs", "id");
/// let engine = PrefillEngine::from_schema(schema, items);
///
/// let hints = PrefillHints::from_query("status=draft&program.abbreviation=ABC");
/// let prefill = engine.aggregate(&hints, "cases", &NoEdits).await;
/// # }
/// ```
#[derive(Debug)]
pub struct PrefillEngine<R: ?Sized, F: ?Sized, Q: ?Sized> {
    relations: Arc<R>,
    fields: Arc<F>,
    items: Arc<Q>,
    config: PrefillConfig,
}

impl<R: ?Sized, F: ?Sized, Q: ?Sized> Clone for PrefillEngine<R, F, Q> {
    fn clone(&self) -> Self {
        Self {
            relations: Arc::clone(&self.relations),
            fields: Arc::clone(&self.fields),
            items: Arc::clone(&self.items),
            config: self.config.clone(),
        }
    }
}

impl<Q: ItemQueryService + ?Sized> PrefillEngine<SchemaDirectory, SchemaDirectory, Q> {
    /// Create an engine whose relation and field directories are one schema
    #[must_use]
    pub fn from_schema(schema: SchemaDirectory, items: Arc<Q>) -> Self {
        let schema = Arc::new(schema);
        Self::new(Arc::clone(&schema), schema, items)
    }
}

impl<R, F, Q> PrefillEngine<R, F, Q>
where
    R: RelationDirectory + ?Sized,
    F: FieldDirectory + ?Sized,
    Q: ItemQueryService + ?Sized,
{
    /// Create an engine with default configuration
    #[inline]
    #[must_use]
    pub fn new(relations: Arc<R>, fields: Arc<F>, items: Arc<Q>) -> Self {
        Self {
            relations,
            fields,
            items,
            config: PrefillConfig::default(),
        }
    }

    /// With configuration
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: PrefillConfig) -> Self {
        self.config = config;
        self
    }

    /// Get configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &PrefillConfig {
        &self.config
    }

    /// Classify one hint against `collection`
    ///
    /// # Errors
    /// See [`classify`].
    #[inline]
    pub fn classify(&self, key: &str, value: &Value, collection: &str) -> Result<ParsedParam, Rejection> {
        classify(key, value, collection, &*self.relations, &self.config)
    }

    /// Resolver bound to this engine's collaborators
    #[inline]
    #[must_use]
    pub fn resolver(&self) -> RelationResolver<'_, F, Q> {
        RelationResolver::new(&*self.fields, &*self.items)
    }

    /// Decode `query` and aggregate it
    pub async fn aggregate_query<E>(&self, query: &str, collection: &str, edits: &E) -> PrefillResult
    where
        E: EditedFields + ?Sized,
    {
        self.aggregate(&PrefillHints::from_query(query), collection, edits)
            .await
    }

    /// Build the prefill map for a new record in `collection`
    ///
    /// Fields present in `edits` never appear in the output and their hints
    /// are neither classified nor resolved. Relational lookups run
    /// concurrently (bounded by `max_concurrent_lookups` if set) and the call
    /// returns only once every one of them has finished.
    #[tracing::instrument(name = "prefill", skip_all, fields(collection = %collection))]
    pub async fn aggregate<E>(&self, hints: &PrefillHints, collection: &str, edits: &E) -> PrefillResult
    where
        E: EditedFields + ?Sized,
    {
        let mut result = PrefillResult::new();
        let mut stats = PassStats::default();
        let mut relational: Vec<RelationalParam> = Vec::new();

        for (key, value) in hints.iter() {
            let owner = owning_field(key, self.config.separator);
            if edits.contains_field(owner) {
                tracing::debug!(key = %key, field = owner, "hint skipped, field already edited");
                stats.skipped_edited += 1;
                continue;
            }

            match self.classify(key, value, collection) {
                Ok(ParsedParam::Direct { field, value }) => {
                    result.insert(field, value);
                    stats.direct += 1;
                }
                Ok(ParsedParam::Relational(param)) => {
                    if relational.iter().any(|p| p.field == param.field) {
                        tracing::debug!(key = %key, field = %param.field, "duplicate relational hint dropped");
                        stats.shadowed += 1;
                    } else {
                        relational.push(param);
                    }
                }
                Err(rejection) => {
                    tracing::debug!(key = %key, reason = rejection.kind(), "hint rejected");
                    stats.rejected += 1;
                }
            }
        }

        if self.config.precedence == Precedence::DirectWins {
            relational.retain(|param| {
                let keep = !result.contains(&param.field);
                if !keep {
                    tracing::debug!(field = %param.field, "relational hint shadowed by direct value");
                    stats.shadowed += 1;
                }
                keep
            });
        }
        stats.scheduled = relational.len();

        let resolver = self.resolver();
        let resolver = &resolver;
        let limit = self
            .config
            .max_concurrent_lookups
            .unwrap_or(relational.len())
            .max(1);

        let resolved: Vec<_> = stream::iter(relational.iter().map(move |param| resolver.resolve(param)))
            .buffer_unordered(limit)
            .filter_map(futures::future::ready)
            .collect()
            .await;

        stats.resolved = resolved.len();
        for entry in resolved {
            result.insert(entry.field, entry.value);
        }

        tracing::debug!(
            direct = stats.direct,
            scheduled = stats.scheduled,
            resolved = stats.resolved,
            skipped_edited = stats.skipped_edited,
            rejected = stats.rejected,
            shadowed = stats.shadowed,
            "prefill complete"
        );

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;
    use crate::query::{Item, MockItemQueryService};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::HashMap;

    fn schema() -> SchemaDirectory {
        SchemaDirectory::new()
            .with_relation("cases", "program", "programs")
            .with_relation("cases", "owner", "users")
            .with_primary_key("programs", "id")
            .with_primary_key("users", "id")
    }

    fn item(id: i64) -> Item {
        let mut item = Item::new();
        item.insert("id".into(), json!(id));
        item
    }

    fn engine(items: MockItemQueryService) -> PrefillEngine<SchemaDirectory, SchemaDirectory, MockItemQueryService> {
        PrefillEngine::from_schema(schema(), Arc::new(items))
    }

    #[tokio::test]
    async fn empty_hints_empty_result() {
        let mut items = MockItemQueryService::new();
        items.expect_query_items().times(0);

        let result = engine(items)
            .aggregate(&PrefillHints::new(), "cases", &crate::types::NoEdits)
            .await;
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn direct_and_relational() {
        let mut items = MockItemQueryService::new();
        items
            .expect_query_items()
            .times(1)
            .returning(|_, _| Ok(vec![item(42)]));

        let hints = PrefillHints::new()
            .with("status", "draft")
            .with("program.abbreviation", "ABC");
        let result = engine(items)
            .aggregate(&hints, "cases", &crate::types::NoEdits)
            .await;

        let expected: PrefillResult = [("status", json!("draft")), ("program", json!(42))]
            .into_iter()
            .collect();
        assert_eq!(result, expected);
    }

    #[tokio::test]
    async fn edited_relational_field_is_not_queried() {
        let mut items = MockItemQueryService::new();
        items.expect_query_items().times(0);

        let edits: HashMap<String, Value> = [("program".to_string(), json!(7))].into();
        let hints = PrefillHints::new().with("program.abbreviation", "ABC");
        let result = engine(items).aggregate(&hints, "cases", &edits).await;

        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn failed_lookup_contributes_nothing() {
        let mut items = MockItemQueryService::new();
        items
            .expect_query_items()
            .times(1)
            .returning(|_, _| Err(QueryError::Timeout { duration_ms: 30_000 }));

        let hints = PrefillHints::new()
            .with("title", "Draft")
            .with("program.abbreviation", "ABC");
        let result = engine(items)
            .aggregate(&hints, "cases", &crate::types::NoEdits)
            .await;

        assert_eq!(result.len(), 1);
        assert_eq!(result.get("title"), Some(&json!("Draft")));
    }

    #[tokio::test]
    async fn direct_wins_skips_lookup() {
        let mut items = MockItemQueryService::new();
        items.expect_query_items().times(0);

        let hints = PrefillHints::new()
            .with("program.abbreviation", "ABC")
            .with("program", "5");
        let result = engine(items)
            .aggregate(&hints, "cases", &crate::types::NoEdits)
            .await;

        assert_eq!(result.get("program"), Some(&json!("5")));
    }

    #[tokio::test]
    async fn relational_wins_overwrites_direct() {
        let mut items = MockItemQueryService::new();
        items
            .expect_query_items()
            .times(1)
            .returning(|_, _| Ok(vec![item(42)]));

        let hints = PrefillHints::new()
            .with("program", "5")
            .with("program.abbreviation", "ABC");
        let result = engine(items)
            .with_config(PrefillConfig::default().with_precedence(Precedence::RelationalWins))
            .aggregate(&hints, "cases", &crate::types::NoEdits)
            .await;

        assert_eq!(result.get("program"), Some(&json!(42)));
    }

    #[tokio::test]
    async fn relational_wins_keeps_direct_on_miss() {
        let mut items = MockItemQueryService::new();
        items
            .expect_query_items()
            .times(1)
            .returning(|_, _| Ok(vec![]));

        let hints = PrefillHints::new()
            .with("program", "5")
            .with("program.abbreviation", "ABC");
        let result = engine(items)
            .with_config(PrefillConfig::default().with_precedence(Precedence::RelationalWins))
            .aggregate(&hints, "cases", &crate::types::NoEdits)
            .await;

        assert_eq!(result.get("program"), Some(&json!("5")));
    }

    #[tokio::test]
    async fn first_relational_hint_per_field_wins() {
        let mut items = MockItemQueryService::new();
        items
            .expect_query_items()
            .withf(|_, query| query.filter.field == "code")
            .times(1)
            .returning(|_, _| Ok(vec![item(1)]));

        let hints = PrefillHints::new()
            .with("program.code", "P1")
            .with("program.abbreviation", "ABC");
        let result = engine(items)
            .aggregate(&hints, "cases", &crate::types::NoEdits)
            .await;

        assert_eq!(result.get("program"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn aggregate_query_string() {
        let mut items = MockItemQueryService::new();
        items.expect_query_items().times(0);

        let result = engine(items)
            .aggregate_query("?bookmark=123&version=2&title=Draft", "cases", &crate::types::NoEdits)
            .await;

        let expected: PrefillResult = [("title", json!("Draft"))].into_iter().collect();
        assert_eq!(result, expected);
    }
}
