//! Relation resolution
//!
//! Translates a relational hint (`program.abbreviation=ABC`) into the related
//! item's primary key with a single `limit 1` query. Fail-soft: every failure
//! collapses into `None`, the same answer as "no match".

use crate::directory::FieldDirectory;
use crate::error::QueryError;
use crate::query::{Filter, ItemQuery, ItemQueryService};
use crate::types::{RelationalParam, ResolvedEntry};

/// Resolves relational hints against the item store
#[derive(Debug)]
pub struct RelationResolver<'a, F: ?Sized, Q: ?Sized> {
    fields: &'a F,
    items: &'a Q,
}

impl<F: ?Sized, Q: ?Sized> Clone for RelationResolver<'_, F, Q> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F: ?Sized, Q: ?Sized> Copy for RelationResolver<'_, F, Q> {}

impl<'a, F, Q> RelationResolver<'a, F, Q>
where
    F: FieldDirectory + ?Sized,
    Q: ItemQueryService + ?Sized,
{
    /// Create a resolver over the given collaborators
    #[inline]
    #[must_use]
    pub fn new(fields: &'a F, items: &'a Q) -> Self {
        Self { fields, items }
    }

    /// Resolve one relational hint
    ///
    /// Returns `None` when the related collection is missing or has no
    /// primary key, when nothing matches, and when the query fails. Multiple
    /// matches are fine: the store's first item wins.
    pub async fn resolve(&self, param: &RelationalParam) -> Option<ResolvedEntry> {
        let Some(related) = param.related_collection.as_deref() else {
            tracing::debug!(field = %param.field, "relational hint without related collection");
            return None;
        };

        let Some(primary_key) = self.fields.primary_key_field(related) else {
            tracing::debug!(
                field = %param.field,
                collection = related,
                "related collection has no primary key"
            );
            return None;
        };

        let query = ItemQuery::new(Filter::equals(
            param.lookup_field.clone(),
            param.lookup_value.clone(),
        ))
        .with_fields([primary_key.field.clone()])
        .with_limit(1);

        let items = match self.items.query_items(related, &query).await {
            Ok(items) => items,
            Err(err) => {
                log_query_failure(&param.field, related, &err);
                return None;
            }
        };

        let Some(first) = items.into_iter().next() else {
            tracing::debug!(
                field = %param.field,
                collection = related,
                lookup_field = %param.lookup_field,
                "no related item matched"
            );
            return None;
        };

        match first.get(&primary_key.field) {
            Some(value) => Some(ResolvedEntry {
                field: param.field.clone(),
                value: value.clone(),
            }),
            None => {
                log_query_failure(
                    &param.field,
                    related,
                    &QueryError::MalformedResponse(format!(
                        "item is missing primary key '{}'",
                        primary_key.field
                    )),
                );
                None
            }
        }
    }
}

fn log_query_failure(field: &str, collection: &str, err: &QueryError) {
    if err.is_transient() {
        tracing::warn!(field, collection, error = %err, "relation lookup failed");
    } else {
        tracing::error!(field, collection, error = %err, "relation lookup failed");
    }
}
