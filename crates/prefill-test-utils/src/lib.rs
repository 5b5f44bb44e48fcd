//! Testing utilities for the prefill workspace
//!
//! Shared fixtures, an in-memory item store, and tracing setup.

#![allow(missing_docs)]

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use prefill_core::{Item, ItemQuery, ItemQueryService, QueryError, RelationInfo, SchemaDirectory};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;

/// Convert a JSON object literal into an [`Item`]
///
/// # Panics
/// If `value` is not an object.
pub fn item(value: Value) -> Item {
    match value {
        Value::Object(map) => map,
        other => panic!("expected JSON object, got {other}"),
    }
}

/// `cases` schema used across tests
///
/// - `cases.program` → `programs` (pk `id`)
/// - `cases.owner` → `users` (pk `id`)
/// - `cases.category` → `categories` (no pk configured)
/// - `cases.subject` relation with no related collection
pub fn cases_schema() -> SchemaDirectory {
    SchemaDirectory::new()
        .with_relation("cases", "program", "programs")
        .with_relation("cases", "owner", "users")
        .with_relation("cases", "category", "categories")
        .with_relation_info("cases", "subject", RelationInfo::dangling())
        .with_primary_key("cases", "id")
        .with_primary_key("programs", "id")
        .with_primary_key("users", "id")
}

/// Store holding the `programs` and `users` rows the `cases` tests expect
pub fn cases_store() -> InMemoryItemStore {
    InMemoryItemStore::new()
        .with_item("programs", serde_json::json!({ "id": 42, "abbreviation": "ABC", "code": "P-42" }))
        .with_item("programs", serde_json::json!({ "id": 43, "abbreviation": "XYZ", "code": "P-43" }))
        .with_item("users", serde_json::json!({ "id": 7, "email": "ada@example.com" }))
}

/// Install a test-friendly tracing subscriber, honouring `RUST_LOG`
///
/// Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Query observed by the store
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedQuery {
    pub collection: String,
    pub query: ItemQuery,
}

/// In-memory [`ItemQueryService`]
///
/// Evaluates filters locally and records every query. Failure, latency and
/// rendezvous can be injected to exercise the engine's concurrency and
/// fail-soft paths.
#[derive(Debug, Default)]
pub struct InMemoryItemStore {
    collections: HashMap<String, Vec<Item>>,
    failures: HashMap<String, QueryError>,
    latency: Option<Duration>,
    rendezvous: Option<Arc<Barrier>>,
    query_counts: DashMap<String, usize>,
    log: Mutex<Vec<RecordedQuery>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl InMemoryItemStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an empty collection
    #[must_use]
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collections.entry(collection.into()).or_default();
        self
    }

    /// Append an item to a collection
    #[must_use]
    pub fn with_item(mut self, collection: impl Into<String>, value: Value) -> Self {
        self.collections
            .entry(collection.into())
            .or_default()
            .push(item(value));
        self
    }

    /// Every query against `collection` fails with `error`
    #[must_use]
    pub fn failing(mut self, collection: impl Into<String>, error: QueryError) -> Self {
        self.failures.insert(collection.into(), error);
        self
    }

    /// Every query sleeps for `latency` before answering
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Queries block until `parties` of them are in flight at once
    ///
    /// A sequential caller deadlocks against this, so pair it with a timeout.
    #[must_use]
    pub fn with_rendezvous(mut self, parties: usize) -> Self {
        self.rendezvous = Some(Arc::new(Barrier::new(parties)));
        self
    }

    /// Number of queries issued against `collection`
    #[must_use]
    pub fn query_count(&self, collection: &str) -> usize {
        self.query_counts.get(collection).map_or(0, |c| *c)
    }

    /// Number of queries across all collections
    #[must_use]
    pub fn total_queries(&self) -> usize {
        self.query_counts.iter().map(|entry| *entry.value()).sum()
    }

    /// Every query seen, in arrival order
    #[must_use]
    pub fn queries(&self) -> Vec<RecordedQuery> {
        self.log.lock().clone()
    }

    /// Highest number of queries that were in flight at the same time
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn lookup(&self, collection: &str, query: &ItemQuery) -> Result<Vec<Item>, QueryError> {
        if let Some(error) = self.failures.get(collection) {
            return Err(error.clone());
        }

        let items = self
            .collections
            .get(collection)
            .ok_or_else(|| QueryError::UnknownCollection(collection.to_string()))?;

        Ok(items
            .iter()
            .filter(|item| query.filter.matches(item))
            .take(query.limit)
            .map(|item| project(item, &query.fields))
            .collect())
    }
}

fn project(item: &Item, fields: &[String]) -> Item {
    if fields.is_empty() {
        return item.clone();
    }
    item.iter()
        .filter(|(key, _)| fields.contains(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

#[async_trait]
impl ItemQueryService for InMemoryItemStore {
    async fn query_items(&self, collection: &str, query: &ItemQuery) -> Result<Vec<Item>, QueryError> {
        *self.query_counts.entry(collection.to_string()).or_insert(0) += 1;
        self.log.lock().push(RecordedQuery {
            collection: collection.to_string(),
            query: query.clone(),
        });

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(barrier) = &self.rendezvous {
            barrier.wait().await;
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let result = self.lookup(collection, query);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prefill_core::Filter;
    use serde_json::json;

    #[tokio::test]
    async fn store_filters_limits_and_projects() {
        let store = cases_store();
        let query = ItemQuery::new(Filter::equals("abbreviation", "ABC")).with_fields(["id"]);

        let items = store.query_items("programs", &query).await.unwrap();

        assert_eq!(items, vec![item(json!({ "id": 42 }))]);
        assert_eq!(store.query_count("programs"), 1);
        assert_eq!(store.queries()[0].collection, "programs");
    }

    #[tokio::test]
    async fn store_unknown_collection_errors() {
        let store = InMemoryItemStore::new();
        let query = ItemQuery::new(Filter::equals("x", "y"));

        let err = store.query_items("ghosts", &query).await.unwrap_err();
        assert_eq!(err, QueryError::UnknownCollection("ghosts".into()));
    }

    #[tokio::test]
    async fn store_injected_failure() {
        let store = cases_store().failing("programs", QueryError::Transport("down".into()));
        let query = ItemQuery::new(Filter::equals("abbreviation", "ABC"));

        assert!(store.query_items("programs", &query).await.is_err());
        assert_eq!(store.total_queries(), 1);
    }
}
