//! Document store contract and the in-process backend.
//!
//! The cache and the quota counters both live behind [`KvStore`]; the
//! service never keeps durable state of its own. Documents are addressed by
//! a `(collection, key)` pair and hold arbitrary JSON.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

/// Errors produced by a [`KvStore`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("document {collection}/{key} is not a counter")]
    NotACounter { collection: String, key: String },
}

/// Persistent key/value store.
///
/// Implementations must offer read-after-write consistency per key and an
/// atomic [`increment`](KvStore::increment).
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError>;

    /// Upserts a document, replacing any previous value.
    async fn put(&self, collection: &str, key: &str, value: Value) -> Result<(), StoreError>;

    async fn delete(&self, collection: &str, key: &str) -> Result<(), StoreError>;

    /// Atomically adds one to the counter at `key` (missing counts as 0) and
    /// returns the new value.
    async fn increment(&self, collection: &str, key: &str) -> Result<u64, StoreError>;

    /// Removes every document in `collection` for which `keep` returns
    /// `false`, and returns how many were removed.
    async fn retain(&self, collection: &str, keep: &Retain<'_>) -> Result<usize, StoreError>;
}

/// Predicate over `(key, document)` used by [`KvStore::retain`].
pub type Retain<'a> = dyn Fn(&str, &Value) -> bool + Send + Sync + 'a;

/// Concurrent in-memory [`KvStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: DashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents across all collections.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

fn document_id(collection: &str, key: &str) -> String {
    format!("{collection}/{key}")
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self
            .documents
            .get(&document_id(collection, key))
            .map(|doc| doc.value().clone()))
    }

    async fn put(&self, collection: &str, key: &str, value: Value) -> Result<(), StoreError> {
        self.documents.insert(document_id(collection, key), value);
        Ok(())
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<(), StoreError> {
        self.documents.remove(&document_id(collection, key));
        Ok(())
    }

    async fn increment(&self, collection: &str, key: &str) -> Result<u64, StoreError> {
        let mut counter = self
            .documents
            .entry(document_id(collection, key))
            .or_insert_with(|| Value::from(0u64));
        let current = counter.as_u64().ok_or_else(|| StoreError::NotACounter {
            collection: collection.to_owned(),
            key: key.to_owned(),
        })?;
        let next = current + 1;
        *counter = Value::from(next);
        Ok(next)
    }

    async fn retain(&self, collection: &str, keep: &Retain<'_>) -> Result<usize, StoreError> {
        let prefix = document_id(collection, "");
        let mut removed = 0;
        self.documents.retain(|id, document| match id.strip_prefix(&prefix) {
            Some(key) if !keep(key, document) => {
                removed += 1;
                false
            }
            _ => true,
        });
        Ok(removed)
    }
}

static STORE: OnceLock<Arc<dyn KvStore>> = OnceLock::new();

/// Returns the process-wide store, creating it on the first call.
///
/// Call once during start-up and hand the result to the components that need
/// it; repeated calls are cheap and always yield the same instance.
pub fn ensure_initialized() -> Arc<dyn KvStore> {
    STORE
        .get_or_init(|| {
            info!("initializing in-memory document store");
            Arc::new(MemoryStore::new())
        })
        .clone()
}
