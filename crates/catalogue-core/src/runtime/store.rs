// crates/catalogue-core/src/runtime/store.rs
// ============================================================================
// Module: Catalogue In-Memory Store
// Description: In-memory document store and shared store wrapper.
// Purpose: Provide a deterministic store implementation without external deps.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! [`InMemoryDocumentStore`] keeps each collection as an insertion-ordered
//! vector behind a mutex. It backs `store.type = "memory"` and the test
//! suites. Nothing survives a restart.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use serde_json::Value;

use crate::core::Document;
use crate::core::Projection;
use crate::core::StoreQuery;
use crate::core::fields;
use crate::interfaces::DocumentStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// Collection contents plus the next store-internal identifier.
#[derive(Debug, Default)]
struct Collections {
    /// Documents per collection, in insertion order.
    documents: BTreeMap<String, Vec<Document>>,
    /// Next `_id` to assign.
    next_id: u64,
}

/// In-memory document store for tests and memory-mode serving.
#[derive(Debug, Default, Clone)]
pub struct InMemoryDocumentStore {
    /// Collections protected by a mutex.
    inner: Arc<Mutex<Collections>>,
}

impl InMemoryDocumentStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Maps a poisoned mutex to a store error.
fn poisoned<T>(_: T) -> StoreError {
    StoreError::Store("document store mutex poisoned".to_string())
}

impl DocumentStore for InMemoryDocumentStore {
    fn find(
        &self,
        collection: &str,
        query: &StoreQuery,
        projection: &Projection,
    ) -> Result<Vec<Document>, StoreError> {
        let guard = self.inner.lock().map_err(poisoned)?;
        let Some(documents) = guard.documents.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(documents
            .iter()
            .filter(|document| query.matches(document))
            .map(|document| projection.apply(document.clone()))
            .collect())
    }

    fn insert(&self, collection: &str, mut document: Document) -> Result<(), StoreError> {
        let mut guard = self.inner.lock().map_err(poisoned)?;
        guard.next_id += 1;
        document.insert(fields::STORE_ID.to_string(), Value::from(guard.next_id));
        guard.documents.entry(collection.to_string()).or_default().push(document);
        Ok(())
    }

    fn remove(&self, collection: &str, query: &StoreQuery) -> Result<u64, StoreError> {
        let mut guard = self.inner.lock().map_err(poisoned)?;
        let Some(documents) = guard.documents.get_mut(collection) else {
            return Ok(0);
        };
        let before = documents.len();
        documents.retain(|document| !query.matches(document));
        Ok(u64::try_from(before - documents.len()).unwrap_or(u64::MAX))
    }

    fn replace(
        &self,
        collection: &str,
        query: &StoreQuery,
        mut document: Document,
    ) -> Result<u64, StoreError> {
        let mut guard = self.inner.lock().map_err(poisoned)?;
        guard.next_id += 1;
        document.insert(fields::STORE_ID.to_string(), Value::from(guard.next_id));
        let documents = guard.documents.entry(collection.to_string()).or_default();
        let before = documents.len();
        documents.retain(|existing| !query.matches(existing));
        let removed = before - documents.len();
        documents.push(document);
        Ok(u64::try_from(removed).unwrap_or(u64::MAX))
    }
}

// ============================================================================
// SECTION: Shared Store
// ============================================================================

/// Shared document store backed by an `Arc` trait object.
#[derive(Clone)]
pub struct SharedDocumentStore {
    /// Inner store implementation.
    inner: Arc<dyn DocumentStore + Send + Sync>,
}

impl SharedDocumentStore {
    /// Wraps a document store in a shared, clonable wrapper.
    #[must_use]
    pub fn from_store(store: impl DocumentStore + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    /// Wraps an existing shared store.
    #[must_use]
    pub const fn new(store: Arc<dyn DocumentStore + Send + Sync>) -> Self {
        Self {
            inner: store,
        }
    }
}

impl DocumentStore for SharedDocumentStore {
    fn find(
        &self,
        collection: &str,
        query: &StoreQuery,
        projection: &Projection,
    ) -> Result<Vec<Document>, StoreError> {
        self.inner.find(collection, query, projection)
    }

    fn insert(&self, collection: &str, document: Document) -> Result<(), StoreError> {
        self.inner.insert(collection, document)
    }

    fn remove(&self, collection: &str, query: &StoreQuery) -> Result<u64, StoreError> {
        self.inner.remove(collection, query)
    }

    fn replace(
        &self,
        collection: &str,
        query: &StoreQuery,
        document: Document,
    ) -> Result<u64, StoreError> {
        self.inner.replace(collection, query, document)
    }
}
