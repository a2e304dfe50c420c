// crates/catalogue-server/src/adapter/tests.rs
// ============================================================================
// Module: Catalogue Store Adapter Tests
// Description: Unit tests for item/schema operations and the store actor.
// Purpose: Pin stamping, stripping, idempotent delete, and bulk behavior.
// Dependencies: catalogue-core, tokio
// ============================================================================

//! ## Overview
//! Runs the adapter against the in-memory document store, plus a failing
//! store to exercise fault mapping.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use catalogue_core::InMemoryDocumentStore;
use catalogue_core::StoreError;
use serde_json::json;

use super::*;

fn doc(value: Value) -> Document {
    value.as_object().cloned().unwrap()
}

fn adapter() -> CatalogueStore {
    CatalogueStore::new(
        SharedDocumentStore::from_store(InMemoryDocumentStore::new()),
        "catalogue",
        "schemas",
    )
}

/// Store that fails every insert or replace after `allowed` successes.
struct FlakyStore {
    /// Backing store for successful writes.
    inner: InMemoryDocumentStore,
    /// Writes allowed before failing.
    allowed: usize,
    /// Writes attempted so far.
    inserts: AtomicUsize,
}

impl DocumentStore for FlakyStore {
    fn find(
        &self,
        collection: &str,
        query: &StoreQuery,
        projection: &Projection,
    ) -> Result<Vec<Document>, StoreError> {
        self.inner.find(collection, query, projection)
    }

    fn insert(&self, collection: &str, document: Document) -> Result<(), StoreError> {
        if self.inserts.fetch_add(1, Ordering::SeqCst) >= self.allowed {
            return Err(StoreError::Io("disk full".to_string()));
        }
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
        if self.inserts.fetch_add(1, Ordering::SeqCst) >= self.allowed {
            return Err(StoreError::Io("disk full".to_string()));
        }
        self.inner.replace(collection, query, document)
    }
}

fn flaky(allowed: usize) -> CatalogueStore {
    CatalogueStore::new(
        SharedDocumentStore::from_store(FlakyStore {
            inner: InMemoryDocumentStore::new(),
            allowed,
            inserts: AtomicUsize::new(0),
        }),
        "catalogue",
        "schemas",
    )
}

#[test]
fn write_item_assigns_fresh_id_and_hides_shadow_tags() {
    let store = adapter();
    let input = doc(json!({
        "id": "caller-id",
        "item-type": "resource-item",
        "tags": ["Air", "Quality"],
    }));
    let id = store.write_item(&input).unwrap();
    assert_ne!(id, "caller-id");
    assert_eq!(input["id"], json!("caller-id"));

    let item = store.read_item(&id).unwrap().unwrap();
    assert_eq!(item["Status"], json!("Live"));
    assert_eq!(item["Version"], json!("1.0"));
    assert!(!item.contains_key("_tags"));
    assert!(!item.contains_key("_id"));

    let filter: FilterMap = [("tags", "AIR")].into_iter().collect();
    let found = store.search_attribute(&filter).unwrap();
    assert_eq!(found.len(), 1);
    assert!(!found[0].contains_key("_tags"));
    assert_eq!(found[0]["tags"], json!(["Air", "Quality"]));
}

#[test]
fn retried_writes_never_reuse_identifiers() {
    let store = adapter();
    let input = doc(json!({"item-type": "provider"}));
    let first = store.write_item(&input).unwrap();
    let second = store.write_item(&input).unwrap();
    assert_ne!(first, second);
}

#[test]
fn missing_item_reads_as_empty() {
    assert_eq!(adapter().read_item("absent").unwrap(), None);
    assert_eq!(adapter().read_schema("absent").unwrap(), None);
}

#[test]
fn schema_round_trips_reserved_field_names() {
    let store = adapter();
    let schema = doc(json!({
        "id": "resource-item",
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "properties": {"$ref": {"type": "string"}, "a&b": {"type": "number"}},
    }));
    store.write_schema(&schema).unwrap();
    assert_eq!(store.read_schema("resource-item").unwrap(), Some(schema.clone()));

    let mut replaced = schema;
    replaced.insert("title".to_string(), json!("v2"));
    store.write_schema(&replaced).unwrap();
    assert_eq!(store.read_schema("resource-item").unwrap(), Some(replaced));
}

#[test]
fn schema_without_id_is_rejected() {
    let fault = adapter().write_schema(&doc(json!({"type": "object"}))).unwrap_err();
    assert!(matches!(fault, StoreFault::Rejected(_)));
}

#[test]
fn deletes_are_idempotent() {
    let store = adapter();
    let id = store.write_item(&doc(json!({"item-type": "provider"}))).unwrap();
    assert_eq!(store.delete_item(&id).unwrap(), 1);
    assert_eq!(store.delete_item(&id).unwrap(), 0);
    assert_eq!(store.delete_schema("absent").unwrap(), 0);
}

#[test]
fn list_count_and_tags_follow_contents() {
    let store = adapter();
    store.write_item(&doc(json!({"item-type": "provider", "tags": ["b", "A"]}))).unwrap();
    store.write_item(&doc(json!({"item-type": "provider", "tags": ["A"]}))).unwrap();
    store.write_item(&doc(json!({"item-type": "data-model", "name": "x"}))).unwrap();

    assert_eq!(store.list(ItemType::Provider).unwrap().len(), 2);
    assert_eq!(store.list(ItemType::BaseSchema).unwrap().len(), 0);
    assert_eq!(store.get_tags().unwrap(), vec!["A".to_string(), "b".to_string()]);

    let filter: FilterMap =
        [("item-type", "provider"), ("attributeFilter", "id")].into_iter().collect();
    assert_eq!(store.count(&filter).unwrap(), 2);
}

#[test]
fn bulk_create_stamps_and_bulk_delete_removes() {
    let store = adapter();
    let items = vec![
        doc(json!({"item-type": "resource-item", "name": "a"})),
        doc(json!({"item-type": "resource-item", "name": "b"})),
    ];
    let ids = store.bulk_create("batch-1", &items).unwrap();
    assert_eq!(ids.len(), 2);
    let first = store.read_item(&ids[0]).unwrap().unwrap();
    assert_eq!(first["bulk-id"], json!("batch-1"));
    assert_eq!(store.bulk_delete("batch-1").unwrap(), 2);
    assert_eq!(store.bulk_delete("batch-1").unwrap(), 0);
}

#[test]
fn bulk_create_fault_keeps_earlier_inserts() {
    let store = flaky(1);
    let items = vec![
        doc(json!({"item-type": "resource-item", "name": "a"})),
        doc(json!({"item-type": "resource-item", "name": "b"})),
    ];
    assert_eq!(store.bulk_create("batch", &items).unwrap_err(), StoreFault::Failure);
    assert_eq!(store.list(ItemType::ResourceItem).unwrap().len(), 1);
}

#[test]
fn updates_are_unimplemented() {
    let store = adapter();
    let fault = store.execute(StoreCommand::Update(doc(json!({"id": "x"})))).unwrap_err();
    assert_eq!(fault, StoreFault::Unimplemented("update"));
    let fault = store
        .execute(StoreCommand::BulkUpdate {
            bulk_id: "b".to_string(),
            item: Document::new(),
        })
        .unwrap_err();
    assert_eq!(fault, StoreFault::Unimplemented("bulkupdate"));
}

#[tokio::test]
async fn actor_serves_concurrent_requests() {
    let handle = StoreHandle::spawn(adapter(), 4);
    let mut tasks = Vec::new();
    for index in 0 .. 16 {
        let handle = handle.clone();
        tasks.push(tokio::spawn(async move {
            let item = doc(json!({"item-type": "provider", "index": index}));
            handle.request(StoreCommand::WriteItem(item)).await
        }));
    }
    for task in tasks {
        assert!(matches!(task.await.unwrap(), Ok(StoreReply::Created(_))));
    }
    let reply = handle.request(StoreCommand::List(ItemType::Provider)).await.unwrap();
    let StoreReply::Items(items) = reply else {
        panic!("unexpected reply {reply:?}");
    };
    assert_eq!(items.len(), 16);
}

#[tokio::test]
async fn actor_surfaces_store_faults() {
    let handle = StoreHandle::spawn(flaky(0), 1);
    let fault = handle
        .request(StoreCommand::WriteItem(doc(json!({"item-type": "provider"}))))
        .await
        .unwrap_err();
    assert_eq!(fault, StoreFault::Failure);
    assert_eq!(fault.to_string(), "Failure");
}

#[test]
fn failed_schema_overwrite_keeps_previous_schema() {
    let store = flaky(1);
    store.write_schema(&doc(json!({"id": "provider", "title": "first"}))).unwrap();
    let err = store
        .write_schema(&doc(json!({"id": "provider", "title": "second"})))
        .unwrap_err();
    assert_eq!(err, StoreFault::Failure);
    let kept = store.read_schema("provider").unwrap().unwrap();
    assert_eq!(kept["title"], json!("first"));
}

#[test]
fn schema_overwrite_leaves_one_document() {
    let store = adapter();
    store.write_schema(&doc(json!({"id": "provider", "title": "first"}))).unwrap();
    store.write_schema(&doc(json!({"id": "provider", "title": "second"}))).unwrap();
    let found = store.store.find("schemas", &id_query("provider"), &Projection::new()).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(store.read_schema("provider").unwrap().unwrap()["title"], json!("second"));
}
