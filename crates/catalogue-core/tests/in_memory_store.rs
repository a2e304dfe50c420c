// crates/catalogue-core/tests/in_memory_store.rs
// ============================================================================
// Module: In-Memory Backend Tests
// Description: Behavior tests for the in-memory store and credential table.
// Purpose: Pin find/insert/remove/replace semantics shared by every backend.
// ============================================================================

//! In-memory document store and credential table tests.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use catalogue_core::CredentialEntry;
use catalogue_core::CredentialTable;
use catalogue_core::Document;
use catalogue_core::DocumentStore;
use catalogue_core::InMemoryCredentialTable;
use catalogue_core::InMemoryDocumentStore;
use catalogue_core::Projection;
use catalogue_core::SharedCredentialTable;
use catalogue_core::SharedDocumentStore;
use catalogue_core::StoreQuery;
use serde_json::Value;
use serde_json::json;

fn doc(value: Value) -> Document {
    value.as_object().cloned().unwrap()
}

#[test]
fn find_returns_insertion_order_without_store_identifier() {
    let store = InMemoryDocumentStore::new();
    store.insert("catalogue", doc(json!({"id": "a", "item-type": "provider"}))).unwrap();
    store.insert("catalogue", doc(json!({"id": "b", "item-type": "provider"}))).unwrap();
    store.insert("catalogue", doc(json!({"id": "c", "item-type": "data-model"}))).unwrap();
    let found = store
        .find("catalogue", &StoreQuery::new().eq("item-type", "provider"), &Projection::new())
        .unwrap();
    let ids: Vec<_> = found.iter().map(|item| item["id"].clone()).collect();
    assert_eq!(ids, vec![json!("a"), json!("b")]);
    assert!(found.iter().all(|item| !item.contains_key("_id")));
}

#[test]
fn unknown_collection_is_empty() {
    let store = InMemoryDocumentStore::new();
    assert!(store.find("nothing", &StoreQuery::new(), &Projection::new()).unwrap().is_empty());
    assert_eq!(store.remove("nothing", &StoreQuery::new()).unwrap(), 0);
}

#[test]
fn remove_reports_count_and_is_idempotent() {
    let store = SharedDocumentStore::from_store(InMemoryDocumentStore::new());
    store.insert("catalogue", doc(json!({"id": "a"}))).unwrap();
    let query = StoreQuery::new().eq("id", "a");
    assert_eq!(store.remove("catalogue", &query).unwrap(), 1);
    assert_eq!(store.remove("catalogue", &query).unwrap(), 0);
}

#[test]
fn replace_swaps_only_matching_documents() {
    let store = SharedDocumentStore::from_store(InMemoryDocumentStore::new());
    store.insert("schemas", doc(json!({"id": "provider", "title": "first"}))).unwrap();
    store.insert("schemas", doc(json!({"id": "service"}))).unwrap();
    let query = StoreQuery::new().eq("id", "provider");
    let removed = store
        .replace("schemas", &query, doc(json!({"id": "provider", "title": "second"})))
        .unwrap();
    assert_eq!(removed, 1);
    let found = store.find("schemas", &query, &Projection::new()).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["title"], json!("second"));
    assert_eq!(store.find("schemas", &StoreQuery::new(), &Projection::new()).unwrap().len(), 2);
}

#[test]
fn credential_updates_are_visible_to_next_lookup() {
    let table = InMemoryCredentialTable::new();
    let shared = SharedCredentialTable::from_table(table.clone());
    assert_eq!(shared.lookup("alice").unwrap(), None);
    let entry = CredentialEntry {
        password: "secret".to_string(),
        write_permission: true,
    };
    table.upsert("alice", entry.clone()).unwrap();
    assert_eq!(shared.lookup("alice").unwrap(), Some(entry));
    table.remove("alice").unwrap();
    assert_eq!(shared.lookup("alice").unwrap(), None);
}
