// crates/catalogue-server/tests/common/mod.rs
// ============================================================================
// Module: Catalogue Server Test Support
// Description: Shared harness for pipeline and HTTP route tests.
// Purpose: Build a dispatcher over in-memory backends with recorded audits.
// Dependencies: catalogue-core, catalogue-server
// ============================================================================

//! Test harness for catalogue-server integration tests.

#![allow(dead_code, reason = "Each test binary uses a different subset.")]

use std::sync::Arc;
use std::sync::Mutex;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use catalogue_core::CredentialEntry;
use catalogue_core::Document;
use catalogue_core::InMemoryCredentialTable;
use catalogue_core::InMemoryDocumentStore;
use catalogue_core::ItemTypes;
use catalogue_core::SharedCredentialTable;
use catalogue_core::SharedDocumentStore;
use catalogue_server::AuditSink;
use catalogue_server::CatalogueRequest;
use catalogue_server::CatalogueStore;
use catalogue_server::CredentialGate;
use catalogue_server::Dispatcher;
use catalogue_server::ItemValidator;
use catalogue_server::SchemaValidator;
use catalogue_server::StoreHandle;
use catalogue_server::ValidatorHandle;
use catalogue_server::audit::AuthAuditEvent;
use catalogue_server::audit::RequestAuditEvent;
use serde_json::Value;

/// Subject of a trusted class-3 client certificate.
pub const TRUSTED_SUBJECT: &str =
    "OID.2.5.4.97=class:3,CN=catalogue-client,O=Example,emailAddress=ops@example.org";
/// Subject of a class-1 client certificate.
pub const UNTRUSTED_SUBJECT: &str = "OID.2.5.4.97=class:1,CN=catalogue-client";
/// Registered user with write permission.
pub const WRITER: &str = "writer";
/// Registered user without write permission.
pub const READER: &str = "reader";
/// Password shared by registered users.
pub const PASSWORD: &str = "secret";

/// Audit sink that keeps every event in memory.
#[derive(Default)]
pub struct RecordingAuditSink {
    /// Request events in arrival order.
    pub requests: Mutex<Vec<RequestAuditEvent>>,
    /// Credential gate events in arrival order.
    pub auth: Mutex<Vec<AuthAuditEvent>>,
}

impl AuditSink for RecordingAuditSink {
    fn record(&self, event: &RequestAuditEvent) {
        self.requests.lock().unwrap().push(event.clone());
    }

    fn record_auth(&self, event: &AuthAuditEvent) {
        self.auth.lock().unwrap().push(event.clone());
    }
}

/// Dispatcher plus handles onto its backends.
pub struct Harness {
    /// Dispatcher under test.
    pub dispatcher: Dispatcher,
    /// Credential table read by the gate.
    pub table: InMemoryCredentialTable,
    /// Direct adapter access sharing the dispatcher's document store.
    pub store: CatalogueStore,
    /// Recorded audit events.
    pub audit: Arc<RecordingAuditSink>,
}

/// Builds a harness validating items against stored schemas.
pub fn harness() -> Harness {
    build(None)
}

/// Builds a harness with a custom validator.
pub fn harness_with_validator(validator: Arc<dyn ItemValidator>) -> Harness {
    build(Some(validator))
}

fn build(validator: Option<Arc<dyn ItemValidator>>) -> Harness {
    let table = InMemoryCredentialTable::new();
    for (user, write_permission) in [(WRITER, true), (READER, false)] {
        table
            .upsert(
                user,
                CredentialEntry {
                    password: PASSWORD.to_string(),
                    write_permission,
                },
            )
            .unwrap();
    }
    let store = CatalogueStore::new(
        SharedDocumentStore::from_store(InMemoryDocumentStore::new()),
        "catalogue",
        "schemas",
    );
    let store_handle = StoreHandle::spawn(store.clone(), 64);
    let validator: Arc<dyn ItemValidator> = match validator {
        Some(validator) => validator,
        None => Arc::new(SchemaValidator::new(store_handle.clone())),
    };
    let audit = Arc::new(RecordingAuditSink::default());
    let dispatcher = Dispatcher::new(
        ItemTypes::standard(),
        CredentialGate::new(SharedCredentialTable::from_table(table.clone())),
        ValidatorHandle::spawn(validator, 64),
        store_handle,
        audit.clone(),
    );
    Harness {
        dispatcher,
        table,
        store,
        audit,
    }
}

/// Encodes a Basic `Authorization` header.
pub fn basic(user: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{user}:{password}")))
}

/// Adds a trusted certificate and the writer's credentials.
pub fn authorized(request: CatalogueRequest) -> CatalogueRequest {
    request.with_client_subject(TRUSTED_SUBJECT).with_authorization(basic(WRITER, PASSWORD))
}

/// Converts a JSON object literal into a document.
pub fn doc(value: Value) -> Document {
    value.as_object().cloned().unwrap()
}
