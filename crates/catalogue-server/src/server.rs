// crates/catalogue-server/src/server.rs
// ============================================================================
// Module: Catalogue HTTP Server
// Description: Route table, request extraction, and response encoding.
// Purpose: Expose the dispatch pipeline over HTTP with optional TLS.
// Dependencies: catalogue-config, axum, axum-server, tokio
// ============================================================================

//! ## Overview
//! The front end is deliberately thin: each route names an action, copies
//! path parameters, the raw query string, the raw body, and three headers
//! into a [`CatalogueRequest`], and encodes the dispatcher's outcome.
//!
//! Security posture: the client certificate subject is read from the
//! configured header, which only a TLS-terminating proxy may set. Request
//! bodies are capped at `server.max_body_bytes`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::DefaultBodyLimit;
use axum::extract::Path as UrlPath;
use axum::extract::RawQuery;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::HeaderName;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::delete;
use axum::routing::get;
use axum::routing::patch;
use axum::routing::post;
use axum::routing::put;
use axum_server::tls_rustls::RustlsConfig;
use catalogue_config::CatalogueConfig;
use catalogue_config::ServerAuditConfig;
use catalogue_config::ServerConfig;
use catalogue_config::StoreConfig;
use catalogue_config::StoreType;
use catalogue_core::Action;
use catalogue_core::InMemoryDocumentStore;
use catalogue_core::ItemType;
use catalogue_core::ItemTypes;
use catalogue_core::SharedCredentialTable;
use catalogue_core::SharedDocumentStore;
use catalogue_store_sqlite::SqliteDocumentStore;
use serde_json::Value;

use crate::adapter::CatalogueStore;
use crate::adapter::StoreHandle;
use crate::audit::AuditSink;
use crate::audit::FileAuditSink;
use crate::audit::NoopAuditSink;
use crate::audit::SecurityAuditEvent;
use crate::audit::StderrAuditSink;
use crate::auth::CredentialGate;
use crate::credentials::FileCredentialTable;
use crate::dispatch::CatalogueFault;
use crate::dispatch::CatalogueReply;
use crate::dispatch::CatalogueRequest;
use crate::dispatch::Dispatcher;
use crate::validation::SchemaValidator;
use crate::validation::ValidatorHandle;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Header carrying the tri-state skip-validation flag.
const SKIP_VALIDATION_HEADER: &str = "skip_validation";
/// Content type of every JSON response.
const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

// ============================================================================
// SECTION: Server
// ============================================================================

/// Catalogue server instance.
pub struct CatalogueServer {
    /// Validated configuration.
    config: CatalogueConfig,
    /// Dispatch pipeline shared by every connection.
    dispatcher: Dispatcher,
}

impl CatalogueServer {
    /// Builds the server and spawns its actors.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when configuration is invalid or a backend
    /// cannot be opened.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn from_config(config: CatalogueConfig) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let audit = build_audit_sink(&config.server.audit)?;
        emit_security_posture(&config, audit.as_ref());
        let store = StoreHandle::spawn(
            build_catalogue_store(&config.store)?,
            config.pipeline.store_queue_capacity,
        );
        let validator = ValidatorHandle::spawn(
            Arc::new(SchemaValidator::new(store.clone())),
            config.pipeline.validator_queue_capacity,
        );
        let table = FileCredentialTable::new(&config.auth.credentials_path);
        let gate = CredentialGate::new(SharedCredentialTable::from_table(table));
        let dispatcher = Dispatcher::new(ItemTypes::standard(), gate, validator, store, audit);
        Ok(Self {
            config,
            dispatcher,
        })
    }

    /// Returns the HTTP router for this server.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] when the subject header is invalid.
    pub fn router(&self) -> Result<Router, ServerError> {
        router(self.dispatcher.clone(), &self.config.server)
    }

    /// Serves requests until the listener fails.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let app = self.router()?;
        let addr =
            self.config.server.bind_addr().map_err(|err| ServerError::Config(err.to_string()))?;
        match &self.config.server.tls {
            Some(tls) => {
                let rustls = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
                    .await
                    .map_err(|err| ServerError::Init(format!("tls load failed: {err}")))?;
                axum_server::bind_rustls(addr, rustls)
                    .serve(app.into_make_service())
                    .await
                    .map_err(|_| ServerError::Transport("https server failed".to_string()))
            }
            None => {
                let listener = tokio::net::TcpListener::bind(addr)
                    .await
                    .map_err(|_| ServerError::Transport("http bind failed".to_string()))?;
                axum::serve(listener, app)
                    .await
                    .map_err(|_| ServerError::Transport("http server failed".to_string()))
            }
        }
    }
}

// ============================================================================
// SECTION: Builders
// ============================================================================

/// Builds the document store selected by configuration.
///
/// # Errors
///
/// Returns [`ServerError::Init`] when the SQLite store cannot be opened.
pub fn build_document_store(config: &StoreConfig) -> Result<SharedDocumentStore, ServerError> {
    match config.store_type {
        StoreType::Memory => Ok(SharedDocumentStore::from_store(InMemoryDocumentStore::new())),
        StoreType::Sqlite => {
            let sqlite_config = config.sqlite_config().ok_or_else(|| {
                ServerError::Config("sqlite store requires path".to_string())
            })?;
            let store = SqliteDocumentStore::new(sqlite_config)
                .map_err(|err| ServerError::Init(err.to_string()))?;
            Ok(SharedDocumentStore::from_store(store))
        }
    }
}

/// Builds the store adapter over the configured document store.
///
/// # Errors
///
/// Returns [`ServerError`] when the document store cannot be built.
pub fn build_catalogue_store(config: &StoreConfig) -> Result<CatalogueStore, ServerError> {
    let store = build_document_store(config)?;
    Ok(CatalogueStore::new(store, &config.item_collection, &config.schema_collection))
}

/// Builds the audit sink selected by configuration.
fn build_audit_sink(config: &ServerAuditConfig) -> Result<Arc<dyn AuditSink>, ServerError> {
    if !config.enabled {
        return Ok(Arc::new(NoopAuditSink));
    }
    match &config.path {
        Some(path) => {
            let sink = FileAuditSink::new(Path::new(path))
                .map_err(|err| ServerError::Init(format!("audit log open failed: {err}")))?;
            Ok(Arc::new(sink))
        }
        None => Ok(Arc::new(StderrAuditSink)),
    }
}

/// Records startup warnings about the security posture.
fn emit_security_posture(config: &CatalogueConfig, audit: &dyn AuditSink) {
    if config.server.tls.is_none() {
        audit.record_security(&SecurityAuditEvent::new(
            "tls_disabled",
            Some("serving plain http; terminate tls at a trusted proxy".to_string()),
        ));
    }
    if !Path::new(&config.auth.credentials_path).is_file() {
        audit.record_security(&SecurityAuditEvent::new(
            "credentials_missing",
            Some(format!("credential file {} not found", config.auth.credentials_path)),
        ));
    }
    if config.store.store_type == StoreType::Memory {
        audit.record_security(&SecurityAuditEvent::new(
            "memory_store",
            Some("catalogue contents are lost on restart".to_string()),
        ));
    }
}

// ============================================================================
// SECTION: Routes
// ============================================================================

/// Shared state for route handlers.
struct ServerState {
    /// Dispatch pipeline.
    dispatcher: Dispatcher,
    /// Header carrying the client certificate subject.
    subject_header: HeaderName,
}

/// Builds the catalogue route table.
///
/// # Errors
///
/// Returns [`ServerError::Config`] when the subject header is invalid.
pub fn router(dispatcher: Dispatcher, config: &ServerConfig) -> Result<Router, ServerError> {
    let subject_header = HeaderName::from_bytes(config.client_subject_header.as_bytes())
        .map_err(|_| ServerError::Config("invalid client_subject_header".to_string()))?;
    let state = Arc::new(ServerState {
        dispatcher,
        subject_header,
    });
    let bulk_type = ItemType::ResourceItem.as_str();
    let app = Router::new()
        .route("/list/catalogue/{itemtype}", get(handle_list))
        .route("/search/catalogue/attribute", get(handle_search))
        .route("/count/catalogue/attribute", get(handle_count))
        .route("/create/catalogue/{itemtype}", post(handle_create))
        .route("/update/catalogue/{itemtype}/{id}", put(handle_update))
        .route("/remove/catalogue/{itemtype}/{id}", delete(handle_delete))
        .route(&bulk_path("create", bulk_type), post(handle_bulk_create))
        .route(&bulk_path("update", bulk_type), patch(handle_bulk_update))
        .route(&bulk_path("remove", bulk_type), delete(handle_bulk_delete))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .with_state(state);
    Ok(app)
}

/// Returns the bulk route for `verb` on `item_type`.
fn bulk_path(verb: &str, item_type: &str) -> String {
    format!("/{verb}/catalogue/{item_type}/bulk/{{bulk_id}}")
}

/// Handles `GET /list/catalogue/{itemtype}`.
async fn handle_list(
    State(state): State<Arc<ServerState>>,
    UrlPath(item_type): UrlPath<String>,
    headers: HeaderMap,
) -> Response {
    let request = base_request(&state, Action::List, &headers).with_item_type(item_type);
    respond(state.dispatcher.dispatch(request).await)
}

/// Handles `GET /search/catalogue/attribute`.
async fn handle_search(
    State(state): State<Arc<ServerState>>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let mut request = base_request(&state, Action::SearchAttribute, &headers);
    request.query = query;
    respond(state.dispatcher.dispatch(request).await)
}

/// Handles `GET /count/catalogue/attribute`.
async fn handle_count(
    State(state): State<Arc<ServerState>>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let mut request = base_request(&state, Action::Count, &headers);
    request.query = query;
    respond(state.dispatcher.dispatch(request).await)
}

/// Handles `POST /create/catalogue/{itemtype}`.
async fn handle_create(
    State(state): State<Arc<ServerState>>,
    UrlPath(item_type): UrlPath<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = base_request(&state, Action::Create, &headers)
        .with_item_type(item_type)
        .with_body(body.to_vec());
    respond(state.dispatcher.dispatch(request).await)
}

/// Handles `PUT /update/catalogue/{itemtype}/{id}`.
async fn handle_update(
    State(state): State<Arc<ServerState>>,
    UrlPath((item_type, id)): UrlPath<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = base_request(&state, Action::Update, &headers)
        .with_item_type(item_type)
        .with_target_id(id)
        .with_body(body.to_vec());
    respond(state.dispatcher.dispatch(request).await)
}

/// Handles `DELETE /remove/catalogue/{itemtype}/{id}`.
async fn handle_delete(
    State(state): State<Arc<ServerState>>,
    UrlPath((item_type, id)): UrlPath<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let request = base_request(&state, Action::Delete, &headers)
        .with_item_type(item_type)
        .with_target_id(id);
    respond(state.dispatcher.dispatch(request).await)
}

/// Handles `POST /create/catalogue/resource-item/bulk/{bulk_id}`.
async fn handle_bulk_create(
    State(state): State<Arc<ServerState>>,
    UrlPath(bulk_id): UrlPath<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request =
        bulk_request(&state, Action::BulkCreate, &headers, bulk_id).with_body(body.to_vec());
    respond(state.dispatcher.dispatch(request).await)
}

/// Handles `PATCH /update/catalogue/resource-item/bulk/{bulk_id}`.
async fn handle_bulk_update(
    State(state): State<Arc<ServerState>>,
    UrlPath(bulk_id): UrlPath<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request =
        bulk_request(&state, Action::BulkUpdate, &headers, bulk_id).with_body(body.to_vec());
    respond(state.dispatcher.dispatch(request).await)
}

/// Handles `DELETE /remove/catalogue/resource-item/bulk/{bulk_id}`.
async fn handle_bulk_delete(
    State(state): State<Arc<ServerState>>,
    UrlPath(bulk_id): UrlPath<String>,
    headers: HeaderMap,
) -> Response {
    let request = bulk_request(&state, Action::BulkDelete, &headers, bulk_id);
    respond(state.dispatcher.dispatch(request).await)
}

/// Builds a request carrying the identity and flag headers.
fn base_request(state: &ServerState, action: Action, headers: &HeaderMap) -> CatalogueRequest {
    CatalogueRequest {
        client_subject: header_text(headers, &state.subject_header),
        authorization: header_text(headers, &AUTHORIZATION),
        skip_validation: header_text(headers, &HeaderName::from_static(SKIP_VALIDATION_HEADER)),
        ..CatalogueRequest::new(action)
    }
}

/// Builds a bulk request on the resource-item collection.
fn bulk_request(
    state: &ServerState,
    action: Action,
    headers: &HeaderMap,
    bulk_id: String,
) -> CatalogueRequest {
    base_request(state, action, headers)
        .with_item_type(ItemType::ResourceItem.as_str())
        .with_bulk_id(bulk_id)
}

/// Returns a header value when present. Bytes outside UTF-8 become
/// replacement characters so downstream parsing rejects them.
fn header_text(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers.get(name).map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
}

/// Encodes a dispatch outcome.
fn respond(outcome: Result<CatalogueReply, CatalogueFault>) -> Response {
    match outcome {
        Ok(reply) => encode(reply.status_code(), reply.body()),
        Err(fault) => encode(fault.status_code(), fault.body()),
    }
}

/// Encodes a status code and optional JSON body.
fn encode(status: u16, body: Option<Value>) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    match body {
        Some(body) => {
            (status, [(CONTENT_TYPE, JSON_CONTENT_TYPE)], body.to_string()).into_response()
        }
        None => status.into_response(),
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Catalogue server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}
