// crates/catalogue-server/src/dispatch.rs
// ============================================================================
// Module: Dispatch Pipeline
// Description: Per-request state machine from transport input to reply.
// Purpose: Order the gate, validation, and store stages and map faults.
// Dependencies: catalogue-core, tokio, serde_json, uuid
// ============================================================================

//! ## Overview
//! Each request moves through `Received -> AuthCheck -> Validating ->
//! Forwarded -> Replied`; any stage may end in `Failed`. Read-only actions skip the
//! credential gate and only item creation is validated. The dispatcher is
//! the only place that maps collaborator faults to [`CatalogueFault`].
//!
//! Security posture: bodies, query strings, and headers are untrusted. A
//! malformed body fails before the gate runs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Instant;

use catalogue_core::Action;
use catalogue_core::CommandPayload;
use catalogue_core::Document;
use catalogue_core::ItemType;
use catalogue_core::ItemTypes;
use catalogue_core::SkipValidation;
use catalogue_core::fields;
use catalogue_core::parse_filter_query;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::adapter::StoreCommand;
use crate::adapter::StoreFault;
use crate::adapter::StoreHandle;
use crate::adapter::StoreReply;
use crate::audit::AuditSink;
use crate::audit::AuthAuditEvent;
use crate::audit::AuthAuditEventParams;
use crate::audit::RequestAuditEvent;
use crate::audit::RequestAuditEventParams;
use crate::audit::RequestOutcome;
use crate::auth::CertificateInfo;
use crate::auth::CredentialGate;
use crate::auth::DenialReason;
use crate::auth::GateDecision;
use crate::validation::ValidatorHandle;

// ============================================================================
// SECTION: Messages
// ============================================================================

/// Body is not the expected JSON shape.
const INVALID_ITEM: &str = "Invalid item: Not a Json Object";
/// Query string could not be translated.
const BAD_QUERY: &str = "Bad Query";
/// Unknown item-type on create.
const UNKNOWN_TYPE_CREATE: &str = "No such item-type exists";
/// Unknown item-type on delete, update, and bulk routes.
const UNKNOWN_TYPE: &str = "No such item-type exists!";
/// Path and body identifiers differ on update.
const ID_MISMATCH: &str = "Ids provided in the URI and object does not match";
/// Certificate check failed.
const CERTIFICATE_ERROR: &str = "Certificate authentication error";
/// Listing label for the item-type enumeration.
const ITEM_TYPES_LABEL: &str = "item-types";
/// Listing label for the tag listing.
const TAGS_LABEL: &str = "tags";

// ============================================================================
// SECTION: Request
// ============================================================================

/// Transport-neutral catalogue request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogueRequest {
    /// Correlation identifier for audit logs.
    pub request_id: String,
    /// Requested action.
    pub action: Action,
    /// Item-type path parameter.
    pub item_type: Option<String>,
    /// Item identifier path parameter.
    pub target_id: Option<String>,
    /// Bulk identifier path parameter.
    pub bulk_id: Option<String>,
    /// Raw query string.
    pub query: Option<String>,
    /// Raw request body.
    pub body: Option<Vec<u8>>,
    /// Client certificate subject from the trusted proxy.
    pub client_subject: Option<String>,
    /// Raw `Authorization` header.
    pub authorization: Option<String>,
    /// Raw `skip_validation` header.
    pub skip_validation: Option<String>,
}

impl CatalogueRequest {
    /// Creates a request for `action` with a fresh request id.
    #[must_use]
    pub fn new(action: Action) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            action,
            item_type: None,
            target_id: None,
            bulk_id: None,
            query: None,
            body: None,
            client_subject: None,
            authorization: None,
            skip_validation: None,
        }
    }

    /// Returns a copy with the item-type set.
    #[must_use]
    pub fn with_item_type(mut self, item_type: impl Into<String>) -> Self {
        self.item_type = Some(item_type.into());
        self
    }

    /// Returns a copy with the target identifier set.
    #[must_use]
    pub fn with_target_id(mut self, id: impl Into<String>) -> Self {
        self.target_id = Some(id.into());
        self
    }

    /// Returns a copy with the bulk identifier set.
    #[must_use]
    pub fn with_bulk_id(mut self, bulk_id: impl Into<String>) -> Self {
        self.bulk_id = Some(bulk_id.into());
        self
    }

    /// Returns a copy with the raw query string set.
    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Returns a copy with the raw body set.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Returns a copy with the client certificate subject set.
    #[must_use]
    pub fn with_client_subject(mut self, subject: impl Into<String>) -> Self {
        self.client_subject = Some(subject.into());
        self
    }

    /// Returns a copy with the `Authorization` header set.
    #[must_use]
    pub fn with_authorization(mut self, header: impl Into<String>) -> Self {
        self.authorization = Some(header.into());
        self
    }

    /// Returns a copy with the `skip_validation` header set.
    #[must_use]
    pub fn with_skip_validation(mut self, value: impl Into<String>) -> Self {
        self.skip_validation = Some(value.into());
        self
    }
}

// ============================================================================
// SECTION: Replies and Faults
// ============================================================================

/// Successful catalogue reply.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogueReply {
    /// Matching items.
    Items(Vec<Document>),
    /// Recognized item-type labels.
    ItemTypes(Vec<&'static str>),
    /// Distinct tags.
    Tags(Vec<String>),
    /// Matching item count.
    Count(u64),
    /// Item created under the identifier.
    Created(String),
    /// Bulk batch created.
    BulkCreated {
        /// Bulk correlation identifier.
        bulk_id: String,
        /// Assigned identifiers in insertion order.
        ids: Vec<String>,
    },
    /// Removal completed (including no-op removals).
    Deleted,
}

impl CatalogueReply {
    /// Returns the HTTP status code.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Created(_) => 201,
            Self::Deleted => 204,
            _ => 200,
        }
    }

    /// Returns the JSON body; `None` for bodiless replies.
    #[must_use]
    pub fn body(&self) -> Option<Value> {
        match self {
            Self::Items(items) => {
                Some(Value::Array(items.iter().cloned().map(Value::Object).collect()))
            }
            Self::ItemTypes(labels) => Some(json!({ "item-types": labels })),
            Self::Tags(tags) => Some(json!(tags)),
            Self::Count(count) => Some(json!({ "count": count })),
            Self::Created(id) => Some(json!({ "id": id })),
            Self::BulkCreated {
                bulk_id,
                ids,
            } => Some(json!({ "bulk-id": bulk_id, "status": "success", "ids": ids })),
            Self::Deleted => None,
        }
    }
}

/// Outward-facing fault.
///
/// # Invariants
/// - Messages never carry store internals or stack traces.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogueFault {
    /// Bad request (400).
    #[error("{0}")]
    ClientFault(String),
    /// Credential failure (401).
    #[error("{0}")]
    AuthFault(String),
    /// Server failure (500).
    #[error("Failure")]
    ServerFault,
}

impl CatalogueFault {
    /// Returns the HTTP status code.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::ClientFault(_) => 400,
            Self::AuthFault(_) => 401,
            Self::ServerFault => 500,
        }
    }

    /// Returns the `{"Status": message}` body; `None` for server faults.
    #[must_use]
    pub fn body(&self) -> Option<Value> {
        match self {
            Self::ClientFault(message) | Self::AuthFault(message) => {
                Some(json!({ "Status": message }))
            }
            Self::ServerFault => None,
        }
    }

    /// Returns a stable label for audit logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ClientFault(_) => "client_fault",
            Self::AuthFault(_) => "auth_fault",
            Self::ServerFault => "server_fault",
        }
    }

    /// Builds a client fault.
    fn client(message: impl Into<String>) -> Self {
        Self::ClientFault(message.into())
    }
}

impl From<StoreFault> for CatalogueFault {
    fn from(fault: StoreFault) -> Self {
        match fault {
            StoreFault::Rejected(message) => Self::ClientFault(message),
            StoreFault::Failure | StoreFault::Unimplemented(_) => Self::ServerFault,
        }
    }
}

// ============================================================================
// SECTION: Dispatcher
// ============================================================================

/// Dispatch pipeline shared by every connection.
///
/// # Invariants
/// - Holds no per-request mutable state.
#[derive(Clone)]
pub struct Dispatcher {
    /// Recognized item-types.
    item_types: ItemTypes,
    /// Credential gate for mutating actions.
    gate: CredentialGate,
    /// Validation actor.
    validator: ValidatorHandle,
    /// Store adapter actor.
    store: StoreHandle,
    /// Audit sink.
    audit: Arc<dyn AuditSink>,
}

impl Dispatcher {
    /// Creates a dispatcher over its collaborators.
    #[must_use]
    pub fn new(
        item_types: ItemTypes,
        gate: CredentialGate,
        validator: ValidatorHandle,
        store: StoreHandle,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            item_types,
            gate,
            validator,
            store,
            audit,
        }
    }

    /// Runs one request through the pipeline and audits the outcome.
    ///
    /// # Errors
    ///
    /// Returns the [`CatalogueFault`] of the first failing stage.
    pub async fn dispatch(
        &self,
        request: CatalogueRequest,
    ) -> Result<CatalogueReply, CatalogueFault> {
        let started = Instant::now();
        let request_id = request.request_id.clone();
        let action = request.action;
        let item_type = request.item_type.clone();
        let result = self.run(request).await;
        let (outcome, status, fault_kind) = match &result {
            Ok(reply) => (RequestOutcome::Ok, reply.status_code(), None),
            Err(fault) => (RequestOutcome::Error, fault.status_code(), Some(fault.kind())),
        };
        self.audit.record(&RequestAuditEvent::new(RequestAuditEventParams {
            request_id,
            action,
            item_type,
            outcome,
            status,
            fault_kind,
            latency_ms: started.elapsed().as_millis(),
        }));
        result
    }

    /// Runs the stages in order.
    async fn run(&self, request: CatalogueRequest) -> Result<CatalogueReply, CatalogueFault> {
        let payload = parse_payload(&request)?;
        if request.action.is_mutating() {
            self.check_gate(&request).await?;
        }
        match request.action {
            Action::List => self.list(request.item_type.as_deref().unwrap_or_default()).await,
            Action::GetTags => self.tags().await,
            Action::SearchAttribute | Action::Count => self.query(request.action, payload).await,
            Action::Create => self.create(&request, payload).await,
            Action::Update => self.update(&request, payload).await,
            Action::Delete => self.delete(&request).await,
            Action::BulkCreate => self.bulk_create(&request, payload).await,
            Action::BulkUpdate => self.bulk_update(&request, payload).await,
            Action::BulkDelete => self.bulk_delete(&request).await,
        }
    }

    /// Runs the credential gate off the async executor.
    async fn check_gate(&self, request: &CatalogueRequest) -> Result<(), CatalogueFault> {
        let gate = self.gate.clone();
        let certificate = request.client_subject.as_deref().and_then(CertificateInfo::parse);
        let subject_email =
            certificate.as_ref().and_then(CertificateInfo::email).map(str::to_string);
        let header = request.authorization.clone();
        let report = tokio::task::spawn_blocking(move || {
            gate.authorize(certificate.as_ref(), header.as_deref())
        })
        .await
        .map_err(|_| CatalogueFault::ServerFault)?
        .map_err(|_| CatalogueFault::ServerFault)?;
        let reason = match report.decision {
            GateDecision::Allowed => None,
            GateDecision::Denied(reason) => Some(reason),
        };
        self.audit.record_auth(&AuthAuditEvent::new(AuthAuditEventParams {
            request_id: request.request_id.clone(),
            stage: report.stage.label(),
            allowed: reason.is_none(),
            reason: reason.map(DenialReason::label),
            user_id: report.user_id,
            subject_email,
        }));
        match reason {
            None => Ok(()),
            Some(reason) => Err(denial_fault(reason)),
        }
    }

    /// Sends one command to the store actor.
    async fn store(&self, command: StoreCommand) -> Result<StoreReply, CatalogueFault> {
        Ok(self.store.request(command).await?)
    }

    /// Resolves a path item-type for delete, update, and bulk routes.
    fn require_type(&self, label: Option<&str>) -> Result<ItemType, CatalogueFault> {
        label
            .and_then(|label| self.item_types.resolve(label))
            .ok_or_else(|| CatalogueFault::client(UNKNOWN_TYPE))
    }

    /// Handles `list`, including the item-type and tag listings.
    async fn list(&self, label: &str) -> Result<CatalogueReply, CatalogueFault> {
        if label == ITEM_TYPES_LABEL {
            return Ok(CatalogueReply::ItemTypes(self.item_types.labels()));
        }
        if label == TAGS_LABEL {
            return self.tags().await;
        }
        let Some(item_type) = self.item_types.resolve(label) else {
            let message = format!("{label} does not exist in the catalogue. ");
            return Err(CatalogueFault::client(message));
        };
        match self.store(StoreCommand::List(item_type)).await? {
            StoreReply::Items(items) => Ok(CatalogueReply::Items(items)),
            _ => Err(CatalogueFault::ServerFault),
        }
    }

    /// Handles `get-tags`.
    async fn tags(&self) -> Result<CatalogueReply, CatalogueFault> {
        match self.store(StoreCommand::GetTags).await? {
            StoreReply::Tags(tags) => Ok(CatalogueReply::Tags(tags)),
            _ => Err(CatalogueFault::ServerFault),
        }
    }

    /// Handles `search-attribute` and `count`.
    async fn query(
        &self,
        action: Action,
        payload: CommandPayload,
    ) -> Result<CatalogueReply, CatalogueFault> {
        let CommandPayload::Filter(filter) = payload else {
            return Err(CatalogueFault::client(BAD_QUERY));
        };
        let command = if action == Action::Count {
            StoreCommand::Count(filter)
        } else {
            StoreCommand::SearchAttribute(filter)
        };
        match self.store(command).await? {
            StoreReply::Items(items) => Ok(CatalogueReply::Items(items)),
            StoreReply::Count(count) => Ok(CatalogueReply::Count(count)),
            _ => Err(CatalogueFault::ServerFault),
        }
    }

    /// Handles `create`: flag check, validation, item-type check, insert.
    async fn create(
        &self,
        request: &CatalogueRequest,
        payload: CommandPayload,
    ) -> Result<CatalogueReply, CatalogueFault> {
        let CommandPayload::Document(mut item) = payload else {
            return Err(CatalogueFault::client(INVALID_ITEM));
        };
        let skip = SkipValidation::parse(request.skip_validation.as_deref())
            .map_err(|err| CatalogueFault::client(err.to_string()))?;
        item.insert(fields::ID.to_string(), Value::String(String::new()));
        let label = request.item_type.clone().unwrap_or_default();
        self.validator
            .validate(&label, item.clone(), skip)
            .await
            .map_err(|_| CatalogueFault::ServerFault)?;
        item.insert(fields::ITEM_TYPE.to_string(), Value::String(label.clone()));
        if self.item_types.resolve(&label).is_none() {
            return Err(CatalogueFault::client(UNKNOWN_TYPE_CREATE));
        }
        match self.store(StoreCommand::WriteItem(item)).await? {
            StoreReply::Created(id) => Ok(CatalogueReply::Created(id)),
            _ => Err(CatalogueFault::ServerFault),
        }
    }

    /// Handles `update`. The store has no committing update.
    async fn update(
        &self,
        request: &CatalogueRequest,
        payload: CommandPayload,
    ) -> Result<CatalogueReply, CatalogueFault> {
        let CommandPayload::Document(mut item) = payload else {
            return Err(CatalogueFault::client(INVALID_ITEM));
        };
        let item_type = self.require_type(request.item_type.as_deref())?;
        let body_id = item.get(fields::ID).and_then(Value::as_str);
        if body_id != request.target_id.as_deref() {
            return Err(CatalogueFault::client(ID_MISMATCH));
        }
        item.insert(fields::ITEM_TYPE.to_string(), Value::String(item_type.as_str().to_string()));
        self.store(StoreCommand::Update(item)).await?;
        Err(CatalogueFault::ServerFault)
    }

    /// Handles `delete`; removing a missing item still succeeds.
    async fn delete(&self, request: &CatalogueRequest) -> Result<CatalogueReply, CatalogueFault> {
        self.require_type(request.item_type.as_deref())?;
        let id = request.target_id.clone().unwrap_or_default();
        self.store(StoreCommand::DeleteItem(id)).await?;
        Ok(CatalogueReply::Deleted)
    }

    /// Handles `bulkcreate`.
    async fn bulk_create(
        &self,
        request: &CatalogueRequest,
        payload: CommandPayload,
    ) -> Result<CatalogueReply, CatalogueFault> {
        let CommandPayload::Batch(items) = payload else {
            return Err(CatalogueFault::client(INVALID_ITEM));
        };
        self.require_type(request.item_type.as_deref())?;
        let bulk_id = request.bulk_id.clone().unwrap_or_default();
        let command = StoreCommand::BulkCreate {
            bulk_id: bulk_id.clone(),
            items,
        };
        match self.store(command).await? {
            StoreReply::BulkCreated(ids) => Ok(CatalogueReply::BulkCreated {
                bulk_id,
                ids,
            }),
            _ => Err(CatalogueFault::ServerFault),
        }
    }

    /// Handles `bulkupdate`. The store has no committing update.
    async fn bulk_update(
        &self,
        request: &CatalogueRequest,
        payload: CommandPayload,
    ) -> Result<CatalogueReply, CatalogueFault> {
        let CommandPayload::Document(item) = payload else {
            return Err(CatalogueFault::client(INVALID_ITEM));
        };
        self.require_type(request.item_type.as_deref())?;
        let bulk_id = request.bulk_id.clone().unwrap_or_default();
        self.store(StoreCommand::BulkUpdate {
            bulk_id,
            item,
        })
        .await?;
        Err(CatalogueFault::ServerFault)
    }

    /// Handles `bulkdelete`; removing nothing still succeeds.
    async fn bulk_delete(
        &self,
        request: &CatalogueRequest,
    ) -> Result<CatalogueReply, CatalogueFault> {
        self.require_type(request.item_type.as_deref())?;
        let bulk_id = request.bulk_id.clone().unwrap_or_default();
        self.store(StoreCommand::BulkDelete(bulk_id)).await?;
        Ok(CatalogueReply::Deleted)
    }
}

// ============================================================================
// SECTION: Received Stage
// ============================================================================

/// Parses the request payload for its action.
fn parse_payload(request: &CatalogueRequest) -> Result<CommandPayload, CatalogueFault> {
    match request.action {
        Action::List | Action::GetTags | Action::Delete | Action::BulkDelete => {
            Ok(CommandPayload::Empty)
        }
        Action::SearchAttribute | Action::Count => {
            let raw = request.query.as_deref().unwrap_or_default();
            parse_filter_query(raw)
                .map(CommandPayload::Filter)
                .map_err(|_| CatalogueFault::client(BAD_QUERY))
        }
        Action::Create | Action::Update | Action::BulkUpdate => {
            parse_object(request.body.as_deref()).map(CommandPayload::Document)
        }
        Action::BulkCreate => parse_batch(request.body.as_deref()).map(CommandPayload::Batch),
    }
}

/// Parses a body that must be a JSON object.
fn parse_object(body: Option<&[u8]>) -> Result<Document, CatalogueFault> {
    match serde_json::from_slice::<Value>(body.unwrap_or_default()) {
        Ok(Value::Object(document)) => Ok(document),
        _ => Err(CatalogueFault::client(INVALID_ITEM)),
    }
}

/// Parses a body that must be a JSON array of objects.
fn parse_batch(body: Option<&[u8]>) -> Result<Vec<Document>, CatalogueFault> {
    let Ok(Value::Array(elements)) = serde_json::from_slice::<Value>(body.unwrap_or_default())
    else {
        return Err(CatalogueFault::client(INVALID_ITEM));
    };
    elements
        .into_iter()
        .map(|element| match element {
            Value::Object(document) => Ok(document),
            _ => Err(CatalogueFault::client(INVALID_ITEM)),
        })
        .collect()
}

/// Maps a gate denial to its outward fault.
fn denial_fault(reason: DenialReason) -> CatalogueFault {
    if reason.is_certificate() {
        return CatalogueFault::client(CERTIFICATE_ERROR);
    }
    match reason {
        DenialReason::MalformedHeader => CatalogueFault::client(reason.message()),
        _ => CatalogueFault::AuthFault(reason.message().to_string()),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_status_codes_and_bodies() {
        let client = CatalogueFault::client(BAD_QUERY);
        assert_eq!(client.status_code(), 400);
        assert_eq!(client.body(), Some(json!({"Status": "Bad Query"})));
        assert_eq!(CatalogueFault::AuthFault("x".to_string()).status_code(), 401);
        assert_eq!(CatalogueFault::ServerFault.status_code(), 500);
        assert_eq!(CatalogueFault::ServerFault.body(), None);
    }

    #[test]
    fn store_faults_map_by_kind() {
        assert_eq!(
            CatalogueFault::from(StoreFault::Rejected("nope".to_string())),
            CatalogueFault::ClientFault("nope".to_string())
        );
        assert_eq!(CatalogueFault::from(StoreFault::Failure), CatalogueFault::ServerFault);
        assert_eq!(
            CatalogueFault::from(StoreFault::Unimplemented("update")),
            CatalogueFault::ServerFault
        );
    }

    #[test]
    fn denials_split_between_400_and_401() {
        assert_eq!(denial_fault(DenialReason::UntrustedClass).status_code(), 400);
        assert_eq!(denial_fault(DenialReason::MalformedHeader).status_code(), 400);
        assert_eq!(
            denial_fault(DenialReason::BadPassword),
            CatalogueFault::AuthFault("Your password is invalid".to_string())
        );
    }

    #[test]
    fn batch_rejects_non_object_elements() {
        assert!(parse_batch(Some(br#"[{"a": 1}, 2]"#)).is_err());
        assert_eq!(parse_batch(Some(br#"[{"a": 1}]"#)).map(|items| items.len()), Ok(1));
        assert!(parse_object(Some(b"[1]")).is_err());
        assert!(parse_object(None).is_err());
    }

    #[test]
    fn replies_carry_expected_status() {
        assert_eq!(CatalogueReply::Created("x".to_string()).status_code(), 201);
        assert_eq!(CatalogueReply::Deleted.status_code(), 204);
        assert_eq!(CatalogueReply::Deleted.body(), None);
        assert_eq!(CatalogueReply::Count(3).body(), Some(json!({"count": 3})));
    }
}
