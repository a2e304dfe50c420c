// crates/catalogue-server/src/lib.rs
// ============================================================================
// Module: Catalogue Server Library
// Description: Credential gate, actors, dispatch pipeline, and HTTP transport.
// Purpose: Serve catalogue operations over HTTP with layered authorization.
// Dependencies: catalogue-core, catalogue-config, axum, tokio
// ============================================================================

//! ## Overview
//! A request flows from the HTTP front end into the [`Dispatcher`], which
//! runs the credential gate for mutating actions, forwards item creation to
//! the validation actor, and finally forwards the command to the store
//! adapter actor. Each actor is reached only through an asynchronous
//! request/single-reply exchange, so many commands can be in flight without
//! shared mutable state.
//!
//! Security posture: every request input is untrusted. The client
//! certificate subject is trusted only when set by the TLS-terminating proxy
//! in the configured header.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod adapter;
pub mod audit;
pub mod auth;
pub mod credentials;
pub mod dispatch;
pub mod server;
pub mod validation;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use adapter::CatalogueStore;
pub use adapter::StoreCommand;
pub use adapter::StoreFault;
pub use adapter::StoreHandle;
pub use adapter::StoreReply;
pub use audit::AuditSink;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use auth::CertificateInfo;
pub use auth::CredentialGate;
pub use auth::DenialReason;
pub use auth::GateDecision;
pub use credentials::FileCredentialTable;
pub use dispatch::CatalogueFault;
pub use dispatch::CatalogueReply;
pub use dispatch::CatalogueRequest;
pub use dispatch::Dispatcher;
pub use server::CatalogueServer;
pub use server::ServerError;
pub use validation::AcceptAllValidator;
pub use validation::ItemValidator;
pub use validation::SchemaValidator;
pub use validation::ValidationFault;
pub use validation::ValidatorHandle;
