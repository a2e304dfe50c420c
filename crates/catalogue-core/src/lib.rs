// crates/catalogue-core/src/lib.rs
// ============================================================================
// Module: Catalogue Core Library
// Description: Public API surface for the catalogue core.
// Purpose: Expose catalogue types, interfaces, and runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Catalogue core defines the item and schema document model, the dynamic
//! query translator that turns flat filters into store-native queries, and
//! the narrow find/insert/remove contract every document store implements.
//! It is backend-agnostic: HTTP, authorization, and actors live in
//! `catalogue-server`.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::CredentialError;
pub use interfaces::CredentialTable;
pub use interfaces::DocumentStore;
pub use interfaces::StoreError;
pub use runtime::InMemoryCredentialTable;
pub use runtime::InMemoryDocumentStore;
pub use runtime::SharedCredentialTable;
pub use runtime::SharedDocumentStore;
