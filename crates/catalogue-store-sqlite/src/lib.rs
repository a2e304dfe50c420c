// crates/catalogue-store-sqlite/src/lib.rs
// ============================================================================
// Module: Catalogue SQLite Store Library
// Description: Public API surface for the SQLite document store.
// Purpose: Expose the durable DocumentStore implementation and its config.
// Dependencies: crate::store
// ============================================================================

//! ## Overview
//! Durable [`catalogue_core::DocumentStore`] backed by `SQLite`. Documents are
//! stored as JSON text per collection; filtering and projection reuse the
//! core query model so every backend matches identically.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::MAX_DOCUMENT_BYTES;
pub use store::SqliteDocumentStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
