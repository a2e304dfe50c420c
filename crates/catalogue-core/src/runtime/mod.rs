// crates/catalogue-core/src/runtime/mod.rs
// ============================================================================
// Module: Catalogue Runtime Helpers
// Description: In-memory stores and shared trait-object wrappers.
// Purpose: Provide deterministic backends for tests and memory-mode serving.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime helpers implement the catalogue interfaces in memory and wrap any
//! implementation in clonable `Arc` handles for sharing across tasks.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod credentials;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use credentials::InMemoryCredentialTable;
pub use credentials::SharedCredentialTable;
pub use store::InMemoryDocumentStore;
pub use store::SharedDocumentStore;
