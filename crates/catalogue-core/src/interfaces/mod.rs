// crates/catalogue-core/src/interfaces/mod.rs
// ============================================================================
// Module: Catalogue Interfaces
// Description: Backend-agnostic contracts for document stores and credentials.
// Purpose: Define the narrow seams the catalogue depends on.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! The catalogue reaches persistent state only through two traits:
//!
//! - [`DocumentStore`]: find/insert/remove/replace over named document
//!   collections.
//! - [`CredentialTable`]: read-through lookup of per-user credentials.
//!
//! Implementations must be safe to share across threads. Neither trait
//! caches on behalf of callers; a credential table in particular must reflect
//! its backing state on every lookup.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::CredentialEntry;
use crate::core::Document;
use crate::core::Projection;
use crate::core::StoreQuery;

// ============================================================================
// SECTION: Document Store
// ============================================================================

/// Document store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("document store io error: {0}")]
    Io(String),
    /// Stored data is corrupted or unreadable.
    #[error("document store corruption: {0}")]
    Corrupt(String),
    /// Input document is invalid for the store.
    #[error("document store invalid data: {0}")]
    Invalid(String),
    /// Store reported an error.
    #[error("document store error: {0}")]
    Store(String),
}

/// Document store over named collections.
///
/// # Invariants
/// - `find` returns documents in insertion order with `projection` applied.
/// - `insert` assigns the store-internal `_id`; callers never supply it.
/// - `remove` succeeds when nothing matches and reports the removed count.
/// - `replace` is all-or-nothing: on error the collection is unchanged.
pub trait DocumentStore {
    /// Returns every document in `collection` matching `query`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    fn find(
        &self,
        collection: &str,
        query: &StoreQuery,
        projection: &Projection,
    ) -> Result<Vec<Document>, StoreError>;

    /// Inserts `document` into `collection`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the document cannot be persisted.
    fn insert(&self, collection: &str, document: Document) -> Result<(), StoreError>;

    /// Removes every document in `collection` matching `query`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be written.
    fn remove(&self, collection: &str, query: &StoreQuery) -> Result<u64, StoreError>;

    /// Removes every document in `collection` matching `query` and inserts
    /// `document` as one atomic step, reporting the removed count.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the replacement cannot be committed; the
    /// previously stored documents are then left in place.
    fn replace(
        &self,
        collection: &str,
        query: &StoreQuery,
        document: Document,
    ) -> Result<u64, StoreError>;
}

// ============================================================================
// SECTION: Credential Table
// ============================================================================

/// Credential table errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    /// Backing table could not be read.
    #[error("credential table io error: {0}")]
    Io(String),
    /// Backing table is not a valid credential map.
    #[error("credential table invalid: {0}")]
    Invalid(String),
}

/// Read-through credential lookup.
pub trait CredentialTable {
    /// Returns the credential entry for `user`, if registered.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] when the table cannot be read.
    fn lookup(&self, user: &str) -> Result<Option<CredentialEntry>, CredentialError>;
}
