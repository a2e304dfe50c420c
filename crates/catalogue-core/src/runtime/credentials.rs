// crates/catalogue-core/src/runtime/credentials.rs
// ============================================================================
// Module: Catalogue In-Memory Credentials
// Description: In-memory credential table and shared table wrapper.
// Purpose: Back the credential gate in tests and embedded deployments.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! [`InMemoryCredentialTable`] holds entries behind a read-write lock so that
//! concurrent lookups never block one another while an update is visible to
//! the next lookup.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::RwLock;

use crate::core::CredentialEntry;
use crate::interfaces::CredentialError;
use crate::interfaces::CredentialTable;

// ============================================================================
// SECTION: In-Memory Table
// ============================================================================

/// In-memory credential table.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCredentialTable {
    /// Entries keyed by user identifier.
    entries: Arc<RwLock<BTreeMap<String, CredentialEntry>>>,
}

impl InMemoryCredentialTable {
    /// Creates an empty credential table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the entry for `user`.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] when the lock is poisoned.
    pub fn upsert(
        &self,
        user: impl Into<String>,
        entry: CredentialEntry,
    ) -> Result<(), CredentialError> {
        self.entries
            .write()
            .map_err(|_| CredentialError::Io("credential table lock poisoned".to_string()))?
            .insert(user.into(), entry);
        Ok(())
    }

    /// Removes the entry for `user`.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] when the lock is poisoned.
    pub fn remove(&self, user: &str) -> Result<(), CredentialError> {
        self.entries
            .write()
            .map_err(|_| CredentialError::Io("credential table lock poisoned".to_string()))?
            .remove(user);
        Ok(())
    }
}

impl CredentialTable for InMemoryCredentialTable {
    fn lookup(&self, user: &str) -> Result<Option<CredentialEntry>, CredentialError> {
        let guard = self
            .entries
            .read()
            .map_err(|_| CredentialError::Io("credential table lock poisoned".to_string()))?;
        Ok(guard.get(user).cloned())
    }
}

// ============================================================================
// SECTION: Shared Table
// ============================================================================

/// Shared credential table backed by an `Arc` trait object.
#[derive(Clone)]
pub struct SharedCredentialTable {
    /// Inner table implementation.
    inner: Arc<dyn CredentialTable + Send + Sync>,
}

impl SharedCredentialTable {
    /// Wraps a credential table in a shared, clonable wrapper.
    #[must_use]
    pub fn from_table(table: impl CredentialTable + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(table),
        }
    }
}

impl CredentialTable for SharedCredentialTable {
    fn lookup(&self, user: &str) -> Result<Option<CredentialEntry>, CredentialError> {
        self.inner.lookup(user)
    }
}
