// crates/catalogue-core/src/core/credentials.rs
// ============================================================================
// Module: Credential Entries
// Description: Per-user credential record consulted by the credential gate.
// Purpose: Define the serialized shape of the credential table.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The credential table maps a user name to a password and a write flag. It
//! is stored as a JSON object keyed by user name and re-read on every
//! authorization check, so edits take effect without a restart.

use serde::Deserialize;
use serde::Serialize;

/// Credential record for a single user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialEntry {
    /// Shared secret presented via Basic authorization.
    pub password: String,
    /// Whether the user may mutate the catalogue.
    #[serde(default)]
    pub write_permission: bool,
}
