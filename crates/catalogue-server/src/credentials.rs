// crates/catalogue-server/src/credentials.rs
// ============================================================================
// Module: File Credential Table
// Description: Read-through credential table backed by a JSON file.
// Purpose: Provide the registered-user lookup for the credential gate.
// Dependencies: catalogue-core, serde_json
// ============================================================================

//! ## Overview
//! The credential file is a JSON object mapping user identifiers to
//! `{"password": "...", "write_permission": true}` entries. The file is read
//! on every lookup, so edits take effect on the next authorization check.
//!
//! Security posture: the file is untrusted input. Oversized or malformed
//! files fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use catalogue_core::CredentialEntry;
use catalogue_core::CredentialError;
use catalogue_core::CredentialTable;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum credential file size in bytes.
pub const MAX_CREDENTIAL_FILE_BYTES: u64 = 1024 * 1024;

// ============================================================================
// SECTION: File Table
// ============================================================================

/// Credential table re-read from disk on every lookup.
#[derive(Debug, Clone)]
pub struct FileCredentialTable {
    /// Path to the JSON credential file.
    path: PathBuf,
}

impl FileCredentialTable {
    /// Creates a table over the file at `path`. The file is not read here.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
        }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and parses the whole file.
    fn read_all(&self) -> Result<BTreeMap<String, CredentialEntry>, CredentialError> {
        let bytes = read_bounded(&self.path, MAX_CREDENTIAL_FILE_BYTES)?;
        serde_json::from_slice(&bytes).map_err(|err| CredentialError::Invalid(err.to_string()))
    }
}

/// Reads at most `limit` bytes from `path`, failing when the file is larger,
/// including when it grows after the size check.
fn read_bounded(path: &Path, limit: u64) -> Result<Vec<u8>, CredentialError> {
    let file = File::open(path).map_err(|err| CredentialError::Io(err.to_string()))?;
    let size = file.metadata().map_err(|err| CredentialError::Io(err.to_string()))?.len();
    if size > limit {
        return Err(oversized());
    }
    let mut bytes = Vec::new();
    file.take(limit.saturating_add(1))
        .read_to_end(&mut bytes)
        .map_err(|err| CredentialError::Io(err.to_string()))?;
    if u64::try_from(bytes.len()).unwrap_or(u64::MAX) > limit {
        return Err(oversized());
    }
    Ok(bytes)
}

/// Error for a credential file over the size limit.
fn oversized() -> CredentialError {
    CredentialError::Invalid("credential file exceeds size limit".to_string())
}

impl CredentialTable for FileCredentialTable {
    fn lookup(&self, user: &str) -> Result<Option<CredentialEntry>, CredentialError> {
        let mut entries = self.read_all()?;
        Ok(entries.remove(user))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only assertions.")]

    use std::fs;

    use super::*;

    #[test]
    fn lookup_sees_file_edits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user.list");
        fs::write(&path, r#"{"alice": {"password": "a", "write_permission": true}}"#).unwrap();
        let table = FileCredentialTable::new(&path);
        assert!(table.lookup("alice").unwrap().unwrap().write_permission);
        assert_eq!(table.lookup("bob").unwrap(), None);

        fs::write(&path, r#"{"bob": {"password": "b"}}"#).unwrap();
        assert_eq!(table.lookup("alice").unwrap(), None);
        let bob = table.lookup("bob").unwrap().unwrap();
        assert_eq!(bob.password, "b");
        assert!(!bob.write_permission);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let table = FileCredentialTable::new(dir.path().join("absent.list"));
        assert!(matches!(table.lookup("alice"), Err(CredentialError::Io(_))));
    }

    #[test]
    fn malformed_file_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user.list");
        fs::write(&path, "not json").unwrap();
        let table = FileCredentialTable::new(&path);
        assert!(matches!(table.lookup("alice"), Err(CredentialError::Invalid(_))));
    }

    #[test]
    fn oversized_file_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user.list");
        let limit = usize::try_from(MAX_CREDENTIAL_FILE_BYTES).unwrap();
        fs::write(&path, vec![b' '; limit + 1]).unwrap();
        let table = FileCredentialTable::new(&path);
        assert!(matches!(table.lookup("alice"), Err(CredentialError::Invalid(_))));
    }

    #[test]
    fn bounded_read_stops_past_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user.list");
        fs::write(&path, b"0123456789").unwrap();
        assert_eq!(read_bounded(&path, 10).unwrap(), b"0123456789");
        assert!(matches!(read_bounded(&path, 9), Err(CredentialError::Invalid(_))));
    }
}
