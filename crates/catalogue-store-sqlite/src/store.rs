// crates/catalogue-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Document Store
// Description: Durable DocumentStore backed by SQLite.
// Purpose: Persist catalogue items and schemas across restarts.
// Dependencies: catalogue-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This module implements a durable [`DocumentStore`] using `SQLite`. Every
//! document is stored as JSON text in a single `documents` table keyed by
//! collection. The store-internal `_id` is the row identifier and is
//! injected on read; it is never persisted inside the body.
//!
//! Lookups by public `id` use an indexed column. All other conditions are
//! evaluated with [`StoreQuery::matches`] so that matching semantics are
//! identical to the in-memory backend.
//! Security posture: database contents are untrusted; bodies that fail to
//! parse are reported as corruption rather than skipped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;

use catalogue_core::Condition;
use catalogue_core::Document;
use catalogue_core::DocumentStore;
use catalogue_core::Projection;
use catalogue_core::StoreError;
use catalogue_core::StoreQuery;
use catalogue_core::fields;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum serialized document size accepted by the store.
pub const MAX_DOCUMENT_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` document store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Returns a configuration with default pragmas for `path`.
    #[must_use]
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
///
/// # Invariants
/// - Error messages avoid embedding raw document bodies.
#[derive(Debug, Error, Clone)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored body failed to parse.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store input.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Document exceeded the size limit.
    #[error("sqlite store payload too large: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual payload size in bytes.
        actual_bytes: usize,
    },
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::Corrupt(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::TooLarge {
                max_bytes,
                actual_bytes,
            } => Self::Invalid(format!(
                "document exceeds size limit: {actual_bytes} bytes (max {max_bytes})"
            )),
        }
    }
}

/// Maps a rusqlite error into a store error.
fn db_error(err: &rusqlite::Error) -> SqliteStoreError {
    SqliteStoreError::Db(err.to_string())
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed document store.
///
/// # Invariants
/// - Connection access is serialized through a mutex.
/// - Documents within a collection are returned in insertion order.
#[derive(Clone)]
pub struct SqliteDocumentStore {
    /// Store configuration.
    config: SqliteStoreConfig,
    /// Shared connection.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteDocumentStore {
    /// Opens an `SQLite`-backed document store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(&config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            config,
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Returns the database path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Locks the shared connection.
    fn connection(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection
            .lock()
            .map_err(|_| SqliteStoreError::Io("sqlite mutex poisoned".to_string()))
    }

    /// Loads candidate rows for `collection`, narrowing by public id when the
    /// query pins one.
    fn load_rows(
        &self,
        collection: &str,
        query: &StoreQuery,
    ) -> Result<Vec<(i64, Document)>, SqliteStoreError> {
        let guard = self.connection()?;
        select_rows(&guard, collection, query)
    }
}

impl DocumentStore for SqliteDocumentStore {
    fn find(
        &self,
        collection: &str,
        query: &StoreQuery,
        projection: &Projection,
    ) -> Result<Vec<Document>, StoreError> {
        let rows = self.load_rows(collection, query)?;
        Ok(rows
            .into_iter()
            .filter(|(_, document)| query.matches(document))
            .map(|(_, document)| projection.apply(document))
            .collect())
    }

    fn insert(&self, collection: &str, document: Document) -> Result<(), StoreError> {
        let (doc_id, body) = encode_body(document)?;
        let guard = self.connection()?;
        guard
            .execute(
                "INSERT INTO documents (collection, doc_id, body) VALUES (?1, ?2, ?3)",
                params![collection, doc_id, body],
            )
            .map_err(|err| db_error(&err))?;
        Ok(())
    }

    fn remove(&self, collection: &str, query: &StoreQuery) -> Result<u64, StoreError> {
        let doomed: Vec<i64> = self
            .load_rows(collection, query)?
            .into_iter()
            .filter(|(_, document)| query.matches(document))
            .map(|(row_id, _)| row_id)
            .collect();
        if doomed.is_empty() {
            return Ok(0);
        }
        let mut guard = self.connection()?;
        let tx = guard.transaction().map_err(|err| db_error(&err))?;
        let removed = delete_rows(&tx, &doomed)?;
        tx.commit().map_err(|err| db_error(&err))?;
        Ok(removed)
    }

    fn replace(
        &self,
        collection: &str,
        query: &StoreQuery,
        document: Document,
    ) -> Result<u64, StoreError> {
        let (doc_id, body) = encode_body(document)?;
        let mut guard = self.connection()?;
        let tx = guard.transaction().map_err(|err| db_error(&err))?;
        let doomed: Vec<i64> = select_rows(&tx, collection, query)?
            .into_iter()
            .filter(|(_, existing)| query.matches(existing))
            .map(|(row_id, _)| row_id)
            .collect();
        let removed = delete_rows(&tx, &doomed)?;
        tx.execute(
            "INSERT INTO documents (collection, doc_id, body) VALUES (?1, ?2, ?3)",
            params![collection, doc_id, body],
        )
        .map_err(|err| db_error(&err))?;
        tx.commit().map_err(|err| db_error(&err))?;
        Ok(removed)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Serializes a document for storage, returning its public id and body.
fn encode_body(mut document: Document) -> Result<(Option<String>, String), SqliteStoreError> {
    document.remove(fields::STORE_ID);
    let body = serde_json::to_string(&document)
        .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
    if body.len() > MAX_DOCUMENT_BYTES {
        return Err(SqliteStoreError::TooLarge {
            max_bytes: MAX_DOCUMENT_BYTES,
            actual_bytes: body.len(),
        });
    }
    let doc_id = document.get(fields::ID).and_then(Value::as_str).map(str::to_string);
    Ok((doc_id, body))
}

/// Selects candidate rows for `collection`, narrowing by public id when the
/// query pins one.
fn select_rows(
    connection: &Connection,
    collection: &str,
    query: &StoreQuery,
) -> Result<Vec<(i64, Document)>, SqliteStoreError> {
    let pinned_id = match query.get(fields::ID) {
        Some(Condition::Eq(Value::String(id))) => Some(id.clone()),
        _ => None,
    };
    let raw_rows = if let Some(id) = pinned_id {
        let mut statement = connection
            .prepare(
                "SELECT row_id, body FROM documents WHERE collection = ?1 AND doc_id = ?2 \
                 ORDER BY row_id",
            )
            .map_err(|err| db_error(&err))?;
        let rows = statement
            .query_map(params![collection, id], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(|err| db_error(&err))?;
        rows.collect::<Result<Vec<(i64, String)>, _>>().map_err(|err| db_error(&err))?
    } else {
        let mut statement = connection
            .prepare("SELECT row_id, body FROM documents WHERE collection = ?1 ORDER BY row_id")
            .map_err(|err| db_error(&err))?;
        let rows = statement
            .query_map(params![collection], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(|err| db_error(&err))?;
        rows.collect::<Result<Vec<(i64, String)>, _>>().map_err(|err| db_error(&err))?
    };
    raw_rows
        .into_iter()
        .map(|(row_id, body)| {
            let mut document = parse_body(&body)?;
            document.insert(fields::STORE_ID.to_string(), Value::from(row_id));
            Ok((row_id, document))
        })
        .collect()
}

/// Deletes rows by internal id, returning how many went away.
fn delete_rows(connection: &Connection, row_ids: &[i64]) -> Result<u64, SqliteStoreError> {
    let mut removed = 0_u64;
    for row_id in row_ids {
        let changed = connection
            .execute("DELETE FROM documents WHERE row_id = ?1", params![row_id])
            .map_err(|err| db_error(&err))?;
        removed += u64::try_from(changed).unwrap_or(0);
    }
    Ok(removed)
}

/// Parses a stored body into a document.
fn parse_body(body: &str) -> Result<Document, SqliteStoreError> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(document)) => Ok(document),
        Ok(_) => Err(SqliteStoreError::Corrupt("stored body is not an object".to_string())),
        Err(err) => Err(SqliteStoreError::Corrupt(err.to_string())),
    }
}

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection =
        Connection::open_with_flags(&config.path, flags).map_err(|err| db_error(&err))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| db_error(&err))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| db_error(&err))?;
    connection
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| db_error(&err))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| db_error(&err))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| db_error(&err))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| db_error(&err))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| db_error(&err))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS documents (
                    row_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    collection TEXT NOT NULL,
                    doc_id TEXT,
                    body TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_documents_collection
                    ON documents (collection, row_id);
                CREATE INDEX IF NOT EXISTS idx_documents_doc_id
                    ON documents (collection, doc_id);",
            )
            .map_err(|err| db_error(&err))?;
        }
        Some(SCHEMA_VERSION) => {}
        Some(other) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "expected schema version {SCHEMA_VERSION}, found {other}"
            )));
        }
    }
    tx.commit().map_err(|err| db_error(&err))?;
    Ok(())
}
