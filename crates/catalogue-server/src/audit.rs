// crates/catalogue-server/src/audit.rs
// ============================================================================
// Module: Catalogue Audit Logging
// Description: Structured audit events for catalogue request handling.
// Purpose: Emit redacted JSON-line audit logs without hard dependencies.
// Dependencies: catalogue-core, serde, serde_json, sha2
// ============================================================================

//! ## Overview
//! This module defines audit event payloads and sinks. Events are serialized
//! as one JSON object per line so deployments can route them to any log
//! pipeline. Credentials never appear in events; certificate e-mail
//! addresses are recorded only as SHA-256 fingerprints.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use catalogue_core::Action;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Request outcome label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestOutcome {
    /// Request completed successfully.
    Ok,
    /// Request was rejected or failed.
    Error,
}

/// Per-request audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct RequestAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Request identifier.
    pub request_id: String,
    /// Catalogue action.
    pub action: Action,
    /// Item-type from the request path, when present.
    pub item_type: Option<String>,
    /// Request outcome.
    pub outcome: RequestOutcome,
    /// HTTP status code returned.
    pub status: u16,
    /// Normalized fault kind label.
    pub fault_kind: Option<&'static str>,
    /// Time spent in the dispatch pipeline (milliseconds).
    pub latency_ms: u128,
}

/// Inputs required to construct a request audit event.
pub struct RequestAuditEventParams {
    /// Request identifier.
    pub request_id: String,
    /// Catalogue action.
    pub action: Action,
    /// Item-type from the request path, when present.
    pub item_type: Option<String>,
    /// Request outcome.
    pub outcome: RequestOutcome,
    /// HTTP status code returned.
    pub status: u16,
    /// Normalized fault kind label.
    pub fault_kind: Option<&'static str>,
    /// Time spent in the dispatch pipeline (milliseconds).
    pub latency_ms: u128,
}

/// Credential gate audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct AuthAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Request identifier.
    pub request_id: String,
    /// Gate stage label (`certificate` or `credentials`).
    pub stage: &'static str,
    /// Whether the stage allowed the request.
    pub allowed: bool,
    /// Denial reason label when denied.
    pub reason: Option<&'static str>,
    /// User identifier from the Basic header, when decoded.
    pub user_id: Option<String>,
    /// SHA-256 fingerprint of the certificate e-mail address.
    pub subject_fingerprint: Option<String>,
}

/// Inputs required to construct an auth audit event.
pub struct AuthAuditEventParams {
    /// Request identifier.
    pub request_id: String,
    /// Gate stage label.
    pub stage: &'static str,
    /// Whether the stage allowed the request.
    pub allowed: bool,
    /// Denial reason label when denied.
    pub reason: Option<&'static str>,
    /// User identifier from the Basic header, when decoded.
    pub user_id: Option<String>,
    /// Certificate e-mail address, fingerprinted before recording.
    pub subject_email: Option<String>,
}

/// Security posture audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct SecurityAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Security event kind.
    pub kind: String,
    /// Optional message.
    pub message: Option<String>,
}

/// Returns the current wall-clock time in milliseconds.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

/// Returns the lower-case hex SHA-256 fingerprint of `value`.
#[must_use]
pub fn fingerprint(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

impl RequestAuditEvent {
    /// Creates a new request audit event with a consistent timestamp.
    #[must_use]
    pub fn new(params: RequestAuditEventParams) -> Self {
        Self {
            event: "catalogue_request",
            timestamp_ms: now_ms(),
            request_id: params.request_id,
            action: params.action,
            item_type: params.item_type,
            outcome: params.outcome,
            status: params.status,
            fault_kind: params.fault_kind,
            latency_ms: params.latency_ms,
        }
    }
}

impl AuthAuditEvent {
    /// Creates a new auth audit event with a consistent timestamp.
    #[must_use]
    pub fn new(params: AuthAuditEventParams) -> Self {
        Self {
            event: "auth_decision",
            timestamp_ms: now_ms(),
            request_id: params.request_id,
            stage: params.stage,
            allowed: params.allowed,
            reason: params.reason,
            user_id: params.user_id,
            subject_fingerprint: params.subject_email.as_deref().map(fingerprint),
        }
    }
}

impl SecurityAuditEvent {
    /// Creates a new security audit event with a consistent timestamp.
    #[must_use]
    pub fn new(kind: impl Into<String>, message: Option<String>) -> Self {
        Self {
            event: "security_posture",
            timestamp_ms: now_ms(),
            kind: kind.into(),
            message,
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for catalogue events.
pub trait AuditSink: Send + Sync {
    /// Record a request audit event.
    fn record(&self, event: &RequestAuditEvent);

    /// Record a credential gate audit event.
    fn record_auth(&self, _event: &AuthAuditEvent) {}

    /// Record a security posture audit event.
    fn record_security(&self, _event: &SecurityAuditEvent) {}
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl StderrAuditSink {
    /// Writes one serialized event to stderr.
    fn emit(event: &impl Serialize) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

impl AuditSink for StderrAuditSink {
    fn record(&self, event: &RequestAuditEvent) {
        Self::emit(event);
    }

    fn record_auth(&self, event: &AuthAuditEvent) {
        Self::emit(event);
    }

    fn record_security(&self, event: &SecurityAuditEvent) {
        Self::emit(event);
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Appends one serialized event to the log file.
    fn emit(&self, event: &impl Serialize) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, event: &RequestAuditEvent) {
        self.emit(event);
    }

    fn record_auth(&self, event: &AuthAuditEvent) {
        self.emit(event);
    }

    fn record_security(&self, event: &SecurityAuditEvent) {
        self.emit(event);
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &RequestAuditEvent) {}
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only assertions.")]

    use super::*;

    #[test]
    fn fingerprint_is_hex_sha256() {
        assert_eq!(
            fingerprint("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn auth_event_never_carries_raw_email() {
        let event = AuthAuditEvent::new(AuthAuditEventParams {
            request_id: "r-1".to_string(),
            stage: "certificate",
            allowed: true,
            reason: None,
            user_id: None,
            subject_email: Some("ops@example.org".to_string()),
        });
        let payload = serde_json::to_string(&event).unwrap();
        assert!(!payload.contains("ops@example.org"));
        assert!(payload.contains("\"event\":\"auth_decision\""));
    }

    #[test]
    fn file_sink_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let sink = FileAuditSink::new(&path).unwrap();
        sink.record_security(&SecurityAuditEvent::new("tls_disabled", None));
        sink.record_security(&SecurityAuditEvent::new("credentials_missing", None));
        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["kind"], "tls_disabled");
    }
}
