// crates/catalogue-server/src/auth.rs
// ============================================================================
// Module: Credential Gate
// Description: Certificate trust-class and Basic credential checks.
// Purpose: Decide whether a mutating catalogue request may proceed.
// Dependencies: catalogue-core, base64, subtle
// ============================================================================

//! ## Overview
//! The gate runs two independent checks before any mutating action:
//!
//! 1. The client certificate subject (a distinguished name set by the
//!    TLS-terminating proxy) must carry an organizational identifier with a
//!    trust class in [`ALLOWED_TRUST_CLASSES`].
//! 2. The `Authorization` header must carry Basic credentials for a
//!    registered user whose entry grants write permission.
//!
//! Both checks return a [`GateDecision`] rather than an error. Only a failure
//! to read the credential table is an error. The table is read on every
//! credential check and never cached.
//!
//! Security posture: headers are untrusted. Oversized or undecodable
//! headers are denied without panicking, and passwords are compared in
//! constant time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use catalogue_core::CredentialError;
use catalogue_core::CredentialTable;
use catalogue_core::SharedCredentialTable;
use subtle::ConstantTimeEq;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted `Authorization` header size.
const MAX_AUTH_HEADER_BYTES: usize = 8 * 1024;
/// Maximum accepted certificate subject size.
const MAX_SUBJECT_BYTES: usize = 4 * 1024;
/// Trust classes accepted for mutating requests.
pub const ALLOWED_TRUST_CLASSES: [u8; 3] = [3, 4, 5];
/// Distinguished-name keys naming the organizational identifier.
const ORG_IDENTIFIER_KEYS: [&str; 3] = ["organizationidentifier", "oid.2.5.4.97", "2.5.4.97"];
/// Distinguished-name key naming the e-mail address.
const EMAIL_KEY: &str = "emailaddress";
/// Marker preceding the trust class number.
const TRUST_CLASS_MARKER: &str = "class:";

// ============================================================================
// SECTION: Certificate Info
// ============================================================================

/// Parsed client certificate subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateInfo {
    /// Attributes in subject order, keys lower-cased.
    attributes: Vec<(String, String)>,
}

impl CertificateInfo {
    /// Parses a distinguished name of comma-separated `key=value` pairs.
    ///
    /// Returns `None` for an empty or oversized subject, or one without any
    /// `key=value` attribute.
    #[must_use]
    pub fn parse(subject: &str) -> Option<Self> {
        if subject.len() > MAX_SUBJECT_BYTES {
            return None;
        }
        let attributes: Vec<(String, String)> = subject
            .split(',')
            .filter_map(|part| part.split_once('='))
            .map(|(key, value)| {
                (key.trim().to_ascii_lowercase(), value.trim().trim_matches('"').to_string())
            })
            .filter(|(key, _)| !key.is_empty())
            .collect();
        if attributes.is_empty() {
            return None;
        }
        Some(Self {
            attributes,
        })
    }

    /// Returns the first attribute value for `key` (case-insensitive).
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        let key = key.to_ascii_lowercase();
        self.attributes
            .iter()
            .find(|(candidate, _)| *candidate == key)
            .map(|(_, value)| value.as_str())
    }

    /// Returns the organizational identifier attribute.
    #[must_use]
    pub fn organization_identifier(&self) -> Option<&str> {
        ORG_IDENTIFIER_KEYS.iter().find_map(|key| self.attribute(key))
    }

    /// Returns the e-mail address attribute.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.attribute(EMAIL_KEY)
    }

    /// Returns the trust class declared in the organizational identifier.
    #[must_use]
    pub fn trust_class(&self) -> Option<u8> {
        let identifier = self.organization_identifier()?.to_ascii_lowercase();
        let start = identifier.find(TRUST_CLASS_MARKER)? + TRUST_CLASS_MARKER.len();
        let digits: String =
            identifier[start ..].chars().take_while(char::is_ascii_digit).collect();
        digits.parse().ok()
    }
}

// ============================================================================
// SECTION: Decisions
// ============================================================================

/// Reason a gate check denied the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// No verified client certificate was presented.
    Unverified,
    /// Certificate trust class is missing or not allowed.
    UntrustedClass,
    /// No `Authorization` header was presented.
    MissingHeader,
    /// Authorization scheme is not `Basic`.
    Scheme,
    /// Header could not be split or decoded.
    MalformedHeader,
    /// Credentials carried no password.
    MissingPassword,
    /// User is not in the credential table.
    UnknownUser,
    /// Password does not match.
    BadPassword,
    /// User lacks write permission.
    NoWriteAccess,
}

impl DenialReason {
    /// Returns a stable label for audit logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Unverified => "unverified",
            Self::UntrustedClass => "trust class",
            Self::MissingHeader => "missing header",
            Self::Scheme => "scheme",
            Self::MalformedHeader => "malformed header",
            Self::MissingPassword => "missing password",
            Self::UnknownUser => "unknown user",
            Self::BadPassword => "bad password",
            Self::NoWriteAccess => "no write access",
        }
    }

    /// Returns the client-facing message.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Unverified | Self::UntrustedClass => "Certificate authentication error",
            Self::MissingHeader => "Add 'authorization' in the header of your request",
            Self::Scheme => "Use Basic HTTP authorization",
            Self::MalformedHeader => "Malformed authorization header",
            Self::MissingPassword => "Password is required",
            Self::UnknownUser => "User is not registered",
            Self::BadPassword => "Your password is invalid",
            Self::NoWriteAccess => "You do not have write access to the server",
        }
    }

    /// Returns true when the denial came from the certificate check.
    #[must_use]
    pub const fn is_certificate(self) -> bool {
        matches!(self, Self::Unverified | Self::UntrustedClass)
    }
}

/// Outcome of a gate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// The check passed.
    Allowed,
    /// The check failed.
    Denied(DenialReason),
}

/// Gate stage that produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStage {
    /// Certificate trust-class check.
    Certificate,
    /// Basic credential check.
    Credentials,
}

impl GateStage {
    /// Returns a stable label for audit logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Certificate => "certificate",
            Self::Credentials => "credentials",
        }
    }
}

/// Decoded Basic credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    /// User identifier.
    pub user: String,
    /// Password, absent when the payload had no `:` or an empty password.
    pub password: Option<String>,
}

// ============================================================================
// SECTION: Checks
// ============================================================================

/// Checks the client certificate trust class.
#[must_use]
pub fn check_certificate(certificate: Option<&CertificateInfo>) -> GateDecision {
    let Some(certificate) = certificate else {
        return GateDecision::Denied(DenialReason::Unverified);
    };
    match certificate.trust_class() {
        Some(class) if ALLOWED_TRUST_CLASSES.contains(&class) => GateDecision::Allowed,
        _ => GateDecision::Denied(DenialReason::UntrustedClass),
    }
}

/// Decodes a Basic `Authorization` header.
///
/// # Errors
///
/// Returns the [`DenialReason`] for a missing, oversized, non-Basic, or
/// undecodable header.
pub fn decode_basic(header: Option<&str>) -> Result<BasicCredentials, DenialReason> {
    let header = header.ok_or(DenialReason::MissingHeader)?;
    if header.len() > MAX_AUTH_HEADER_BYTES {
        return Err(DenialReason::MalformedHeader);
    }
    let (scheme, payload) = header.trim().split_once(' ').ok_or(DenialReason::MalformedHeader)?;
    if scheme != "Basic" {
        return Err(DenialReason::Scheme);
    }
    let decoded = STANDARD.decode(payload.trim()).map_err(|_| DenialReason::MalformedHeader)?;
    let text = String::from_utf8(decoded).map_err(|_| DenialReason::MalformedHeader)?;
    let (user, password) = match text.split_once(':') {
        Some((user, password)) if !password.is_empty() => {
            (user.to_string(), Some(password.to_string()))
        }
        Some((user, _)) => (user.to_string(), None),
        None => (text, None),
    };
    Ok(BasicCredentials {
        user,
        password,
    })
}

/// Checks Basic credentials against the credential table.
///
/// # Errors
///
/// Returns [`CredentialError`] when the table cannot be read.
pub fn check_credentials(
    header: Option<&str>,
    table: &dyn CredentialTable,
) -> Result<GateDecision, CredentialError> {
    let credentials = match decode_basic(header) {
        Ok(credentials) => credentials,
        Err(reason) => return Ok(GateDecision::Denied(reason)),
    };
    Ok(match_credentials(&credentials, table)?)
}

/// Matches decoded credentials against the table.
fn match_credentials(
    credentials: &BasicCredentials,
    table: &dyn CredentialTable,
) -> Result<GateDecision, CredentialError> {
    let Some(password) = credentials.password.as_deref() else {
        return Ok(GateDecision::Denied(DenialReason::MissingPassword));
    };
    let Some(entry) = table.lookup(&credentials.user)? else {
        return Ok(GateDecision::Denied(DenialReason::UnknownUser));
    };
    if !bool::from(entry.password.as_bytes().ct_eq(password.as_bytes())) {
        return Ok(GateDecision::Denied(DenialReason::BadPassword));
    }
    if !entry.write_permission {
        return Ok(GateDecision::Denied(DenialReason::NoWriteAccess));
    }
    Ok(GateDecision::Allowed)
}

/// Runs the combined gate: certificate first, then credentials.
///
/// # Errors
///
/// Returns [`CredentialError`] when the table cannot be read.
pub fn authorize(
    certificate: Option<&CertificateInfo>,
    header: Option<&str>,
    table: &dyn CredentialTable,
) -> Result<GateDecision, CredentialError> {
    match check_certificate(certificate) {
        GateDecision::Allowed => check_credentials(header, table),
        denied @ GateDecision::Denied(_) => Ok(denied),
    }
}

// ============================================================================
// SECTION: Gate
// ============================================================================

/// Detailed gate outcome used for auditing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateReport {
    /// Stage that produced the final decision.
    pub stage: GateStage,
    /// Final decision.
    pub decision: GateDecision,
    /// User identifier when the header decoded.
    pub user_id: Option<String>,
}

/// Credential gate bound to a shared credential table.
#[derive(Clone)]
pub struct CredentialGate {
    /// Read-through credential table.
    table: SharedCredentialTable,
}

impl CredentialGate {
    /// Creates a gate over `table`.
    #[must_use]
    pub const fn new(table: SharedCredentialTable) -> Self {
        Self {
            table,
        }
    }

    /// Runs the combined gate and reports which stage decided.
    ///
    /// This reads the credential table and should run off the async
    /// executor.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] when the table cannot be read.
    pub fn authorize(
        &self,
        certificate: Option<&CertificateInfo>,
        header: Option<&str>,
    ) -> Result<GateReport, CredentialError> {
        if let denied @ GateDecision::Denied(_) = check_certificate(certificate) {
            return Ok(GateReport {
                stage: GateStage::Certificate,
                decision: denied,
                user_id: None,
            });
        }
        let (decision, user_id) = match decode_basic(header) {
            Err(reason) => (GateDecision::Denied(reason), None),
            Ok(credentials) => {
                (match_credentials(&credentials, &self.table)?, Some(credentials.user))
            }
        };
        Ok(GateReport {
            stage: GateStage::Credentials,
            decision,
            user_id,
        })
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
