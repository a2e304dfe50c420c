// crates/catalogue-core/src/core/command.rs
// ============================================================================
// Module: Catalogue Commands
// Description: Action vocabulary and per-request payloads.
// Purpose: Describe the unit of work flowing through the dispatch pipeline.
// Dependencies: serde, crate::core::{item, translate}
// ============================================================================

//! ## Overview
//! Each request carries one [`Action`] and one parsed [`CommandPayload`],
//! exclusively owned by the dispatch pipeline for its lifetime. The
//! [`Action`] tag selects the pipeline stages: mutating actions pass the
//! credential gate, and only `create` visits the validation collaborator.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::item::Document;
use crate::core::translate::FilterMap;

// ============================================================================
// SECTION: Actions
// ============================================================================

/// Catalogue action tag.
///
/// # Invariants
/// - Wire labels are stable; they name the store operation in audit logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// List items of one item-type (or the item-type / tag listings).
    #[serde(rename = "list")]
    List,
    /// List distinct tags across all items.
    #[serde(rename = "get-tags")]
    GetTags,
    /// Filter items by attribute.
    #[serde(rename = "search-attribute")]
    SearchAttribute,
    /// Count items matching a filter.
    #[serde(rename = "count")]
    Count,
    /// Create one item.
    #[serde(rename = "create")]
    Create,
    /// Update one item.
    #[serde(rename = "update")]
    Update,
    /// Delete one item.
    #[serde(rename = "delete")]
    Delete,
    /// Create a batch of items.
    #[serde(rename = "bulkcreate")]
    BulkCreate,
    /// Update a batch of items.
    #[serde(rename = "bulkupdate")]
    BulkUpdate,
    /// Delete a batch of items.
    #[serde(rename = "bulkdelete")]
    BulkDelete,
}

impl Action {
    /// Returns the stable wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::GetTags => "get-tags",
            Self::SearchAttribute => "search-attribute",
            Self::Count => "count",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::BulkCreate => "bulkcreate",
            Self::BulkUpdate => "bulkupdate",
            Self::BulkDelete => "bulkdelete",
        }
    }

    /// Returns true when the action changes catalogue state and must pass
    /// the credential gate.
    #[must_use]
    pub const fn is_mutating(self) -> bool {
        matches!(
            self,
            Self::Create
                | Self::Update
                | Self::Delete
                | Self::BulkCreate
                | Self::BulkUpdate
                | Self::BulkDelete
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Skip-Validation Flag
// ============================================================================

/// Error returned when the skip-validation flag is not a boolean literal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid value: skip_validation is not a boolean")]
pub struct SkipValidationError;

/// Tri-state skip-validation flag carried with item creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SkipValidation {
    /// Validation runs (explicit `false` or absent).
    #[default]
    Validate,
    /// Validation is skipped (explicit `true`).
    Skip,
}

impl SkipValidation {
    /// Parses the raw header value.
    ///
    /// Absent means `false`. Values are lower-cased before comparison, so
    /// only `true` and `false` (in any case) are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`SkipValidationError`] for any other literal.
    pub fn parse(raw: Option<&str>) -> Result<Self, SkipValidationError> {
        let Some(raw) = raw else {
            return Ok(Self::Validate);
        };
        match raw.to_lowercase().as_str() {
            "true" => Ok(Self::Skip),
            "false" => Ok(Self::Validate),
            _ => Err(SkipValidationError),
        }
    }

    /// Returns the header literal forwarded to the validation collaborator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validate => "false",
            Self::Skip => "true",
        }
    }
}

// ============================================================================
// SECTION: Command
// ============================================================================

/// Request payload parsed during the `Received` stage.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandPayload {
    /// No payload (listings, deletes).
    Empty,
    /// Flat filter parsed from the query string.
    Filter(FilterMap),
    /// A single structured document.
    Document(Document),
    /// A batch of structured documents.
    Batch(Vec<Document>),
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_state_changing_actions_are_mutating() {
        assert!(!Action::List.is_mutating());
        assert!(!Action::GetTags.is_mutating());
        assert!(!Action::SearchAttribute.is_mutating());
        assert!(!Action::Count.is_mutating());
        assert!(Action::Create.is_mutating());
        assert!(Action::BulkDelete.is_mutating());
    }

    #[test]
    fn skip_validation_accepts_boolean_literals_in_any_case() {
        assert_eq!(SkipValidation::parse(None), Ok(SkipValidation::Validate));
        assert_eq!(SkipValidation::parse(Some("false")), Ok(SkipValidation::Validate));
        assert_eq!(SkipValidation::parse(Some("TRUE")), Ok(SkipValidation::Skip));
    }

    #[test]
    fn skip_validation_rejects_other_literals() {
        assert_eq!(SkipValidation::parse(Some("maybe")), Err(SkipValidationError));
        assert_eq!(SkipValidation::parse(Some("")), Err(SkipValidationError));
        assert_eq!(
            SkipValidationError.to_string(),
            "Invalid value: skip_validation is not a boolean"
        );
    }
}
