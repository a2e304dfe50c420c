// crates/catalogue-core/src/core/query.rs
// ============================================================================
// Module: Store Query Model
// Description: Store-native filter conditions and field projections.
// Purpose: Give every document store one matching and projection semantics.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`StoreQuery`] is a conjunction of per-field conditions. Conditions use
//! document-store membership semantics: an equality condition matches a field
//! whose value equals the operand, or an array field that contains it. A
//! [`Projection`] selects which fields are returned and always hides the
//! store-internal identifier.
//!
//! Security posture: projection is the last step before documents leave the
//! store layer, so `_id` is excluded unconditionally here rather than at each
//! call site.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::item::Document;
use crate::core::item::fields;

// ============================================================================
// SECTION: Conditions
// ============================================================================

/// Per-field match condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum Condition {
    /// Field equals the value, or is an array containing it.
    Eq(Value),
    /// Field equals any listed value, or is an array containing one of them.
    In(Vec<Value>),
}

impl Condition {
    /// Returns true when `candidate` satisfies the condition.
    #[must_use]
    pub fn matches(&self, candidate: &Value) -> bool {
        match self {
            Self::Eq(expected) => value_matches(candidate, expected),
            Self::In(options) => options.iter().any(|expected| value_matches(candidate, expected)),
        }
    }
}

/// Equality with array membership.
fn value_matches(candidate: &Value, expected: &Value) -> bool {
    if candidate == expected {
        return true;
    }
    match candidate {
        Value::Array(items) => items.iter().any(|item| item == expected),
        _ => false,
    }
}

// ============================================================================
// SECTION: Store Query
// ============================================================================

/// Conjunction of field conditions.
///
/// # Invariants
/// - At most one condition per field; setting a field again replaces it.
/// - An empty query matches every document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreQuery {
    /// Conditions keyed by field name (dotted paths reach nested objects).
    conditions: BTreeMap<String, Condition>,
}

impl StoreQuery {
    /// Creates an empty query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a query with an equality condition on `field`.
    #[must_use]
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, Condition::Eq(value.into()));
        self
    }

    /// Sets (or replaces) the condition for `field`.
    pub fn set(&mut self, field: impl Into<String>, condition: Condition) {
        self.conditions.insert(field.into(), condition);
    }

    /// Returns the condition for `field`, if any.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Condition> {
        self.conditions.get(field)
    }

    /// Returns true when the query has no conditions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Returns the number of conditions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// Iterates conditions in field-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Condition)> {
        self.conditions.iter().map(|(field, condition)| (field.as_str(), condition))
    }

    /// Returns true when every condition matches `document`.
    ///
    /// A condition on a missing field never matches.
    #[must_use]
    pub fn matches(&self, document: &Document) -> bool {
        self.conditions.iter().all(|(field, condition)| {
            lookup_field(document, field).is_some_and(|value| condition.matches(value))
        })
    }
}

/// Resolves a field by exact key first, then by dotted path.
fn lookup_field<'a>(document: &'a Document, field: &str) -> Option<&'a Value> {
    if let Some(value) = document.get(field) {
        return Some(value);
    }
    let mut segments = field.split('.');
    let mut current = document.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

// ============================================================================
// SECTION: Projection
// ============================================================================

/// Field projection applied to documents leaving the store.
///
/// # Invariants
/// - `_id` is always excluded and can never be included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projection {
    /// Fields to keep; empty means keep all.
    include: BTreeSet<String>,
    /// Fields to drop.
    exclude: BTreeSet<String>,
}

impl Default for Projection {
    fn default() -> Self {
        Self::new()
    }
}

impl Projection {
    /// Creates a projection that only hides the store-internal identifier.
    #[must_use]
    pub fn new() -> Self {
        let mut exclude = BTreeSet::new();
        exclude.insert(fields::STORE_ID.to_string());
        Self {
            include: BTreeSet::new(),
            exclude,
        }
    }

    /// Marks `field` for inclusion. `_id` is ignored.
    pub fn include(&mut self, field: impl Into<String>) {
        let field = field.into();
        if field != fields::STORE_ID {
            self.include.insert(field);
        }
    }

    /// Marks `field` for exclusion.
    pub fn exclude(&mut self, field: impl Into<String>) {
        self.exclude.insert(field.into());
    }

    /// Returns the included fields.
    #[must_use]
    pub const fn included(&self) -> &BTreeSet<String> {
        &self.include
    }

    /// Returns the excluded fields.
    #[must_use]
    pub const fn excluded(&self) -> &BTreeSet<String> {
        &self.exclude
    }

    /// Applies the projection to a document.
    #[must_use]
    pub fn apply(&self, mut document: Document) -> Document {
        if !self.include.is_empty() {
            document.retain(|key, _| self.include.contains(key));
        }
        for field in &self.exclude {
            document.remove(field);
        }
        document
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only assertions.")]

    use serde_json::json;

    use super::*;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn equality_matches_scalars_and_array_members() {
        let document = doc(json!({"color": "red", "_tags": ["air", "water"]}));
        assert!(StoreQuery::new().eq("color", "red").matches(&document));
        assert!(StoreQuery::new().eq("_tags", "air").matches(&document));
        assert!(!StoreQuery::new().eq("_tags", "fire").matches(&document));
    }

    #[test]
    fn membership_matches_any_listed_value() {
        let document = doc(json!({"_tags": ["air"]}));
        let mut query = StoreQuery::new();
        query.set("_tags", Condition::In(vec![json!("fire"), json!("air")]));
        assert!(query.matches(&document));
    }

    #[test]
    fn missing_field_never_matches() {
        let document = doc(json!({"name": "x"}));
        assert!(!StoreQuery::new().eq("color", "red").matches(&document));
        assert!(StoreQuery::new().matches(&document));
    }

    #[test]
    fn dotted_paths_reach_nested_objects() {
        let document = doc(json!({"location": {"city": "pune"}}));
        assert!(StoreQuery::new().eq("location.city", "pune").matches(&document));
    }

    #[test]
    fn projection_always_hides_store_identifier() {
        let mut projection = Projection::new();
        projection.include("_id");
        projection.include("name");
        let projected = projection.apply(doc(json!({"_id": 7, "name": "x", "id": "y"})));
        assert_eq!(Value::Object(projected), json!({"name": "x"}));
    }

    #[test]
    fn empty_projection_keeps_everything_but_store_identifier() {
        let projected = Projection::new().apply(doc(json!({"_id": 7, "name": "x"})));
        assert_eq!(Value::Object(projected), json!({"name": "x"}));
    }
}
