// crates/catalogue-core/src/core/translate.rs
// ============================================================================
// Module: Query Translator
// Description: Flat filter parsing and translation into store queries.
// Purpose: Turn client key/value and tag filters into a query plus projection.
// Dependencies: url, serde_json, crate::core::{item, query}
// ============================================================================

//! ## Overview
//! Clients filter the catalogue with a flat query string. The translator
//! parses it into a [`FilterMap`] (key to ordered values) and then into a
//! [`StoreQuery`] and [`Projection`]:
//!
//! - `tags` matches the lower-cased shadow tag field: equality for a single
//!   value, membership for several.
//! - `attributeFilter` never filters; each listed name becomes an included
//!   projection field.
//! - Every other key is an equality condition. When a key repeats, the last
//!   value wins. Repeated non-tag keys are not OR-ed.
//!
//! Translation is total over a well-formed [`FilterMap`]; only parsing can
//! fail, and it fails without producing a partial query.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;
use url::form_urlencoded;

use crate::core::item::ItemType;
use crate::core::item::fields;
use crate::core::query::Condition;
use crate::core::query::Projection;
use crate::core::query::StoreQuery;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Filter parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    /// Query string was empty.
    #[error("empty filter query")]
    Empty,
    /// A pair had no `=` separator.
    #[error("filter pair missing '=': {0}")]
    MissingSeparator(String),
    /// A pair had an empty key.
    #[error("filter pair has empty key")]
    EmptyKey,
    /// A pair had an empty value.
    #[error("filter key {0} has empty value")]
    EmptyValue(String),
}

// ============================================================================
// SECTION: Filter Map
// ============================================================================

/// Filter keys mapped to their values in submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterMap {
    /// Values per key, in the order they were submitted.
    entries: BTreeMap<String, Vec<String>>,
}

impl FilterMap {
    /// Creates an empty filter map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value under `key`.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.entry(key.into()).or_default().push(value.into());
    }

    /// Returns the values submitted for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Returns true when no keys are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates keys and their values.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(key, values)| (key.as_str(), values.as_slice()))
    }
}

impl<K, V> FromIterator<(K, V)> for FilterMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.push(key, value);
        }
        map
    }
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Parses a raw query string into a [`FilterMap`].
///
/// Pairs are split on `&`, then on the first `=`, then percent-decoded.
/// A value written as a bracketed list (`["a","b"]` or `[a,b]`) contributes
/// each element under the same key.
///
/// # Errors
///
/// Returns [`TranslateError`] when the query is empty, a pair lacks `=`, or a
/// key, value, or list element is empty.
pub fn parse_filter_query(raw: &str) -> Result<FilterMap, TranslateError> {
    if raw.trim().is_empty() {
        return Err(TranslateError::Empty);
    }
    let mut map = FilterMap::new();
    for pair in raw.split('&') {
        let Some((raw_key, raw_value)) = pair.split_once('=') else {
            return Err(TranslateError::MissingSeparator(pair.to_string()));
        };
        let key = decode_component(raw_key);
        if key.is_empty() {
            return Err(TranslateError::EmptyKey);
        }
        let value = decode_component(raw_value);
        let Some(values) = expand_list(&value) else {
            return Err(TranslateError::EmptyValue(key));
        };
        for value in values {
            map.push(key.clone(), value);
        }
    }
    Ok(map)
}

/// Percent-decodes one key or value, treating `+` as a space.
fn decode_component(raw: &str) -> String {
    // The component never contains '&'; prefixing a key keeps any '=' intact.
    let framed = format!("k={raw}");
    form_urlencoded::parse(framed.as_bytes())
        .next()
        .map(|(_, decoded)| decoded.into_owned())
        .unwrap_or_default()
}

/// Expands a bracketed list literal into its elements.
///
/// Returns `None` when the value or any list element is empty. A value
/// missing either bracket is taken literally.
fn expand_list(value: &str) -> Option<Vec<String>> {
    let trimmed = value.trim();
    let Some(inner) = trimmed.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) else {
        return if trimmed.is_empty() { None } else { Some(vec![value.to_string()]) };
    };
    inner
        .split(',')
        .map(|element| element.trim().trim_matches('"').trim())
        .map(|element| (!element.is_empty()).then(|| element.to_string()))
        .collect()
}

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Store query and projection derived from a filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Translation {
    /// Filter applied to the item collection.
    pub query: StoreQuery,
    /// Fields returned for each matching item.
    pub projection: Projection,
}

/// Translates a filter map into a store query and projection.
///
/// The reserved keys `tags` and `attributeFilter` match in any case.
#[must_use]
pub fn to_query(filter: &FilterMap) -> Translation {
    let mut translation = Translation::default();
    for (key, values) in filter.iter() {
        if key.eq_ignore_ascii_case(fields::TAGS) {
            if let Some(condition) = tag_condition(values) {
                translation.query.set(fields::SHADOW_TAGS, condition);
            }
        } else if key.eq_ignore_ascii_case(fields::ATTRIBUTE_FILTER) {
            for name in values {
                translation.projection.include(name.clone());
            }
        } else {
            for value in values {
                translation.query.set(key, Condition::Eq(Value::String(value.clone())));
            }
        }
    }
    translation
}

/// Builds the shadow-tag condition for the submitted tag values.
fn tag_condition(values: &[String]) -> Option<Condition> {
    match values {
        [] => None,
        [single] => Some(Condition::Eq(Value::String(single.to_lowercase()))),
        many => Some(Condition::In(
            many.iter().map(|tag| Value::String(tag.to_lowercase())).collect(),
        )),
    }
}

/// Returns the translation for listing every item of `item_type`.
#[must_use]
pub fn translate_list(item_type: ItemType) -> Translation {
    Translation {
        query: StoreQuery::new().eq(fields::ITEM_TYPE, item_type.as_str()),
        projection: Projection::new(),
    }
}

/// Returns the unfiltered translation used by the tag listing.
#[must_use]
pub fn translate_get_tags() -> Translation {
    Translation::default()
}
