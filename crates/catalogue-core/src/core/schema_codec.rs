// crates/catalogue-core/src/core/schema_codec.rs
// ============================================================================
// Module: Schema Field-Name Codec
// Description: Reversible encoding of store-reserved characters in field names.
// Purpose: Persist JSON Schema documents whose keys start with `$`.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Document stores reserve `$` in field names, and JSON Schema documents use
//! it freely (`$schema`, `$ref`, `$id`). Schemas are persisted with a
//! structural field-name transform applied recursively over the document
//! tree. Values are never touched.
//!
//! The escape character is `&`:
//!
//! | Raw | Encoded |
//! |-----|---------|
//! | `$` | `&-`    |
//! | `&` | `&&`    |
//!
//! The mapping is prefix-free, so decoding is unambiguous and a field that
//! already contains `&` can never collide with an encoded `$`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::core::item::Document;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Character reserved by the document store.
const RESERVED: char = '$';
/// Escape character introducing an encoded sequence.
const ESCAPE: char = '&';
/// Second character of an encoded reserved character.
const RESERVED_CODE: char = '-';

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Decoding failures for stored schema documents.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaCodecError {
    /// Field name ended in the middle of an escape sequence.
    #[error("truncated escape in field name {0}")]
    TruncatedEscape(String),
    /// Field name contained an unknown escape sequence.
    #[error("unknown escape in field name {0}")]
    UnknownEscape(String),
}

// ============================================================================
// SECTION: Public API
// ============================================================================

/// Encodes every field name in `document`, recursively.
#[must_use]
pub fn encode_schema(document: &Document) -> Document {
    encode_map(document)
}

/// Decodes every field name in `document`, recursively.
///
/// # Errors
///
/// Returns [`SchemaCodecError`] when a field name is not a valid encoding.
pub fn decode_schema(document: &Document) -> Result<Document, SchemaCodecError> {
    decode_map(document)
}

// ============================================================================
// SECTION: Encoding
// ============================================================================

/// Encodes the keys of one object.
fn encode_map(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter().map(|(key, value)| (encode_name(key), encode_value(value))).collect()
}

/// Recurses into objects and arrays.
fn encode_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(encode_map(map)),
        Value::Array(items) => Value::Array(items.iter().map(encode_value).collect()),
        other => other.clone(),
    }
}

/// Encodes one field name.
fn encode_name(name: &str) -> String {
    let mut encoded = String::with_capacity(name.len());
    for ch in name.chars() {
        match ch {
            RESERVED => {
                encoded.push(ESCAPE);
                encoded.push(RESERVED_CODE);
            }
            ESCAPE => {
                encoded.push(ESCAPE);
                encoded.push(ESCAPE);
            }
            other => encoded.push(other),
        }
    }
    encoded
}

// ============================================================================
// SECTION: Decoding
// ============================================================================

/// Decodes the keys of one object.
fn decode_map(map: &Map<String, Value>) -> Result<Map<String, Value>, SchemaCodecError> {
    let mut decoded = Map::with_capacity(map.len());
    for (key, value) in map {
        decoded.insert(decode_name(key)?, decode_value(value)?);
    }
    Ok(decoded)
}

/// Recurses into objects and arrays.
fn decode_value(value: &Value) -> Result<Value, SchemaCodecError> {
    match value {
        Value::Object(map) => Ok(Value::Object(decode_map(map)?)),
        Value::Array(items) => {
            items.iter().map(decode_value).collect::<Result<Vec<_>, _>>().map(Value::Array)
        }
        other => Ok(other.clone()),
    }
}

/// Decodes one field name.
fn decode_name(name: &str) -> Result<String, SchemaCodecError> {
    let mut decoded = String::with_capacity(name.len());
    let mut chars = name.chars();
    while let Some(ch) = chars.next() {
        if ch != ESCAPE {
            decoded.push(ch);
            continue;
        }
        match chars.next() {
            Some(RESERVED_CODE) => decoded.push(RESERVED),
            Some(ESCAPE) => decoded.push(ESCAPE),
            Some(_) => return Err(SchemaCodecError::UnknownEscape(name.to_string())),
            None => return Err(SchemaCodecError::TruncatedEscape(name.to_string())),
        }
    }
    Ok(decoded)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
