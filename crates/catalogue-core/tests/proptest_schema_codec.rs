// crates/catalogue-core/tests/proptest_schema_codec.rs
// ============================================================================
// Module: Schema Codec Property-Based Tests
// Description: Property tests for the schema field-name codec.
// Purpose: Show encode/decode is a lossless bijection over field names.
// ============================================================================

//! Property-based tests for schema codec invariants.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use catalogue_core::Document;
use catalogue_core::decode_schema;
use catalogue_core::encode_schema;
use proptest::prelude::*;
use serde_json::Value;

fn field_name() -> impl Strategy<Value = String> {
    "[a-z$&-]{0,6}"
}

fn document() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        "[a-z$&]{0,6}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            proptest::collection::btree_map(field_name(), inner, 0..4)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

fn object() -> impl Strategy<Value = Document> {
    proptest::collection::btree_map(field_name(), document(), 0..5)
        .prop_map(|map| map.into_iter().collect())
}

proptest! {
    #[test]
    fn decode_inverts_encode(doc in object()) {
        let encoded = encode_schema(&doc);
        prop_assert_eq!(decode_schema(&encoded).unwrap(), doc);
    }

    #[test]
    fn encoded_field_names_never_contain_reserved_character(doc in object()) {
        let encoded = encode_schema(&doc);
        for key in encoded.keys() {
            prop_assert!(!key.contains('$'));
        }
    }

    #[test]
    fn distinct_field_names_stay_distinct(a in field_name(), b in field_name()) {
        prop_assume!(a != b);
        let mut doc = Document::new();
        doc.insert(a, Value::Bool(true));
        doc.insert(b, Value::Bool(false));
        prop_assert_eq!(encode_schema(&doc).len(), 2);
    }
}
