// crates/catalogue-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for bounded reads and schema file loading.
// Purpose: Ensure CLI file inputs fail closed on oversized or malformed data.
// Dependencies: catalogue-cli main helpers, tempfile
// ============================================================================

//! ## Overview
//! Validates `read_bytes_with_limit` and `load_schema_file`.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;

use serde_json::json;

use super::ReadLimitError;
use super::load_schema_file;
use super::read_bytes_with_limit;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn read_bytes_with_limit_allows_small_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("small.bin");
    fs::write(&path, b"ok").expect("write small file");
    assert_eq!(read_bytes_with_limit(&path, 16).expect("read small file"), b"ok");
}

#[test]
fn read_bytes_with_limit_rejects_large_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("large.bin");
    fs::write(&path, vec![0_u8; 9]).expect("write large file");
    match read_bytes_with_limit(&path, 8).expect_err("expected size limit failure") {
        ReadLimitError::TooLarge {
            size,
            limit,
        } => {
            assert_eq!(size, 9);
            assert_eq!(limit, 8);
        }
        ReadLimitError::Io(err) => panic!("unexpected io error: {err}"),
    }
}

#[test]
fn schema_file_gets_requested_id() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("provider.json");
    fs::write(&path, json!({"id": "other", "type": "object"}).to_string()).expect("write");
    let schema = load_schema_file(&path, "provider").expect("load schema");
    assert_eq!(schema["id"], json!("provider"));
    assert_eq!(schema["type"], json!("object"));
}

#[test]
fn schema_file_must_be_json_object() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("list.json");
    fs::write(&path, "[1, 2]").expect("write");
    let err = load_schema_file(&path, "provider").expect_err("array rejected");
    assert_eq!(err.to_string(), "schema file must contain a json object");

    fs::write(&path, "{not json").expect("write");
    let err = load_schema_file(&path, "provider").expect_err("garbage rejected");
    assert!(err.to_string().starts_with("schema file is not valid json"));
}
