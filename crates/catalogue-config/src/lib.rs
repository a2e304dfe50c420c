// crates/catalogue-config/src/lib.rs
// ============================================================================
// Module: Catalogue Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for catalogue.toml semantics.
// Dependencies: catalogue-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `catalogue-config` defines the configuration model for the catalogue
//! server. Loading is strict and fail-closed: every load runs validation and
//! any invalid field aborts startup.
//!
//! Security posture: config inputs are untrusted.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
