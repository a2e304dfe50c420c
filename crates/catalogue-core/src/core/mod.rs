// crates/catalogue-core/src/core/mod.rs
// ============================================================================
// Module: Catalogue Core Types
// Description: Canonical catalogue item, command, and query structures.
// Purpose: Provide stable, serializable types shared by every catalogue layer.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Catalogue core types define the item model and its system attributes, the
//! command vocabulary of the dispatch pipeline, the store query model, and the
//! pure transforms (query translation, schema field-name encoding) applied
//! between the wire and the document store.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod command;
pub mod credentials;
pub mod item;
pub mod query;
pub mod schema_codec;
pub mod translate;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use command::Action;
pub use command::CommandPayload;
pub use command::SkipValidation;
pub use command::SkipValidationError;
pub use credentials::CredentialEntry;
pub use item::Document;
pub use item::ItemType;
pub use item::ItemTypes;
pub use item::SystemStamp;
pub use item::fields;
pub use item::stamp_new_item;
pub use query::Condition;
pub use query::Projection;
pub use query::StoreQuery;
pub use schema_codec::SchemaCodecError;
pub use schema_codec::decode_schema;
pub use schema_codec::encode_schema;
pub use translate::FilterMap;
pub use translate::TranslateError;
pub use translate::Translation;
pub use translate::parse_filter_query;
pub use translate::to_query;
pub use translate::translate_get_tags;
pub use translate::translate_list;
