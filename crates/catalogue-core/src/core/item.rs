// crates/catalogue-core/src/core/item.rs
// ============================================================================
// Module: Catalogue Items
// Description: Item documents, item-type enumeration, and system attributes.
// Purpose: Define the catalogue item model and its creation-time stamping.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Catalogue items are free-form JSON objects keyed by string field names.
//! The catalogue owns a handful of reserved fields: the public `id`, the
//! `item-type`, the lower-cased shadow tag array, and the system attributes
//! stamped on creation. The set of recognized item-types is fixed and is
//! shared read-only through [`ItemTypes`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

// ============================================================================
// SECTION: Document
// ============================================================================

/// A catalogue document: a JSON object keyed by field name.
pub type Document = Map<String, Value>;

/// Reserved field names and system attribute values.
pub mod fields {
    /// Public item identifier.
    pub const ID: &str = "id";
    /// Item-type discriminator.
    pub const ITEM_TYPE: &str = "item-type";
    /// User-visible tags.
    pub const TAGS: &str = "tags";
    /// Lower-cased shadow copy of `tags`; never returned to clients.
    pub const SHADOW_TAGS: &str = "_tags";
    /// Store-internal identifier; never returned to clients.
    pub const STORE_ID: &str = "_id";
    /// Creation timestamp.
    pub const CREATED: &str = "Created";
    /// Last modification timestamp.
    pub const LAST_MODIFIED: &str = "Last modified on";
    /// Lifecycle status.
    pub const STATUS: &str = "Status";
    /// Item version.
    pub const VERSION: &str = "Version";
    /// Provider tag.
    pub const PROVIDER: &str = "Provider";
    /// Correlation identifier for items created in a bulk batch.
    pub const BULK_ID: &str = "bulk-id";
    /// Reserved filter key carrying the projection list.
    pub const ATTRIBUTE_FILTER: &str = "attributeFilter";

    /// Version assigned to newly created items.
    pub const INITIAL_VERSION: &str = "1.0";
    /// Lifecycle status assigned to newly created items.
    pub const LIVE_STATUS: &str = "Live";
    /// Provider tag stamped on newly created items.
    pub const DEFAULT_PROVIDER: &str = "catalogue-provider";
}

// ============================================================================
// SECTION: Item Types
// ============================================================================

/// Recognized catalogue item-types.
///
/// # Invariants
/// - The wire label of each variant is stable and unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ItemType {
    /// A resource item.
    ResourceItem,
    /// A data model.
    DataModel,
    /// An access object.
    AccessObject,
    /// A resource server.
    ResourceServer,
    /// A provider.
    Provider,
    /// A base schema.
    BaseSchema,
    /// A generic catalogue item.
    CatalogueItem,
}

impl ItemType {
    /// All item-types in their canonical listing order.
    pub const ALL: [Self; 7] = [
        Self::ResourceItem,
        Self::DataModel,
        Self::AccessObject,
        Self::ResourceServer,
        Self::Provider,
        Self::BaseSchema,
        Self::CatalogueItem,
    ];

    /// Returns the wire label for the item-type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ResourceItem => "resource-item",
            Self::DataModel => "data-model",
            Self::AccessObject => "access-object",
            Self::ResourceServer => "resource-server",
            Self::Provider => "provider",
            Self::BaseSchema => "base-schema",
            Self::CatalogueItem => "catalogue-item",
        }
    }

    /// Parses a wire label. Matching is exact (case-sensitive).
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == label)
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable, process-wide set of recognized item-types.
///
/// # Invariants
/// - Built once at startup and never mutated; clones share the same set.
#[derive(Debug, Clone)]
pub struct ItemTypes {
    /// Recognized item-types in listing order.
    types: Arc<[ItemType]>,
}

impl Default for ItemTypes {
    fn default() -> Self {
        Self::standard()
    }
}

impl ItemTypes {
    /// Returns the standard seven-element item-type set.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            types: Arc::from(ItemType::ALL.as_slice()),
        }
    }

    /// Resolves a label to a recognized item-type.
    #[must_use]
    pub fn resolve(&self, label: &str) -> Option<ItemType> {
        ItemType::parse(label).filter(|kind| self.types.contains(kind))
    }

    /// Returns true when the label names a recognized item-type.
    #[must_use]
    pub fn contains(&self, label: &str) -> bool {
        self.resolve(label).is_some()
    }

    /// Returns the wire labels in listing order.
    #[must_use]
    pub fn labels(&self) -> Vec<&'static str> {
        self.types.iter().map(|kind| kind.as_str()).collect()
    }
}

// ============================================================================
// SECTION: System Attributes
// ============================================================================

/// System attribute values stamped onto a newly created item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemStamp {
    /// Freshly generated public identifier.
    pub id: String,
    /// Creation timestamp (also used as the first modification time).
    pub timestamp: String,
    /// Provider tag.
    pub provider: String,
}

/// Returns a stamped copy of `item` ready for insertion.
///
/// The input is never mutated. Any caller-supplied `id`, version, status, or
/// timestamp is overwritten. When `tags` is an array, its string values are
/// duplicated lower-cased into the shadow tag field.
#[must_use]
pub fn stamp_new_item(item: &Document, stamp: &SystemStamp) -> Document {
    let mut stamped = item.clone();
    stamped.insert(fields::CREATED.to_string(), Value::String(stamp.timestamp.clone()));
    stamped.insert(fields::LAST_MODIFIED.to_string(), Value::String(stamp.timestamp.clone()));
    stamped.insert(fields::STATUS.to_string(), Value::String(fields::LIVE_STATUS.to_string()));
    stamped.insert(fields::VERSION.to_string(), Value::String(fields::INITIAL_VERSION.to_string()));
    stamped.insert(fields::ID.to_string(), Value::String(stamp.id.clone()));
    stamped.insert(fields::PROVIDER.to_string(), Value::String(stamp.provider.clone()));
    stamped.remove(fields::SHADOW_TAGS);
    if let Some(Value::Array(tags)) = item.get(fields::TAGS) {
        let shadow = tags
            .iter()
            .filter_map(Value::as_str)
            .map(|tag| Value::String(tag.to_lowercase()))
            .collect();
        stamped.insert(fields::SHADOW_TAGS.to_string(), Value::Array(shadow));
    }
    stamped
}

// ============================================================================
// SECTION: Tests
// ============================================================================
