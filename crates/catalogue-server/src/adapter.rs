// crates/catalogue-server/src/adapter.rs
// ============================================================================
// Module: Catalogue Store Adapter
// Description: Item and schema operations over a document store.
// Purpose: Stamp, encode, query, and remove catalogue documents.
// Dependencies: catalogue-core, tokio, uuid, time
// ============================================================================

//! ## Overview
//! [`CatalogueStore`] specializes the find/insert/remove contract for the two
//! entity kinds: items and schemas. Items are stamped with system attributes
//! on insert; schemas pass through the reserved-character codec.
//!
//! [`StoreHandle`] exposes the adapter as an actor. Each request travels over
//! a bounded channel with its own single-use reply channel, and store calls
//! run on the blocking pool so the dispatcher never blocks.
//!
//! Bulk creation inserts items in order. A store fault aborts the batch and
//! leaves earlier inserts committed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;

use catalogue_core::Document;
use catalogue_core::DocumentStore;
use catalogue_core::FilterMap;
use catalogue_core::ItemType;
use catalogue_core::Projection;
use catalogue_core::SharedDocumentStore;
use catalogue_core::StoreQuery;
use catalogue_core::SystemStamp;
use catalogue_core::decode_schema;
use catalogue_core::encode_schema;
use catalogue_core::fields;
use catalogue_core::stamp_new_item;
use catalogue_core::to_query;
use catalogue_core::translate_get_tags;
use catalogue_core::translate_list;
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::sync::Semaphore;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use uuid::Uuid;

// ============================================================================
// SECTION: Faults
// ============================================================================

/// Fault returned by the store adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreFault {
    /// Generic store failure. Details are never surfaced to clients.
    #[error("Failure")]
    Failure,
    /// The operation has no committing behavior.
    #[error("operation not implemented: {0}")]
    Unimplemented(&'static str),
    /// The request was rejected with a client-facing message.
    #[error("{0}")]
    Rejected(String),
}

impl From<catalogue_core::StoreError> for StoreFault {
    fn from(_: catalogue_core::StoreError) -> Self {
        Self::Failure
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Operation requested from the store adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCommand {
    /// Stamp and insert one item.
    WriteItem(Document),
    /// Encode and upsert one schema.
    WriteSchema(Document),
    /// Read one item by identifier.
    ReadItem(String),
    /// Read and decode one schema by identifier.
    ReadSchema(String),
    /// Remove one item by identifier.
    DeleteItem(String),
    /// Remove one schema by identifier.
    DeleteSchema(String),
    /// Filter items by attribute.
    SearchAttribute(FilterMap),
    /// List items of one item-type.
    List(ItemType),
    /// List distinct user-visible tags.
    GetTags,
    /// Count items matching a filter.
    Count(FilterMap),
    /// Update one item.
    Update(Document),
    /// Stamp and insert a batch of items.
    BulkCreate {
        /// Bulk correlation identifier.
        bulk_id: String,
        /// Items in insertion order.
        items: Vec<Document>,
    },
    /// Update a batch of items.
    BulkUpdate {
        /// Bulk correlation identifier.
        bulk_id: String,
        /// Update document.
        item: Document,
    },
    /// Remove every item carrying a bulk identifier.
    BulkDelete(String),
}

impl StoreCommand {
    /// Returns the operation label carried in the request header.
    #[must_use]
    pub const fn action_label(&self) -> &'static str {
        match self {
            Self::WriteItem(_) => "write-item",
            Self::WriteSchema(_) => "write-schema",
            Self::ReadItem(_) => "read-item",
            Self::ReadSchema(_) => "read-schema",
            Self::DeleteItem(_) => "delete-item",
            Self::DeleteSchema(_) => "delete-schema",
            Self::SearchAttribute(_) => "search-attribute",
            Self::List(_) => "list",
            Self::GetTags => "get-tags",
            Self::Count(_) => "count",
            Self::Update(_) => "update",
            Self::BulkCreate {
                ..
            } => "bulkcreate",
            Self::BulkUpdate {
                ..
            } => "bulkupdate",
            Self::BulkDelete(_) => "bulkdelete",
        }
    }
}

/// Successful store adapter reply.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreReply {
    /// Item inserted under the new identifier.
    Created(String),
    /// Schema written.
    Written,
    /// Lookup result; `None` when nothing matched.
    Found(Option<Document>),
    /// Number of removed documents.
    Removed(u64),
    /// Matching items.
    Items(Vec<Document>),
    /// Sorted distinct tags.
    Tags(Vec<String>),
    /// Matching item count.
    Count(u64),
    /// Identifiers assigned to a bulk batch, in insertion order.
    BulkCreated(Vec<String>),
}

// ============================================================================
// SECTION: Adapter
// ============================================================================

/// Catalogue operations over a document store.
///
/// # Invariants
/// - Documents returned to callers never carry `_id` or `_tags`.
/// - Caller documents are never mutated.
#[derive(Clone)]
pub struct CatalogueStore {
    /// Underlying document store.
    store: SharedDocumentStore,
    /// Item collection name.
    item_collection: String,
    /// Schema collection name.
    schema_collection: String,
    /// Provider tag stamped on new items.
    provider: String,
}

impl CatalogueStore {
    /// Creates an adapter over `store` using the given collection names.
    #[must_use]
    pub fn new(
        store: SharedDocumentStore,
        item_collection: impl Into<String>,
        schema_collection: impl Into<String>,
    ) -> Self {
        Self {
            store,
            item_collection: item_collection.into(),
            schema_collection: schema_collection.into(),
            provider: fields::DEFAULT_PROVIDER.to_string(),
        }
    }

    /// Builds a fresh system stamp.
    fn stamp(&self) -> Result<SystemStamp, StoreFault> {
        let timestamp =
            OffsetDateTime::now_utc().format(&Rfc3339).map_err(|_| StoreFault::Failure)?;
        Ok(SystemStamp {
            id: Uuid::new_v4().to_string(),
            timestamp,
            provider: self.provider.clone(),
        })
    }

    /// Stamps and inserts one item, returning its new identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreFault::Failure`] when the insert fails.
    pub fn write_item(&self, item: &Document) -> Result<String, StoreFault> {
        let stamp = self.stamp()?;
        let stamped = stamp_new_item(item, &stamp);
        self.store.insert(&self.item_collection, stamped)?;
        Ok(stamp.id)
    }

    /// Encodes and upserts one schema keyed by its `id`. A failed write
    /// leaves any previous schema with that id in place.
    ///
    /// # Errors
    ///
    /// Returns [`StoreFault::Rejected`] when the schema has no string `id`
    /// and [`StoreFault::Failure`] when the store fails.
    pub fn write_schema(&self, schema: &Document) -> Result<(), StoreFault> {
        let Some(id) = schema.get(fields::ID).and_then(Value::as_str) else {
            return Err(StoreFault::Rejected("Schema id is required".to_string()));
        };
        self.store.replace(&self.schema_collection, &id_query(id), encode_schema(schema))?;
        Ok(())
    }

    /// Reads one item by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreFault::Failure`] when the store fails.
    pub fn read_item(&self, id: &str) -> Result<Option<Document>, StoreFault> {
        let found = self.store.find(&self.item_collection, &id_query(id), &Projection::new())?;
        Ok(found.into_iter().next().map(strip_shadow_tags))
    }

    /// Reads and decodes one schema by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreFault::Failure`] when the store fails or the stored
    /// field names cannot be decoded.
    pub fn read_schema(&self, id: &str) -> Result<Option<Document>, StoreFault> {
        let found = self.store.find(&self.schema_collection, &id_query(id), &Projection::new())?;
        match found.into_iter().next() {
            None => Ok(None),
            Some(encoded) => {
                decode_schema(&encoded).map(Some).map_err(|_| StoreFault::Failure)
            }
        }
    }

    /// Removes one item. Missing items are not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreFault::Failure`] when the store fails.
    pub fn delete_item(&self, id: &str) -> Result<u64, StoreFault> {
        Ok(self.store.remove(&self.item_collection, &id_query(id))?)
    }

    /// Removes one schema. Missing schemas are not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreFault::Failure`] when the store fails.
    pub fn delete_schema(&self, id: &str) -> Result<u64, StoreFault> {
        Ok(self.store.remove(&self.schema_collection, &id_query(id))?)
    }

    /// Filters items by attribute.
    ///
    /// # Errors
    ///
    /// Returns [`StoreFault::Failure`] when the store fails.
    pub fn search_attribute(&self, filter: &FilterMap) -> Result<Vec<Document>, StoreFault> {
        let translation = to_query(filter);
        let found =
            self.store.find(&self.item_collection, &translation.query, &translation.projection)?;
        Ok(found.into_iter().map(strip_shadow_tags).collect())
    }

    /// Lists every item of `item_type`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreFault::Failure`] when the store fails.
    pub fn list(&self, item_type: ItemType) -> Result<Vec<Document>, StoreFault> {
        let translation = translate_list(item_type);
        let found =
            self.store.find(&self.item_collection, &translation.query, &translation.projection)?;
        Ok(found.into_iter().map(strip_shadow_tags).collect())
    }

    /// Returns the sorted distinct user-visible tags across all items.
    ///
    /// # Errors
    ///
    /// Returns [`StoreFault::Failure`] when the store fails.
    pub fn get_tags(&self) -> Result<Vec<String>, StoreFault> {
        let mut translation = translate_get_tags();
        translation.projection.include(fields::TAGS);
        let found =
            self.store.find(&self.item_collection, &translation.query, &translation.projection)?;
        let tags: BTreeSet<String> = found
            .iter()
            .filter_map(|item| item.get(fields::TAGS).and_then(Value::as_array))
            .flatten()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
        Ok(tags.into_iter().collect())
    }

    /// Counts items matching `filter`. Projection keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreFault::Failure`] when the store fails.
    pub fn count(&self, filter: &FilterMap) -> Result<u64, StoreFault> {
        let translation = to_query(filter);
        let found = self.store.find(&self.item_collection, &translation.query, &Projection::new())?;
        u64::try_from(found.len()).map_err(|_| StoreFault::Failure)
    }

    /// Stamps and inserts a batch of items in order.
    ///
    /// Each item also carries `bulk-id`. The first failing insert aborts the
    /// batch; earlier inserts stay committed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreFault::Failure`] when any insert fails.
    pub fn bulk_create(
        &self,
        bulk_id: &str,
        items: &[Document],
    ) -> Result<Vec<String>, StoreFault> {
        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            let stamp = self.stamp()?;
            let mut stamped = stamp_new_item(item, &stamp);
            stamped.insert(fields::BULK_ID.to_string(), Value::String(bulk_id.to_string()));
            self.store.insert(&self.item_collection, stamped)?;
            ids.push(stamp.id);
        }
        Ok(ids)
    }

    /// Removes every item carrying `bulk_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreFault::Failure`] when the store fails.
    pub fn bulk_delete(&self, bulk_id: &str) -> Result<u64, StoreFault> {
        let query = StoreQuery::new().eq(fields::BULK_ID, bulk_id);
        Ok(self.store.remove(&self.item_collection, &query)?)
    }

    /// Executes one command synchronously.
    ///
    /// # Errors
    ///
    /// Returns [`StoreFault`] from the selected operation. Update commands
    /// always return [`StoreFault::Unimplemented`].
    pub fn execute(&self, command: StoreCommand) -> Result<StoreReply, StoreFault> {
        match command {
            StoreCommand::WriteItem(item) => self.write_item(&item).map(StoreReply::Created),
            StoreCommand::WriteSchema(schema) => {
                self.write_schema(&schema).map(|()| StoreReply::Written)
            }
            StoreCommand::ReadItem(id) => self.read_item(&id).map(StoreReply::Found),
            StoreCommand::ReadSchema(id) => self.read_schema(&id).map(StoreReply::Found),
            StoreCommand::DeleteItem(id) => self.delete_item(&id).map(StoreReply::Removed),
            StoreCommand::DeleteSchema(id) => self.delete_schema(&id).map(StoreReply::Removed),
            StoreCommand::SearchAttribute(filter) => {
                self.search_attribute(&filter).map(StoreReply::Items)
            }
            StoreCommand::List(item_type) => self.list(item_type).map(StoreReply::Items),
            StoreCommand::GetTags => self.get_tags().map(StoreReply::Tags),
            StoreCommand::Count(filter) => self.count(&filter).map(StoreReply::Count),
            StoreCommand::BulkCreate {
                bulk_id,
                items,
            } => self.bulk_create(&bulk_id, &items).map(StoreReply::BulkCreated),
            StoreCommand::BulkDelete(bulk_id) => {
                self.bulk_delete(&bulk_id).map(StoreReply::Removed)
            }
            command @ (StoreCommand::Update(_)
            | StoreCommand::BulkUpdate {
                ..
            }) => Err(StoreFault::Unimplemented(command.action_label())),
        }
    }
}

/// Builds an equality query on the public identifier.
fn id_query(id: &str) -> StoreQuery {
    StoreQuery::new().eq(fields::ID, id)
}

/// Removes the shadow tag field.
fn strip_shadow_tags(mut item: Document) -> Document {
    item.remove(fields::SHADOW_TAGS);
    item
}

// ============================================================================
// SECTION: Actor
// ============================================================================

/// Request envelope carried to the store actor.
struct StoreEnvelope {
    /// Requested operation.
    command: StoreCommand,
    /// Single-use reply channel.
    reply: oneshot::Sender<Result<StoreReply, StoreFault>>,
}

/// Cloneable handle to the store adapter actor.
#[derive(Clone)]
pub struct StoreHandle {
    /// Request channel into the actor.
    sender: mpsc::Sender<StoreEnvelope>,
}

impl StoreHandle {
    /// Spawns the actor on the current tokio runtime.
    ///
    /// `capacity` bounds both queued requests and requests in progress; zero
    /// is treated as one.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    #[must_use]
    pub fn spawn(store: CatalogueStore, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        tokio::spawn(run_store_actor(Arc::new(store), receiver, capacity));
        Self {
            sender,
        }
    }

    /// Sends one command and awaits its reply.
    ///
    /// # Errors
    ///
    /// Returns the adapter's [`StoreFault`], or [`StoreFault::Failure`] when
    /// the actor is gone.
    pub async fn request(&self, command: StoreCommand) -> Result<StoreReply, StoreFault> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(StoreEnvelope {
                command,
                reply,
            })
            .await
            .map_err(|_| StoreFault::Failure)?;
        response.await.map_err(|_| StoreFault::Failure)?
    }
}

/// Actor loop: each request runs independently on the blocking pool, with at
/// most `capacity` in progress.
async fn run_store_actor(
    store: Arc<CatalogueStore>,
    mut receiver: mpsc::Receiver<StoreEnvelope>,
    capacity: usize,
) {
    let permits = Arc::new(Semaphore::new(capacity));
    while let Some(envelope) = receiver.recv().await {
        let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
            break;
        };
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            let StoreEnvelope {
                command,
                reply,
            } = envelope;
            let outcome = tokio::task::spawn_blocking(move || store.execute(command))
                .await
                .unwrap_or(Err(StoreFault::Failure));
            drop(permit);
            let _ = reply.send(outcome);
        });
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
