// crates/catalogue-server/src/validation.rs
// ============================================================================
// Module: Validation Collaborator
// Description: Item validation against stored JSON Schemas.
// Purpose: Gate item creation behind an asynchronous validation exchange.
// Dependencies: catalogue-core, jsonschema, tokio, async-trait
// ============================================================================

//! ## Overview
//! The dispatcher reaches validation only through [`ValidatorHandle`], a
//! request/single-reply exchange tagged with the `validate-item` action.
//! [`SchemaValidator`] looks up the schema stored under the item's
//! item-type and checks the item with JSON Schema draft 2020-12. An
//! item-type without a stored schema passes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use catalogue_core::Document;
use catalogue_core::SkipValidation;
use jsonschema::Draft;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::sync::mpsc;
use tokio::sync::oneshot;

use crate::adapter::StoreCommand;
use crate::adapter::StoreHandle;
use crate::adapter::StoreReply;

// ============================================================================
// SECTION: Faults
// ============================================================================

/// Validation failure. Always fatal to the request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationFault {
    /// The item violates its schema.
    #[error("item failed schema validation: {0}")]
    Invalid(String),
    /// The stored schema does not compile.
    #[error("stored schema is invalid: {0}")]
    BadSchema(String),
    /// The schema could not be read.
    #[error("schema lookup failed")]
    Lookup,
    /// The validator actor is gone.
    #[error("validator unavailable")]
    Unavailable,
}

// ============================================================================
// SECTION: Validator Interface
// ============================================================================

/// Item validation interface.
#[async_trait]
pub trait ItemValidator: Send + Sync {
    /// Validates `item` declared as `item_type`.
    async fn validate(
        &self,
        item_type: &str,
        item: &Document,
        skip: SkipValidation,
    ) -> Result<(), ValidationFault>;
}

/// Validator that accepts every item.
pub struct AcceptAllValidator;

#[async_trait]
impl ItemValidator for AcceptAllValidator {
    async fn validate(
        &self,
        _item_type: &str,
        _item: &Document,
        _skip: SkipValidation,
    ) -> Result<(), ValidationFault> {
        Ok(())
    }
}

/// Validator backed by schemas in the schema collection.
#[derive(Clone)]
pub struct SchemaValidator {
    /// Store actor used for schema lookups.
    store: StoreHandle,
}

impl SchemaValidator {
    /// Creates a validator reading schemas through `store`.
    #[must_use]
    pub const fn new(store: StoreHandle) -> Self {
        Self {
            store,
        }
    }
}

#[async_trait]
impl ItemValidator for SchemaValidator {
    async fn validate(
        &self,
        item_type: &str,
        item: &Document,
        skip: SkipValidation,
    ) -> Result<(), ValidationFault> {
        if skip == SkipValidation::Skip {
            return Ok(());
        }
        let reply = self
            .store
            .request(StoreCommand::ReadSchema(item_type.to_string()))
            .await
            .map_err(|_| ValidationFault::Lookup)?;
        match reply {
            StoreReply::Found(None) => Ok(()),
            StoreReply::Found(Some(schema)) => check_against_schema(schema, item),
            _ => Err(ValidationFault::Lookup),
        }
    }
}

/// Checks `item` against a decoded schema document.
///
/// # Errors
///
/// Returns [`ValidationFault::BadSchema`] when the schema does not compile and
/// [`ValidationFault::Invalid`] listing every violation otherwise.
pub fn check_against_schema(schema: Document, item: &Document) -> Result<(), ValidationFault> {
    let schema = Value::Object(schema);
    let validator = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .map_err(|err| ValidationFault::BadSchema(err.to_string()))?;
    let instance = Value::Object(item.clone());
    let errors: Vec<String> =
        validator.iter_errors(&instance).map(|err| err.to_string()).collect();
    if errors.is_empty() { Ok(()) } else { Err(ValidationFault::Invalid(errors.join("; "))) }
}

// ============================================================================
// SECTION: Actor
// ============================================================================

/// Request envelope carried to the validator actor.
struct ValidationEnvelope {
    /// Declared item-type.
    item_type: String,
    /// Item to validate.
    item: Document,
    /// Skip flag forwarded from the request.
    skip: SkipValidation,
    /// Single-use reply channel.
    reply: oneshot::Sender<Result<(), ValidationFault>>,
}

/// Cloneable handle to the validator actor.
#[derive(Clone)]
pub struct ValidatorHandle {
    /// Request channel into the actor.
    sender: mpsc::Sender<ValidationEnvelope>,
}

impl ValidatorHandle {
    /// Spawns the actor on the current tokio runtime.
    ///
    /// `capacity` bounds both queued and in-progress validations; zero is
    /// treated as one.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    #[must_use]
    pub fn spawn(validator: Arc<dyn ItemValidator>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        tokio::spawn(run_validator_actor(validator, receiver, capacity));
        Self {
            sender,
        }
    }

    /// Sends one `validate-item` request and awaits the reply.
    ///
    /// # Errors
    ///
    /// Returns the validator's [`ValidationFault`], or
    /// [`ValidationFault::Unavailable`] when the actor is gone.
    pub async fn validate(
        &self,
        item_type: &str,
        item: Document,
        skip: SkipValidation,
    ) -> Result<(), ValidationFault> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(ValidationEnvelope {
                item_type: item_type.to_string(),
                item,
                skip,
                reply,
            })
            .await
            .map_err(|_| ValidationFault::Unavailable)?;
        response.await.map_err(|_| ValidationFault::Unavailable)?
    }
}

/// Actor loop: requests are validated concurrently, at most `capacity` at a
/// time.
async fn run_validator_actor(
    validator: Arc<dyn ItemValidator>,
    mut receiver: mpsc::Receiver<ValidationEnvelope>,
    capacity: usize,
) {
    let permits = Arc::new(Semaphore::new(capacity));
    while let Some(envelope) = receiver.recv().await {
        let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
            break;
        };
        let validator = Arc::clone(&validator);
        tokio::spawn(async move {
            let outcome =
                validator.validate(&envelope.item_type, &envelope.item, envelope.skip).await;
            drop(permit);
            let _ = envelope.reply.send(outcome);
        });
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        reason = "Test-only assertions."
    )]

    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use catalogue_core::InMemoryDocumentStore;
    use catalogue_core::SharedDocumentStore;
    use serde_json::json;

    use super::*;
    use crate::adapter::CatalogueStore;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn store_with_schema() -> StoreHandle {
        let store = CatalogueStore::new(
            SharedDocumentStore::from_store(InMemoryDocumentStore::new()),
            "catalogue",
            "schemas",
        );
        store
            .write_schema(&doc(json!({
                "id": "provider",
                "$schema": "https://json-schema.org/draft/2020-12/schema",
                "type": "object",
                "required": ["name"],
                "properties": {"name": {"type": "string"}},
            })))
            .unwrap();
        StoreHandle::spawn(store, 8)
    }

    #[tokio::test]
    async fn schema_violations_are_reported() {
        let handle =
            ValidatorHandle::spawn(Arc::new(SchemaValidator::new(store_with_schema())), 8);
        let ok = doc(json!({"item-type": "provider", "name": "acme"}));
        handle.validate("provider", ok, SkipValidation::Validate).await.unwrap();
        let bad = doc(json!({"item-type": "provider"}));
        let fault =
            handle.validate("provider", bad, SkipValidation::Validate).await.unwrap_err();
        assert!(matches!(fault, ValidationFault::Invalid(_)));
    }

    #[tokio::test]
    async fn skip_and_missing_schema_pass() {
        let handle =
            ValidatorHandle::spawn(Arc::new(SchemaValidator::new(store_with_schema())), 8);
        let bad = doc(json!({"item-type": "provider"}));
        handle.validate("provider", bad.clone(), SkipValidation::Skip).await.unwrap();
        handle.validate("data-model", bad, SkipValidation::Validate).await.unwrap();
    }

    /// Validator that records how many calls overlap.
    #[derive(Default)]
    struct OverlapValidator {
        /// Calls currently running.
        in_flight: AtomicUsize,
        /// Highest overlap observed.
        peak: AtomicUsize,
    }

    #[async_trait]
    impl ItemValidator for OverlapValidator {
        async fn validate(
            &self,
            _item_type: &str,
            _item: &Document,
            _skip: SkipValidation,
        ) -> Result<(), ValidationFault> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn in_progress_validations_are_bounded_by_capacity() {
        let validator = Arc::new(OverlapValidator::default());
        let handle = ValidatorHandle::spawn(Arc::clone(&validator) as Arc<dyn ItemValidator>, 2);
        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0 .. 6 {
            let handle = handle.clone();
            tasks.spawn(async move {
                handle.validate("provider", Document::new(), SkipValidation::Validate).await
            });
        }
        let mut completed = 0;
        while let Some(outcome) = tasks.join_next().await {
            outcome.unwrap().unwrap();
            completed += 1;
        }
        assert_eq!(completed, 6);
        assert!(validator.peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn uncompilable_schema_is_reported() {
        let fault = check_against_schema(doc(json!({"type": 12})), &Document::new()).unwrap_err();
        assert!(matches!(fault, ValidationFault::BadSchema(_)));
    }
}
