//! Persistence for conversation records.
//!
//! The conversation manager rehydrates its state from a [`ConversationStore`]
//! whenever the active assistant changes, and writes the active record back
//! after every exchange. Any keyed durable storage can back it; this crate
//! ships an in-memory store and a JSON file store.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod error;
mod file;
mod memory;

use async_trait::async_trait;
use parlor_model::{ConversationCatalog, ConversationRecord};

pub use error::{Error, ErrorKind};
pub use file::FileStore;
pub use memory::MemoryStore;

/// A keyed store of conversation records.
///
/// Keys are assistant labels. Implementations must apply writes to one key
/// in the order they are issued.
#[async_trait]
pub trait ConversationStore: Send + Sync + 'static {
    /// Loads the record stored under `label`.
    async fn load(
        &self,
        label: &str,
    ) -> Result<Option<ConversationRecord>, Error>;

    /// Stores `record` under `label`, replacing any previous record.
    async fn save(
        &self,
        label: &str,
        record: &ConversationRecord,
    ) -> Result<(), Error>;

    /// Removes the entry for `label`. Removing a missing entry is not an
    /// error.
    async fn remove(&self, label: &str) -> Result<(), Error>;

    /// Returns every stored record.
    async fn catalog(&self) -> Result<ConversationCatalog, Error>;
}

/// Validates that a label is usable as a key.
pub(crate) fn validate_label(label: &str) -> Result<(), Error> {
    if label.is_empty() {
        return Err(Error::new(ErrorKind::InvalidKey)
            .with_reason("label cannot be empty"));
    }
    if label.chars().any(char::is_control) {
        return Err(Error::new(ErrorKind::InvalidKey).with_reason(format!(
            "label contains control characters: {label:?}"
        )));
    }
    Ok(())
}
