use std::sync::Arc;

use async_trait::async_trait;
use parlor_model::{ConversationCatalog, ConversationRecord};
use tokio::sync::RwLock;

use crate::{ConversationStore, Error, validate_label};

/// In-memory storage for testing and short-lived sessions.
///
/// Clones share the same catalog, which makes it easy to hand the "same
/// storage" to a second manager.
#[derive(Clone, Default)]
pub struct MemoryStore {
    catalog: Arc<RwLock<ConversationCatalog>>,
}

impl MemoryStore {
    /// Creates an empty in-memory store.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `catalog`.
    #[inline]
    pub fn with_catalog(catalog: ConversationCatalog) -> Self {
        Self {
            catalog: Arc::new(RwLock::new(catalog)),
        }
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn load(
        &self,
        label: &str,
    ) -> Result<Option<ConversationRecord>, Error> {
        validate_label(label)?;
        Ok(self.catalog.read().await.get(label).cloned())
    }

    async fn save(
        &self,
        label: &str,
        record: &ConversationRecord,
    ) -> Result<(), Error> {
        validate_label(label)?;
        self.catalog.write().await.insert(label, record.clone());
        Ok(())
    }

    async fn remove(&self, label: &str) -> Result<(), Error> {
        validate_label(label)?;
        self.catalog.write().await.remove(label);
        Ok(())
    }

    async fn catalog(&self) -> Result<ConversationCatalog, Error> {
        Ok(self.catalog.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use parlor_model::Message;

    use super::*;
    use crate::ErrorKind;

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = MemoryStore::new();
        let other = store.clone();

        let record = ConversationRecord {
            assistant_id: "asst_1".to_owned(),
            thread_id: Some("thread_1".to_owned()),
            messages: vec![Message::user_text("Oi")],
        };
        store.save("A", &record).await.unwrap();
        assert_eq!(other.load("A").await.unwrap(), Some(record));

        other.remove("A").await.unwrap();
        assert_eq!(store.load("A").await.unwrap(), None);
        assert!(store.catalog().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_bad_labels() {
        let store = MemoryStore::new();
        let err = store.load("").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidKey);
        let err = store
            .save("A\nB", &ConversationRecord::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidKey);
    }
}
