use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::Message;

/// The persisted state of one assistant's conversation.
///
/// `thread_id` stays `None` until the first remote thread is created for
/// the assistant, and never changes afterwards.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRecord {
    /// The resolved assistant identifier, empty if it was unknown.
    #[serde(default)]
    pub assistant_id: String,
    /// The remote thread backing this conversation.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "de_thread_id"
    )]
    pub thread_id: Option<String>,
    /// Messages in display order.
    #[serde(default)]
    pub messages: Vec<Message>,
}

// Older catalogs store a missing thread as an empty string.
fn de_thread_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|id| !id.is_empty()))
}

/// All conversations, keyed by assistant label.
///
/// A missing key means the assistant has no conversation yet, which is not
/// the same thing as a record without messages.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationCatalog {
    records: BTreeMap<String, ConversationRecord>,
}

impl ConversationCatalog {
    /// Returns the record stored under `label`.
    #[inline]
    pub fn get(&self, label: &str) -> Option<&ConversationRecord> {
        self.records.get(label)
    }

    /// Stores `record` under `label`, replacing any previous record.
    #[inline]
    pub fn insert<S: Into<String>>(
        &mut self,
        label: S,
        record: ConversationRecord,
    ) -> Option<ConversationRecord> {
        self.records.insert(label.into(), record)
    }

    /// Removes the entry for `label` entirely.
    #[inline]
    pub fn remove(&mut self, label: &str) -> Option<ConversationRecord> {
        self.records.remove(label)
    }

    /// Returns whether `label` has an entry.
    #[inline]
    pub fn contains(&self, label: &str) -> bool {
        self.records.contains_key(label)
    }

    /// Returns the number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns whether the catalog has no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterates over `(label, record)` pairs in label order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConversationRecord)> {
        self.records.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_empty_thread_id_reads_as_none() {
        let catalog: ConversationCatalog = serde_json::from_value(json!({
            "Campanha": {
                "messages": [],
                "assistantId": "asst_1",
                "threadId": ""
            }
        }))
        .unwrap();
        let record = catalog.get("Campanha").unwrap();
        assert_eq!(record.assistant_id, "asst_1");
        assert_eq!(record.thread_id, None);
        assert!(record.messages.is_empty());
    }

    #[test]
    fn test_absent_and_empty_are_distinct() {
        let mut catalog = ConversationCatalog::default();
        catalog.insert("A", ConversationRecord::default());
        assert!(catalog.contains("A"));
        assert!(!catalog.contains("B"));

        catalog.remove("A");
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let mut catalog = ConversationCatalog::default();
        catalog.insert(
            "A",
            ConversationRecord {
                assistant_id: "asst_1".to_owned(),
                thread_id: Some("thread_1".to_owned()),
                messages: vec![],
            },
        );
        assert_eq!(
            serde_json::to_value(&catalog).unwrap(),
            json!({
                "A": {
                    "assistantId": "asst_1",
                    "threadId": "thread_1",
                    "messages": []
                }
            })
        );
    }
}
