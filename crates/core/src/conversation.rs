//! Conversation-related types.

use parlor_model::{ConversationRecord, Message};

/// The conversation of the active assistant.
#[derive(Clone, Default, Debug)]
pub(crate) struct Conversation {
    pub label: String,
    pub thread_id: Option<String>,
    pub messages: Vec<Message>,
}

impl Conversation {
    /// Creates an empty conversation for `label`, with no remote thread.
    #[inline]
    pub fn empty<S: Into<String>>(label: S) -> Self {
        Self {
            label: label.into(),
            thread_id: None,
            messages: vec![],
        }
    }

    /// Restores the conversation of `label` from its stored record.
    #[inline]
    pub fn from_record<S: Into<String>>(
        label: S,
        record: ConversationRecord,
    ) -> Self {
        Self {
            label: label.into(),
            thread_id: record.thread_id,
            messages: record.messages,
        }
    }

    /// Builds the record to store for this conversation.
    pub fn to_record(&self, assistant_id: &str) -> ConversationRecord {
        ConversationRecord {
            assistant_id: assistant_id.to_owned(),
            thread_id: self.thread_id.clone(),
            messages: self.messages.clone(),
        }
    }

    /// Adopts `thread_id` unless a thread is already known. A conversation
    /// never switches threads.
    pub fn adopt_thread(&mut self, thread_id: String) {
        match &self.thread_id {
            None => self.thread_id = Some(thread_id),
            Some(current) if *current != thread_id => {
                warn!("ignoring thread {thread_id}, already on {current}");
            }
            Some(_) => {}
        }
    }
}
