use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// The author of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A human turn.
    User,
    /// A turn produced by the remote assistant.
    Assistant,
}

/// A piece of message content.
///
/// Only [`ContentBlock::Text`] carries meaning for the conversation logic.
/// Other variants are stored and exported as-is, never interpreted.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text.
    Text {
        /// The text itself.
        value: String,
    },
    /// A reference to an image hosted elsewhere.
    ImageRef {
        /// Where the image lives.
        url: String,
    },
    /// Content of a kind this client does not understand, kept in place.
    Other {
        /// The remote name of the content kind.
        kind: String,
    },
}

impl ContentBlock {
    /// Creates a text block.
    #[inline]
    pub fn text<S: Into<String>>(value: S) -> Self {
        Self::Text {
            value: value.into(),
        }
    }

    /// Returns the text if this is a text block.
    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { value } => Some(value),
            Self::ImageRef { .. } | Self::Other { .. } => None,
        }
    }
}

/// A message in a conversation.
///
/// Messages are immutable once they are appended to a conversation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    /// Who wrote the message.
    pub role: Role,
    /// The content blocks, in display order.
    pub content: Vec<ContentBlock>,
    /// When the message was created, with millisecond precision.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Creates a message stamped with the current time.
    ///
    /// The timestamp is truncated to milliseconds so that a message is
    /// equal to itself after a trip through persistence.
    pub fn new(role: Role, content: Vec<ContentBlock>) -> Self {
        Self {
            role,
            content,
            timestamp: Utc::now().trunc_subsecs(3),
        }
    }

    /// Creates a user message with a single text block.
    #[inline]
    pub fn user_text<S: Into<String>>(text: S) -> Self {
        Self::new(Role::User, vec![ContentBlock::text(text)])
    }

    /// Creates an assistant message with a single text block.
    #[inline]
    pub fn assistant_text<S: Into<String>>(text: S) -> Self {
        Self::new(Role::Assistant, vec![ContentBlock::text(text)])
    }

    /// Returns the leading block's text, if the leading block is text.
    #[inline]
    pub fn text(&self) -> Option<&str> {
        self.content.first().and_then(ContentBlock::as_text)
    }
}
