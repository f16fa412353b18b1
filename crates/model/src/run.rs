use serde::{Deserialize, Serialize};

use crate::{ContentBlock, Role};

/// Status of a remote run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Waiting to be picked up.
    Queued,
    /// Being computed.
    InProgress,
    /// The run waits for tool outputs.
    RequiresAction,
    /// A cancellation was requested.
    Cancelling,
    /// The run was cancelled.
    Cancelled,
    /// The run failed.
    Failed,
    /// The run finished and the reply is on the thread.
    Completed,
    /// The run ended without a full reply.
    Incomplete,
    /// The run took too long and was abandoned by the remote system.
    Expired,
    /// A status this crate doesn't know about.
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// Returns whether the exchange stops polling on this status.
    ///
    /// Only `completed`, `failed` and `expired` end the wait; everything
    /// else is polled again.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Expired)
    }
}

/// A run of an assistant against a thread.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Run {
    /// The run identifier, scoped to its thread.
    pub id: String,
    /// The last known status.
    pub status: RunStatus,
}

/// A message as listed from a remote thread.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadMessage {
    /// The remote message identifier.
    pub id: String,
    /// The author.
    pub role: Role,
    /// Content blocks in remote order.
    pub content: Vec<ContentBlock>,
}
