use parlor_model::{ContentBlock, RunStatus};
use serde::{Deserialize, Serialize};

/// What the assistant leaves on the thread when a scripted run completes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetReply {
    /// A single text block.
    #[serde(rename = "text")]
    Text(String),
    /// Arbitrary content blocks.
    #[serde(rename = "content")]
    Content(Vec<ContentBlock>),
    /// The run completes without adding any message.
    #[serde(rename = "nothing")]
    Nothing,
}

/// The preset behavior of one run.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScriptedRun {
    /// Statuses reported by successive polls. The last one repeats forever.
    /// An empty list behaves like `[Completed]`.
    pub statuses: Vec<RunStatus>,
    /// The reply appended to the thread once `Completed` is reported.
    pub reply: PresetReply,
}

impl ScriptedRun {
    /// A run that completes on the first poll with a text reply.
    #[inline]
    pub fn completed_with_text<S: Into<String>>(text: S) -> Self {
        Self {
            statuses: vec![RunStatus::Completed],
            reply: PresetReply::Text(text.into()),
        }
    }

    /// A run that ends with `status` on the first poll and no reply.
    #[inline]
    pub fn ending_with(status: RunStatus) -> Self {
        Self {
            statuses: vec![status],
            reply: PresetReply::Nothing,
        }
    }

    /// Replaces the poll statuses.
    #[inline]
    pub fn with_statuses(
        mut self,
        statuses: impl Into<Vec<RunStatus>>,
    ) -> Self {
        self.statuses = statuses.into();
        self
    }

    /// Replaces the reply.
    #[inline]
    pub fn with_reply(mut self, reply: PresetReply) -> Self {
        self.reply = reply;
        self
    }
}
