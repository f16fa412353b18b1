use parlor_model::{ContentBlock, Role, Run, RunStatus, ThreadMessage};
use serde::{Deserialize, Serialize};

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct ThreadObject {
    pub id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct RunObject {
    pub id: String,
    pub status: RunStatus,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct ListObject<T> {
    pub data: Vec<T>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct MessageObject {
    pub id: String,
    pub role: Role,
    #[serde(default)]
    pub content: Vec<ContentPart>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct TextPart {
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct ImageUrlPart {
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct ImageFilePart {
    pub file_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KnownPart {
    Text { text: TextPart },
    ImageUrl { image_url: ImageUrlPart },
    ImageFile { image_file: ImageFilePart },
}

/// A content part. Parts of other kinds keep their place in the message.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(untagged)]
pub enum ContentPart {
    Known(KnownPart),
    Other {
        #[serde(rename = "type")]
        kind: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct CreateMessageRequest {
    pub role: Role,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct CreateRunRequest {
    pub assistant_id: String,
}

// -----------
// Conversions
// -----------

impl From<RunObject> for Run {
    #[inline]
    fn from(run: RunObject) -> Self {
        Run {
            id: run.id,
            status: run.status,
        }
    }
}

impl From<MessageObject> for ThreadMessage {
    fn from(msg: MessageObject) -> Self {
        ThreadMessage {
            id: msg.id,
            role: msg.role,
            content: msg.content.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<ContentPart> for ContentBlock {
    fn from(part: ContentPart) -> Self {
        match part {
            ContentPart::Known(KnownPart::Text { text }) => {
                ContentBlock::Text { value: text.value }
            }
            ContentPart::Known(KnownPart::ImageUrl { image_url }) => {
                ContentBlock::ImageRef { url: image_url.url }
            }
            ContentPart::Known(KnownPart::ImageFile { image_file }) => {
                ContentBlock::ImageRef {
                    url: format!("file://{}", image_file.file_id),
                }
            }
            ContentPart::Other { kind } => {
                debug!("keeping an unsupported content part: {kind}");
                ContentBlock::Other { kind }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_message_listing() {
        let listing: ListObject<MessageObject> = serde_json::from_value(json!({
            "object": "list",
            "data": [
                {
                    "id": "msg_2",
                    "object": "thread.message",
                    "role": "assistant",
                    "content": [
                        { "type": "image_file", "image_file": { "file_id": "file-9" } },
                        {
                            "type": "text",
                            "text": { "value": "Segue o gráfico.", "annotations": [] }
                        },
                        { "type": "refusal", "refusal": "no" }
                    ]
                },
                {
                    "id": "msg_1",
                    "object": "thread.message",
                    "role": "user",
                    "content": [
                        { "type": "text", "text": { "value": "Oi", "annotations": [] } }
                    ]
                }
            ],
            "has_more": false
        }))
        .unwrap();

        let messages: Vec<ThreadMessage> =
            listing.data.into_iter().map(Into::into).collect();
        assert_eq!(
            messages[0],
            ThreadMessage {
                id: "msg_2".to_owned(),
                role: Role::Assistant,
                content: vec![
                    ContentBlock::ImageRef {
                        url: "file://file-9".to_owned()
                    },
                    ContentBlock::text("Segue o gráfico."),
                    ContentBlock::Other {
                        kind: "refusal".to_owned(),
                    },
                ],
            }
        );
        assert_eq!(messages[1].role, Role::User);
    }

    #[test]
    fn test_leading_part_keeps_its_place() {
        let msg: MessageObject = serde_json::from_value(json!({
            "id": "msg_3",
            "object": "thread.message",
            "role": "assistant",
            "content": [
                { "type": "refusal", "refusal": "Não posso ajudar." },
                { "type": "text", "text": { "value": "oculto" } }
            ]
        }))
        .unwrap();

        let msg = ThreadMessage::from(msg);
        assert_eq!(
            msg.content.first(),
            Some(&ContentBlock::Other {
                kind: "refusal".to_owned()
            })
        );
        assert_eq!(msg.content.first().and_then(ContentBlock::as_text), None);
        assert_eq!(msg.content.len(), 2);
    }

    #[test]
    fn test_run_object() {
        let run: RunObject = serde_json::from_value(json!({
            "id": "run_1",
            "object": "thread.run",
            "thread_id": "thread_1",
            "assistant_id": "asst_1",
            "status": "requires_action"
        }))
        .unwrap();
        assert_eq!(
            Run::from(run),
            Run {
                id: "run_1".to_owned(),
                status: RunStatus::RequiresAction,
            }
        );
    }

    #[test]
    fn test_create_message_request() {
        let req = CreateMessageRequest {
            role: Role::User,
            content: "Oi".to_owned(),
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({ "role": "user", "content": "Oi" })
        );
    }
}
