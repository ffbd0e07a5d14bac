//! Message entity and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::participant::ParticipantRef;

/// Default message type tag
pub const TEXT_MESSAGE: &str = "text";

/// A message posted to a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Row id; grows with send order
    pub id: i64,

    /// Conversation this message belongs to
    pub conversation_id: i64,

    /// Sender's participation, cleared when the sender leaves
    pub participation_id: Option<i64>,

    /// Who sent the message
    pub sender: ParticipantRef,

    pub body: String,

    /// Type tag (`text`, `attachment`, ...)
    pub message_type: String,

    /// Structured payload / per-message metadata
    pub data: serde_json::Value,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Message {
    /// Whether `participant` sent this message
    pub fn is_from(&self, participant: &ParticipantRef) -> bool {
        self.sender == *participant
    }
}

/// Content of a message before it is sent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageDraft {
    pub body: String,
    pub message_type: String,
    pub data: serde_json::Value,
}

impl MessageDraft {
    /// A plain text message
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            message_type: TEXT_MESSAGE.to_string(),
            data: serde_json::json!({}),
        }
    }

    pub fn with_type(mut self, message_type: impl Into<String>) -> Self {
        self.message_type = message_type.into();
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

impl From<&str> for MessageDraft {
    fn from(body: &str) -> Self {
        Self::text(body)
    }
}

impl From<String> for MessageDraft {
    fn from(body: String) -> Self {
        Self::text(body)
    }
}

/// A message as seen by one participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageView {
    pub message: Message,

    /// Sent by the viewer, or at or before the viewer's read marker
    pub is_seen: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_draft() {
        let draft = MessageDraft::text("Hello");
        assert_eq!(draft.body, "Hello");
        assert_eq!(draft.message_type, TEXT_MESSAGE);
        assert_eq!(draft.data, serde_json::json!({}));
    }

    #[test]
    fn test_draft_builder() {
        let draft = MessageDraft::from("photo.png")
            .with_type("attachment")
            .with_data(serde_json::json!({ "file_name": "photo.png", "size": 2048 }));
        assert_eq!(draft.message_type, "attachment");
        assert_eq!(draft.data["size"], 2048);
    }

    #[test]
    fn test_is_from() {
        let now = Utc::now();
        let message = Message {
            id: 1,
            conversation_id: 1,
            participation_id: Some(1),
            sender: ParticipantRef::new("user", "1"),
            body: "hi".to_string(),
            message_type: TEXT_MESSAGE.to_string(),
            data: serde_json::json!({}),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        assert!(message.is_from(&ParticipantRef::new("user", "1")));
        assert!(!message.is_from(&ParticipantRef::new("client", "1")));
    }
}
