//! Conversation entity and creation options

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A conversation between two or more participants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Row id; grows with creation order
    pub id: i64,

    /// Free-form payload (title, description, ...)
    pub data: serde_json::Value,

    /// One-to-one conversation with exactly two participants
    pub direct_message: bool,

    /// Private conversations are not listed as public
    pub private: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Set when the conversation is soft-deleted for everyone
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Conversation {
    pub fn title(&self) -> Option<&str> {
        self.data.get("title").and_then(|v| v.as_str())
    }

    pub fn description(&self) -> Option<&str> {
        self.data.get("description").and_then(|v| v.as_str())
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Options for creating a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationOptions {
    pub direct: bool,
    pub private: bool,
    pub data: serde_json::Value,
}

impl Default for ConversationOptions {
    fn default() -> Self {
        Self {
            direct: false,
            private: true,
            data: serde_json::json!({}),
        }
    }
}

impl ConversationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a direct (1:1) conversation
    pub fn direct(mut self) -> Self {
        self.direct = true;
        self
    }

    pub fn private(mut self, private: bool) -> Self {
        self.private = private;
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_defaults() {
        let options = ConversationOptions::new();
        assert!(!options.direct);
        assert!(options.private);
        assert_eq!(options.data, serde_json::json!({}));
    }

    #[test]
    fn test_options_builder() {
        let options = ConversationOptions::new()
            .direct()
            .private(false)
            .with_data(serde_json::json!({ "title": "PHP Channel" }));
        assert!(options.direct);
        assert!(!options.private);
        assert_eq!(options.data["title"], "PHP Channel");
    }

    #[test]
    fn test_title_and_description() {
        let now = Utc::now();
        let conversation = Conversation {
            id: 1,
            data: serde_json::json!({ "title": "Rust", "description": "Rust Channel" }),
            direct_message: false,
            private: true,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        assert_eq!(conversation.title(), Some("Rust"));
        assert_eq!(conversation.description(), Some("Rust Channel"));
        assert!(!conversation.is_deleted());
    }
}
