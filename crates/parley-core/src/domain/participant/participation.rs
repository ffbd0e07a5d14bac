//! Participation entity
//!
//! A participant's membership record in one conversation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identity::ParticipantRef;

/// Membership of one messageable in one conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participation {
    /// Row id
    pub id: i64,

    /// Conversation this membership belongs to
    pub conversation_id: i64,

    /// The member
    pub messageable: ParticipantRef,

    /// Per-participant settings (e.g. muted mentions)
    pub settings: serde_json::Value,

    /// Everything at or before this instant counts as read
    pub last_read_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Participation {
    /// Whether a message sent at `sent_at` by `sender` counts as seen by this participant
    pub fn has_seen(&self, sender: &ParticipantRef, sent_at: DateTime<Utc>) -> bool {
        if *sender == self.messageable {
            return true;
        }
        self.last_read_at.is_some_and(|read_at| sent_at <= read_at)
    }

    /// Look up a single setting
    pub fn setting(&self, key: &str) -> Option<&serde_json::Value> {
        self.settings.get(key)
    }
}
