//! Parley Core Library
//!
//! This crate provides multi-party conversations backed by SQLite:
//! - Participants resolved from host identities through a type registry
//! - Direct and group conversations, private and public
//! - Messages with per-participant deletion and read state
//! - Participant-scoped listings with stable pagination
//! - Storage (SQLite connection pool + schema migrations)
//! - File-backed configuration

pub mod chat;
pub mod config;
pub mod domain;
pub mod error;
pub mod storage;

pub use chat::Chat;
pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::chat::Chat;
    pub use crate::config::Config;
    pub use crate::domain::conversation::{Conversation, ConversationOptions};
    pub use crate::domain::message::{Message, MessageDraft, MessageView};
    pub use crate::domain::participant::{Identifiable, MessageableRegistry, ParticipantRef, Participation};
    pub use crate::domain::query::{ConversationKind, ConversationQuery, ConversationSummary, MessageQuery, Page, Sorting};
    pub use crate::error::{Error, Result};
    pub use crate::storage::Database;
}
