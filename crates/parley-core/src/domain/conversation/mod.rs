//! Conversation domain module
//!
//! # Architecture
//!
//! - **Entity**: `Conversation` and `ConversationOptions`
//! - **Repository**: `ConversationRepository` for database operations
//! - **Store**: `ConversationStore` enforcing membership and direct-message rules

pub mod conversation;
pub mod repository;
pub mod store;

pub use conversation::{Conversation, ConversationOptions};
pub use repository::ConversationRepository;
pub use store::{ConversationStore, DIRECT_PARTICIPANTS};
