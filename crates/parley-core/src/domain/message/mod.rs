//! Message domain module
//!
//! # Architecture
//!
//! - **Entity**: `Message`, `MessageDraft` and the per-viewer `MessageView`
//! - **Repository**: `MessageRepository` for database operations
//! - **Store**: `MessageStore` for sending, deletion and read state

pub mod message;
pub mod repository;
pub mod store;

pub use message::{Message, MessageDraft, MessageView, TEXT_MESSAGE};
pub use repository::MessageRepository;
pub use store::MessageStore;
