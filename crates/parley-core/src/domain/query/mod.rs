//! Listing queries
//!
//! Read-only, participant-scoped views over conversations and messages with
//! stable ordering and 1-based pagination.

pub mod conversations;
pub mod messages;
pub mod page;

pub use conversations::{ConversationKind, ConversationQuery, ConversationSummary};
pub use messages::MessageQuery;
pub use page::{DEFAULT_PER_PAGE, Page, PageRequest, Sorting};
