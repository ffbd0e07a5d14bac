//! Chat facade
//!
//! Single entry point for hosts: resolves [`Identifiable`] entities through
//! the registry and forwards to the stores and listing queries over one
//! shared database.
//!
//! ```ignore
//! use parley_core::prelude::*;
//!
//! let registry = MessageableRegistry::new().register("user");
//! let chat = Chat::new(Database::in_memory().await?, registry);
//!
//! let alice = ParticipantRef::new("user", "alice");
//! let bob = ParticipantRef::new("user", "bob");
//! let conversation = chat
//!     .create_conversation(&[&alice, &bob], ConversationOptions::new().direct())
//!     .await?;
//! chat.send(conversation.id, &alice, "Hello").await?;
//! ```

use crate::config::{Config, MAX_PER_PAGE, PaginationConfig};
use crate::domain::conversation::{Conversation, ConversationOptions, ConversationStore};
use crate::domain::message::{Message, MessageDraft, MessageStore, MessageView};
use crate::domain::participant::{Identifiable, MessageableRegistry, ParticipantRef, Participation};
use crate::domain::query::{ConversationQuery, ConversationSummary, MessageQuery, Page};
use crate::error::{Error, Result};
use crate::storage::Database;

/// Conversations and messages for registered messageable types
#[derive(Debug, Clone)]
pub struct Chat {
    db: Database,
    registry: MessageableRegistry,
    conversations: ConversationStore,
    messages: MessageStore,
    pagination: PaginationConfig,
}

impl Chat {
    pub fn new(db: Database, registry: MessageableRegistry) -> Self {
        let conversations = ConversationStore::new(db.pool().clone());
        let messages = MessageStore::new(db.pool().clone());
        Self {
            db,
            registry,
            conversations,
            messages,
            pagination: PaginationConfig::default(),
        }
    }

    /// Open the configured database and apply the configured paging defaults
    pub async fn open(config: &Config, registry: MessageableRegistry) -> anyhow::Result<Self> {
        config.validate()?;
        let db = Database::new(config.storage.database_config()).await?;

        tracing::info!(
            path = %config.storage.resolved_database_path().display(),
            kinds = registry.tags().count(),
            "Chat opened"
        );

        Ok(Self::new(db, registry).with_pagination(config.pagination.clone())?)
    }

    /// Replace the paging defaults used by [`Chat::conversations_for`] and [`Chat::messages_for`]
    pub fn with_pagination(mut self, pagination: PaginationConfig) -> Result<Self> {
        if !(1..=MAX_PER_PAGE).contains(&pagination.per_page) {
            return Err(Error::ConfigError(format!(
                "per_page must be between 1 and {}, got {}",
                MAX_PER_PAGE, pagination.per_page
            )));
        }
        self.pagination = pagination;
        Ok(self)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn registry(&self) -> &MessageableRegistry {
        &self.registry
    }

    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    pub fn messages(&self) -> &MessageStore {
        &self.messages
    }

    fn resolve(&self, entity: &dyn Identifiable) -> Result<ParticipantRef> {
        self.registry.resolve(entity)
    }

    // Conversations

    pub async fn create_conversation(
        &self,
        participants: &[&dyn Identifiable],
        options: ConversationOptions,
    ) -> Result<Conversation> {
        let participants = self.registry.resolve_all(participants)?;
        self.conversations.create(&participants, options).await
    }

    pub async fn conversation(&self, id: i64) -> Result<Conversation> {
        self.conversations.get(id).await
    }

    /// The direct conversation linking two entities, if any
    pub async fn direct_conversation_between(
        &self,
        first: &dyn Identifiable,
        second: &dyn Identifiable,
    ) -> Result<Option<Conversation>> {
        let first = self.resolve(first)?;
        let second = self.resolve(second)?;
        self.conversations.between(&first, &second).await
    }

    pub async fn add_participants(&self, id: i64, participants: &[&dyn Identifiable]) -> Result<Vec<Participation>> {
        let participants = self.registry.resolve_all(participants)?;
        self.conversations.add_participants(id, &participants).await
    }

    pub async fn remove_participants(&self, id: i64, participants: &[&dyn Identifiable]) -> Result<u64> {
        let participants = self.registry.resolve_all(participants)?;
        self.conversations.remove_participants(id, &participants).await
    }

    pub async fn participants(&self, id: i64) -> Result<Vec<Participation>> {
        self.conversations.participants(id).await
    }

    pub async fn participation(&self, id: i64, participant: &dyn Identifiable) -> Result<Participation> {
        let participant = self.resolve(participant)?;
        self.conversations.participation(id, &participant).await
    }

    pub async fn make_private(&self, id: i64, private: bool) -> Result<Conversation> {
        self.conversations.set_private(id, private).await
    }

    pub async fn make_direct(&self, id: i64, direct: bool) -> Result<Conversation> {
        self.conversations.set_direct(id, direct).await
    }

    pub async fn update_conversation_data(&self, id: i64, data: serde_json::Value) -> Result<Conversation> {
        self.conversations.update_data(id, data).await
    }

    pub async fn update_settings(
        &self,
        id: i64,
        participant: &dyn Identifiable,
        settings: serde_json::Value,
    ) -> Result<Participation> {
        let participant = self.resolve(participant)?;
        self.conversations.update_settings(id, &participant, settings).await
    }

    /// Hide a conversation from one participant
    pub async fn delete_conversation(&self, id: i64, participant: &dyn Identifiable) -> Result<bool> {
        let participant = self.resolve(participant)?;
        self.conversations.delete_for(id, &participant).await
    }

    /// Soft-delete a conversation for everyone
    pub async fn soft_delete_conversation(&self, id: i64) -> Result<()> {
        self.conversations.soft_delete(id).await
    }

    // Messages

    pub async fn send(
        &self,
        conversation_id: i64,
        sender: &dyn Identifiable,
        draft: impl Into<MessageDraft>,
    ) -> Result<Message> {
        let sender = self.resolve(sender)?;
        self.messages.send(conversation_id, &sender, draft).await
    }

    pub async fn message(&self, id: i64) -> Result<Message> {
        self.messages.get(id).await
    }

    /// Hide a message from one participant
    pub async fn delete_message(&self, message_id: i64, participant: &dyn Identifiable) -> Result<bool> {
        let participant = self.resolve(participant)?;
        self.messages.delete(message_id, &participant).await
    }

    /// Hide every current message of a conversation from one participant
    pub async fn clear_conversation(&self, conversation_id: i64, participant: &dyn Identifiable) -> Result<u64> {
        let participant = self.resolve(participant)?;
        self.messages.clear(conversation_id, &participant).await
    }

    pub async fn read_all(&self, conversation_id: i64, participant: &dyn Identifiable) -> Result<()> {
        let participant = self.resolve(participant)?;
        self.messages.read_all(conversation_id, &participant).await
    }

    pub async fn mark_read(&self, message_id: i64, participant: &dyn Identifiable) -> Result<bool> {
        let participant = self.resolve(participant)?;
        self.messages.mark_read(message_id, &participant).await
    }

    pub async fn unread_count(&self, conversation_id: i64, participant: &dyn Identifiable) -> Result<i64> {
        let participant = self.resolve(participant)?;
        self.messages.unread_count(conversation_id, &participant).await
    }

    pub async fn unread_total(&self, participant: &dyn Identifiable) -> Result<i64> {
        let participant = self.resolve(participant)?;
        self.messages.unread_total(&participant).await
    }

    pub async fn last_message(
        &self,
        conversation_id: i64,
        participant: &dyn Identifiable,
    ) -> Result<Option<MessageView>> {
        let participant = self.resolve(participant)?;
        self.messages.last_message(conversation_id, &participant).await
    }

    // Listings

    /// A conversation listing for one participant with the configured paging defaults
    pub fn conversations_for(&self, participant: &dyn Identifiable) -> Result<ConversationQuery> {
        Ok(ConversationQuery::for_participant(self.resolve(participant)?)
            .sorting(self.pagination.sorting)
            .per_page(self.pagination.per_page))
    }

    /// A message listing for one participant with the configured paging defaults
    pub fn messages_for(&self, conversation_id: i64, participant: &dyn Identifiable) -> Result<MessageQuery> {
        Ok(MessageQuery::new(conversation_id, self.resolve(participant)?)
            .sorting(self.pagination.sorting)
            .per_page(self.pagination.per_page))
    }

    pub async fn list_conversations(&self, query: &ConversationQuery) -> Result<Page<ConversationSummary>> {
        self.registry.resolve(query.participant())?;
        query.fetch(self.db.pool()).await
    }

    pub async fn list_messages(&self, query: &MessageQuery) -> Result<Page<MessageView>> {
        self.registry.resolve(query.participant())?;
        query.fetch(self.db.pool()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct User(u64);

    impl Identifiable for User {
        fn messageable_type(&self) -> &str {
            "user"
        }

        fn messageable_id(&self) -> String {
            self.0.to_string()
        }
    }

    struct Bot;

    impl Identifiable for Bot {
        fn messageable_type(&self) -> &str {
            "bot"
        }

        fn messageable_id(&self) -> String {
            "helper".to_string()
        }
    }

    async fn create_test_chat() -> Chat {
        let db = Database::in_memory()
            .await
            .expect("Failed to create test database");
        Chat::new(db, MessageableRegistry::new().register("user").register("client"))
    }

    #[tokio::test]
    async fn test_unregistered_type_is_rejected() {
        let chat = create_test_chat().await;

        let result = chat
            .create_conversation(&[&User(1), &Bot], ConversationOptions::new())
            .await;
        assert!(matches!(result, Err(Error::UnknownMessageableType(ref tag)) if tag == "bot"));
    }

    #[tokio::test]
    async fn test_mixed_messageable_types() {
        let chat = create_test_chat().await;
        let client = ParticipantRef::new("client", "1");

        let conversation = chat
            .create_conversation(&[&User(1), &client], ConversationOptions::new().direct())
            .await
            .unwrap();

        let message = chat.send(conversation.id, &client, "Hello").await.unwrap();
        assert_eq!(message.sender, client);

        let found = chat
            .direct_conversation_between(&client, &User(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, conversation.id);

        assert_eq!(chat.unread_count(conversation.id, &User(1)).await.unwrap(), 1);
        assert_eq!(chat.unread_total(&User(1)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_listing_uses_pagination_defaults() {
        let chat = create_test_chat()
            .await
            .with_pagination(PaginationConfig {
                per_page: 1,
                sorting: crate::domain::query::Sorting::Asc,
            })
            .unwrap();

        let first = chat
            .create_conversation(&[&User(1), &User(2)], ConversationOptions::new())
            .await
            .unwrap();
        chat.create_conversation(&[&User(1), &User(3)], ConversationOptions::new())
            .await
            .unwrap();

        let query = chat.conversations_for(&User(1)).unwrap();
        let page = chat.list_conversations(&query).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].conversation.id, first.id);
        assert!(page.has_more());
    }

    #[tokio::test]
    async fn test_listings_reject_unregistered_types() {
        let chat = create_test_chat().await;
        let conversation = chat
            .create_conversation(&[&User(1), &User(2)], ConversationOptions::new())
            .await
            .unwrap();
        let bot = ParticipantRef::new("bot", "helper");

        let query = MessageQuery::new(conversation.id, bot.clone());
        let result = chat.list_messages(&query).await;
        assert!(matches!(result, Err(Error::UnknownMessageableType(ref tag)) if tag == "bot"));

        let query = ConversationQuery::for_participant(bot);
        let result = chat.list_conversations(&query).await;
        assert!(matches!(result, Err(Error::UnknownMessageableType(_))));
    }

    #[tokio::test]
    async fn test_invalid_pagination_rejected() {
        let chat = create_test_chat().await;
        let result = chat.with_pagination(PaginationConfig {
            per_page: 0,
            sorting: Default::default(),
        });
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_open_from_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config
            .set("storage.database_path", &dir.path().join("chat.db").display().to_string())
            .unwrap();

        let chat = Chat::open(&config, MessageableRegistry::new().register("user"))
            .await
            .expect("Failed to open chat");
        assert!(chat.database().health_check().await.is_ok());
    }
}
