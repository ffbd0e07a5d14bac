//! Message store
//!
//! Sending, per-participant deletion and read state. Mutations touching more
//! than one row run in a single transaction.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::message::{Message, MessageDraft, MessageView};
use super::repository::MessageRepository;
use crate::domain::conversation::ConversationRepository;
use crate::domain::participant::{ParticipantRef, ParticipationRepository};
use crate::domain::visibility::{HiddenEntity, VisibilityRepository};
use crate::error::{Error, Result};

/// Message operations over a shared connection pool
#[derive(Debug, Clone)]
pub struct MessageStore {
    pool: SqlitePool,
}

impl MessageStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Send a message; the sender must participate in the conversation
    pub async fn send(
        &self,
        conversation_id: i64,
        sender: &ParticipantRef,
        draft: impl Into<MessageDraft>,
    ) -> Result<Message> {
        let draft = draft.into();
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(Error::DatabaseError)?;

        ConversationRepository::require(&mut *tx, conversation_id).await?;
        let participation = ParticipationRepository::require(&mut *tx, conversation_id, sender).await?;

        let id = MessageRepository::insert(&mut *tx, conversation_id, participation.id, sender, &draft, now).await?;
        ConversationRepository::touch(&mut *tx, conversation_id, now).await?;

        let message = MessageRepository::get(&mut *tx, id)
            .await?
            .ok_or(Error::MessageNotFound(id))?;

        tx.commit().await.map_err(Error::DatabaseError)?;

        info!(
            conversation_id,
            message_id = id,
            sender = %sender,
            message_type = %message.message_type,
            "Message sent"
        );

        Ok(message)
    }

    /// Get a message by id
    pub async fn get(&self, message_id: i64) -> Result<Message> {
        MessageRepository::get(&self.pool, message_id)
            .await?
            .ok_or(Error::MessageNotFound(message_id))
    }

    /// Hide a message from one participant; returns false if it was already hidden
    pub async fn delete(&self, message_id: i64, participant: &ParticipantRef) -> Result<bool> {
        let message = self.get(message_id).await?;
        ConversationRepository::require(&self.pool, message.conversation_id).await?;
        let participation =
            ParticipationRepository::require(&self.pool, message.conversation_id, participant).await?;

        let hidden =
            VisibilityRepository::hide(&self.pool, HiddenEntity::Message(message_id), participation.id, Utc::now())
                .await?;

        if hidden {
            info!(message_id, participant = %participant, "Message deleted for participant");
        } else {
            debug!(message_id, participant = %participant, "Message already deleted for participant");
        }

        Ok(hidden)
    }

    /// Hide every current message of a conversation from one participant
    pub async fn clear(&self, conversation_id: i64, participant: &ParticipantRef) -> Result<u64> {
        ConversationRepository::require(&self.pool, conversation_id).await?;
        let participation = ParticipationRepository::require(&self.pool, conversation_id, participant).await?;

        let hidden =
            VisibilityRepository::hide_all_messages(&self.pool, conversation_id, participation.id, Utc::now())
                .await?;

        info!(conversation_id, participant = %participant, hidden, "Conversation cleared for participant");

        Ok(hidden)
    }

    /// Mark everything in the conversation as read for one participant
    pub async fn read_all(&self, conversation_id: i64, participant: &ParticipantRef) -> Result<()> {
        ConversationRepository::require(&self.pool, conversation_id).await?;
        let participation = ParticipationRepository::require(&self.pool, conversation_id, participant).await?;

        ParticipationRepository::set_last_read(&self.pool, participation.id, Utc::now()).await?;

        debug!(conversation_id, participant = %participant, "Conversation read");

        Ok(())
    }

    /// Mark a message and everything before it as read
    ///
    /// The read marker is a timestamp, so messages sharing this message's
    /// `created_at` count as read too. Returns false when the marker was
    /// already at or past the message.
    pub async fn mark_read(&self, message_id: i64, participant: &ParticipantRef) -> Result<bool> {
        let message = self.get(message_id).await?;
        ConversationRepository::require(&self.pool, message.conversation_id).await?;
        let participation =
            ParticipationRepository::require(&self.pool, message.conversation_id, participant).await?;

        let advanced =
            ParticipationRepository::advance_last_read(&self.pool, participation.id, message.created_at, Utc::now())
                .await?;

        debug!(message_id, participant = %participant, advanced, "Message marked read");

        Ok(advanced)
    }

    /// Number of unread messages in one conversation for a participant
    pub async fn unread_count(&self, conversation_id: i64, participant: &ParticipantRef) -> Result<i64> {
        ConversationRepository::require(&self.pool, conversation_id).await?;
        let participation = ParticipationRepository::require(&self.pool, conversation_id, participant).await?;

        MessageRepository::count_unread(&self.pool, participation.id).await
    }

    /// Number of unread messages across every conversation visible to a participant
    pub async fn unread_total(&self, participant: &ParticipantRef) -> Result<i64> {
        MessageRepository::count_unread_total(&self.pool, participant).await
    }

    /// Newest message of a conversation still visible to a participant
    pub async fn last_message(
        &self,
        conversation_id: i64,
        participant: &ParticipantRef,
    ) -> Result<Option<MessageView>> {
        ConversationRepository::require(&self.pool, conversation_id).await?;
        let participation = ParticipationRepository::require(&self.pool, conversation_id, participant).await?;

        let message = MessageRepository::last_visible(&self.pool, conversation_id, participation.id).await?;

        Ok(message.map(|message| MessageView {
            is_seen: participation.has_seen(&message.sender, message.created_at),
            message,
        }))
    }
}
