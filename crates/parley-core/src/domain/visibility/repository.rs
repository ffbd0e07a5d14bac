//! Deletion-log repository

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqliteExecutor;

use crate::error::{Error, Result};

/// An entity that can be hidden from one participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum HiddenEntity {
    Conversation(i64),
    Message(i64),
}

impl HiddenEntity {
    /// Deletion-log table for this entity kind
    fn table(&self) -> &'static str {
        match self {
            Self::Conversation(_) => "conversations_deleted",
            Self::Message(_) => "messages_deleted",
        }
    }

    /// Column referencing the entity in its deletion log
    fn column(&self) -> &'static str {
        match self {
            Self::Conversation(_) => "conversation_id",
            Self::Message(_) => "message_id",
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Self::Conversation(id) | Self::Message(id) => *id,
        }
    }
}

/// Repository for the conversation and message deletion logs
#[derive(Debug, Clone, Copy, Default)]
pub struct VisibilityRepository;

impl VisibilityRepository {
    /// Hide an entity from a participation; returns false if it was already hidden
    pub async fn hide<'e, E: SqliteExecutor<'e>>(
        executor: E,
        entity: HiddenEntity,
        participation_id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(&format!(
            "INSERT OR IGNORE INTO {} ({}, participation_id, created_at, updated_at) VALUES (?, ?, ?, ?)",
            entity.table(),
            entity.column()
        ))
        .bind(entity.id())
        .bind(participation_id)
        .bind(now)
        .bind(now)
        .execute(executor)
        .await
        .map_err(Error::DatabaseError)?;

        Ok(result.rows_affected() > 0)
    }

    /// Hide every current message of a conversation from a participation
    pub async fn hide_all_messages<'e, E: SqliteExecutor<'e>>(
        executor: E,
        conversation_id: i64,
        participation_id: i64,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO messages_deleted (message_id, participation_id, created_at, updated_at)
            SELECT m.id, ?, ?, ? FROM messages m
            WHERE m.conversation_id = ? AND m.deleted_at IS NULL
            "#,
        )
        .bind(participation_id)
        .bind(now)
        .bind(now)
        .bind(conversation_id)
        .execute(executor)
        .await
        .map_err(Error::DatabaseError)?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::{ConversationOptions, ConversationRepository};
    use crate::domain::message::{MessageDraft, MessageRepository};
    use crate::domain::participant::{ParticipantRef, ParticipationRepository};
    use crate::domain::query::ConversationQuery;
    use crate::storage::Database;

    struct Fixture {
        db: Database,
        conversation_id: i64,
        alice: i64,
        bob: i64,
        alice_ref: ParticipantRef,
    }

    async fn fixture() -> Fixture {
        let db = Database::in_memory().await.expect("Failed to create test database");
        let conversation_id = ConversationRepository::insert(db.pool(), &ConversationOptions::new(), Utc::now())
            .await
            .unwrap();
        let alice_ref = ParticipantRef::new("user", "alice");
        let alice = ParticipationRepository::insert(db.pool(), conversation_id, &alice_ref, Utc::now())
            .await
            .unwrap();
        let bob = ParticipationRepository::insert(
            db.pool(),
            conversation_id,
            &ParticipantRef::new("user", "bob"),
            Utc::now(),
        )
        .await
        .unwrap();
        Fixture {
            db,
            conversation_id,
            alice,
            bob,
            alice_ref,
        }
    }

    async fn send(f: &Fixture, body: &str) -> i64 {
        MessageRepository::insert(
            f.db.pool(),
            f.conversation_id,
            f.alice,
            &f.alice_ref,
            &MessageDraft::text(body),
            Utc::now(),
        )
        .await
        .unwrap()
    }

    async fn visible(f: &Fixture, participation_id: i64) -> i64 {
        MessageRepository::count_visible(f.db.pool(), f.conversation_id, participation_id)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_hide_is_per_participation() {
        let f = fixture().await;
        let message = HiddenEntity::Message(send(&f, "hello").await);

        assert!(VisibilityRepository::hide(f.db.pool(), message, f.alice, Utc::now()).await.unwrap());

        assert_eq!(visible(&f, f.alice).await, 0);
        assert_eq!(visible(&f, f.bob).await, 1);
    }

    #[tokio::test]
    async fn test_hide_is_idempotent() {
        let f = fixture().await;
        let conversation = HiddenEntity::Conversation(f.conversation_id);

        assert!(VisibilityRepository::hide(f.db.pool(), conversation, f.bob, Utc::now()).await.unwrap());
        assert!(!VisibilityRepository::hide(f.db.pool(), conversation, f.bob, Utc::now()).await.unwrap());

        let listed = |who: &str| ConversationQuery::for_participant(ParticipantRef::new("user", who));
        assert_eq!(listed("bob").count(f.db.pool()).await.unwrap(), 0);
        assert_eq!(listed("alice").count(f.db.pool()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_hide_all_messages() {
        let f = fixture().await;
        let first = send(&f, "one").await;
        send(&f, "two").await;
        send(&f, "three").await;

        VisibilityRepository::hide(f.db.pool(), HiddenEntity::Message(first), f.alice, Utc::now())
            .await
            .unwrap();

        let hidden = VisibilityRepository::hide_all_messages(f.db.pool(), f.conversation_id, f.alice, Utc::now())
            .await
            .unwrap();
        assert_eq!(hidden, 2);

        assert_eq!(visible(&f, f.alice).await, 0);
        assert_eq!(visible(&f, f.bob).await, 3);
    }

    #[test]
    fn test_entity_serialization() {
        let json = serde_json::to_value(HiddenEntity::Message(9)).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "message", "id": 9 }));
    }
}
