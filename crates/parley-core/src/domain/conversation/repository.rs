//! Conversation repository for database operations
//!
//! Soft-deleted conversations are invisible to every read here.

use chrono::{DateTime, Utc};
use sqlx::SqliteExecutor;

use super::conversation::{Conversation, ConversationOptions};
use crate::domain::participant::ParticipantRef;
use crate::error::{Error, Result};

const CONVERSATION_COLUMNS: &str =
    "id, data, direct_message, private, created_at, updated_at, deleted_at";

/// Repository for conversation rows
#[derive(Debug, Clone, Copy, Default)]
pub struct ConversationRepository;

impl ConversationRepository {
    /// Insert a conversation and return its id
    pub async fn insert<'e, E: SqliteExecutor<'e>>(
        executor: E,
        options: &ConversationOptions,
        now: DateTime<Utc>,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO conversations (data, direct_message, private, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(options.data.to_string())
        .bind(options.direct)
        .bind(options.private)
        .bind(now)
        .bind(now)
        .execute(executor)
        .await
        .map_err(Error::DatabaseError)?;

        Ok(result.last_insert_rowid())
    }

    /// Get a live conversation by id
    pub async fn get<'e, E: SqliteExecutor<'e>>(executor: E, id: i64) -> Result<Option<Conversation>> {
        let row: Option<ConversationRow> = sqlx::query_as(&format!(
            "SELECT {} FROM conversations WHERE id = ? AND deleted_at IS NULL",
            CONVERSATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(Error::DatabaseError)?;

        row.map(ConversationRow::into_conversation).transpose()
    }

    /// Get a live conversation or fail with `ConversationNotFound`
    pub async fn require<'e, E: SqliteExecutor<'e>>(executor: E, id: i64) -> Result<Conversation> {
        Self::get(executor, id).await?.ok_or(Error::ConversationNotFound(id))
    }

    /// Find the live direct conversation linking two participants
    pub async fn find_direct_between<'e, E: SqliteExecutor<'e>>(
        executor: E,
        first: &ParticipantRef,
        second: &ParticipantRef,
    ) -> Result<Option<Conversation>> {
        let row: Option<ConversationRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM conversations c
            WHERE c.direct_message = 1
              AND c.deleted_at IS NULL
              AND EXISTS (
                  SELECT 1 FROM participation p
                  WHERE p.conversation_id = c.id AND p.messageable_type = ? AND p.messageable_id = ?
              )
              AND EXISTS (
                  SELECT 1 FROM participation p
                  WHERE p.conversation_id = c.id AND p.messageable_type = ? AND p.messageable_id = ?
              )
            ORDER BY c.id ASC
            LIMIT 1
            "#,
            CONVERSATION_COLUMNS
        ))
        .bind(&first.kind)
        .bind(&first.id)
        .bind(&second.kind)
        .bind(&second.id)
        .fetch_optional(executor)
        .await
        .map_err(Error::DatabaseError)?;

        row.map(ConversationRow::into_conversation).transpose()
    }

    /// Update the private flag
    pub async fn set_private<'e, E: SqliteExecutor<'e>>(
        executor: E,
        id: i64,
        private: bool,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE conversations SET private = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(private)
        .bind(now)
        .bind(id)
        .execute(executor)
        .await
        .map_err(Error::DatabaseError)?;

        Ok(result.rows_affected() > 0)
    }

    /// Update the direct flag
    pub async fn set_direct<'e, E: SqliteExecutor<'e>>(
        executor: E,
        id: i64,
        direct: bool,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE conversations SET direct_message = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(direct)
        .bind(now)
        .bind(id)
        .execute(executor)
        .await
        .map_err(Error::DatabaseError)?;

        Ok(result.rows_affected() > 0)
    }

    /// Replace the data payload
    pub async fn update_data<'e, E: SqliteExecutor<'e>>(
        executor: E,
        id: i64,
        data: &serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE conversations SET data = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(data.to_string())
        .bind(now)
        .bind(id)
        .execute(executor)
        .await
        .map_err(Error::DatabaseError)?;

        Ok(result.rows_affected() > 0)
    }

    /// Update the conversation's updated_at timestamp
    pub async fn touch<'e, E: SqliteExecutor<'e>>(executor: E, id: i64, now: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE conversations SET updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(id)
            .execute(executor)
            .await
            .map_err(Error::DatabaseError)?;

        Ok(())
    }

    /// Soft-delete a conversation for everyone
    pub async fn soft_delete<'e, E: SqliteExecutor<'e>>(
        executor: E,
        id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE conversations SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(executor)
        .await
        .map_err(Error::DatabaseError)?;

        Ok(result.rows_affected() > 0)
    }
}

/// Database row for a conversation
#[derive(sqlx::FromRow)]
pub(crate) struct ConversationRow {
    id: i64,
    data: String,
    direct_message: bool,
    private: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl ConversationRow {
    pub(crate) fn into_conversation(self) -> Result<Conversation> {
        let data = serde_json::from_str(&self.data)
            .map_err(|e| Error::Parse(format!("Invalid conversation data JSON: {}", e)))?;

        Ok(Conversation {
            id: self.id,
            data,
            direct_message: self.direct_message,
            private: self.private,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::participant::ParticipationRepository;
    use crate::storage::Database;

    async fn create_test_db() -> Database {
        Database::in_memory()
            .await
            .expect("Failed to create test database")
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = create_test_db().await;
        let options = ConversationOptions::new().with_data(serde_json::json!({ "title": "General" }));

        let id = ConversationRepository::insert(db.pool(), &options, Utc::now())
            .await
            .expect("Failed to insert");

        let conversation = ConversationRepository::get(db.pool(), id)
            .await
            .expect("Failed to get")
            .expect("Conversation not found");

        assert_eq!(conversation.id, id);
        assert_eq!(conversation.title(), Some("General"));
        assert!(conversation.private);
        assert!(!conversation.direct_message);
    }

    #[tokio::test]
    async fn test_ids_grow_with_creation_order() {
        let db = create_test_db().await;
        let options = ConversationOptions::new();

        let first = ConversationRepository::insert(db.pool(), &options, Utc::now()).await.unwrap();
        let second = ConversationRepository::insert(db.pool(), &options, Utc::now()).await.unwrap();

        assert!(second > first);
    }

    #[tokio::test]
    async fn test_flag_updates() {
        let db = create_test_db().await;
        let id = ConversationRepository::insert(db.pool(), &ConversationOptions::new(), Utc::now())
            .await
            .unwrap();

        assert!(ConversationRepository::set_private(db.pool(), id, false, Utc::now()).await.unwrap());
        assert!(ConversationRepository::set_direct(db.pool(), id, true, Utc::now()).await.unwrap());

        let conversation = ConversationRepository::get(db.pool(), id).await.unwrap().unwrap();
        assert!(!conversation.private);
        assert!(conversation.direct_message);
    }

    #[tokio::test]
    async fn test_soft_delete_hides_conversation() {
        let db = create_test_db().await;
        let id = ConversationRepository::insert(db.pool(), &ConversationOptions::new(), Utc::now())
            .await
            .unwrap();

        assert!(ConversationRepository::soft_delete(db.pool(), id, Utc::now()).await.unwrap());
        assert!(!ConversationRepository::soft_delete(db.pool(), id, Utc::now()).await.unwrap());

        assert!(ConversationRepository::get(db.pool(), id).await.unwrap().is_none());
        assert!(matches!(
            ConversationRepository::require(db.pool(), id).await,
            Err(Error::ConversationNotFound(missing)) if missing == id
        ));
        assert!(!ConversationRepository::update_data(db.pool(), id, &serde_json::json!({}), Utc::now())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_find_direct_between() {
        let db = create_test_db().await;
        let alice = ParticipantRef::new("user", "alice");
        let bob = ParticipantRef::new("user", "bob");
        let carol = ParticipantRef::new("user", "carol");

        let group = ConversationRepository::insert(db.pool(), &ConversationOptions::new(), Utc::now())
            .await
            .unwrap();
        let direct = ConversationRepository::insert(db.pool(), &ConversationOptions::new().direct(), Utc::now())
            .await
            .unwrap();
        for id in [group, direct] {
            for p in [&alice, &bob] {
                ParticipationRepository::insert(db.pool(), id, p, Utc::now()).await.unwrap();
            }
        }

        let found = ConversationRepository::find_direct_between(db.pool(), &bob, &alice)
            .await
            .unwrap()
            .expect("Direct conversation not found");
        assert_eq!(found.id, direct);

        assert!(ConversationRepository::find_direct_between(db.pool(), &alice, &carol)
            .await
            .unwrap()
            .is_none());
    }
}
