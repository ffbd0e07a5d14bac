//! Message repository for database operations
//!
//! Reads that take a participation id only return messages that participation
//! has not hidden. Soft-deleted messages are excluded everywhere.

use chrono::{DateTime, Utc};
use sqlx::SqliteExecutor;

use super::message::{Message, MessageDraft};
use crate::domain::participant::ParticipantRef;
use crate::domain::query::Sorting;
use crate::error::{Error, Result};

const MESSAGE_COLUMNS: &str = "m.id, m.conversation_id, m.participation_id, m.sender_type, m.sender_id, m.body, m.message_type, m.data, m.created_at, m.updated_at, m.deleted_at";

/// Predicate excluding messages hidden from the participation bound at its `?`
const NOT_HIDDEN: &str = "NOT EXISTS (SELECT 1 FROM messages_deleted md WHERE md.message_id = m.id AND md.participation_id = ?)";

/// Repository for message rows
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageRepository;

impl MessageRepository {
    /// Insert a message and return its id
    pub async fn insert<'e, E: SqliteExecutor<'e>>(
        executor: E,
        conversation_id: i64,
        participation_id: i64,
        sender: &ParticipantRef,
        draft: &MessageDraft,
        now: DateTime<Utc>,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO messages (
                conversation_id, participation_id, sender_type, sender_id,
                body, message_type, data, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(conversation_id)
        .bind(participation_id)
        .bind(&sender.kind)
        .bind(&sender.id)
        .bind(&draft.body)
        .bind(&draft.message_type)
        .bind(draft.data.to_string())
        .bind(now)
        .bind(now)
        .execute(executor)
        .await
        .map_err(Error::DatabaseError)?;

        Ok(result.last_insert_rowid())
    }

    /// Get a live message by id
    pub async fn get<'e, E: SqliteExecutor<'e>>(executor: E, id: i64) -> Result<Option<Message>> {
        let row: Option<MessageRow> = sqlx::query_as(&format!(
            "SELECT {} FROM messages m WHERE m.id = ? AND m.deleted_at IS NULL",
            MESSAGE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(Error::DatabaseError)?;

        row.map(MessageRow::into_message).transpose()
    }

    /// Newest message of a conversation still visible to a participation
    pub async fn last_visible<'e, E: SqliteExecutor<'e>>(
        executor: E,
        conversation_id: i64,
        participation_id: i64,
    ) -> Result<Option<Message>> {
        let row: Option<MessageRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM messages m
            WHERE m.conversation_id = ? AND m.deleted_at IS NULL AND {}
            ORDER BY m.created_at DESC, m.id DESC
            LIMIT 1
            "#,
            MESSAGE_COLUMNS, NOT_HIDDEN
        ))
        .bind(conversation_id)
        .bind(participation_id)
        .fetch_optional(executor)
        .await
        .map_err(Error::DatabaseError)?;

        row.map(MessageRow::into_message).transpose()
    }

    /// List messages visible to a participation, one page at a time
    pub async fn list_visible<'e, E: SqliteExecutor<'e>>(
        executor: E,
        conversation_id: i64,
        participation_id: i64,
        sorting: Sorting,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>> {
        let direction = sorting.as_sql();
        let rows: Vec<MessageRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM messages m
            WHERE m.conversation_id = ? AND m.deleted_at IS NULL AND {}
            ORDER BY m.created_at {}, m.id {}
            LIMIT ? OFFSET ?
            "#,
            MESSAGE_COLUMNS, NOT_HIDDEN, direction, direction
        ))
        .bind(conversation_id)
        .bind(participation_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await
        .map_err(Error::DatabaseError)?;

        rows.into_iter().map(MessageRow::into_message).collect()
    }

    /// Count messages visible to a participation
    pub async fn count_visible<'e, E: SqliteExecutor<'e>>(
        executor: E,
        conversation_id: i64,
        participation_id: i64,
    ) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(&format!(
            "SELECT COUNT(*) FROM messages m WHERE m.conversation_id = ? AND m.deleted_at IS NULL AND {}",
            NOT_HIDDEN
        ))
        .bind(conversation_id)
        .bind(participation_id)
        .fetch_one(executor)
        .await
        .map_err(Error::DatabaseError)?;

        Ok(count)
    }

    /// Count unread messages for a participation
    ///
    /// Unread means newer than the read marker (everything when there is no
    /// marker), not sent by the participant and not hidden by them.
    pub async fn count_unread<'e, E: SqliteExecutor<'e>>(executor: E, participation_id: i64) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM messages m
            JOIN participation p ON p.conversation_id = m.conversation_id
            WHERE p.id = ?
              AND m.deleted_at IS NULL
              AND (p.last_read_at IS NULL OR m.created_at > p.last_read_at)
              AND NOT (m.sender_type = p.messageable_type AND m.sender_id = p.messageable_id)
              AND NOT EXISTS (
                  SELECT 1 FROM messages_deleted md
                  WHERE md.message_id = m.id AND md.participation_id = p.id
              )
            "#,
        )
        .bind(participation_id)
        .fetch_one(executor)
        .await
        .map_err(Error::DatabaseError)?;

        Ok(count)
    }

    /// Count unread messages across every conversation a participant can see
    pub async fn count_unread_total<'e, E: SqliteExecutor<'e>>(
        executor: E,
        participant: &ParticipantRef,
    ) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM messages m
            JOIN participation p ON p.conversation_id = m.conversation_id
            JOIN conversations c ON c.id = m.conversation_id
            WHERE p.messageable_type = ? AND p.messageable_id = ?
              AND c.deleted_at IS NULL
              AND m.deleted_at IS NULL
              AND (p.last_read_at IS NULL OR m.created_at > p.last_read_at)
              AND NOT (m.sender_type = p.messageable_type AND m.sender_id = p.messageable_id)
              AND NOT EXISTS (
                  SELECT 1 FROM messages_deleted md
                  WHERE md.message_id = m.id AND md.participation_id = p.id
              )
              AND NOT EXISTS (
                  SELECT 1 FROM conversations_deleted cd
                  WHERE cd.conversation_id = c.id AND cd.participation_id = p.id
              )
            "#,
        )
        .bind(&participant.kind)
        .bind(&participant.id)
        .fetch_one(executor)
        .await
        .map_err(Error::DatabaseError)?;

        Ok(count)
    }
}

/// Database row for a message
#[derive(sqlx::FromRow)]
struct MessageRow {
    id: i64,
    conversation_id: i64,
    participation_id: Option<i64>,
    sender_type: String,
    sender_id: String,
    body: String,
    message_type: String,
    data: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl MessageRow {
    fn into_message(self) -> Result<Message> {
        let data = serde_json::from_str(&self.data)
            .map_err(|e| Error::Parse(format!("Invalid message data JSON: {}", e)))?;

        Ok(Message {
            id: self.id,
            conversation_id: self.conversation_id,
            participation_id: self.participation_id,
            sender: ParticipantRef::new(self.sender_type, self.sender_id),
            body: self.body,
            message_type: self.message_type,
            data,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        })
    }
}
