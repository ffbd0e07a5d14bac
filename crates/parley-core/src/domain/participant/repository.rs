//! Participation repository for database operations
//!
//! Every function takes any SQLite executor, so callers can run it against
//! the pool or inside a transaction.

use chrono::{DateTime, Utc};
use sqlx::SqliteExecutor;

use super::identity::ParticipantRef;
use super::participation::Participation;
use crate::error::{Error, Result};

const PARTICIPATION_COLUMNS: &str = "id, conversation_id, messageable_type, messageable_id, settings, last_read_at, created_at, updated_at";

/// Repository for participation rows
#[derive(Debug, Clone, Copy, Default)]
pub struct ParticipationRepository;

impl ParticipationRepository {
    /// Insert a participation and return its id
    pub async fn insert<'e, E: SqliteExecutor<'e>>(
        executor: E,
        conversation_id: i64,
        participant: &ParticipantRef,
        now: DateTime<Utc>,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO participation (
                conversation_id, messageable_type, messageable_id, settings, created_at, updated_at
            )
            VALUES (?, ?, ?, '{}', ?, ?)
            "#,
        )
        .bind(conversation_id)
        .bind(&participant.kind)
        .bind(&participant.id)
        .bind(now)
        .bind(now)
        .execute(executor)
        .await
        .map_err(Error::DatabaseError)?;

        Ok(result.last_insert_rowid())
    }

    /// Get a participation by id
    pub async fn get<'e, E: SqliteExecutor<'e>>(executor: E, id: i64) -> Result<Option<Participation>> {
        let row: Option<ParticipationRow> = sqlx::query_as(&format!(
            "SELECT {} FROM participation WHERE id = ?",
            PARTICIPATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(Error::DatabaseError)?;

        row.map(ParticipationRow::into_participation).transpose()
    }

    /// Find the participation of a messageable in a conversation
    pub async fn find<'e, E: SqliteExecutor<'e>>(
        executor: E,
        conversation_id: i64,
        participant: &ParticipantRef,
    ) -> Result<Option<Participation>> {
        let row: Option<ParticipationRow> = sqlx::query_as(&format!(
            "SELECT {} FROM participation WHERE conversation_id = ? AND messageable_type = ? AND messageable_id = ?",
            PARTICIPATION_COLUMNS
        ))
        .bind(conversation_id)
        .bind(&participant.kind)
        .bind(&participant.id)
        .fetch_optional(executor)
        .await
        .map_err(Error::DatabaseError)?;

        row.map(ParticipationRow::into_participation).transpose()
    }

    /// Find a participation or fail with `ParticipantNotFound`
    pub async fn require<'e, E: SqliteExecutor<'e>>(
        executor: E,
        conversation_id: i64,
        participant: &ParticipantRef,
    ) -> Result<Participation> {
        Self::find(executor, conversation_id, participant)
            .await?
            .ok_or_else(|| Error::ParticipantNotFound(participant.to_string()))
    }

    /// List participations of a conversation in join order
    pub async fn list_by_conversation<'e, E: SqliteExecutor<'e>>(
        executor: E,
        conversation_id: i64,
    ) -> Result<Vec<Participation>> {
        let rows: Vec<ParticipationRow> = sqlx::query_as(&format!(
            "SELECT {} FROM participation WHERE conversation_id = ? ORDER BY id ASC",
            PARTICIPATION_COLUMNS
        ))
        .bind(conversation_id)
        .fetch_all(executor)
        .await
        .map_err(Error::DatabaseError)?;

        rows.into_iter().map(ParticipationRow::into_participation).collect()
    }

    /// Count participants of a conversation
    pub async fn count<'e, E: SqliteExecutor<'e>>(executor: E, conversation_id: i64) -> Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM participation WHERE conversation_id = ?")
                .bind(conversation_id)
                .fetch_one(executor)
                .await
                .map_err(Error::DatabaseError)?;

        Ok(count)
    }

    /// Remove a messageable from a conversation
    pub async fn delete<'e, E: SqliteExecutor<'e>>(
        executor: E,
        conversation_id: i64,
        participant: &ParticipantRef,
    ) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM participation WHERE conversation_id = ? AND messageable_type = ? AND messageable_id = ?",
        )
        .bind(conversation_id)
        .bind(&participant.kind)
        .bind(&participant.id)
        .execute(executor)
        .await
        .map_err(Error::DatabaseError)?;

        Ok(result.rows_affected() > 0)
    }

    /// Replace the settings of a participation
    pub async fn update_settings<'e, E: SqliteExecutor<'e>>(
        executor: E,
        id: i64,
        settings: &serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE participation SET settings = ?, updated_at = ? WHERE id = ?")
            .bind(settings.to_string())
            .bind(now)
            .bind(id)
            .execute(executor)
            .await
            .map_err(Error::DatabaseError)?;

        Ok(result.rows_affected() > 0)
    }

    /// Set the read marker unconditionally
    pub async fn set_last_read<'e, E: SqliteExecutor<'e>>(
        executor: E,
        id: i64,
        read_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query("UPDATE participation SET last_read_at = ?, updated_at = ? WHERE id = ?")
            .bind(read_at)
            .bind(read_at)
            .bind(id)
            .execute(executor)
            .await
            .map_err(Error::DatabaseError)?;

        Ok(())
    }

    /// Move the read marker forward; never moves it backwards
    pub async fn advance_last_read<'e, E: SqliteExecutor<'e>>(
        executor: E,
        id: i64,
        read_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE participation SET last_read_at = ?, updated_at = ?
            WHERE id = ? AND (last_read_at IS NULL OR last_read_at < ?)
            "#,
        )
        .bind(read_at)
        .bind(now)
        .bind(id)
        .bind(read_at)
        .execute(executor)
        .await
        .map_err(Error::DatabaseError)?;

        Ok(result.rows_affected() > 0)
    }
}

/// Database row for participation
#[derive(sqlx::FromRow)]
struct ParticipationRow {
    id: i64,
    conversation_id: i64,
    messageable_type: String,
    messageable_id: String,
    settings: String,
    last_read_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ParticipationRow {
    fn into_participation(self) -> Result<Participation> {
        let settings = serde_json::from_str(&self.settings)
            .map_err(|e| Error::Parse(format!("Invalid participation settings JSON: {}", e)))?;

        Ok(Participation {
            id: self.id,
            conversation_id: self.conversation_id,
            messageable: ParticipantRef::new(self.messageable_type, self.messageable_id),
            settings,
            last_read_at: self.last_read_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
