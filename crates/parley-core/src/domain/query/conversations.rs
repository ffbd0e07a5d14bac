//! Conversation listing for one participant
//!
//! Conversations are ordered by their most recent visible activity: the
//! newest message the participant has not hidden, or the conversation's
//! creation time when there is none. Ties are always broken by id
//! descending, so pages never overlap or skip rows.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use super::page::{Page, PageRequest, Sorting};
use crate::domain::conversation::Conversation;
use crate::domain::conversation::repository::ConversationRow;
use crate::domain::message::{MessageRepository, MessageView};
use crate::domain::participant::{ParticipantRef, ParticipationRepository};
use crate::error::{Error, Result};

/// Which conversations a listing includes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationKind {
    #[default]
    Any,
    /// Direct (1:1) conversations only
    Direct,
    /// Conversations flagged private, direct ones included
    Private,
    /// Conversations not flagged private
    Public,
}

impl ConversationKind {
    fn filter(&self) -> &'static str {
        match self {
            Self::Any => "",
            Self::Direct => "AND c.direct_message = 1",
            Self::Private => "AND c.private = 1",
            Self::Public => "AND c.private = 0",
        }
    }
}

/// A conversation as listed for one participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub conversation: Conversation,

    /// Newest message the participant can still see
    pub last_message: Option<MessageView>,

    pub unread_count: i64,
}

/// Paged listing of a participant's conversations
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationQuery {
    participant: ParticipantRef,
    kind: ConversationKind,
    sorting: Sorting,
    request: PageRequest,
}

impl ConversationQuery {
    pub fn for_participant(participant: ParticipantRef) -> Self {
        Self {
            participant,
            kind: ConversationKind::default(),
            sorting: Sorting::default(),
            request: PageRequest::default(),
        }
    }

    pub fn kind(mut self, kind: ConversationKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn sorting(mut self, sorting: Sorting) -> Self {
        self.sorting = sorting;
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.request.page = page;
        self
    }

    pub fn per_page(mut self, per_page: u32) -> Self {
        self.request.per_page = per_page;
        self
    }

    pub fn participant(&self) -> &ParticipantRef {
        &self.participant
    }

    /// Run the query
    pub async fn fetch(&self, pool: &SqlitePool) -> Result<Page<ConversationSummary>> {
        self.request.validate()?;

        let total = self.count(pool).await?;

        let direction = self.sorting.as_sql();
        let rows: Vec<SummaryRow> = sqlx::query_as(&format!(
            r#"
            SELECT
                c.id, c.data, c.direct_message, c.private, c.created_at, c.updated_at, c.deleted_at,
                p.id AS participation_id,
                COALESCE(
                    (
                        SELECT MAX(m.created_at) FROM messages m
                        WHERE m.conversation_id = c.id
                          AND m.deleted_at IS NULL
                          AND NOT EXISTS (
                              SELECT 1 FROM messages_deleted md
                              WHERE md.message_id = m.id AND md.participation_id = p.id
                          )
                    ),
                    c.created_at
                ) AS activity_at
            {}
            ORDER BY activity_at {}, c.id DESC
            LIMIT ? OFFSET ?
            "#,
            self.from_clause(),
            direction
        ))
        .bind(&self.participant.kind)
        .bind(&self.participant.id)
        .bind(self.request.limit())
        .bind(self.request.offset())
        .fetch_all(pool)
        .await
        .map_err(Error::DatabaseError)?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(row.into_summary(pool).await?);
        }

        Ok(Page::new(items, total, self.request))
    }

    /// Number of conversations matching the query, ignoring paging
    pub async fn count(&self, pool: &SqlitePool) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) {}", self.from_clause()))
            .bind(&self.participant.kind)
            .bind(&self.participant.id)
            .fetch_one(pool)
            .await
            .map_err(Error::DatabaseError)?;

        Ok(count)
    }

    /// Shared FROM/WHERE; binds participant type then id
    fn from_clause(&self) -> String {
        format!(
            r#"
            FROM conversations c
            JOIN participation p ON p.conversation_id = c.id
            WHERE p.messageable_type = ? AND p.messageable_id = ?
              AND c.deleted_at IS NULL
              AND NOT EXISTS (
                  SELECT 1 FROM conversations_deleted cd
                  WHERE cd.conversation_id = c.id AND cd.participation_id = p.id
              )
              {}
            "#,
            self.kind.filter()
        )
    }
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    #[sqlx(flatten)]
    conversation: ConversationRow,
    participation_id: i64,
}

impl SummaryRow {
    async fn into_summary(self, pool: &SqlitePool) -> Result<ConversationSummary> {
        let conversation = self.conversation.into_conversation()?;
        let participation = ParticipationRepository::get(pool, self.participation_id)
            .await?
            .ok_or_else(|| Error::Parse(format!("participation {} vanished", self.participation_id)))?;

        let last_message = MessageRepository::last_visible(pool, conversation.id, participation.id)
            .await?
            .map(|message| MessageView {
                is_seen: participation.has_seen(&message.sender, message.created_at),
                message,
            });
        let unread_count = MessageRepository::count_unread(pool, participation.id).await?;

        Ok(ConversationSummary {
            conversation,
            last_message,
            unread_count,
        })
    }
}
