//! Message listing for one participant of a conversation

use sqlx::SqlitePool;

use super::page::{Page, PageRequest, Sorting};
use crate::domain::conversation::ConversationRepository;
use crate::domain::message::{MessageRepository, MessageView};
use crate::domain::participant::{ParticipantRef, ParticipationRepository};
use crate::error::Result;

/// Paged listing of the messages a participant can see, by (created_at, id)
#[derive(Debug, Clone, PartialEq)]
pub struct MessageQuery {
    conversation_id: i64,
    participant: ParticipantRef,
    sorting: Sorting,
    request: PageRequest,
}

impl MessageQuery {
    pub fn new(conversation_id: i64, participant: ParticipantRef) -> Self {
        Self {
            conversation_id,
            participant,
            sorting: Sorting::default(),
            request: PageRequest::default(),
        }
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

    pub async fn fetch(&self, pool: &SqlitePool) -> Result<Page<MessageView>> {
        self.request.validate()?;

        ConversationRepository::require(pool, self.conversation_id).await?;
        let participation = ParticipationRepository::require(pool, self.conversation_id, &self.participant).await?;

        let total = MessageRepository::count_visible(pool, self.conversation_id, participation.id).await?;
        let messages = MessageRepository::list_visible(
            pool,
            self.conversation_id,
            participation.id,
            self.sorting,
            self.request.limit(),
            self.request.offset(),
        )
        .await?;

        let items = messages
            .into_iter()
            .map(|message| MessageView {
                is_seen: participation.has_seen(&message.sender, message.created_at),
                message,
            })
            .collect();

        Ok(Page::new(items, total, self.request))
    }
}
