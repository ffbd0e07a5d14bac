//! Conversation store
//!
//! Creation, membership and flag changes. Every mutation that reads before
//! it writes runs inside one transaction, so the direct-conversation rules
//! are checked against the same state that gets committed.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use super::conversation::{Conversation, ConversationOptions};
use super::repository::ConversationRepository;
use crate::domain::participant::{ParticipantRef, Participation, ParticipationRepository};
use crate::domain::visibility::{HiddenEntity, VisibilityRepository};
use crate::error::{Error, Result};

/// Number of participants in a direct conversation
pub const DIRECT_PARTICIPANTS: usize = 2;

/// Conversation operations over a shared connection pool
#[derive(Debug, Clone)]
pub struct ConversationStore {
    pool: SqlitePool,
}

impl ConversationStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a conversation with its initial participants
    ///
    /// Repeated participants are collapsed. A direct conversation needs
    /// exactly two distinct participants who do not already share one.
    pub async fn create(&self, participants: &[ParticipantRef], options: ConversationOptions) -> Result<Conversation> {
        let participants = distinct(participants);

        if options.direct && participants.len() != DIRECT_PARTICIPANTS {
            return Err(Error::InvalidParticipantCount {
                expected: DIRECT_PARTICIPANTS,
                actual: participants.len(),
            });
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(Error::DatabaseError)?;

        if options.direct {
            let (first, second) = (&participants[0], &participants[1]);
            if ConversationRepository::find_direct_between(&mut *tx, first, second)
                .await?
                .is_some()
            {
                warn!(first = %first, second = %second, "Direct conversation already exists");
                return Err(Error::DuplicateDirectConversation(first.to_string(), second.to_string()));
            }
        }

        let id = ConversationRepository::insert(&mut *tx, &options, now).await?;
        for participant in &participants {
            ParticipationRepository::insert(&mut *tx, id, participant, now).await?;
        }

        let conversation = ConversationRepository::require(&mut *tx, id).await?;
        tx.commit().await.map_err(Error::DatabaseError)?;

        info!(
            conversation_id = id,
            participants = participants.len(),
            direct = options.direct,
            private = options.private,
            "Conversation created"
        );

        Ok(conversation)
    }

    /// Get a conversation by id
    pub async fn get(&self, id: i64) -> Result<Conversation> {
        ConversationRepository::require(&self.pool, id).await
    }

    /// The direct conversation between two participants, if any
    pub async fn between(&self, first: &ParticipantRef, second: &ParticipantRef) -> Result<Option<Conversation>> {
        ConversationRepository::find_direct_between(&self.pool, first, second).await
    }

    /// Participations of a conversation in join order
    pub async fn participants(&self, id: i64) -> Result<Vec<Participation>> {
        ConversationRepository::require(&self.pool, id).await?;
        ParticipationRepository::list_by_conversation(&self.pool, id).await
    }

    /// One participant's membership in a conversation
    pub async fn participation(&self, id: i64, participant: &ParticipantRef) -> Result<Participation> {
        ConversationRepository::require(&self.pool, id).await?;
        ParticipationRepository::require(&self.pool, id, participant).await
    }

    /// Add participants, skipping those already present; returns the new memberships
    pub async fn add_participants(&self, id: i64, participants: &[ParticipantRef]) -> Result<Vec<Participation>> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(Error::DatabaseError)?;

        let conversation = ConversationRepository::require(&mut *tx, id).await?;

        let mut fresh = Vec::new();
        for participant in distinct(participants) {
            if ParticipationRepository::find(&mut *tx, id, &participant).await?.is_none() {
                fresh.push(participant);
            }
        }

        if conversation.direct_message {
            let current = ParticipationRepository::count(&mut *tx, id).await? as usize;
            let actual = current + fresh.len();
            if actual != DIRECT_PARTICIPANTS {
                return Err(Error::InvalidParticipantCount {
                    expected: DIRECT_PARTICIPANTS,
                    actual,
                });
            }
        }

        let mut added = Vec::with_capacity(fresh.len());
        for participant in &fresh {
            let participation_id = ParticipationRepository::insert(&mut *tx, id, participant, now).await?;
            if let Some(participation) = ParticipationRepository::get(&mut *tx, participation_id).await? {
                added.push(participation);
            }
        }
        if !added.is_empty() {
            ConversationRepository::touch(&mut *tx, id, now).await?;
        }

        tx.commit().await.map_err(Error::DatabaseError)?;

        info!(conversation_id = id, added = added.len(), "Participants added");

        Ok(added)
    }

    /// Remove participants; returns how many memberships were removed
    ///
    /// Their messages stay, with the sender's participation cleared.
    pub async fn remove_participants(&self, id: i64, participants: &[ParticipantRef]) -> Result<u64> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(Error::DatabaseError)?;

        let conversation = ConversationRepository::require(&mut *tx, id).await?;

        let mut present = Vec::new();
        for participant in distinct(participants) {
            if ParticipationRepository::find(&mut *tx, id, &participant).await?.is_some() {
                present.push(participant);
            }
        }

        if conversation.direct_message && !present.is_empty() {
            let current = ParticipationRepository::count(&mut *tx, id).await? as usize;
            return Err(Error::InvalidParticipantCount {
                expected: DIRECT_PARTICIPANTS,
                actual: current.saturating_sub(present.len()),
            });
        }

        let mut removed = 0;
        for participant in &present {
            if ParticipationRepository::delete(&mut *tx, id, participant).await? {
                removed += 1;
            }
        }
        if removed > 0 {
            ConversationRepository::touch(&mut *tx, id, now).await?;
        }

        tx.commit().await.map_err(Error::DatabaseError)?;

        info!(conversation_id = id, removed, "Participants removed");

        Ok(removed)
    }

    /// Set the private flag
    pub async fn set_private(&self, id: i64, private: bool) -> Result<Conversation> {
        let mut tx = self.pool.begin().await.map_err(Error::DatabaseError)?;

        if !ConversationRepository::set_private(&mut *tx, id, private, Utc::now()).await? {
            return Err(Error::ConversationNotFound(id));
        }
        let conversation = ConversationRepository::require(&mut *tx, id).await?;

        tx.commit().await.map_err(Error::DatabaseError)?;

        debug!(conversation_id = id, private, "Conversation privacy updated");

        Ok(conversation)
    }

    /// Set the direct flag
    ///
    /// Turning it on requires exactly two participants who share no other
    /// direct conversation.
    pub async fn set_direct(&self, id: i64, direct: bool) -> Result<Conversation> {
        let mut tx = self.pool.begin().await.map_err(Error::DatabaseError)?;

        let conversation = ConversationRepository::require(&mut *tx, id).await?;

        if direct && !conversation.direct_message {
            let members = ParticipationRepository::list_by_conversation(&mut *tx, id).await?;
            if members.len() != DIRECT_PARTICIPANTS {
                return Err(Error::InvalidParticipantCount {
                    expected: DIRECT_PARTICIPANTS,
                    actual: members.len(),
                });
            }

            let (first, second) = (&members[0].messageable, &members[1].messageable);
            if ConversationRepository::find_direct_between(&mut *tx, first, second)
                .await?
                .is_some()
            {
                warn!(conversation_id = id, first = %first, second = %second, "Direct conversation already exists");
                return Err(Error::DuplicateDirectConversation(first.to_string(), second.to_string()));
            }
        }

        ConversationRepository::set_direct(&mut *tx, id, direct, Utc::now()).await?;
        let conversation = ConversationRepository::require(&mut *tx, id).await?;

        tx.commit().await.map_err(Error::DatabaseError)?;

        debug!(conversation_id = id, direct, "Conversation direct flag updated");

        Ok(conversation)
    }

    /// Replace the conversation's data payload
    pub async fn update_data(&self, id: i64, data: serde_json::Value) -> Result<Conversation> {
        let mut tx = self.pool.begin().await.map_err(Error::DatabaseError)?;

        if !ConversationRepository::update_data(&mut *tx, id, &data, Utc::now()).await? {
            return Err(Error::ConversationNotFound(id));
        }
        let conversation = ConversationRepository::require(&mut *tx, id).await?;

        tx.commit().await.map_err(Error::DatabaseError)?;

        debug!(conversation_id = id, "Conversation data updated");

        Ok(conversation)
    }

    /// Replace one participant's settings in a conversation
    pub async fn update_settings(
        &self,
        id: i64,
        participant: &ParticipantRef,
        settings: serde_json::Value,
    ) -> Result<Participation> {
        if !settings.is_object() {
            return Err(Error::InvalidInput("participation settings must be a JSON object".to_string()));
        }

        let mut tx = self.pool.begin().await.map_err(Error::DatabaseError)?;

        ConversationRepository::require(&mut *tx, id).await?;
        let participation = ParticipationRepository::require(&mut *tx, id, participant).await?;

        ParticipationRepository::update_settings(&mut *tx, participation.id, &settings, Utc::now()).await?;
        let participation = ParticipationRepository::require(&mut *tx, id, participant).await?;

        tx.commit().await.map_err(Error::DatabaseError)?;

        debug!(conversation_id = id, participant = %participant, "Participation settings updated");

        Ok(participation)
    }

    /// Hide a conversation from one participant; returns false if already hidden
    pub async fn delete_for(&self, id: i64, participant: &ParticipantRef) -> Result<bool> {
        ConversationRepository::require(&self.pool, id).await?;
        let participation = ParticipationRepository::require(&self.pool, id, participant).await?;

        let hidden =
            VisibilityRepository::hide(&self.pool, HiddenEntity::Conversation(id), participation.id, Utc::now())
                .await?;

        info!(conversation_id = id, participant = %participant, hidden, "Conversation deleted for participant");

        Ok(hidden)
    }

    /// Soft-delete a conversation for everyone
    pub async fn soft_delete(&self, id: i64) -> Result<()> {
        if !ConversationRepository::soft_delete(&self.pool, id, Utc::now()).await? {
            return Err(Error::ConversationNotFound(id));
        }

        info!(conversation_id = id, "Conversation soft-deleted");

        Ok(())
    }
}

/// Drop repeated participants, keeping first-seen order
fn distinct(participants: &[ParticipantRef]) -> Vec<ParticipantRef> {
    let mut unique: Vec<ParticipantRef> = Vec::with_capacity(participants.len());
    for participant in participants {
        if !unique.contains(participant) {
            unique.push(participant.clone());
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    async fn create_test_store() -> (Database, ConversationStore) {
        let db = Database::in_memory()
            .await
            .expect("Failed to create test database");
        let store = ConversationStore::new(db.pool().clone());
        (db, store)
    }

    fn user(id: &str) -> ParticipantRef {
        ParticipantRef::new("user", id)
    }

    #[tokio::test]
    async fn test_create_collapses_duplicates() {
        let (_db, store) = create_test_store().await;

        let conversation = store
            .create(&[user("1"), user("2"), user("1")], ConversationOptions::new())
            .await
            .unwrap();

        let members = store.participants(conversation.id).await.unwrap();
        assert_eq!(members.len(), 2);
        assert!(conversation.private);
        assert!(!conversation.direct_message);
    }

    #[tokio::test]
    async fn test_direct_requires_two_participants() {
        let (_db, store) = create_test_store().await;

        let result = store
            .create(&[user("1"), user("2"), user("3")], ConversationOptions::new().direct())
            .await;
        assert!(matches!(
            result,
            Err(Error::InvalidParticipantCount { expected: 2, actual: 3 })
        ));

        let result = store
            .create(&[user("1"), user("1")], ConversationOptions::new().direct())
            .await;
        assert!(matches!(
            result,
            Err(Error::InvalidParticipantCount { expected: 2, actual: 1 })
        ));
    }

    #[tokio::test]
    async fn test_duplicate_direct_rejected() {
        let (_db, store) = create_test_store().await;

        let first = store
            .create(&[user("1"), user("2")], ConversationOptions::new().direct())
            .await
            .unwrap();

        let second = store
            .create(&[user("2"), user("1")], ConversationOptions::new().direct())
            .await;
        assert!(matches!(second, Err(Error::DuplicateDirectConversation(..))));

        // A group between the same pair is fine
        store
            .create(&[user("1"), user("2")], ConversationOptions::new())
            .await
            .unwrap();

        let between = store.between(&user("1"), &user("2")).await.unwrap().unwrap();
        assert_eq!(between.id, first.id);
    }

    #[tokio::test]
    async fn test_add_participants() {
        let (_db, store) = create_test_store().await;
        let conversation = store.create(&[user("1")], ConversationOptions::new()).await.unwrap();

        let added = store
            .add_participants(conversation.id, &[user("1"), user("2"), user("3"), user("2")])
            .await
            .unwrap();

        assert_eq!(
            added.iter().map(|p| p.messageable.clone()).collect::<Vec<_>>(),
            vec![user("2"), user("3")]
        );
        assert_eq!(store.participants(conversation.id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_direct_membership_is_frozen() {
        let (_db, store) = create_test_store().await;
        let conversation = store
            .create(&[user("1"), user("2")], ConversationOptions::new().direct())
            .await
            .unwrap();

        let result = store.add_participants(conversation.id, &[user("3")]).await;
        assert!(matches!(
            result,
            Err(Error::InvalidParticipantCount { expected: 2, actual: 3 })
        ));

        let result = store.remove_participants(conversation.id, &[user("2")]).await;
        assert!(matches!(
            result,
            Err(Error::InvalidParticipantCount { expected: 2, actual: 1 })
        ));

        // Nothing was written by the failed calls
        assert_eq!(store.participants(conversation.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_remove_participants() {
        let (_db, store) = create_test_store().await;
        let conversation = store
            .create(&[user("1"), user("2"), user("3")], ConversationOptions::new())
            .await
            .unwrap();

        let removed = store
            .remove_participants(conversation.id, &[user("2"), user("9")])
            .await
            .unwrap();
        assert_eq!(removed, 1);

        let result = store.participation(conversation.id, &user("2")).await;
        assert!(matches!(result, Err(Error::ParticipantNotFound(_))));
    }

    #[tokio::test]
    async fn test_set_direct() {
        let (_db, store) = create_test_store().await;
        let group = store
            .create(&[user("1"), user("2"), user("3")], ConversationOptions::new())
            .await
            .unwrap();

        let result = store.set_direct(group.id, true).await;
        assert!(matches!(result, Err(Error::InvalidParticipantCount { actual: 3, .. })));

        let pair = store.create(&[user("1"), user("2")], ConversationOptions::new()).await.unwrap();
        let updated = store.set_direct(pair.id, true).await.unwrap();
        assert!(updated.direct_message);

        let other = store.create(&[user("2"), user("1")], ConversationOptions::new()).await.unwrap();
        let result = store.set_direct(other.id, true).await;
        assert!(matches!(result, Err(Error::DuplicateDirectConversation(..))));

        let updated = store.set_direct(pair.id, false).await.unwrap();
        assert!(!updated.direct_message);
    }

    #[tokio::test]
    async fn test_set_private_and_update_data() {
        let (_db, store) = create_test_store().await;
        let conversation = store.create(&[user("1")], ConversationOptions::new()).await.unwrap();

        let updated = store.set_private(conversation.id, false).await.unwrap();
        assert!(!updated.private);

        let updated = store
            .update_data(conversation.id, serde_json::json!({ "title": "Rust", "description": "Rust Channel" }))
            .await
            .unwrap();
        assert_eq!(updated.title(), Some("Rust"));

        let result = store.set_private(9999, true).await;
        assert!(matches!(result, Err(Error::ConversationNotFound(9999))));
    }

    #[tokio::test]
    async fn test_update_settings() {
        let (_db, store) = create_test_store().await;
        let conversation = store.create(&[user("1"), user("2")], ConversationOptions::new()).await.unwrap();

        let participation = store
            .update_settings(conversation.id, &user("1"), serde_json::json!({ "mute_mentions": true }))
            .await
            .unwrap();
        assert_eq!(participation.setting("mute_mentions"), Some(&serde_json::json!(true)));

        let other = store.participation(conversation.id, &user("2")).await.unwrap();
        assert_eq!(other.settings, serde_json::json!({}));

        let result = store
            .update_settings(conversation.id, &user("1"), serde_json::json!("loud"))
            .await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_delete_for_and_soft_delete() {
        let (_db, store) = create_test_store().await;
        let conversation = store.create(&[user("1"), user("2")], ConversationOptions::new()).await.unwrap();

        assert!(store.delete_for(conversation.id, &user("1")).await.unwrap());
        assert!(!store.delete_for(conversation.id, &user("1")).await.unwrap());

        store.soft_delete(conversation.id).await.unwrap();
        assert!(store.get(conversation.id).await.unwrap_err().is_not_found());
        assert!(store.soft_delete(conversation.id).await.unwrap_err().is_not_found());
    }

    #[test]
    fn test_distinct_keeps_order() {
        let unique = distinct(&[user("b"), user("a"), user("b"), ParticipantRef::new("client", "b")]);
        assert_eq!(unique, vec![user("b"), user("a"), ParticipantRef::new("client", "b")]);
    }
}
