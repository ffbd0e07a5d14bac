//! Messageable identities
//!
//! Anything that can send or receive messages implements [`Identifiable`].
//! Stores only ever see the resolved [`ParticipantRef`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Capability of an entity that can take part in conversations
pub trait Identifiable {
    /// Type tag of the entity (e.g. `user`, `client`)
    fn messageable_type(&self) -> &str;

    /// Identifier of the entity, unique within its type
    fn messageable_id(&self) -> String;

    /// Resolve into a plain participant reference
    fn to_participant(&self) -> ParticipantRef {
        ParticipantRef::new(self.messageable_type(), self.messageable_id())
    }
}

/// A messageable entity reduced to its type tag and id
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticipantRef {
    pub kind: String,
    pub id: String,
}

impl ParticipantRef {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }
}

impl Identifiable for ParticipantRef {
    fn messageable_type(&self) -> &str {
        &self.kind
    }

    fn messageable_id(&self) -> String {
        self.id.clone()
    }

    fn to_participant(&self) -> ParticipantRef {
        self.clone()
    }
}

impl fmt::Display for ParticipantRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}
