//! Registry of messageable types
//!
//! Hosts register the type tags their identities use. Resolution goes through
//! the registry, so an unexpected tag is rejected before it reaches storage.

use std::collections::BTreeMap;

use super::identity::{Identifiable, ParticipantRef};
use crate::error::{Error, Result};

/// Description of a registered messageable type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageableKind {
    /// Type tag stored alongside participant ids
    pub tag: String,
    /// Human-readable label
    pub label: String,
}

/// Registry of known messageable types
#[derive(Debug, Clone, Default)]
pub struct MessageableRegistry {
    kinds: BTreeMap<String, MessageableKind>,
}

impl MessageableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type tag, labelled with the tag itself
    pub fn register(self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        let label = tag.clone();
        self.register_with_label(tag, label)
    }

    /// Register a type tag with a label
    pub fn register_with_label(mut self, tag: impl Into<String>, label: impl Into<String>) -> Self {
        let tag = tag.into();
        self.kinds.insert(
            tag.clone(),
            MessageableKind {
                tag,
                label: label.into(),
            },
        );
        self
    }

    /// Look up a registered kind
    pub fn kind(&self, tag: &str) -> Option<&MessageableKind> {
        self.kinds.get(tag)
    }

    pub fn is_registered(&self, tag: &str) -> bool {
        self.kind(tag).is_some()
    }

    /// Registered tags in sorted order
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.kinds.keys().map(String::as_str)
    }

    /// Resolve an entity into a participant reference
    pub fn resolve(&self, entity: &dyn Identifiable) -> Result<ParticipantRef> {
        let tag = entity.messageable_type();
        if !self.is_registered(tag) {
            return Err(Error::UnknownMessageableType(tag.to_string()));
        }

        let id = entity.messageable_id();
        if id.is_empty() {
            return Err(Error::InvalidInput(format!(
                "Messageable of type '{}' has an empty id",
                tag
            )));
        }

        Ok(ParticipantRef::new(tag, id))
    }

    /// Resolve a list of entities, dropping repeats while keeping first-seen order
    pub fn resolve_all(&self, entities: &[&dyn Identifiable]) -> Result<Vec<ParticipantRef>> {
        let mut resolved: Vec<ParticipantRef> = Vec::with_capacity(entities.len());
        for entity in entities {
            let participant = self.resolve(*entity)?;
            if !resolved.contains(&participant) {
                resolved.push(participant);
            }
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> MessageableRegistry {
        MessageableRegistry::new()
            .register("user")
            .register_with_label("client", "API client")
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = registry();
        assert!(registry.is_registered("user"));
        assert_eq!(registry.kind("client").unwrap().label, "API client");
        assert_eq!(registry.tags().collect::<Vec<_>>(), vec!["client", "user"]);
    }

    #[test]
    fn test_resolve_unknown_type() {
        let err = registry()
            .resolve(&ParticipantRef::new("bot", "1"))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownMessageableType(tag) if tag == "bot"));
    }

    #[test]
    fn test_resolve_empty_id() {
        let err = registry()
            .resolve(&ParticipantRef::new("user", ""))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_resolve_all_dedups() {
        let a = ParticipantRef::new("user", "1");
        let b = ParticipantRef::new("client", "1");
        let resolved = registry().resolve_all(&[&a, &b, &a]).unwrap();
        assert_eq!(resolved, vec![a, b]);
    }
}
