//! Participant domain module
//!
//! Turns host-defined identities into conversation participants.
//!
//! # Architecture
//!
//! - **Identity**: `Identifiable` capability and the resolved `ParticipantRef`
//! - **Registry**: `MessageableRegistry` of accepted type tags
//! - **Entity**: `Participation`, one membership with settings and read marker
//! - **Repository**: `ParticipationRepository` for database operations

pub mod identity;
pub mod participation;
pub mod registry;
pub mod repository;

pub use identity::{Identifiable, ParticipantRef};
pub use participation::Participation;
pub use registry::{MessageableKind, MessageableRegistry};
pub use repository::ParticipationRepository;
