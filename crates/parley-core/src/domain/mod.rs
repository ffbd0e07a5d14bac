//! Domain layer
//!
//! Contains the core business logic and domain models.

pub mod conversation;
pub mod message;
pub mod participant;
pub mod query;
pub mod visibility;
