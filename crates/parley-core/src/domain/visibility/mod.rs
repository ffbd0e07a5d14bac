//! Per-participant visibility
//!
//! A conversation or message is hidden from one participant by a row in a
//! deletion log keyed by (entity id, participation id). The entity itself is
//! never modified, so other participants keep seeing it.

pub mod repository;

pub use repository::{HiddenEntity, VisibilityRepository};
