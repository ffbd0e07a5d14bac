//! Error types for Parley

use thiserror::Error;

/// Result type alias using Parley's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Parley error types
#[derive(Error, Debug)]
pub enum Error {
    // Entity errors (E001-E099)
    #[error("Conversation {0} not found.")]
    ConversationNotFound(i64),

    #[error("Message {0} not found.")]
    MessageNotFound(i64),

    #[error("Participant '{0}' is not part of this conversation.")]
    ParticipantNotFound(String),

    // Direct messaging errors (E100-E199)
    #[error("A direct conversation between '{0}' and '{1}' already exists.")]
    DuplicateDirectConversation(String, String),

    #[error("Direct conversations need exactly {expected} participants, got {actual}.")]
    InvalidParticipantCount { expected: usize, actual: usize },

    // Identity errors (E200-E299)
    #[error("Messageable type '{0}' is not registered.")]
    UnknownMessageableType(String),

    // Database errors (E400-E499)
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Failed to parse stored value: {0}")]
    Parse(String),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Input errors (E800-E899)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConversationNotFound(_) => "E001",
            Self::MessageNotFound(_) => "E002",
            Self::ParticipantNotFound(_) => "E003",
            Self::DuplicateDirectConversation(..) => "E100",
            Self::InvalidParticipantCount { .. } => "E101",
            Self::UnknownMessageableType(_) => "E200",
            Self::DatabaseError(_) => "E400",
            Self::Parse(_) => "E401",
            Self::ConfigError(_) => "E600",
            Self::InvalidInput(_) => "E800",
            Self::Io(_) => "E9999",
        }
    }

    /// Whether this error reports a missing conversation, message, or participant
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ConversationNotFound(_) | Self::MessageNotFound(_) | Self::ParticipantNotFound(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_codes() {
        assert_eq!(Error::ConversationNotFound(7).code(), "E001");
        assert_eq!(Error::MessageNotFound(7).code(), "E002");
        assert_eq!(Error::ParticipantNotFound("user:1".into()).code(), "E003");

        assert!(Error::ConversationNotFound(7).is_not_found());
        assert!(Error::ParticipantNotFound("user:1".into()).is_not_found());
        assert!(!Error::DuplicateDirectConversation("a".into(), "b".into()).is_not_found());
    }

    #[test]
    fn test_invalid_participant_count_message() {
        let error = Error::InvalidParticipantCount {
            expected: 2,
            actual: 3,
        };
        assert_eq!(error.code(), "E101");
        assert!(error.to_string().contains("exactly 2"));
        assert!(error.to_string().contains("got 3"));
    }

    #[test]
    fn test_database_error_conversion() {
        let error: Error = sqlx::Error::RowNotFound.into();
        assert_eq!(error.code(), "E400");
        assert!(error.to_string().starts_with("Database error"));
    }
}
