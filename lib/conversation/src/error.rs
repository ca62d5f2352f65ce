//! Error types for the conversation crate.

use chat_relay_core::ConversationId;
use std::fmt;

/// Errors from session store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No session exists for the conversation; `ensure` was never called.
    NotFound { conversation_id: ConversationId },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { conversation_id } => {
                write!(f, "no session for conversation {conversation_id}")
            }
        }
    }
}

impl std::error::Error for SessionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_error_display() {
        let err = SessionError::NotFound {
            conversation_id: ConversationId::new(7),
        };
        assert_eq!(err.to_string(), "no session for conversation 7");
    }
}
