//! Turn types for conversations.

use chat_relay_ai::{ChatMessage, ChatRole};
use chat_relay_core::TurnId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The role of a turn's author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Persona prompt seeded at session creation.
    System,
    /// User/human message.
    User,
    /// Assistant/AI message.
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        })
    }
}

impl From<Role> for ChatRole {
    fn from(role: Role) -> Self {
        match role {
            Role::System => Self::System,
            Role::User => Self::User,
            Role::Assistant => Self::Assistant,
        }
    }
}

/// One message in a conversation.
///
/// Turns are immutable once appended to a session; fields are read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    id: TurnId,
    role: Role,
    content: String,
    timestamp: DateTime<Utc>,
}

impl Turn {
    /// Creates a new turn.
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: TurnId::new(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Creates a system turn.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Creates a user turn.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates an assistant turn.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Unique turn identifier.
    #[must_use]
    pub fn id(&self) -> TurnId {
        self.id
    }

    /// Author role.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Text payload; may be empty.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Converts into the completion service's message shape.
    #[must_use]
    pub fn to_chat_message(&self) -> ChatMessage {
        ChatMessage::new(self.role.into(), self.content.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_creation() {
        let turn = Turn::user("Hello!");
        assert_eq!(turn.role(), Role::User);
        assert_eq!(turn.content(), "Hello!");
    }

    #[test]
    fn empty_content_is_allowed() {
        let turn = Turn::assistant("");
        assert_eq!(turn.content(), "");
    }

    #[test]
    fn chat_message_keeps_role_and_content() {
        let message = Turn::system("persona").to_chat_message();
        assert_eq!(message, ChatMessage::system("persona"));
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Assistant).expect("serialize");
        assert_eq!(json, "\"assistant\"");
    }
}
