//! Inbound and outbound events.
//!
//! Inbound events are what the transport hands to the dispatcher; every
//! inbound event produces exactly one outbound event.

use chat_relay_core::ConversationId;
use chat_relay_integration::FileReference;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Text prefix that starts the conversation over.
pub const RESET_COMMAND: &str = "/start";

/// An event received from the chat transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InboundEvent {
    /// Start the conversation over.
    Reset { conversation_id: ConversationId },
    /// A text message.
    Text {
        conversation_id: ConversationId,
        text: String,
    },
    /// A voice clip to be transcribed first.
    Voice {
        conversation_id: ConversationId,
        file: FileReference,
    },
}

impl InboundEvent {
    /// Classifies a text message; text starting with [`RESET_COMMAND`] is a reset.
    #[must_use]
    pub fn from_text(conversation_id: ConversationId, text: impl Into<String>) -> Self {
        let text = text.into();
        if text.starts_with(RESET_COMMAND) {
            Self::Reset { conversation_id }
        } else {
            Self::Text {
                conversation_id,
                text,
            }
        }
    }

    /// Creates a voice event.
    #[must_use]
    pub fn voice(conversation_id: ConversationId, file: FileReference) -> Self {
        Self::Voice {
            conversation_id,
            file,
        }
    }

    /// The conversation the event belongs to.
    #[must_use]
    pub fn conversation_id(&self) -> ConversationId {
        match self {
            Self::Reset { conversation_id }
            | Self::Text {
                conversation_id, ..
            }
            | Self::Voice {
                conversation_id, ..
            } => *conversation_id,
        }
    }

    /// The kind of input, for logging and fallback messages.
    #[must_use]
    pub fn kind(&self) -> InboundKind {
        match self {
            Self::Reset { .. } => InboundKind::Command,
            Self::Text { .. } => InboundKind::Text,
            Self::Voice { .. } => InboundKind::Voice,
        }
    }
}

/// Coarse input kind of an inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundKind {
    /// A command such as `/start`.
    Command,
    /// Free text.
    Text,
    /// A voice clip.
    Voice,
}

impl InboundKind {
    /// Message sent when handling fails outside the turn pipeline.
    #[must_use]
    pub fn unexpected_failure_message(&self) -> &'static str {
        match self {
            Self::Command | Self::Text => "Unexpected error while handling text.",
            Self::Voice => "Unexpected error while handling voice.",
        }
    }
}

impl fmt::Display for InboundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Command => "command",
            Self::Text => "text",
            Self::Voice => "voice",
        })
    }
}

/// A message for the chat transport to deliver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundEvent {
    /// Destination conversation.
    pub conversation_id: ConversationId,
    /// Reply or user-facing error text.
    pub text: String,
}

impl OutboundEvent {
    /// Creates an outbound event.
    #[must_use]
    pub fn new(conversation_id: ConversationId, text: impl Into<String>) -> Self {
        Self {
            conversation_id,
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_prefix_is_reset() {
        let id = ConversationId::new(1);
        assert_eq!(
            InboundEvent::from_text(id, "/start"),
            InboundEvent::Reset { conversation_id: id }
        );
        assert_eq!(
            InboundEvent::from_text(id, "/start@relay_bot payload"),
            InboundEvent::Reset { conversation_id: id }
        );
    }

    #[test]
    fn other_text_is_text() {
        let id = ConversationId::new(1);
        let event = InboundEvent::from_text(id, "hi /start");
        assert_eq!(event.kind(), InboundKind::Text);
        assert_eq!(event.conversation_id(), id);
    }

    #[test]
    fn empty_text_is_text() {
        let id = ConversationId::new(2);
        assert_eq!(
            InboundEvent::from_text(id, ""),
            InboundEvent::Text {
                conversation_id: id,
                text: String::new(),
            }
        );
    }

    #[test]
    fn fallback_messages_by_kind() {
        assert_eq!(
            InboundKind::Voice.unexpected_failure_message(),
            "Unexpected error while handling voice."
        );
        assert_eq!(
            InboundKind::Text.unexpected_failure_message(),
            "Unexpected error while handling text."
        );
    }

    #[test]
    fn inbound_event_is_tagged_by_kind() {
        let event = InboundEvent::voice(ConversationId::new(3), FileReference::new("AwAC"));
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["kind"], "voice");
        assert_eq!(json["file"], "AwAC");
    }
}
