//! Chat transport trait and related types.
//!
//! The dispatcher only ever needs three things from the chat platform:
//! deliver a message, show an activity indicator, and turn a file reference
//! into something downloadable.

use crate::error::TransportError;
use async_trait::async_trait;
use chat_relay_core::ConversationId;
use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Activity indicators shown to the user while a turn is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatActivity {
    /// "typing…"
    Typing,
}

impl ChatActivity {
    /// Returns the Bot API action name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Typing => "typing",
        }
    }
}

impl fmt::Display for ChatActivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque handle to a file held by the chat platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileReference(String);

impl FileReference {
    /// Wraps a platform file id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the platform file id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trait for the outbound side of a chat platform.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Delivers a text message to a conversation.
    async fn send_message(
        &self,
        conversation_id: ConversationId,
        text: &str,
    ) -> Result<(), Report<TransportError>>;

    /// Shows an activity indicator in a conversation.
    async fn notify_activity(
        &self,
        conversation_id: ConversationId,
        activity: ChatActivity,
    ) -> Result<(), Report<TransportError>>;

    /// Resolves a file reference into a URL that can be fetched with a plain GET.
    async fn resolve_file_url(&self, file: &FileReference) -> Result<String, Report<TransportError>>;
}
