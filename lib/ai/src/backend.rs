//! Shared types for model-service backends.
//!
//! Both the completion and the transcription service speak the
//! OpenAI-compatible wire format; they differ only in endpoint, key and model.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for one OpenAI-compatible service.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL for the API, e.g. `https://openrouter.ai/api/v1`.
    pub base_url: String,
    /// Bearer token sent with every request.
    pub api_key: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// Upper bound for a single request, connection included.
    pub timeout: Duration,
}

impl ProviderConfig {
    /// Creates a configuration with a 60 second timeout.
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Joins `path` onto the base URL.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// System (persona) message.
    System,
    /// User/human message.
    User,
    /// Assistant/AI message.
    Assistant,
}

/// A message as sent to the completion service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The role of the message sender.
    pub role: ChatRole,
    /// The content of the message.
    pub content: String,
}

impl ChatMessage {
    /// Creates a message with the given role.
    #[must_use]
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(ChatRole::System, content)
    }

    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    /// Creates an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slash() {
        let config = ProviderConfig::new("https://api.openai.com/v1/", "key", "whisper-1");
        assert_eq!(
            config.endpoint("/audio/transcriptions"),
            "https://api.openai.com/v1/audio/transcriptions"
        );
    }

    #[test]
    fn roles_serialize_lowercase() {
        let msg = ChatMessage::assistant("ok");
        let json = serde_json::to_value(&msg).expect("serialize");
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["content"], "ok");
    }

    #[test]
    fn default_timeout_can_be_overridden() {
        let config = ProviderConfig::new("http://localhost", "k", "m")
            .with_timeout(Duration::from_secs(5));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn debug_hides_api_key() {
        let config = ProviderConfig::new("http://localhost", "sk-secret", "m");
        assert!(!format!("{config:?}").contains("sk-secret"));
    }
}
