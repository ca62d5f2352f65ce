//! Completion adapter.
//!
//! Sends an ordered conversation history to a language model and returns
//! the generated reply. The history is passed through untouched: no
//! truncation, summarization or deduplication happens here.

use crate::backend::ChatMessage;
use crate::error::CompletionError;
use async_trait::async_trait;
use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};

/// Trait for chat completion backends.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Generates a reply for the given history.
    ///
    /// An upstream response without content yields an empty string rather
    /// than an error.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure, a non-success status, or a
    /// malformed response body.
    async fn complete(&self, history: &[ChatMessage]) -> Result<String, Report<CompletionError>>;
}

/// Request body of `POST /chat/completions`.
#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
}

/// Response body of `POST /chat/completions`, reduced to what the relay reads.
#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionResponse {
    /// Returns the first choice's content, or an empty string.
    pub(crate) fn into_reply(self) -> String {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .unwrap_or_default()
    }
}
