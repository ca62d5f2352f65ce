//! Telegram Bot API client.
//!
//! Implements [`ChatTransport`] for outbound traffic and exposes
//! [`TelegramClient::get_updates`] for long polling. Every method is a
//! JSON `POST {api_base}/bot{token}/{method}` whose answer is wrapped in the
//! Bot API envelope `{ ok, result, description, error_code }`.

use crate::error::TransportError;
use crate::transport::{ChatActivity, ChatTransport, FileReference};
use async_trait::async_trait;
use chat_relay_core::ConversationId;
use rootcause::prelude::Report;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Default Bot API host.
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Extra time allowed on top of the long-poll timeout before the HTTP
/// client gives up.
const POLL_GRACE: Duration = Duration::from_secs(10);

/// Telegram client configuration.
#[derive(Clone)]
pub struct TelegramConfig {
    /// Bot credential token.
    pub token: String,
    /// Bot API host, without trailing slash.
    pub api_base: String,
    /// Long-poll timeout passed to `getUpdates`.
    pub poll_timeout: Duration,
}

impl TelegramConfig {
    /// Creates a configuration against the public Bot API with a 30s poll.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            poll_timeout: Duration::from_secs(30),
        }
    }

    /// Overrides the Bot API host.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Overrides the long-poll timeout.
    #[must_use]
    pub fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.api_base, self.token, file_path)
    }
}

// The token is a credential; keep it out of logs.
impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("poll_timeout", &self.poll_timeout)
            .finish()
    }
}

/// An incoming update.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    /// Monotonic update identifier; the next poll uses `update_id + 1`.
    pub update_id: i64,
    /// New incoming message, if this update carries one.
    #[serde(default)]
    pub message: Option<Message>,
}

/// A chat message.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    /// Message identifier within the chat.
    pub message_id: i64,
    /// The chat the message belongs to.
    pub chat: Chat,
    /// Text of a text message.
    #[serde(default)]
    pub text: Option<String>,
    /// Voice note attached to the message.
    #[serde(default)]
    pub voice: Option<Voice>,
}

/// A chat.
#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    /// Chat identifier.
    pub id: i64,
}

/// A voice note.
#[derive(Debug, Clone, Deserialize)]
pub struct Voice {
    /// Identifier used to download the file.
    pub file_id: String,
    /// Duration in seconds.
    #[serde(default)]
    pub duration: Option<u32>,
    /// MIME type as reported by the sender.
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// Answer of `getFile`.
#[derive(Debug, Clone, Deserialize)]
struct File {
    #[serde(default)]
    file_path: Option<String>,
}

/// Bot API response envelope.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<i64>,
}

impl<T> ApiResponse<T> {
    fn into_result(self, method: &str) -> Result<T, TransportError> {
        match (self.ok, self.result) {
            (true, Some(result)) => Ok(result),
            (true, None) => Err(TransportError::Api {
                method: method.to_string(),
                code: None,
                description: "response carried no result".to_string(),
            }),
            (false, _) => Err(TransportError::Api {
                method: method.to_string(),
                code: self.error_code,
                description: self.description.unwrap_or_default(),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
struct GetUpdatesParams<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: &'a [&'a str],
}

#[derive(Debug, Serialize)]
struct SendMessageParams<'a> {
    chat_id: i64,
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct SendChatActionParams<'a> {
    chat_id: i64,
    action: &'a str,
}

#[derive(Debug, Serialize)]
struct GetFileParams<'a> {
    file_id: &'a str,
}

/// Telegram Bot API client.
#[derive(Debug, Clone)]
pub struct TelegramClient {
    config: TelegramConfig,
    http: reqwest::Client,
}

impl TelegramClient {
    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: TelegramConfig) -> Result<Self, Report<TransportError>> {
        let http = reqwest::Client::builder()
            .timeout(config.poll_timeout + POLL_GRACE)
            .build()
            .map_err(|e| TransportError::RequestFailed {
                method: "client".to_string(),
                reason: e.without_url().to_string(),
            })?;
        Ok(Self { config, http })
    }

    /// Long-polls for new updates.
    ///
    /// `offset` acknowledges every update with a lower id.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API rejects it.
    #[instrument(skip(self))]
    pub async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>, Report<TransportError>> {
        let params = GetUpdatesParams {
            offset,
            timeout: self.config.poll_timeout.as_secs(),
            allowed_updates: &["message"],
        };
        let updates: Vec<Update> = self.call("getUpdates", &params).await?;
        if !updates.is_empty() {
            debug!(count = updates.len(), "received updates");
        }
        Ok(updates)
    }

    async fn call<P, R>(&self, method: &str, params: &P) -> Result<R, Report<TransportError>>
    where
        P: Serialize + ?Sized + Sync,
        R: DeserializeOwned + Send,
    {
        let response = self
            .http
            .post(self.config.method_url(method))
            .json(params)
            .send()
            .await
            .map_err(|e| TransportError::RequestFailed {
                method: method.to_string(),
                reason: e.without_url().to_string(),
            })?;

        // The Bot API reports failures in the envelope with a 4xx status,
        // so the body is parsed regardless of status.
        let envelope: ApiResponse<R> =
            response
                .json()
                .await
                .map_err(|e| TransportError::RequestFailed {
                    method: method.to_string(),
                    reason: e.without_url().to_string(),
                })?;

        Ok(envelope.into_result(method)?)
    }
}

#[async_trait]
impl ChatTransport for TelegramClient {
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    async fn send_message(
        &self,
        conversation_id: ConversationId,
        text: &str,
    ) -> Result<(), Report<TransportError>> {
        let params = SendMessageParams {
            chat_id: conversation_id.as_i64(),
            text,
        };
        let _sent: serde_json::Value = self
            .call("sendMessage", &params)
            .await
            .map_err(|report| TransportError::DeliveryFailed {
                reason: report.to_string(),
            })?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn notify_activity(
        &self,
        conversation_id: ConversationId,
        activity: ChatActivity,
    ) -> Result<(), Report<TransportError>> {
        let params = SendChatActionParams {
            chat_id: conversation_id.as_i64(),
            action: activity.as_str(),
        };
        let _accepted: bool = self.call("sendChatAction", &params).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn resolve_file_url(&self, file: &FileReference) -> Result<String, Report<TransportError>> {
        let params = GetFileParams {
            file_id: file.as_str(),
        };
        let info: File = self.call("getFile", &params).await.map_err(|report| {
            TransportError::FileResolutionFailed {
                file_id: file.to_string(),
                reason: report.to_string(),
            }
        })?;
        let file_path = info
            .file_path
            .ok_or_else(|| TransportError::FileResolutionFailed {
                file_id: file.to_string(),
                reason: "file is not available for download".to_string(),
            })?;
        Ok(self.config.file_url(&file_path))
    }
}
