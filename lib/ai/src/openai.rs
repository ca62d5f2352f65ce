//! OpenAI-compatible HTTP client.
//!
//! One client type serves both adapters: completion goes to
//! `POST {base}/chat/completions`, transcription to
//! `POST {base}/audio/transcriptions` as a multipart upload.

use crate::backend::{ChatMessage, ProviderConfig};
use crate::completion::{ChatCompletionRequest, ChatCompletionResponse, CompletionBackend};
use crate::error::{CompletionError, TranscriptionError};
use crate::transcription::{AudioClip, TranscriptionBackend, TranscriptionResponse};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use rootcause::prelude::Report;
use tracing::{debug, instrument, warn};

/// Client for an OpenAI-compatible service.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    config: ProviderConfig,
    http: reqwest::Client,
}

impl OpenAiClient {
    /// Creates a client used for chat completions.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn completion(config: ProviderConfig) -> Result<Self, Report<CompletionError>> {
        let http = build_http(&config).map_err(|e| CompletionError::InvalidConfig {
            reason: e.to_string(),
        })?;
        Ok(Self { config, http })
    }

    /// Creates a client used for transcriptions.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn transcription(config: ProviderConfig) -> Result<Self, Report<TranscriptionError>> {
        let http = build_http(&config).map_err(|e| TranscriptionError::InvalidConfig {
            reason: e.to_string(),
        })?;
        Ok(Self { config, http })
    }

    /// Returns the model this client sends.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.config.model
    }
}

fn build_http(config: &ProviderConfig) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().timeout(config.timeout).build()
}

#[async_trait]
impl CompletionBackend for OpenAiClient {
    #[instrument(skip_all, fields(model = %self.config.model, messages = history.len()))]
    async fn complete(&self, history: &[ChatMessage]) -> Result<String, Report<CompletionError>> {
        let url = self.config.endpoint("chat/completions");
        let body = ChatCompletionRequest {
            model: &self.config.model,
            messages: history,
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CompletionError::Timeout
                } else {
                    CompletionError::RequestFailed {
                        reason: e.to_string(),
                    }
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "completion endpoint returned error");
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let parsed: ChatCompletionResponse =
            response
                .json()
                .await
                .map_err(|e| CompletionError::ResponseParseFailed {
                    reason: e.to_string(),
                })?;

        let reply = parsed.into_reply();
        debug!(reply_len = reply.len(), "completion received");
        Ok(reply)
    }
}

#[async_trait]
impl TranscriptionBackend for OpenAiClient {
    #[instrument(skip_all, fields(model = %self.config.model, bytes = clip.bytes.len()))]
    async fn transcribe(&self, clip: AudioClip) -> Result<String, Report<TranscriptionError>> {
        let url = self.config.endpoint("audio/transcriptions");
        let part = Part::bytes(clip.bytes)
            .file_name(clip.file_name)
            .mime_str(&clip.mime_type)
            .map_err(|e| TranscriptionError::InvalidConfig {
                reason: e.to_string(),
            })?;
        let form = Form::new()
            .part("file", part)
            .text("model", self.config.model.clone())
            .text("response_format", "json");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TranscriptionError::Timeout
                } else {
                    TranscriptionError::RequestFailed {
                        reason: e.to_string(),
                    }
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "transcription endpoint returned error");
            return Err(TranscriptionError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let parsed: TranscriptionResponse =
            response
                .json()
                .await
                .map_err(|e| TranscriptionError::ResponseParseFailed {
                    reason: e.to_string(),
                })?;

        let text = parsed.into_text();
        debug!(text_len = text.len(), "transcription received");
        Ok(text)
    }
}
