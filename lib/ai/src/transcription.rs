//! Transcription adapter.
//!
//! Converts a voice clip into plain text. An empty transcript is a valid
//! result and is handed on like any other text.

use crate::error::TranscriptionError;
use async_trait::async_trait;
use rootcause::prelude::Report;
use serde::Deserialize;

/// A voice payload ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    /// Raw container bytes.
    pub bytes: Vec<u8>,
    /// File name reported in the upload; the service sniffs the format from it.
    pub file_name: String,
    /// MIME type of the container.
    pub mime_type: String,
}

impl AudioClip {
    /// Creates an Ogg/Opus clip, the format Telegram voice notes use.
    #[must_use]
    pub fn ogg(bytes: Vec<u8>, file_name: impl Into<String>) -> Self {
        Self {
            bytes,
            file_name: file_name.into(),
            mime_type: "audio/ogg".to_string(),
        }
    }

    /// Returns true if the clip carries no audio at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Trait for speech-to-text backends.
#[async_trait]
pub trait TranscriptionBackend: Send + Sync {
    /// Transcribes the clip.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure, a non-success status, or a
    /// malformed response body.
    async fn transcribe(&self, clip: AudioClip) -> Result<String, Report<TranscriptionError>>;
}

/// Response body of `POST /audio/transcriptions` in JSON mode.
#[derive(Debug, Deserialize)]
pub(crate) struct TranscriptionResponse {
    #[serde(default)]
    pub text: Option<String>,
}

impl TranscriptionResponse {
    pub(crate) fn into_text(self) -> String {
        self.text.unwrap_or_default()
    }
}
