//! Error types for the AI crate.
//!
//! Both adapters report failures as plain enums wrapped in a rootcause
//! `Report`:
//! - `CompletionError`: chat completion calls
//! - `TranscriptionError`: speech-to-text calls

use std::fmt;

/// Errors from chat completion calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    /// The request could not be sent or the connection dropped.
    RequestFailed { reason: String },
    /// The service answered with a non-success HTTP status.
    Status { status: u16, body: String },
    /// The response body was not the expected shape.
    ResponseParseFailed { reason: String },
    /// Timeout waiting for the response.
    Timeout,
    /// The client could not be constructed from its configuration.
    InvalidConfig { reason: String },
}

impl fmt::Display for CompletionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestFailed { reason } => write!(f, "completion request failed: {reason}"),
            Self::Status { status, body } => {
                write!(f, "completion service returned HTTP {status}: {body}")
            }
            Self::ResponseParseFailed { reason } => {
                write!(f, "failed to parse completion response: {reason}")
            }
            Self::Timeout => write!(f, "completion request timed out"),
            Self::InvalidConfig { reason } => {
                write!(f, "invalid completion configuration: {reason}")
            }
        }
    }
}

impl std::error::Error for CompletionError {}

/// Errors from transcription calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptionError {
    /// The request could not be sent or the connection dropped.
    RequestFailed { reason: String },
    /// The service answered with a non-success HTTP status.
    Status { status: u16, body: String },
    /// The response body was not the expected shape.
    ResponseParseFailed { reason: String },
    /// Timeout waiting for the response.
    Timeout,
    /// The client or the upload could not be built.
    InvalidConfig { reason: String },
}

impl fmt::Display for TranscriptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestFailed { reason } => {
                write!(f, "transcription request failed: {reason}")
            }
            Self::Status { status, body } => {
                write!(f, "transcription service returned HTTP {status}: {body}")
            }
            Self::ResponseParseFailed { reason } => {
                write!(f, "failed to parse transcription response: {reason}")
            }
            Self::Timeout => write!(f, "transcription request timed out"),
            Self::InvalidConfig { reason } => {
                write!(f, "invalid transcription configuration: {reason}")
            }
        }
    }
}

impl std::error::Error for TranscriptionError {}
