//! Error types for the integration crate.
//!
//! - `TransportError`: Errors from the chat platform
//! - `TransientStoreError`: Errors from scratch file handling

use chat_relay_core::TransientFileId;
use std::fmt;

/// Errors from chat transport operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// An outbound message could not be delivered.
    DeliveryFailed { reason: String },
    /// A file reference could not be resolved into a download URL.
    FileResolutionFailed { file_id: String, reason: String },
    /// The HTTP request itself failed.
    RequestFailed { method: String, reason: String },
    /// The platform answered `ok: false`.
    Api {
        method: String,
        code: Option<i64>,
        description: String,
    },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeliveryFailed { reason } => write!(f, "message delivery failed: {reason}"),
            Self::FileResolutionFailed { file_id, reason } => {
                write!(f, "could not resolve file '{file_id}': {reason}")
            }
            Self::RequestFailed { method, reason } => {
                write!(f, "{method} request failed: {reason}")
            }
            Self::Api {
                method,
                code,
                description,
            } => match code {
                Some(code) => write!(f, "{method} rejected ({code}): {description}"),
                None => write!(f, "{method} rejected: {description}"),
            },
        }
    }
}

impl std::error::Error for TransportError {}

/// Errors from transient store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransientStoreError {
    /// The scratch directory could not be created.
    DirectoryUnavailable { path: String, reason: String },
    /// The source could not be fetched.
    DownloadFailed { url: String, reason: String },
    /// Writing the payload to disk failed.
    WriteFailed { id: TransientFileId, reason: String },
    /// Reading a stored payload failed.
    ReadFailed { id: TransientFileId, reason: String },
    /// Deleting a stored payload failed.
    ReleaseFailed { id: TransientFileId, reason: String },
    /// The handle does not refer to a stored payload.
    NotFound { id: TransientFileId },
}

impl fmt::Display for TransientStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DirectoryUnavailable { path, reason } => {
                write!(f, "scratch directory {path} unavailable: {reason}")
            }
            Self::DownloadFailed { url, reason } => {
                write!(f, "download of {url} failed: {reason}")
            }
            Self::WriteFailed { id, reason } => write!(f, "writing {id} failed: {reason}"),
            Self::ReadFailed { id, reason } => write!(f, "reading {id} failed: {reason}"),
            Self::ReleaseFailed { id, reason } => write!(f, "releasing {id} failed: {reason}"),
            Self::NotFound { id } => write!(f, "transient file not found: {id}"),
        }
    }
}

impl std::error::Error for TransientStoreError {}
