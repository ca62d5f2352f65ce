//! Model-service adapters for chat-relay.
//!
//! This crate provides the two external AI calls the relay makes:
//!
//! - **Completion**: ordered chat history in, generated reply out
//! - **Transcription**: voice clip in, plain-text transcript out
//!
//! Both are expressed as traits so the dispatcher can be exercised with
//! in-memory fakes; [`OpenAiClient`] implements them against any
//! OpenAI-compatible HTTP endpoint.

pub mod backend;
pub mod completion;
pub mod error;
pub mod openai;
pub mod transcription;

pub use backend::{ChatMessage, ChatRole, ProviderConfig};
pub use completion::CompletionBackend;
pub use error::{CompletionError, TranscriptionError};
pub use openai::OpenAiClient;
pub use transcription::{AudioClip, TranscriptionBackend};
