//! Core types for the chat-relay bot.
//!
//! This crate provides the identifiers shared by the adapter crates and
//! the conversation dispatcher.

pub mod id;

pub use id::{ConversationId, ParseIdError, TransientFileId, TurnId};
