//! Conversation core for chat-relay.
//!
//! This crate provides:
//!
//! - **Session Store**: per-conversation turn history, seeded with the persona
//! - **Events**: inbound text/voice/reset events and outbound replies
//! - **Turn Dispatcher**: the transcribe/append/complete/reply pipeline

pub mod dispatch;
pub mod error;
pub mod event;
pub mod locks;
pub mod session;
pub mod turn;

pub use dispatch::{
    DispatchConfig, RESET_REPLY, TurnDispatcher, TurnFailure, TurnOutcome, TurnStage,
};
pub use error::SessionError;
pub use event::{InboundEvent, InboundKind, OutboundEvent, RESET_COMMAND};
pub use locks::ConversationLocks;
pub use session::{InMemorySessionStore, Session, SessionStore};
pub use turn::{Role, Turn};
