//! External I/O for chat-relay.
//!
//! This crate provides:
//!
//! - **Chat transport**: the narrow interface the dispatcher talks to
//!   (send message, notify activity, resolve file)
//! - **Telegram client**: Bot API implementation of the transport plus
//!   long polling for inbound updates
//! - **Transient store**: scratch files for downloaded voice payloads

pub mod error;
pub mod telegram;
pub mod transient;
pub mod transport;

pub use error::{TransientStoreError, TransportError};
pub use telegram::{TelegramClient, TelegramConfig, Update};
pub use transient::{FsTransientStore, TransientFile, TransientStore};
pub use transport::{ChatActivity, ChatTransport, FileReference};
