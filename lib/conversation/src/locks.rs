//! Per-conversation turn serialization.
//!
//! At most one turn per conversation is in flight; turns for different
//! conversations proceed independently.

use chat_relay_core::ConversationId;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of per-conversation async mutexes.
#[derive(Debug, Default)]
pub struct ConversationLocks {
    locks: DashMap<ConversationId, Arc<Mutex<()>>>,
}

impl ConversationLocks {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other turn for `conversation_id` is running.
    ///
    /// The turn holds the conversation until the guard is dropped.
    pub async fn acquire(&self, conversation_id: ConversationId) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the map shard is not held across the await.
        let lock = self
            .locks
            .entry(conversation_id)
            .or_default()
            .value()
            .clone();
        lock.lock_owned().await
    }
}
