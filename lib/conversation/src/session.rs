//! Conversation sessions and the session store.
//!
//! A session is the ordered history of one conversation. It always starts
//! with the persona prompt as a system turn, only ever grows by appending,
//! and can be reset back to that single system turn.

use crate::error::SessionError;
use crate::turn::Turn;
use async_trait::async_trait;
use chat_relay_core::ConversationId;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// The history of one conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    conversation_id: ConversationId,
    turns: Vec<Turn>,
    created_at: DateTime<Utc>,
    last_active_at: DateTime<Utc>,
}

impl Session {
    /// Creates a session seeded with the persona prompt.
    #[must_use]
    pub fn new(conversation_id: ConversationId, persona: &str) -> Self {
        let now = Utc::now();
        Self {
            conversation_id,
            turns: vec![Turn::system(persona)],
            created_at: now,
            last_active_at: now,
        }
    }

    /// The conversation this session belongs to.
    #[must_use]
    pub fn conversation_id(&self) -> ConversationId {
        self.conversation_id
    }

    /// Turns in chronological order.
    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Returns the number of turns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Always false; a session holds at least its system turn.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
        self.last_active_at = Utc::now();
    }
}

/// Trait for session storage.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the session for `conversation_id`, creating it if needed.
    async fn ensure(&self, conversation_id: ConversationId) -> Session;

    /// Like [`ensure`](Self::ensure), but returns only the history length
    /// instead of a copy of the session.
    async fn ensure_len(&self, conversation_id: ConversationId) -> usize;

    /// Replaces the session with a fresh one holding only the system turn.
    async fn reset(&self, conversation_id: ConversationId) -> Session;

    /// Appends a turn and returns the new history length.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFound` if `ensure` was never called.
    async fn append(
        &self,
        conversation_id: ConversationId,
        turn: Turn,
    ) -> Result<usize, Report<SessionError>>;

    /// Returns a snapshot of the session's turns.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFound` if `ensure` was never called.
    async fn history(&self, conversation_id: ConversationId) -> Result<Vec<Turn>, Report<SessionError>>;
}

/// Process-lifetime, in-memory session store.
///
/// Sessions for distinct conversations live in separate map shards, so
/// operations on one conversation do not wait on another's.
#[derive(Debug)]
pub struct InMemorySessionStore {
    persona: Arc<str>,
    sessions: DashMap<ConversationId, Session>,
}

impl InMemorySessionStore {
    /// Creates an empty store that seeds new sessions with `persona`.
    #[must_use]
    pub fn new(persona: impl Into<Arc<str>>) -> Self {
        Self {
            persona: persona.into(),
            sessions: DashMap::new(),
        }
    }

    /// The persona prompt every session starts with.
    #[must_use]
    pub fn persona(&self) -> &str {
        &self.persona
    }

    /// Number of conversations with a session.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn ensure(&self, conversation_id: ConversationId) -> Session {
        match self.sessions.entry(conversation_id) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                info!(%conversation_id, "initializing session");
                entry
                    .insert(Session::new(conversation_id, &self.persona))
                    .value()
                    .clone()
            }
        }
    }

    async fn ensure_len(&self, conversation_id: ConversationId) -> usize {
        match self.sessions.entry(conversation_id) {
            Entry::Occupied(entry) => entry.get().len(),
            Entry::Vacant(entry) => {
                info!(%conversation_id, "initializing session");
                entry
                    .insert(Session::new(conversation_id, &self.persona))
                    .len()
            }
        }
    }

    async fn reset(&self, conversation_id: ConversationId) -> Session {
        let session = Session::new(conversation_id, &self.persona);
        self.sessions.insert(conversation_id, session.clone());
        info!(%conversation_id, "session reset");
        session
    }

    async fn append(
        &self,
        conversation_id: ConversationId,
        turn: Turn,
    ) -> Result<usize, Report<SessionError>> {
        let mut session = self
            .sessions
            .get_mut(&conversation_id)
            .ok_or(SessionError::NotFound { conversation_id })?;
        let turn_id = turn.id();
        let role = turn.role();
        session.append(turn);
        let len = session.len();
        debug!(%conversation_id, turn = %turn_id, %role, history_len = len, "turn appended");
        Ok(len)
    }

    async fn history(&self, conversation_id: ConversationId) -> Result<Vec<Turn>, Report<SessionError>> {
        let session = self
            .sessions
            .get(&conversation_id)
            .ok_or(SessionError::NotFound { conversation_id })?;
        Ok(session.turns().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::turn::Role;

    const PERSONA: &str = "You are a blunt but friendly assistant.";

    fn store() -> InMemorySessionStore {
        InMemorySessionStore::new(PERSONA)
    }

    #[test]
    fn new_session_starts_with_persona() {
        let session = Session::new(ConversationId::new(1), PERSONA);

        assert_eq!(session.len(), 1);
        assert_eq!(session.turns()[0].role(), Role::System);
        assert_eq!(session.turns()[0].content(), PERSONA);
    }

    #[tokio::test]
    async fn ensure_is_idempotent() {
        let store = store();
        let id = ConversationId::new(1);

        let first = store.ensure(id).await;
        store.append(id, Turn::user("hi")).await.expect("append");
        let second = store.ensure(id).await;
        let third = store.ensure(id).await;

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 2);
        assert_eq!(third.len(), second.len());
        assert_eq!(store.session_count(), 1);
    }

    #[tokio::test]
    async fn ensure_len_creates_and_reports_length() {
        let store = store();
        let id = ConversationId::new(12);

        assert_eq!(store.ensure_len(id).await, 1);
        store.append(id, Turn::user("hi")).await.expect("append");
        assert_eq!(store.ensure_len(id).await, 2);
        assert_eq!(store.session_count(), 1);
        assert_eq!(store.history(id).await.expect("history")[0].content(), PERSONA);
    }

    #[tokio::test]
    async fn append_without_ensure_is_not_found() {
        let store = store();
        let id = ConversationId::new(9);

        let err = store.append(id, Turn::user("hi")).await.unwrap_err();

        assert_eq!(
            err.current_context(),
            &SessionError::NotFound {
                conversation_id: id
            }
        );
    }

    #[tokio::test]
    async fn history_without_ensure_is_not_found() {
        let store = store();
        assert!(store.history(ConversationId::new(3)).await.is_err());
    }

    #[tokio::test]
    async fn append_preserves_order() {
        let store = store();
        let id = ConversationId::new(2);
        store.ensure(id).await;

        store.append(id, Turn::user("one")).await.expect("append");
        store.append(id, Turn::assistant("two")).await.expect("append");
        let len = store.append(id, Turn::user("three")).await.expect("append");

        let history = store.history(id).await.expect("history");
        let contents: Vec<&str> = history.iter().map(Turn::content).collect();
        assert_eq!(len, 4);
        assert_eq!(contents, [PERSONA, "one", "two", "three"]);
    }

    #[tokio::test]
    async fn reset_yields_single_system_turn() {
        let store = store();
        let id = ConversationId::new(4);
        store.ensure(id).await;
        for i in 0..5 {
            store
                .append(id, Turn::user(format!("msg {i}")))
                .await
                .expect("append");
        }

        let session = store.reset(id).await;

        assert_eq!(session.len(), 1);
        let history = store.history(id).await.expect("history");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role(), Role::System);
        assert_eq!(history[0].content(), PERSONA);
    }

    #[tokio::test]
    async fn reset_creates_missing_session() {
        let store = store();
        let id = ConversationId::new(5);

        store.reset(id).await;

        assert_eq!(store.history(id).await.expect("history").len(), 1);
    }

    #[tokio::test]
    async fn conversations_are_isolated() {
        let store = store();
        let a = ConversationId::new(10);
        let b = ConversationId::new(11);
        store.ensure(a).await;
        store.ensure(b).await;

        store.append(a, Turn::user("for a")).await.expect("append");

        assert_eq!(store.history(a).await.expect("history").len(), 2);
        assert_eq!(store.history(b).await.expect("history").len(), 1);
    }

    #[test]
    fn session_serde_roundtrip() {
        let session = Session::new(ConversationId::new(6), PERSONA);

        let json = serde_json::to_string(&session).expect("serialize");
        let parsed: Session = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(parsed.conversation_id(), session.conversation_id());
        assert_eq!(parsed.turns(), session.turns());
    }
}
