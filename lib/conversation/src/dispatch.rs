//! Turn dispatch.
//!
//! A turn moves through `Received -> (Transcribing) -> Appending ->
//! Completing -> Replying -> Done`. Any stage can end the turn in
//! `Failed(stage)`, in which case the conversation receives the stage's
//! error message instead of a reply.
//!
//! Turns for the same conversation run one at a time; see
//! [`ConversationLocks`].

use crate::event::{InboundEvent, OutboundEvent};
use crate::locks::ConversationLocks;
use crate::session::SessionStore;
use crate::turn::Turn;
use chat_relay_ai::{AudioClip, ChatMessage, CompletionBackend, TranscriptionBackend};
use chat_relay_core::ConversationId;
use chat_relay_integration::{
    ChatActivity, ChatTransport, FileReference, TransientFile, TransientStore, TransportError,
};
use rootcause::prelude::Report;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Reply sent after a reset.
pub const RESET_REPLY: &str = "Conversation started.";

/// Upper bounds on the external calls of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Bound on one transcription call.
    pub transcription_timeout: Duration,
    /// Bound on one completion call.
    pub completion_timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            transcription_timeout: Duration::from_secs(60),
            completion_timeout: Duration::from_secs(120),
        }
    }
}

/// A stage of the turn pipeline that can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TurnStage {
    /// Downloading and transcribing a voice clip.
    Transcribing,
    /// Recording the user's turn.
    Appending,
    /// Requesting the reply.
    Completing,
    /// Recording and delivering the reply.
    Replying,
}

impl TurnStage {
    /// The message the user sees when this stage fails.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Transcribing => "Error transcribing audio.",
            Self::Appending | Self::Completing | Self::Replying => {
                "Error processing your message."
            }
        }
    }
}

impl fmt::Display for TurnStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Transcribing => "transcribing",
            Self::Appending => "appending",
            Self::Completing => "completing",
            Self::Replying => "replying",
        })
    }
}

/// A failed stage and what went wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnFailure {
    /// The stage that failed.
    pub stage: TurnStage,
    /// Rendered cause.
    pub reason: String,
}

impl TurnFailure {
    fn new(stage: TurnStage, cause: impl fmt::Display) -> Self {
        Self {
            stage,
            reason: cause.to_string(),
        }
    }

    fn timed_out(stage: TurnStage, after: Duration) -> Self {
        Self {
            stage,
            reason: format!("timed out after {}s", after.as_secs_f32()),
        }
    }
}

impl fmt::Display for TurnFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.reason)
    }
}

impl std::error::Error for TurnFailure {}

/// How a turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The session was reset.
    Reset,
    /// A reply was recorded and delivered.
    Replied { reply: String },
    /// The turn failed; the stage's error message was sent.
    Failed { stage: TurnStage },
}

/// Runs inbound events through the turn pipeline.
///
/// Cheap to clone; clones share the session store, the adapters and the
/// per-conversation locks.
#[derive(Clone)]
pub struct TurnDispatcher {
    sessions: Arc<dyn SessionStore>,
    completion: Arc<dyn CompletionBackend>,
    transcription: Arc<dyn TranscriptionBackend>,
    transport: Arc<dyn ChatTransport>,
    transient: Arc<dyn TransientStore>,
    locks: Arc<ConversationLocks>,
    config: DispatchConfig,
}

impl TurnDispatcher {
    /// Creates a dispatcher with default timeouts.
    #[must_use]
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        completion: Arc<dyn CompletionBackend>,
        transcription: Arc<dyn TranscriptionBackend>,
        transport: Arc<dyn ChatTransport>,
        transient: Arc<dyn TransientStore>,
    ) -> Self {
        Self {
            sessions,
            completion,
            transcription,
            transport,
            transient,
            locks: Arc::new(ConversationLocks::new()),
            config: DispatchConfig::default(),
        }
    }

    /// Replaces the timeouts.
    #[must_use]
    pub fn with_config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the session store.
    #[must_use]
    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    /// Handles one inbound event.
    ///
    /// Never fails: every stage failure is reported to the conversation and
    /// returned as [`TurnOutcome::Failed`].
    #[instrument(skip_all, fields(conversation_id = %event.conversation_id(), kind = %event.kind()))]
    pub async fn dispatch(&self, event: InboundEvent) -> TurnOutcome {
        let conversation_id = event.conversation_id();
        let _turn = self.locks.acquire(conversation_id).await;

        let result = match event {
            InboundEvent::Reset { conversation_id } => {
                self.reset(conversation_id).await;
                return TurnOutcome::Reset;
            }
            InboundEvent::Text {
                conversation_id,
                text,
            } => self.run_turn(conversation_id, text).await,
            InboundEvent::Voice {
                conversation_id,
                file,
            } => match self.transcribe(conversation_id, &file).await {
                Ok(text) => self.run_turn(conversation_id, text).await,
                Err(failure) => Err(failure),
            },
        };

        match result {
            Ok(reply) => TurnOutcome::Replied { reply },
            Err(failure) => {
                self.report_failure(conversation_id, &failure).await;
                TurnOutcome::Failed {
                    stage: failure.stage,
                }
            }
        }
    }

    async fn reset(&self, conversation_id: ConversationId) {
        self.sessions.reset(conversation_id).await;
        if let Err(e) = self
            .deliver(OutboundEvent::new(conversation_id, RESET_REPLY))
            .await
        {
            warn!(%conversation_id, error = %e, "failed to confirm reset");
        }
    }

    /// Appending, Completing and Replying.
    async fn run_turn(
        &self,
        conversation_id: ConversationId,
        text: String,
    ) -> Result<String, TurnFailure> {
        let prior_len = self.sessions.ensure_len(conversation_id).await;
        let len = self
            .sessions
            .append(conversation_id, Turn::user(text))
            .await
            .map_err(|e| TurnFailure::new(TurnStage::Appending, e))?;
        debug!(%conversation_id, prior_len, history_len = len, "user turn recorded");

        let reply = self.complete(conversation_id).await?;

        self.sessions
            .append(conversation_id, Turn::assistant(reply.clone()))
            .await
            .map_err(|e| TurnFailure::new(TurnStage::Replying, e))?;
        self.deliver(OutboundEvent::new(conversation_id, reply.clone()))
            .await
            .map_err(|e| TurnFailure::new(TurnStage::Replying, e))?;
        info!(%conversation_id, reply_len = reply.len(), "reply delivered");
        Ok(reply)
    }

    async fn complete(&self, conversation_id: ConversationId) -> Result<String, TurnFailure> {
        const STAGE: TurnStage = TurnStage::Completing;

        self.notify_typing(conversation_id).await;
        let history = self
            .sessions
            .history(conversation_id)
            .await
            .map_err(|e| TurnFailure::new(STAGE, e))?;
        let messages: Vec<ChatMessage> = history.iter().map(Turn::to_chat_message).collect();

        let timeout = self.config.completion_timeout;
        match tokio::time::timeout(timeout, self.completion.complete(&messages)).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(e)) => Err(TurnFailure::new(STAGE, e)),
            Err(_) => Err(TurnFailure::timed_out(STAGE, timeout)),
        }
    }

    /// Resolves, downloads and transcribes a voice clip.
    ///
    /// The downloaded payload is released exactly once whether or not
    /// transcription succeeds.
    async fn transcribe(
        &self,
        conversation_id: ConversationId,
        file: &FileReference,
    ) -> Result<String, TurnFailure> {
        const STAGE: TurnStage = TurnStage::Transcribing;

        self.notify_typing(conversation_id).await;
        let url = self
            .transport
            .resolve_file_url(file)
            .await
            .map_err(|e| TurnFailure::new(STAGE, e))?;
        let stored = self
            .transient
            .materialize(&url)
            .await
            .map_err(|e| TurnFailure::new(STAGE, e))?;

        let result = self.transcribe_stored(&stored).await;

        let id = stored.id();
        if let Err(e) = self.transient.release(stored).await {
            warn!(%conversation_id, file = %id, error = %e, "failed to release voice payload");
        }

        let text = result?;
        debug!(%conversation_id, transcript_len = text.len(), "voice transcribed");
        Ok(text)
    }

    async fn transcribe_stored(&self, stored: &TransientFile) -> Result<String, TurnFailure> {
        const STAGE: TurnStage = TurnStage::Transcribing;

        let bytes = self
            .transient
            .open_for_read(stored)
            .await
            .map_err(|e| TurnFailure::new(STAGE, e))?;
        let clip = AudioClip::ogg(bytes, stored.file_name());

        let timeout = self.config.transcription_timeout;
        match tokio::time::timeout(timeout, self.transcription.transcribe(clip)).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(TurnFailure::new(STAGE, e)),
            Err(_) => Err(TurnFailure::timed_out(STAGE, timeout)),
        }
    }

    async fn deliver(&self, event: OutboundEvent) -> Result<(), Report<TransportError>> {
        self.transport
            .send_message(event.conversation_id, &event.text)
            .await
    }

    async fn notify_typing(&self, conversation_id: ConversationId) {
        if let Err(e) = self
            .transport
            .notify_activity(conversation_id, ChatActivity::Typing)
            .await
        {
            warn!(%conversation_id, error = %e, "failed to send typing indicator");
        }
    }

    async fn report_failure(&self, conversation_id: ConversationId, failure: &TurnFailure) {
        error!(%conversation_id, stage = %failure.stage, error = %failure.reason, "turn failed");
        if let Err(e) = self
            .deliver(OutboundEvent::new(
                conversation_id,
                failure.stage.user_message(),
            ))
            .await
        {
            warn!(%conversation_id, error = %e, "failed to deliver error message");
        }
    }
}
