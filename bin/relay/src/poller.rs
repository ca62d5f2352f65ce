//! Long-polling loop.
//!
//! Fetches updates from the Bot API, turns each usable message into an
//! [`InboundEvent`] and hands it to the dispatcher on its own task.

use chat_relay_conversation::{InboundEvent, TurnDispatcher, TurnOutcome};
use chat_relay_core::ConversationId;
use chat_relay_integration::{ChatTransport, FileReference, TelegramClient, Update};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Pause after a failed `getUpdates` before polling again.
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Converts an update into an inbound event.
///
/// Updates without a message, and messages carrying neither text nor a
/// voice clip, yield `None`.
#[must_use]
pub fn inbound_event(update: &Update) -> Option<InboundEvent> {
    let message = update.message.as_ref()?;
    let conversation_id = ConversationId::new(message.chat.id);

    if let Some(voice) = &message.voice {
        return Some(InboundEvent::voice(
            conversation_id,
            FileReference::new(voice.file_id.clone()),
        ));
    }
    let text = message.text.as_deref()?;
    Some(InboundEvent::from_text(conversation_id, text))
}

/// Next `getUpdates` offset after seeing `updates`.
fn next_offset(current: Option<i64>, updates: &[Update]) -> Option<i64> {
    updates
        .iter()
        .map(|update| update.update_id + 1)
        .max()
        .max(current)
}

/// Polls for updates and spawns one dispatch task per inbound event.
pub struct Poller {
    client: Arc<TelegramClient>,
    transport: Arc<dyn ChatTransport>,
    dispatcher: TurnDispatcher,
    tasks: JoinSet<()>,
}

impl Poller {
    /// Creates a poller.
    ///
    /// `transport` receives the fallback message when a dispatch task
    /// panics; normally it is the same client.
    #[must_use]
    pub fn new(
        client: Arc<TelegramClient>,
        transport: Arc<dyn ChatTransport>,
        dispatcher: TurnDispatcher,
    ) -> Self {
        Self {
            client,
            transport,
            dispatcher,
            tasks: JoinSet::new(),
        }
    }

    /// Polls until `shutdown` resolves, then waits for in-flight turns.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        let mut offset = None;

        info!("polling for updates");
        loop {
            // Only shutdown may interrupt an open long poll; finished turns
            // are reaped between polls.
            let polled = tokio::select! {
                () = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }
                polled = self.client.get_updates(offset) => polled,
            };

            match polled {
                Ok(updates) => {
                    offset = next_offset(offset, &updates);
                    for update in &updates {
                        match inbound_event(update) {
                            Some(event) => self.spawn(event),
                            None => debug!(update_id = update.update_id, "ignoring update"),
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "getUpdates failed; retrying");
                    tokio::select! {
                        () = &mut shutdown => {
                            info!("shutdown requested");
                            break;
                        }
                        () = tokio::time::sleep(RETRY_DELAY) => {}
                    }
                }
            }
            self.reap_finished();
        }

        let in_flight = self.tasks.len();
        if in_flight > 0 {
            info!(in_flight, "waiting for in-flight turns");
        }
        while let Some(joined) = self.tasks.join_next().await {
            log_join_error(joined);
        }
    }

    fn reap_finished(&mut self) {
        while let Some(joined) = self.tasks.try_join_next() {
            log_join_error(joined);
        }
    }

    fn spawn(&mut self, event: InboundEvent) {
        let dispatcher = self.dispatcher.clone();
        let transport = self.transport.clone();
        self.tasks
            .spawn(supervise(dispatcher, transport, event));
    }
}

fn log_join_error(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        error!(error = %e, "dispatch supervisor failed");
    }
}

/// Runs one turn on its own task and reports a panic to the conversation.
pub async fn supervise(
    dispatcher: TurnDispatcher,
    transport: Arc<dyn ChatTransport>,
    event: InboundEvent,
) {
    let conversation_id = event.conversation_id();
    let kind = event.kind();

    let turn = tokio::spawn(async move { dispatcher.dispatch(event).await });
    match turn.await {
        Ok(TurnOutcome::Failed { stage }) => {
            debug!(%conversation_id, %stage, "turn ended in failure");
        }
        Ok(outcome) => debug!(%conversation_id, ?outcome, "turn finished"),
        Err(e) if e.is_panic() => {
            error!(%conversation_id, %kind, "turn panicked");
            if let Err(e) = transport
                .send_message(conversation_id, kind.unexpected_failure_message())
                .await
            {
                warn!(%conversation_id, error = %e, "failed to deliver fallback message");
            }
        }
        Err(e) => warn!(%conversation_id, error = %e, "turn cancelled"),
    }
}
