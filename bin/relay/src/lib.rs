//! chat-relay process.
//!
//! Wires the Telegram client, the model-service clients, the transient
//! store and the session store into a [`TurnDispatcher`], then long-polls
//! for updates until shutdown.

pub mod config;
pub mod error;
pub mod poller;

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::poller::Poller;
use chat_relay_ai::OpenAiClient;
use chat_relay_conversation::{InMemorySessionStore, TurnDispatcher};
use chat_relay_integration::{FsTransientStore, TelegramClient};
use rootcause::prelude::Report;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Bound on downloading one voice payload.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Builds every component and runs the poll loop until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if a component cannot be constructed. Per-turn failures
/// are handled inside the dispatcher and never end the loop.
pub async fn run(
    config: RelayConfig,
    shutdown: impl Future<Output = ()>,
) -> Result<(), Report<RelayError>> {
    let persona = config.persona.resolve().await?;

    let telegram = Arc::new(
        TelegramClient::new(config.telegram())
            .map_err(|e| startup_failed("telegram client", e))?,
    );
    let completion = OpenAiClient::completion(config.completion())
        .map_err(|e| startup_failed("completion client", e))?;
    let transcription = OpenAiClient::transcription(config.transcription())
        .map_err(|e| startup_failed("transcription client", e))?;
    let transient = FsTransientStore::open(&config.storage.temp_dir, DOWNLOAD_TIMEOUT)
        .await
        .map_err(|e| startup_failed("transient store", e))?;
    info!(
        completion_model = completion.model(),
        transcription_model = transcription.model(),
        temp_dir = %transient.dir().display(),
        "components ready"
    );

    let dispatcher = TurnDispatcher::new(
        Arc::new(InMemorySessionStore::new(persona)),
        Arc::new(completion),
        Arc::new(transcription),
        telegram.clone(),
        Arc::new(transient),
    )
    .with_config(config.dispatch());

    Poller::new(telegram.clone(), telegram, dispatcher)
        .run(shutdown)
        .await;
    info!("relay stopped");
    Ok(())
}

fn startup_failed(component: &'static str, cause: impl std::fmt::Display) -> RelayError {
    RelayError::Startup {
        component,
        reason: cause.to_string(),
    }
}
