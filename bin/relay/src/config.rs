//! Relay configuration.
//!
//! Loaded once at startup via the `config` crate from environment
//! variables, with `__` separating sections from keys
//! (`TELEGRAM__TOKEN`, `COMPLETION__MODEL`, `PERSONA__FILE`, ...).

use crate::error::RelayError;
use chat_relay_ai::ProviderConfig;
use chat_relay_conversation::DispatchConfig;
use chat_relay_integration::TelegramConfig;
use rootcause::prelude::Report;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Complete relay configuration.
#[derive(Debug, Deserialize)]
pub struct RelayConfig {
    /// Bot API access.
    pub telegram: TelegramSettings,
    /// Chat completion service.
    pub completion: CompletionSettings,
    /// Speech-to-text service.
    pub transcription: TranscriptionSettings,
    /// System prompt every conversation starts with.
    #[serde(default)]
    pub persona: PersonaSettings,
    /// Scratch storage for voice downloads.
    #[serde(default)]
    pub storage: StorageSettings,
}

/// A credential that never shows up in `Debug` output.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Returns the underlying value.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

/// Bot API settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramSettings {
    /// Bot token.
    pub token: Secret,

    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,

    /// Long-poll timeout passed to `getUpdates`, in seconds.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
}

/// Chat completion service settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionSettings {
    pub api_key: Secret,

    #[serde(default = "default_completion_base_url")]
    pub base_url: String,

    #[serde(default = "default_completion_model")]
    pub model: String,

    /// Bound on one completion call, in seconds.
    #[serde(default = "default_completion_timeout_secs")]
    pub timeout_secs: u64,
}

/// Speech-to-text service settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionSettings {
    pub api_key: Secret,

    #[serde(default = "default_transcription_base_url")]
    pub base_url: String,

    #[serde(default = "default_transcription_model")]
    pub model: String,

    /// Bound on one transcription call, in seconds.
    #[serde(default = "default_transcription_timeout_secs")]
    pub timeout_secs: u64,
}

/// Where the persona prompt comes from.
///
/// Exactly one of `prompt` and `file` must be set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonaSettings {
    /// Inline prompt text.
    pub prompt: Option<String>,
    /// Path to a file holding the prompt.
    pub file: Option<PathBuf>,
}

/// Scratch storage settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Directory voice payloads are downloaded into.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,
}

fn default_telegram_api_base() -> String {
    chat_relay_integration::telegram::DEFAULT_API_BASE.to_string()
}

fn default_poll_timeout_secs() -> u64 {
    30
}

fn default_completion_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_completion_model() -> String {
    "deepseek/deepseek-chat-v3.1".to_string()
}

fn default_completion_timeout_secs() -> u64 {
    120
}

fn default_transcription_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_transcription_model() -> String {
    "whisper-1".to_string()
}

fn default_transcription_timeout_secs() -> u64 {
    60
}

fn default_temp_dir() -> PathBuf {
    PathBuf::from("./tmp")
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            temp_dir: default_temp_dir(),
        }
    }
}

impl RelayConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, Report<RelayError>> {
        Self::from_builder(config::Config::builder().add_source(
            config::Environment::default()
                .separator("__")
                .try_parsing(true),
        ))
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, Report<RelayError>> {
        let config = builder
            .build()
            .map_err(RelayError::from)?
            .try_deserialize()
            .map_err(RelayError::from)?;
        Ok(config)
    }

    /// Bot API client settings.
    #[must_use]
    pub fn telegram(&self) -> TelegramConfig {
        TelegramConfig::new(self.telegram.token.expose())
            .with_api_base(self.telegram.api_base.clone())
            .with_poll_timeout(Duration::from_secs(self.telegram.poll_timeout_secs))
    }

    /// Completion provider settings.
    #[must_use]
    pub fn completion(&self) -> ProviderConfig {
        let c = &self.completion;
        ProviderConfig::new(c.base_url.clone(), c.api_key.expose(), c.model.clone())
            .with_timeout(Duration::from_secs(c.timeout_secs))
    }

    /// Transcription provider settings.
    #[must_use]
    pub fn transcription(&self) -> ProviderConfig {
        let t = &self.transcription;
        ProviderConfig::new(t.base_url.clone(), t.api_key.expose(), t.model.clone())
            .with_timeout(Duration::from_secs(t.timeout_secs))
    }

    /// Dispatcher-level bounds on the external calls.
    #[must_use]
    pub fn dispatch(&self) -> DispatchConfig {
        DispatchConfig {
            transcription_timeout: Duration::from_secs(self.transcription.timeout_secs),
            completion_timeout: Duration::from_secs(self.completion.timeout_secs),
        }
    }
}

impl PersonaSettings {
    /// Resolves the prompt text, reading `file` if that is the source.
    ///
    /// # Errors
    ///
    /// Returns an error if both or neither source is set, the file cannot
    /// be read, or the prompt is blank.
    pub async fn resolve(&self) -> Result<String, Report<RelayError>> {
        let persona_error = |reason: String| RelayError::Persona { reason };

        let prompt = match (&self.prompt, &self.file) {
            (Some(prompt), None) => prompt.clone(),
            (None, Some(path)) => tokio::fs::read_to_string(path)
                .await
                .map_err(|e| persona_error(format!("{}: {e}", path.display())))?,
            (Some(_), Some(_)) => {
                return Err(persona_error("set PERSONA__PROMPT or PERSONA__FILE, not both".into()).into());
            }
            (None, None) => {
                return Err(persona_error("set PERSONA__PROMPT or PERSONA__FILE".into()).into());
            }
        };

        if prompt.trim().is_empty() {
            return Err(persona_error("prompt is empty".into()).into());
        }
        Ok(prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> config::ConfigBuilder<config::builder::DefaultState> {
        config::Config::builder()
            .set_override("telegram.token", "123:bot-token")
            .expect("override")
            .set_override("completion.api_key", "sk-completion")
            .expect("override")
            .set_override("transcription.api_key", "sk-transcription")
            .expect("override")
    }

    #[test]
    fn defaults_apply() {
        let config = RelayConfig::from_builder(builder()).expect("load");

        assert_eq!(config.telegram.api_base, "https://api.telegram.org");
        assert_eq!(config.telegram.poll_timeout_secs, 30);
        assert_eq!(config.completion.base_url, "https://openrouter.ai/api/v1");
        assert_eq!(config.completion.model, "deepseek/deepseek-chat-v3.1");
        assert_eq!(config.completion.timeout_secs, 120);
        assert_eq!(config.transcription.base_url, "https://api.openai.com/v1");
        assert_eq!(config.transcription.model, "whisper-1");
        assert_eq!(config.transcription.timeout_secs, 60);
        assert_eq!(config.storage.temp_dir, PathBuf::from("./tmp"));
        assert!(config.persona.prompt.is_none());
    }

    #[test]
    fn missing_token_is_config_error() {
        let result = RelayConfig::from_builder(
            config::Config::builder()
                .set_override("completion.api_key", "k")
                .expect("override")
                .set_override("transcription.api_key", "k")
                .expect("override"),
        );

        let err = result.unwrap_err();
        assert!(matches!(err.current_context(), RelayError::Config { .. }));
    }

    #[test]
    fn overrides_are_respected() {
        let config = RelayConfig::from_builder(
            builder()
                .set_override("completion.model", "gpt-4o-mini")
                .expect("override")
                .set_override("completion.timeout_secs", 5)
                .expect("override"),
        )
        .expect("load");

        let dispatch = config.dispatch();
        assert_eq!(config.completion().model, "gpt-4o-mini");
        assert_eq!(dispatch.completion_timeout, Duration::from_secs(5));
        assert_eq!(dispatch.transcription_timeout, Duration::from_secs(60));
    }

    #[test]
    fn secrets_are_redacted_in_debug() {
        let config = RelayConfig::from_builder(builder()).expect("load");
        let debug = format!("{config:?}");

        assert!(!debug.contains("bot-token"));
        assert!(!debug.contains("sk-completion"));
        assert!(debug.contains("<redacted>"));
    }

    #[tokio::test]
    async fn persona_from_inline_prompt() {
        let persona = PersonaSettings {
            prompt: Some("Be brief.".to_string()),
            file: None,
        };
        assert_eq!(persona.resolve().await.expect("resolve"), "Be brief.");
    }

    #[tokio::test]
    async fn persona_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("persona.txt");
        std::fs::write(&path, "You answer in haiku.\n").expect("write");
        let persona = PersonaSettings {
            prompt: None,
            file: Some(path),
        };

        assert_eq!(
            persona.resolve().await.expect("resolve"),
            "You answer in haiku.\n"
        );
    }

    #[tokio::test]
    async fn persona_requires_exactly_one_source() {
        let neither = PersonaSettings::default();
        let both = PersonaSettings {
            prompt: Some("a".to_string()),
            file: Some(PathBuf::from("b")),
        };

        assert!(neither.resolve().await.is_err());
        assert!(both.resolve().await.is_err());
    }

    #[tokio::test]
    async fn blank_persona_is_rejected() {
        let persona = PersonaSettings {
            prompt: Some("   ".to_string()),
            file: None,
        };

        let err = persona.resolve().await.unwrap_err();
        assert!(matches!(err.current_context(), RelayError::Persona { .. }));
    }
}
