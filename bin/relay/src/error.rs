//! Startup errors for the relay process.

use std::fmt;

/// Errors that stop the relay before it starts polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// Configuration is missing or malformed.
    Config { reason: String },
    /// The persona prompt could not be resolved.
    Persona { reason: String },
    /// A component could not be constructed.
    Startup { component: &'static str, reason: String },
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { reason } => write!(f, "invalid configuration: {reason}"),
            Self::Persona { reason } => write!(f, "persona prompt unavailable: {reason}"),
            Self::Startup { component, reason } => {
                write!(f, "failed to start {component}: {reason}")
            }
        }
    }
}

impl std::error::Error for RelayError {}

impl From<config::ConfigError> for RelayError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config {
            reason: e.to_string(),
        }
    }
}
