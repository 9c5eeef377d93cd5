//! Configuration error types

use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to read config file {path}: {message}")]
    ReadFailed { path: String, message: String },

    #[error("invalid config: {message}")]
    ParseError { message: String },
}

impl ConfigError {
    /// Stable error code for analytics / structured reporting.
    #[must_use]
    pub fn user_code(&self) -> Option<&'static str> {
        match self {
            Self::ReadFailed { .. } => Some("config.read_failed"),
            Self::ParseError { .. } => Some("config.parse_error"),
        }
    }
}
