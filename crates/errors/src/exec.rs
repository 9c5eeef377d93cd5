//! Process execution error types
//!
//! These cover the conditions that are fatal to a single `execute` call.
//! A process that starts and exits non-zero is not an error at this layer;
//! it is reported through the execution result.

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum ExecError {
    #[error("failed to start {program}: {message}")]
    StartFailed { program: String, message: String },

    #[error("elevation denied for {program}: {message}")]
    ElevationDenied { program: String, message: String },

    #[error("elevation is not supported on this platform")]
    ElevationUnsupported,

    #[error("output stream capture failed for {program}: {message}")]
    OutputCaptureFailed { program: String, message: String },
}

impl UserFacingError for ExecError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::StartFailed { .. } => {
                Some("Verify the program exists and is executable on this machine.")
            }
            Self::ElevationDenied { .. } => {
                Some("Re-run with credentials that can elevate, or drop the elevation flag.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::OutputCaptureFailed { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        match self {
            Self::StartFailed { .. } => Some("exec.start_failed"),
            Self::ElevationDenied { .. } => Some("exec.elevation_denied"),
            Self::ElevationUnsupported => Some("exec.elevation_unsupported"),
            Self::OutputCaptureFailed { .. } => Some("exec.output_capture_failed"),
        }
    }
}
