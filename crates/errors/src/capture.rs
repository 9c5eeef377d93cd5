//! File capture error types
//!
//! Only root-level failures abort a capture. Per-file read failures are
//! tolerated by the capture service itself and never appear here.

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum CaptureError {
    #[error("capture root not found: {path}")]
    RootNotFound { path: String },

    #[error("capture root is not a directory: {path}")]
    RootNotADirectory { path: String },

    #[error("failed to enumerate {path}: {message}")]
    EnumerationFailed { path: String, message: String },
}

impl UserFacingError for CaptureError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::RootNotFound { .. } | Self::RootNotADirectory { .. } => {
                Some("Check the package install location exists before capturing it.")
            }
            Self::EnumerationFailed { .. } => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::EnumerationFailed { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        match self {
            Self::RootNotFound { .. } => Some("capture.root_not_found"),
            Self::RootNotADirectory { .. } => Some("capture.root_not_a_directory"),
            Self::EnumerationFailed { .. } => Some("capture.enumeration_failed"),
        }
    }
}
