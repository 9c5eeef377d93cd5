#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Host configuration for the pakt execution core
//!
//! Loaded from a TOML file by the composition root and handed to the
//! components that need it; never read from ambient global state. Every
//! field has a default so a missing file means default behavior, not an
//! error.

use pakt_errors::{ConfigError, Error};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Configuration consumed by the execution engine
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct CoreConfig {
    /// Directories of host-provided tools, prepended to a child process's
    /// search path when a request asks for a widened search path.
    #[serde(default)]
    pub tool_paths: Vec<PathBuf>,

    /// Timeout applied to executions whose request does not set one.
    /// `None` means no engine-level ceiling.
    #[serde(default)]
    pub default_timeout_secs: Option<u64>,
}

impl CoreConfig {
    /// Load configuration from a TOML file.
    ///
    /// A missing file yields the defaults; any other read failure or a
    /// malformed file is an error.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadFailed` if the file exists but cannot be
    /// read, or `ConfigError::ParseError` if it is not valid TOML.
    pub async fn load(path: &Path) -> Result<Self, Error> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError::ReadFailed {
                    path: path.display().to_string(),
                    message: e.to_string(),
                }
                .into());
            }
        };

        toml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                message: e.to_string(),
            }
            .into()
        })
    }
}
