//! Message shapes published by the execution and capture components
//!
//! Concrete types are the routing keys on the bus, so each observable
//! condition gets its own struct. All shapes are serde-friendly for
//! downstream audit sinks.

use pakt_types::ExecutionResult;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Published immediately before an external process is spawned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeforeExecution {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

/// Published after a spawned process has completed or been terminated.
/// Not published when the process could not be started at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AfterExecution {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub result: ExecutionResult,
}

/// Warning published when a file's checksum could not be computed during
/// capture because another process held the file locked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedFileWarning {
    pub path: PathBuf,
    /// OS error text from the failed open/read
    pub os_error: String,
}
