//! Execution result reporting
//!
//! A process that ran to completion is always represented as a result, even
//! when it failed or was terminated; only "could not be started at all" is
//! an error elsewhere in the system.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reserved exit code reported when a process was terminated because its
/// configured timeout expired.
pub const TIMEOUT_EXIT_CODE: i32 = -1;

/// Base added to the signal number when a Unix process dies to a signal
/// instead of exiting, following shell convention (`128 + signo`).
pub const SIGNAL_EXIT_BASE: i32 = 128;

/// Outcome of one external process execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Exit code of the process, or [`TIMEOUT_EXIT_CODE`] when it was
    /// terminated by the engine.
    pub exit_code: i32,
    /// Wall-clock duration of the run. Reflects the configured timeout when
    /// the run timed out.
    pub elapsed: Duration,
    /// Whether termination was due to timeout rather than natural exit.
    pub timed_out: bool,
}

impl ExecutionResult {
    /// Create a result for a process that exited on its own
    #[must_use]
    pub fn exited(exit_code: i32, elapsed: Duration) -> Self {
        Self {
            exit_code,
            elapsed,
            timed_out: false,
        }
    }

    /// Create a result for a process the engine terminated at its timeout
    #[must_use]
    pub fn timed_out(timeout: Duration) -> Self {
        Self {
            exit_code: TIMEOUT_EXIT_CODE,
            elapsed: timeout,
            timed_out: true,
        }
    }

    /// True when the process exited normally with a zero exit code
    #[must_use]
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_requires_zero_exit() {
        assert!(ExecutionResult::exited(0, Duration::from_secs(1)).success());
        assert!(!ExecutionResult::exited(2, Duration::from_secs(1)).success());
    }

    #[test]
    fn test_timed_out_is_never_success() {
        let result = ExecutionResult::timed_out(Duration::from_secs(30));
        assert!(!result.success());
        assert!(result.timed_out);
        assert_eq!(result.exit_code, TIMEOUT_EXIT_CODE);
        assert_eq!(result.elapsed, Duration::from_secs(30));
    }

    #[test]
    fn test_result_serialization() {
        let result = ExecutionResult::exited(3, Duration::from_millis(250));
        let json = serde_json::to_string(&result).unwrap();
        let back: ExecutionResult = serde_json::from_str(&json).unwrap();
        assert_eq!(result, back);
    }
}
