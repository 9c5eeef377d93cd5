//! Execution request value type

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Callback invoked with each line of a process output stream as it arrives
pub type LineHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// How a request relates to the engine's default timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimeoutPolicy {
    /// No explicit choice: the engine's configured default applies
    Inherit,
    /// Explicitly unbounded, even if the engine has a default
    Never,
    /// Terminate after this duration
    After(Duration),
}

/// One external process invocation: program, arguments, working directory
/// and execution policy. Built by the orchestrator per call, consumed by
/// [`crate::ExecutionEngine::execute`], never reused.
#[derive(Clone)]
pub struct ExecutionRequest {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    elevate: bool,
    widen_search_path: bool,
    timeout: TimeoutPolicy,
    on_stdout: Option<LineHandler>,
    on_stderr: Option<LineHandler>,
}

impl ExecutionRequest {
    /// Create a request for the given program
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            elevate: false,
            widen_search_path: false,
            timeout: TimeoutPolicy::Inherit,
            on_stdout: None,
            on_stderr: None,
        }
    }

    /// Add an argument
    pub fn arg<S: AsRef<str>>(&mut self, arg: S) -> &mut Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for arg in args {
            self.args.push(arg.as_ref().to_string());
        }
        self
    }

    /// Set the working directory
    pub fn current_dir<P: Into<PathBuf>>(&mut self, dir: P) -> &mut Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Terminate the process if it has not exited after `limit`
    pub fn timeout(&mut self, limit: Duration) -> &mut Self {
        self.timeout = TimeoutPolicy::After(limit);
        self
    }

    /// Run without any timeout, opting out of the engine default as well
    pub fn no_timeout(&mut self) -> &mut Self {
        self.timeout = TimeoutPolicy::Never;
        self
    }

    /// Request the process be started with elevated privileges
    pub fn elevate(&mut self) -> &mut Self {
        self.elevate = true;
        self
    }

    /// Prepend the host's configured tool directories to the child's
    /// executable search path. The calling process environment is never
    /// modified.
    pub fn widen_search_path(&mut self) -> &mut Self {
        self.widen_search_path = true;
        self
    }

    /// Receive each standard output line as it arrives
    pub fn on_stdout(&mut self, handler: LineHandler) -> &mut Self {
        self.on_stdout = Some(handler);
        self
    }

    /// Receive each standard error line as it arrives
    pub fn on_stderr(&mut self, handler: LineHandler) -> &mut Self {
        self.on_stderr = Some(handler);
        self
    }

    /// Get the program name
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Get the arguments
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Get the working directory
    pub fn get_current_dir(&self) -> Option<&PathBuf> {
        self.working_dir.as_ref()
    }

    /// Whether elevation was requested
    pub fn is_elevated(&self) -> bool {
        self.elevate
    }

    /// Whether a widened search path was requested
    pub fn wants_widened_search_path(&self) -> bool {
        self.widen_search_path
    }

    pub(crate) fn timeout_policy(&self) -> TimeoutPolicy {
        self.timeout
    }

    pub(crate) fn stdout_handler(&self) -> Option<LineHandler> {
        self.on_stdout.clone()
    }

    pub(crate) fn stderr_handler(&self) -> Option<LineHandler> {
        self.on_stderr.clone()
    }
}

impl fmt::Debug for ExecutionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionRequest")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("working_dir", &self.working_dir)
            .field("elevate", &self.elevate)
            .field("widen_search_path", &self.widen_search_path)
            .field("timeout", &self.timeout)
            .field("on_stdout", &self.on_stdout.as_ref().map(|_| ".."))
            .field("on_stderr", &self.on_stderr.as_ref().map(|_| ".."))
            .finish()
    }
}
