//! Process execution engine

use pakt_config::CoreConfig;
use pakt_errors::{Error, ExecError, Result};
use pakt_events::{AfterExecution, BeforeExecution, EventBus};
use pakt_types::{ExecutionResult, SIGNAL_EXIT_BASE};
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use crate::request::{ExecutionRequest, LineHandler, TimeoutPolicy};

/// Runs external processes on behalf of package operations.
///
/// The engine holds no per-call mutable state; concurrent `execute` calls
/// for different packages are safe without external locking. All shared
/// observation goes through the event bus handle given at construction.
#[derive(Clone)]
pub struct ExecutionEngine {
    bus: EventBus,
    config: CoreConfig,
}

impl ExecutionEngine {
    /// Create an engine with default configuration
    #[must_use]
    pub fn new(bus: EventBus) -> Self {
        Self::with_config(bus, CoreConfig::default())
    }

    /// Create an engine with host configuration (tool directories for the
    /// widened search path, default timeout)
    #[must_use]
    pub fn with_config(bus: EventBus, config: CoreConfig) -> Self {
        Self { bus, config }
    }

    /// Run `request` to completion.
    ///
    /// Blocking from the caller's perspective: the future resolves when the
    /// process has exited or been terminated at its timeout. Output is
    /// drained concurrently with exit waiting so a chatty process cannot
    /// deadlock the engine on a full pipe buffer. Standard input is closed.
    ///
    /// # Errors
    ///
    /// Returns `ExecError::StartFailed` when the program cannot be spawned
    /// at all, `ExecError::ElevationDenied` when elevation was requested
    /// and refused, and `ExecError::OutputCaptureFailed` if an output
    /// handler panicked. A non-zero exit, crash, or timeout is not an
    /// error; it is reported in the returned result.
    pub async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResult> {
        self.bus.publish(BeforeExecution {
            program: request.program().to_string(),
            args: request.get_args().to_vec(),
            working_dir: request.get_current_dir().cloned(),
        });

        let mut command = self.build_command(&request).await?;
        tracing::debug!(
            program = request.program(),
            args = ?request.get_args(),
            "spawning external process"
        );

        let start = Instant::now();
        let mut child = command.spawn().map_err(|e| ExecError::StartFailed {
            program: request.program().to_string(),
            message: e.to_string(),
        })?;

        let stdout_task = child
            .stdout
            .take()
            .map(|stream| drain_lines(stream, request.stdout_handler()));
        let stderr_task = child
            .stderr
            .take()
            .map(|stream| drain_lines(stream, request.stderr_handler()));

        let result = match self.effective_timeout(&request) {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => ExecutionResult::exited(exit_code(&status?), start.elapsed()),
                Err(_expired) => {
                    tracing::warn!(
                        program = request.program(),
                        timeout_secs = limit.as_secs_f64(),
                        "process exceeded timeout; terminating"
                    );
                    terminate(&mut child).await;
                    ExecutionResult::timed_out(limit)
                }
            },
            None => ExecutionResult::exited(exit_code(&child.wait().await?), start.elapsed()),
        };

        // Once the process is gone its pipes close, so both drains finish.
        for task in [stdout_task, stderr_task].into_iter().flatten() {
            task.await.map_err(|e| ExecError::OutputCaptureFailed {
                program: request.program().to_string(),
                message: e.to_string(),
            })?;
        }

        self.bus.publish(AfterExecution {
            program: request.program().to_string(),
            args: request.get_args().to_vec(),
            working_dir: request.get_current_dir().cloned(),
            result: result.clone(),
        });

        Ok(result)
    }

    async fn build_command(&self, request: &ExecutionRequest) -> Result<Command> {
        let (program, args) = if request.is_elevated() {
            elevated_invocation(request).await?
        } else {
            (
                request.program().to_string(),
                request.get_args().to_vec(),
            )
        };

        let mut command = Command::new(program);
        command.args(args);
        if let Some(dir) = request.get_current_dir() {
            command.current_dir(dir);
        }
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // The widened PATH is set on the child only; the calling process
        // environment stays untouched.
        if request.wants_widened_search_path() && !self.config.tool_paths.is_empty() {
            command.env("PATH", widened_search_path(&self.config.tool_paths)?);
        }

        // Own process group, so a timeout can take down descendants too.
        #[cfg(unix)]
        command.process_group(0);

        Ok(command)
    }

    fn effective_timeout(&self, request: &ExecutionRequest) -> Option<Duration> {
        match request.timeout_policy() {
            TimeoutPolicy::After(limit) => Some(limit),
            TimeoutPolicy::Never => None,
            TimeoutPolicy::Inherit => self.config.default_timeout_secs.map(Duration::from_secs),
        }
    }
}

fn drain_lines<R>(stream: R, handler: Option<LineHandler>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        loop {
            match lines.next_line().await {
                // Drain even without a handler: an undrained pipe can fill
                // and block the child.
                Ok(Some(line)) => {
                    if let Some(handler) = &handler {
                        handler(&line);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!(error = %e, "output stream ended uncleanly");
                    break;
                }
            }
        }
    })
}

fn widened_search_path(tool_paths: &[PathBuf]) -> Result<OsString> {
    let mut paths: Vec<PathBuf> = tool_paths.to_vec();
    if let Some(current) = std::env::var_os("PATH") {
        paths.extend(std::env::split_paths(&current));
    }
    std::env::join_paths(paths)
        .map_err(|e| Error::internal(format!("invalid tool path entry: {e}")))
}

fn exit_code(status: &ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return SIGNAL_EXIT_BASE + signal;
        }
    }
    status.code().unwrap_or(-1)
}

/// Kill the child and, on Unix, its whole process group, then reap it.
/// Best-effort: the process may already be gone.
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        unsafe {
            libc::killpg(pid as libc::pid_t, libc::SIGKILL);
        }
    }
    let _ = child.kill().await;
    let _ = child.wait().await;
}

/// Rewrite the invocation to run elevated via the platform mechanism.
///
/// Unix: already-root is a no-op; otherwise probe `sudo -n true` first so a
/// refusal surfaces as a start failure instead of a misleading non-zero
/// exit from the elevated command itself.
#[cfg(unix)]
async fn elevated_invocation(request: &ExecutionRequest) -> Result<(String, Vec<String>)> {
    let euid = unsafe { libc::geteuid() };
    if euid == 0 {
        return Ok((
            request.program().to_string(),
            request.get_args().to_vec(),
        ));
    }

    let probe = Command::new("sudo")
        .args(["-n", "true"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| ExecError::StartFailed {
            program: "sudo".to_string(),
            message: e.to_string(),
        })?;

    if !probe.status.success() {
        return Err(ExecError::ElevationDenied {
            program: request.program().to_string(),
            message: String::from_utf8_lossy(&probe.stderr).trim().to_string(),
        }
        .into());
    }

    let mut args = vec!["-n".to_string(), request.program().to_string()];
    args.extend(request.get_args().iter().cloned());
    Ok(("sudo".to_string(), args))
}

#[cfg(not(unix))]
async fn elevated_invocation(_request: &ExecutionRequest) -> Result<(String, Vec<String>)> {
    Err(ExecError::ElevationUnsupported.into())
}
