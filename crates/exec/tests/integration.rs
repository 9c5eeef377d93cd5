//! Integration tests for the process execution engine
//!
//! These run real processes through `/bin/sh`, so they are Unix-only.

#![cfg(unix)]

use pakt_config::CoreConfig;
use pakt_errors::{Error, ExecError};
use pakt_events::{AfterExecution, BeforeExecution, EventBus};
use pakt_exec::{ExecutionEngine, ExecutionRequest};
use pakt_types::TIMEOUT_EXIT_CODE;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn collector() -> (Arc<Mutex<Vec<String>>>, pakt_exec::LineHandler) {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&lines);
    let handler: pakt_exec::LineHandler = Arc::new(move |line: &str| {
        sink.lock().unwrap().push(line.to_string());
    });
    (lines, handler)
}

#[tokio::test]
async fn test_stdout_streamed_line_by_line() {
    let engine = ExecutionEngine::new(EventBus::new());
    let (lines, handler) = collector();

    let mut request = ExecutionRequest::new("/bin/sh");
    request
        .args(["-c", "printf 'one\\ntwo\\n'"])
        .on_stdout(handler);

    let result = engine.execute(request).await.unwrap();
    assert!(result.success());
    assert!(!result.timed_out);
    assert_eq!(*lines.lock().unwrap(), vec!["one", "two"]);
}

#[tokio::test]
async fn test_nonzero_exit_and_stderr_text() {
    let engine = ExecutionEngine::new(EventBus::new());
    let (stderr_lines, handler) = collector();

    let mut request = ExecutionRequest::new("/bin/sh");
    request
        .args(["-c", "echo installer exploded >&2; exit 3"])
        .on_stderr(handler);

    let result = engine.execute(request).await.unwrap();
    assert_eq!(result.exit_code, 3);
    assert!(!result.success());
    assert!(!result.timed_out);
    assert_eq!(*stderr_lines.lock().unwrap(), vec!["installer exploded"]);
}

#[tokio::test]
async fn test_nonexistent_program_is_start_failure() {
    let engine = ExecutionEngine::new(EventBus::new());
    let request = ExecutionRequest::new("/definitely/not/a/real/program");

    let err = engine.execute(request).await.unwrap_err();
    match err {
        Error::Exec(ExecError::StartFailed { program, .. }) => {
            assert_eq!(program, "/definitely/not/a/real/program");
        }
        other => panic!("expected StartFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_timeout_terminates_process_tree() {
    let engine = ExecutionEngine::new(EventBus::new());
    let dir = tempfile::TempDir::new().unwrap();
    let marker = dir.path().join("survived");

    let mut request = ExecutionRequest::new("/bin/sh");
    request
        .args([
            "-c",
            &format!("sleep 1 && touch {}", marker.display()),
        ])
        .timeout(Duration::from_millis(100));

    let result = engine.execute(request).await.unwrap();
    assert!(result.timed_out);
    assert_eq!(result.exit_code, TIMEOUT_EXIT_CODE);
    assert_eq!(result.elapsed, Duration::from_millis(100));

    // If the process (or a descendant) survived the kill, the marker will
    // appear once its sleep finishes.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(!marker.exists(), "timed-out process kept running");
}

#[tokio::test]
async fn test_lifecycle_events_published() {
    let bus = EventBus::new();
    let engine = ExecutionEngine::new(bus.clone());

    let order = Arc::new(Mutex::new(Vec::new()));
    {
        let order = Arc::clone(&order);
        bus.subscribe(move |before: &BeforeExecution| {
            order
                .lock()
                .unwrap()
                .push(format!("before:{}", before.program));
            Ok(())
        });
    }
    {
        let order = Arc::clone(&order);
        bus.subscribe(move |after: &AfterExecution| {
            order
                .lock()
                .unwrap()
                .push(format!("after:{}:{}", after.program, after.result.exit_code));
            Ok(())
        });
    }

    let mut request = ExecutionRequest::new("/bin/sh");
    request.args(["-c", "exit 0"]).current_dir("/tmp");
    engine.execute(request).await.unwrap();

    assert_eq!(
        *order.lock().unwrap(),
        vec!["before:/bin/sh", "after:/bin/sh:0"]
    );
}

#[tokio::test]
async fn test_no_after_event_on_start_failure() {
    let bus = EventBus::new();
    let engine = ExecutionEngine::new(bus.clone());

    let befores = Arc::new(Mutex::new(0u32));
    let afters = Arc::new(Mutex::new(0u32));
    {
        let befores = Arc::clone(&befores);
        bus.subscribe(move |_: &BeforeExecution| {
            *befores.lock().unwrap() += 1;
            Ok(())
        });
    }
    {
        let afters = Arc::clone(&afters);
        bus.subscribe(move |_: &AfterExecution| {
            *afters.lock().unwrap() += 1;
            Ok(())
        });
    }

    let request = ExecutionRequest::new("/definitely/not/a/real/program");
    assert!(engine.execute(request).await.is_err());

    assert_eq!(*befores.lock().unwrap(), 1);
    assert_eq!(*afters.lock().unwrap(), 0);
}

#[tokio::test]
async fn test_widened_search_path_finds_host_tool() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::TempDir::new().unwrap();
    let tool = dir.path().join("pakt-probe-tool");
    std::fs::write(&tool, "#!/bin/sh\necho found\n").unwrap();
    std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

    let config = CoreConfig {
        tool_paths: vec![PathBuf::from(dir.path())],
        default_timeout_secs: None,
    };
    let engine = ExecutionEngine::with_config(EventBus::new(), config);

    // Without the flag the bare name resolves against the parent PATH and
    // the spawn fails.
    let request = ExecutionRequest::new("pakt-probe-tool");
    assert!(matches!(
        engine.execute(request).await,
        Err(Error::Exec(ExecError::StartFailed { .. }))
    ));

    let (lines, handler) = collector();
    let mut request = ExecutionRequest::new("pakt-probe-tool");
    request.widen_search_path().on_stdout(handler);
    let result = engine.execute(request).await.unwrap();
    assert!(result.success());
    assert_eq!(*lines.lock().unwrap(), vec!["found"]);
}

#[tokio::test]
async fn test_engine_default_timeout_applies() {
    let config = CoreConfig {
        tool_paths: vec![],
        default_timeout_secs: Some(1),
    };
    let engine = ExecutionEngine::with_config(EventBus::new(), config);

    // Inherits the engine default and times out.
    let mut request = ExecutionRequest::new("/bin/sh");
    request.args(["-c", "sleep 5"]);
    let result = engine.execute(request).await.unwrap();
    assert!(result.timed_out);

    // An explicit opt-out runs to completion.
    let mut request = ExecutionRequest::new("/bin/sh");
    request.args(["-c", "exit 0"]).no_timeout();
    let result = engine.execute(request).await.unwrap();
    assert!(result.success());
}

#[tokio::test]
async fn test_elevate_is_noop_when_already_root() {
    // Only meaningful when the test runner is root (common in CI
    // containers); otherwise it would depend on the host's sudo setup.
    if unsafe { libc::geteuid() } != 0 {
        return;
    }

    let engine = ExecutionEngine::new(EventBus::new());
    let mut request = ExecutionRequest::new("/bin/sh");
    request.args(["-c", "exit 0"]).elevate();
    let result = engine.execute(request).await.unwrap();
    assert!(result.success());
}

#[tokio::test]
async fn test_concurrent_executions_are_independent() {
    let engine = ExecutionEngine::new(EventBus::new());

    let mut tasks = Vec::new();
    for code in 0..4 {
        let engine = engine.clone();
        tasks.push(tokio::spawn(async move {
            let mut request = ExecutionRequest::new("/bin/sh");
            request.args(["-c", &format!("exit {code}")]);
            engine.execute(request).await.unwrap()
        }));
    }

    for (code, task) in tasks.into_iter().enumerate() {
        let result = task.await.unwrap();
        assert_eq!(result.exit_code, i32::try_from(code).unwrap());
    }
}
