// tests/runner_lifecycle.rs

#![cfg(unix)]

mod common;
use crate::common::fixtures::write_script;
use crate::common::{init_tracing, with_timeout};

use std::collections::HashSet;

use flashrun::errors::RunnerError;
use flashrun::exec::{
    CompletionStatus, InvocationRequest, OutputEvent, OutputStream, ProcessHandle, ProcessRunner,
};

async fn drain(handle: &mut ProcessHandle) -> Vec<OutputEvent> {
    let mut events = Vec::new();
    while let Some(event) = handle.next_event().await {
        events.push(event);
    }
    events
}

fn sh(script: &str) -> InvocationRequest {
    InvocationRequest::new("sh").arg("-c").arg(script)
}

#[tokio::test]
async fn echo_produces_one_stdout_event_and_success() {
    init_tracing();
    let runner = ProcessRunner::default();
    let mut handle = runner
        .launch(InvocationRequest::new("echo").arg("hello"))
        .unwrap();

    let events = with_timeout(drain(&mut handle)).await;
    let result = with_timeout(handle.wait()).await;

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].seq, 0);
    assert_eq!(events[0].stream, OutputStream::Stdout);
    assert_eq!(events[0].text, "hello");
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.status, CompletionStatus::Success);
    assert!(result.finished_at >= result.started_at);
}

#[tokio::test]
async fn missing_executable_is_rejected_before_spawn() {
    init_tracing();
    let runner = ProcessRunner::default();

    let err = runner
        .launch(InvocationRequest::new("/no/such/binary"))
        .unwrap_err();

    assert!(matches!(err, RunnerError::InvalidExecutable { .. }), "got {err:?}");
    assert!(runner.active().is_empty());
}

#[tokio::test]
async fn directory_is_not_an_executable() {
    let runner = ProcessRunner::default();
    let dir = tempfile::tempdir().unwrap();

    let err = runner
        .launch(InvocationRequest::new(dir.path()))
        .unwrap_err();

    match err {
        RunnerError::InvalidExecutable { reason, .. } => {
            assert!(reason.contains("not a regular file"), "reason: {reason}")
        }
        other => panic!("expected InvalidExecutable, got {other:?}"),
    }
}

#[tokio::test]
async fn nul_byte_in_argument_is_invalid() {
    let runner = ProcessRunner::default();
    let err = runner
        .launch(InvocationRequest::new("echo").arg("a\0b"))
        .unwrap_err();
    assert!(matches!(err, RunnerError::InvalidArguments(_)), "got {err:?}");
    assert!(runner.active().is_empty());
}

#[tokio::test]
async fn non_zero_exit_is_failure_with_tool_code() {
    init_tracing();
    let runner = ProcessRunner::default();
    let mut handle = runner.launch(sh("echo oops >&2; exit 3")).unwrap();

    let events = with_timeout(drain(&mut handle)).await;
    let result = with_timeout(handle.wait()).await;

    assert_eq!(result.exit_code, 3);
    assert_eq!(result.status, CompletionStatus::Failure);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].stream, OutputStream::Stderr);
    assert_eq!(events[0].text, "oops");
}

#[tokio::test]
async fn streams_keep_their_own_order_and_seq_is_unique() {
    init_tracing();
    let runner = ProcessRunner::default();
    let script = "for i in 1 2 3 4 5; do echo out$i; echo err$i >&2; done";
    let mut handle = runner.launch(sh(script)).unwrap();

    let events = with_timeout(drain(&mut handle)).await;
    with_timeout(handle.wait()).await;

    let stdout: Vec<_> = events
        .iter()
        .filter(|e| e.stream == OutputStream::Stdout)
        .map(|e| e.text.as_str())
        .collect();
    let stderr: Vec<_> = events
        .iter()
        .filter(|e| e.stream == OutputStream::Stderr)
        .map(|e| e.text.as_str())
        .collect();
    assert_eq!(stdout, ["out1", "out2", "out3", "out4", "out5"]);
    assert_eq!(stderr, ["err1", "err2", "err3", "err4", "err5"]);

    let seqs: Vec<u64> = events.iter().map(|e| e.seq).collect();
    let unique: HashSet<u64> = seqs.iter().copied().collect();
    assert_eq!(unique.len(), seqs.len());
    assert!(seqs.windows(2).all(|w| w[0] < w[1]), "seq not increasing: {seqs:?}");
}

#[tokio::test]
async fn wait_is_idempotent() {
    let runner = ProcessRunner::default();
    let handle = runner.launch(sh("exit 7")).unwrap();

    let first = with_timeout(handle.wait()).await;
    let second = with_timeout(handle.wait()).await;

    assert_eq!(first, second);
    assert_eq!(handle.try_result(), Some(first));
}

#[tokio::test]
async fn finished_child_leaves_the_registry() {
    let runner = ProcessRunner::default();
    let handle = runner.launch(sh("sleep 0.2")).unwrap();
    let id = handle.id();

    assert!(runner.is_active(id));
    assert_eq!(runner.active().len(), 1);

    with_timeout(handle.wait()).await;

    assert!(!runner.is_active(id));
    assert!(runner.active().is_empty());
    assert!(!runner.cancel(id));
}

#[tokio::test]
async fn cancel_after_exit_is_a_no_op() {
    let runner = ProcessRunner::default();
    let mut handle = runner.launch(InvocationRequest::new("true")).unwrap();

    with_timeout(drain(&mut handle)).await;
    let before = with_timeout(handle.wait()).await;

    assert!(!handle.cancel());
    let after = with_timeout(handle.wait()).await;
    assert_eq!(before, after);
    assert_eq!(after.status, CompletionStatus::Success);
}

#[tokio::test]
async fn concurrent_handles_do_not_interleave() {
    init_tracing();
    let runner = ProcessRunner::default();
    let mut a = runner.launch(sh("for i in 1 2 3; do echo a$i; done")).unwrap();
    let mut b = runner.launch(sh("for i in 1 2 3; do echo b$i; done")).unwrap();
    assert_ne!(a.id(), b.id());

    let (ea, eb) = with_timeout(async { tokio::join!(drain(&mut a), drain(&mut b)) }).await;

    let ta: Vec<_> = ea.iter().map(|e| e.text.as_str()).collect();
    let tb: Vec<_> = eb.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(ta, ["a1", "a2", "a3"]);
    assert_eq!(tb, ["b1", "b2", "b3"]);
    assert!(with_timeout(a.wait()).await.is_success());
    assert!(with_timeout(b.wait()).await.is_success());
}

#[tokio::test]
async fn env_and_working_dir_reach_the_child() {
    let runner = ProcessRunner::default();
    let dir = tempfile::tempdir().unwrap();
    let canonical = dir.path().canonicalize().unwrap();

    let request = sh("echo \"$FLASHRUN_TEST_VALUE\"; pwd -P")
        .env("FLASHRUN_TEST_VALUE", "from-test")
        .current_dir(dir.path());
    let mut handle = runner.launch(request).unwrap();

    let events = with_timeout(drain(&mut handle)).await;
    let texts: Vec<_> = events.iter().map(|e| e.text.clone()).collect();

    assert_eq!(texts[0], "from-test");
    assert_eq!(texts[1], canonical.to_string_lossy());
}

#[tokio::test]
async fn relative_program_runs_from_the_working_dir() {
    init_tracing();
    let runner = ProcessRunner::default();
    let work = tempfile::tempdir().unwrap();
    std::fs::create_dir(work.path().join("tools")).unwrap();
    write_script(&work.path().join("tools"), "tool", "echo from-working-dir");

    let mut handle = runner
        .launch(InvocationRequest::new("tools/tool").current_dir(work.path()))
        .unwrap();

    let events = with_timeout(drain(&mut handle)).await;
    let texts: Vec<_> = events.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, ["from-working-dir"]);
    assert!(with_timeout(handle.wait()).await.is_success());
}

#[tokio::test]
async fn relative_program_missing_from_working_dir_is_invalid() {
    let runner = ProcessRunner::default();
    let work = tempfile::tempdir().unwrap();

    let err = runner
        .launch(InvocationRequest::new("tools/tool").current_dir(work.path()))
        .unwrap_err();

    match err {
        RunnerError::InvalidExecutable { path, reason } => {
            assert!(path.starts_with(work.path()), "checked {path:?}");
            assert_eq!(reason, "does not exist");
        }
        other => panic!("expected InvalidExecutable, got {other:?}"),
    }
    assert!(runner.active().is_empty());
}

#[tokio::test]
async fn carriage_return_progress_arrives_line_by_line() {
    let runner = ProcessRunner::default();
    let mut handle = runner.launch(sh("printf '10%%\\r20%%\\r30%%\\n'")).unwrap();

    let events = with_timeout(drain(&mut handle)).await;
    let texts: Vec<_> = events.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, ["10%", "20%", "30%"]);
}

#[tokio::test]
async fn unterminated_last_line_is_delivered() {
    let runner = ProcessRunner::default();
    let mut handle = runner.launch(sh("printf 'partial'")).unwrap();

    let events = with_timeout(drain(&mut handle)).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].text, "partial");
}

#[tokio::test]
async fn try_next_event_polls_without_blocking() {
    let runner = ProcessRunner::default();
    let mut handle = runner.launch(sh("echo one; echo two")).unwrap();

    with_timeout(handle.wait()).await;
    // The worker publishes the result only after both pipes hit EOF, so
    // every line is queued by now.
    let queued = handle.drain_events();
    assert_eq!(queued.len(), 2);
    assert!(handle.try_next_event().is_none());
}

#[test]
fn launch_outside_a_runtime_is_a_spawn_error() {
    let runner = ProcessRunner::default();
    let err = runner
        .launch(InvocationRequest::new("echo").arg("hi"))
        .unwrap_err();
    assert!(matches!(err, RunnerError::SpawnError { .. }), "got {err:?}");
    assert!(runner.active().is_empty());
}
