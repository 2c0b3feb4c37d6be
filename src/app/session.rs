// src/app/session.rs

//! Consuming a running handle: streaming into the log, or collecting
//! quietly for output that has to be parsed.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::exec::{
    CompletionResult, CompletionStatus, HandleId, OutputEvent, OutputStream, ProcessHandle,
    ProcessRunner,
};
use crate::log_buffer::LogBuffer;

/// Everything a quietly collected run produced.
#[derive(Debug, Clone)]
pub struct Captured {
    pub events: Vec<OutputEvent>,
    pub result: CompletionResult,
}

impl Captured {
    pub fn stdout_text(&self) -> String {
        self.events
            .iter()
            .filter(|e| e.stream == OutputStream::Stdout)
            .map(|e| e.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Cancel `id` through the runner once `timeout` elapses.
///
/// The returned task should be aborted when the run finishes first.
pub fn arm_timeout(
    runner: &ProcessRunner,
    id: HandleId,
    timeout: Option<Duration>,
) -> Option<JoinHandle<()>> {
    let timeout = timeout?;
    let runner = runner.clone();
    Some(tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        if runner.cancel(id) {
            warn!(handle = %id, timeout_ms = timeout.as_millis() as u64, "timeout elapsed; cancelling");
        }
    }))
}

/// Print every event as it arrives and record it in `log`.
pub async fn stream_to_log(handle: &mut ProcessHandle, log: &mut LogBuffer) -> CompletionResult {
    while let Some(event) = handle.next_event().await {
        if event.stream == OutputStream::Runner {
            warn!(handle = %handle.id(), "{}", event.text);
        }
        if let Some(line) = log.push_event(&event) {
            println!("{line}");
        }
    }
    handle.wait().await
}

/// Drain a handle without printing.
pub async fn collect(mut handle: ProcessHandle) -> Captured {
    let mut events = Vec::new();
    while let Some(event) = handle.next_event().await {
        events.push(event);
    }
    let result = handle.wait().await;
    debug!(handle = %handle.id(), events = events.len(), status = %result.status, "collected output");
    Captured { events, result }
}

/// Process exit code for a completion: the tool's own code on failure,
/// 130 when cancelled.
pub fn exit_code_for(result: &CompletionResult) -> i32 {
    match result.status {
        CompletionStatus::Success => 0,
        CompletionStatus::Cancelled => 130,
        CompletionStatus::Failure if (1..=255).contains(&result.exit_code) => result.exit_code,
        CompletionStatus::Failure => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    fn result(exit_code: i32, status: CompletionStatus) -> CompletionResult {
        CompletionResult {
            exit_code,
            status,
            started_at: Local::now(),
            finished_at: Local::now(),
            elapsed: Duration::ZERO,
        }
    }

    #[test]
    fn exit_codes_follow_status() {
        assert_eq!(exit_code_for(&result(0, CompletionStatus::Success)), 0);
        assert_eq!(exit_code_for(&result(3, CompletionStatus::Failure)), 3);
        assert_eq!(exit_code_for(&result(-1, CompletionStatus::Failure)), 1);
        assert_eq!(exit_code_for(&result(0, CompletionStatus::Failure)), 1);
        assert_eq!(exit_code_for(&result(143, CompletionStatus::Cancelled)), 130);
    }
}
