// src/exec/event.rs

//! Values that flow out of a running child: output events and the final
//! completion result.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Local};

/// Identifies one invocation within a [`ProcessRunner`](super::ProcessRunner).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl HandleId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where an [`OutputEvent`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputStream {
    Stdout,
    Stderr,
    /// Diagnostics produced by the runner itself (e.g. a failed pipe read).
    Runner,
}

impl fmt::Display for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputStream::Stdout => "stdout",
            OutputStream::Stderr => "stderr",
            OutputStream::Runner => "runner",
        };
        f.write_str(name)
    }
}

/// One line of captured output.
///
/// `seq` starts at 0 for every handle and increases by one per event,
/// across both streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputEvent {
    pub seq: u64,
    pub stream: OutputStream,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStatus {
    Success,
    Failure,
    Cancelled,
}

impl CompletionStatus {
    /// Cancellation wins over everything, then a broken output pipe, then
    /// the exit code.
    pub fn derive(exit_code: i32, cancelled: bool, output_lost: bool) -> Self {
        if cancelled {
            CompletionStatus::Cancelled
        } else if output_lost || exit_code != 0 {
            CompletionStatus::Failure
        } else {
            CompletionStatus::Success
        }
    }
}

impl fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompletionStatus::Success => "success",
            CompletionStatus::Failure => "failure",
            CompletionStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Final outcome of one invocation. Recorded exactly once per handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResult {
    /// Raw exit code. On Unix a child killed by a signal reports
    /// `128 + signal`; `-1` when no code could be determined.
    pub exit_code: i32,
    pub status: CompletionStatus,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub elapsed: Duration,
}

impl CompletionResult {
    pub fn is_success(&self) -> bool {
        self.status == CompletionStatus::Success
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == CompletionStatus::Cancelled
    }
}

/// Map an `ExitStatus` onto a single integer.
pub(crate) fn exit_code_of(status: &std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    -1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_status_from_exit_code() {
        assert_eq!(CompletionStatus::derive(0, false, false), CompletionStatus::Success);
        assert_eq!(CompletionStatus::derive(3, false, false), CompletionStatus::Failure);
        assert_eq!(CompletionStatus::derive(-1, false, false), CompletionStatus::Failure);
    }

    #[test]
    fn cancellation_overrides_exit_code() {
        assert_eq!(CompletionStatus::derive(0, true, false), CompletionStatus::Cancelled);
        assert_eq!(CompletionStatus::derive(143, true, true), CompletionStatus::Cancelled);
    }

    #[test]
    fn lost_output_is_a_failure_even_on_zero_exit() {
        assert_eq!(CompletionStatus::derive(0, false, true), CompletionStatus::Failure);
    }

    #[test]
    fn handle_id_displays_with_hash() {
        assert_eq!(HandleId::new(7).to_string(), "#7");
    }
}
