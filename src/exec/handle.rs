// src/exec/handle.rs

use std::sync::{Arc, OnceLock};

use chrono::Local;
use tokio::sync::{mpsc, watch};

use super::registry::request_cancel;
use super::{CompletionResult, CompletionStatus, HandleId, OutputEvent};

/// Caller-side view of one launched child.
///
/// - Output is consumed with [`next_event`](Self::next_event) (suspending) or
///   [`try_next_event`](Self::try_next_event) / [`drain_events`](Self::drain_events)
///   (non-blocking, for render loops that poll on their own schedule).
/// - [`wait`](Self::wait) suspends until the completion result is recorded.
/// - [`cancel`](Self::cancel) requests termination.
///
/// Dropping the handle does not stop the child; use the runner's
/// [`cancel`](super::ProcessRunner::cancel) if the handle is gone.
#[derive(Debug)]
pub struct ProcessHandle {
    pub(crate) id: HandleId,
    pub(crate) events: mpsc::UnboundedReceiver<OutputEvent>,
    pub(crate) result: watch::Receiver<Option<CompletionResult>>,
    pub(crate) cancel: Arc<watch::Sender<bool>>,
    /// Stand-in result, fixed on first use, for a worker that vanished.
    pub(crate) abandoned: OnceLock<CompletionResult>,
}

impl ProcessHandle {
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// Next output event, or `None` once the child's streams are closed and
    /// every event has been delivered.
    pub async fn next_event(&mut self) -> Option<OutputEvent> {
        self.events.recv().await
    }

    pub fn try_next_event(&mut self) -> Option<OutputEvent> {
        self.events.try_recv().ok()
    }

    /// Everything queued right now, in order.
    pub fn drain_events(&mut self) -> Vec<OutputEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }

    /// Request termination of the child.
    ///
    /// Returns `false` (and does nothing) when the child has already
    /// finished or a cancellation was already requested.
    pub fn cancel(&self) -> bool {
        if self.is_finished() {
            return false;
        }
        request_cancel(&self.cancel)
    }

    pub fn is_finished(&self) -> bool {
        self.result.borrow().is_some()
    }

    pub fn try_result(&self) -> Option<CompletionResult> {
        self.result.borrow().clone()
    }

    /// Wait for the completion result. Repeated calls return the same value.
    pub async fn wait(&self) -> CompletionResult {
        let mut rx = self.result.clone();
        let recorded = rx
            .wait_for(Option::is_some)
            .await
            .map(|result| (*result).clone())
            .ok()
            .flatten();
        recorded
            .or_else(|| rx.borrow().clone())
            .unwrap_or_else(|| self.abandoned.get_or_init(abandoned).clone())
    }
}

/// Result used if the worker vanished without recording one (it panicked).
fn abandoned() -> CompletionResult {
    let now = Local::now();
    CompletionResult {
        exit_code: -1,
        status: CompletionStatus::Failure,
        started_at: now,
        finished_at: now,
        elapsed: std::time::Duration::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn wait_is_stable_when_the_worker_vanished() {
        let (_events_tx, events) = mpsc::unbounded_channel();
        let (result_tx, result) = watch::channel(None);
        let (cancel, _cancel_rx) = watch::channel(false);
        drop(result_tx);

        let handle = ProcessHandle {
            id: HandleId::new(0),
            events,
            result,
            cancel: Arc::new(cancel),
            abandoned: OnceLock::new(),
        };

        let first = handle.wait().await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = handle.wait().await;

        assert_eq!(first.status, CompletionStatus::Failure);
        assert_eq!(first.exit_code, -1);
        assert_eq!(first, second);
        assert!(handle.try_result().is_none());
    }
}
