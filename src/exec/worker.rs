// src/exec/worker.rs

//! Background worker: one Tokio task per child.
//!
//! The worker owns the `Child`, both pipe readers, and the sending half of
//! the event queue. It multiplexes:
//! - stdout / stderr lines,
//! - the child's exit,
//! - cancellation requests,
//! - the SIGTERM → SIGKILL escalation deadline,
//!
//! and stops once the child has been reaped and both pipes are closed.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use super::event::exit_code_of;
use super::registry::Registry;
use super::{CompletionResult, CompletionStatus, HandleId, OutputEvent, OutputStream};

/// Line reader over one pipe.
///
/// Lines end at `\n`, `\r\n` or a bare `\r`, so carriage-return progress
/// updates arrive one at a time. Bytes move from the pipe into `buf` only
/// after `fill_buf` completes, so dropping a pending `next_line` future
/// inside `select!` loses nothing.
pub(crate) struct LineReader {
    inner: BufReader<Box<dyn AsyncRead + Send + Unpin>>,
    buf: Vec<u8>,
}

impl LineReader {
    pub(crate) fn new(pipe: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self {
            inner: BufReader::new(Box::new(pipe)),
            buf: Vec::new(),
        }
    }

    /// Next line without its terminator, or `None` at EOF.
    ///
    /// Invalid UTF-8 is replaced; an unterminated final chunk is returned as a
    /// line of its own.
    pub(crate) async fn next_line(&mut self) -> io::Result<Option<String>> {
        loop {
            if let Some(line) = self.split_line(false) {
                return Ok(Some(line));
            }

            let chunk = self.inner.fill_buf().await?;
            if chunk.is_empty() {
                return Ok(self.split_line(true));
            }
            let n = chunk.len();
            self.buf.extend_from_slice(chunk);
            self.inner.consume(n);
        }
    }

    /// Take the first complete line out of `buf`.
    ///
    /// A trailing `\r` is held back until the next byte shows whether it
    /// starts a `\r\n` pair, unless the pipe is at EOF.
    fn split_line(&mut self, eof: bool) -> Option<String> {
        let (end, skip) = match self.buf.iter().position(|&b| b == b'\n' || b == b'\r') {
            Some(i) if self.buf[i] == b'\n' => (i, 1),
            Some(i) => match self.buf.get(i + 1) {
                Some(b'\n') => (i, 2),
                Some(_) => (i, 1),
                None if eof => (i, 1),
                None => return None,
            },
            None if eof && !self.buf.is_empty() => (self.buf.len(), 0),
            None => return None,
        };

        let line = String::from_utf8_lossy(&self.buf[..end]).into_owned();
        self.buf.drain(..end + skip);
        Some(line)
    }
}

async fn next_line(reader: Option<&mut LineReader>) -> io::Result<Option<String>> {
    match reader {
        Some(reader) => reader.next_line().await,
        None => std::future::pending().await,
    }
}

/// Turns read results into numbered events and tracks lost output.
pub(crate) struct OutputSink {
    id: HandleId,
    events: mpsc::UnboundedSender<OutputEvent>,
    seq: u64,
    output_lost: bool,
}

impl OutputSink {
    pub(crate) fn new(id: HandleId, events: mpsc::UnboundedSender<OutputEvent>) -> Self {
        Self {
            id,
            events,
            seq: 0,
            output_lost: false,
        }
    }

    /// Forward one read result. Returns whether the stream stays open.
    fn on_line(&mut self, stream: OutputStream, line: io::Result<Option<String>>) -> bool {
        match line {
            Ok(Some(text)) => {
                self.emit(stream, text);
                true
            }
            Ok(None) => {
                debug!(handle = %self.id, %stream, "stream closed");
                false
            }
            Err(err) => {
                warn!(handle = %self.id, %stream, error = %err, "read failed; abandoning stream");
                self.lost(format!("failed reading {stream}: {err}"));
                false
            }
        }
    }

    /// Record a runner-side failure as one `Runner` event.
    fn lost(&mut self, message: String) {
        self.output_lost = true;
        self.emit(OutputStream::Runner, message);
    }

    fn emit(&mut self, stream: OutputStream, text: String) {
        let event = OutputEvent {
            seq: self.seq,
            stream,
            text,
        };
        self.seq += 1;
        // A consumer that dropped its handle no longer wants output; keep
        // draining the pipes regardless so the child never blocks.
        let _ = self.events.send(event);
    }

    fn completion(
        &self,
        exit_code: i32,
        cancelled: bool,
        started_at: DateTime<Local>,
        elapsed: Duration,
    ) -> CompletionResult {
        CompletionResult {
            exit_code,
            status: CompletionStatus::derive(exit_code, cancelled, self.output_lost),
            started_at,
            finished_at: Local::now(),
            elapsed,
        }
    }
}

pub(crate) struct Worker {
    pub(crate) id: HandleId,
    pub(crate) child: Child,
    pub(crate) pid: Option<u32>,
    pub(crate) sink: OutputSink,
    pub(crate) result: watch::Sender<Option<CompletionResult>>,
    pub(crate) cancel: watch::Receiver<bool>,
    pub(crate) registry: Arc<Registry>,
    pub(crate) grace_period: Duration,
    pub(crate) started_at: DateTime<Local>,
    pub(crate) started: Instant,
}

impl Worker {
    pub(crate) async fn run(mut self) {
        let mut stdout = self.child.stdout.take().map(LineReader::new);
        let mut stderr = self.child.stderr.take().map(LineReader::new);

        let mut exit_code: Option<i32> = None;
        let mut cancelled = false;
        let mut cancel_open = true;
        let mut kill_at: Option<Instant> = None;

        while exit_code.is_none() || stdout.is_some() || stderr.is_some() {
            tokio::select! {
                status = self.child.wait(), if exit_code.is_none() => {
                    exit_code = Some(self.on_exit(status));
                }

                line = next_line(stdout.as_mut()), if stdout.is_some() => {
                    if !self.sink.on_line(OutputStream::Stdout, line) {
                        stdout = None;
                    }
                }

                line = next_line(stderr.as_mut()), if stderr.is_some() => {
                    if !self.sink.on_line(OutputStream::Stderr, line) {
                        stderr = None;
                    }
                }

                changed = self.cancel.changed(), if cancel_open => {
                    if changed.is_err() {
                        cancel_open = false;
                        continue;
                    }
                    if !*self.cancel.borrow_and_update() {
                        continue;
                    }
                    cancel_open = false;

                    // The child may have exited without us having polled
                    // `wait` yet; in that case the cancellation is a no-op.
                    if exit_code.is_none() {
                        if let Ok(Some(status)) = self.child.try_wait() {
                            exit_code = Some(self.on_exit(Ok(status)));
                        }
                    }

                    if exit_code.is_none() {
                        cancelled = true;
                        kill_at = self.begin_termination();
                    } else {
                        // Exited, but something it forked may still hold the
                        // pipes open.
                        debug!(handle = %self.id, "cancel after exit; releasing leftover process group");
                        self.force_kill(true);
                    }
                }

                _ = sleep_until(kill_at.unwrap_or_else(Instant::now)), if kill_at.is_some() => {
                    kill_at = None;
                    warn!(
                        handle = %self.id,
                        grace_ms = self.grace_period.as_millis() as u64,
                        "process did not exit within grace period; killing"
                    );
                    self.force_kill(exit_code.is_some());
                }
            }
        }

        self.finish(exit_code.unwrap_or(-1), cancelled);
    }

    fn on_exit(&mut self, status: io::Result<std::process::ExitStatus>) -> i32 {
        match status {
            Ok(status) => {
                let code = exit_code_of(&status);
                debug!(handle = %self.id, exit_code = code, "process exited");
                code
            }
            Err(err) => {
                warn!(handle = %self.id, error = %err, "waiting for process failed");
                self.sink.lost(format!("failed waiting for process: {err}"));
                -1
            }
        }
    }

    fn begin_termination(&mut self) -> Option<Instant> {
        info!(handle = %self.id, pid = ?self.pid, "cancellation requested; terminating process");

        match super::terminate::terminate_gracefully(&mut self.child, self.pid) {
            Ok(true) => Some(Instant::now() + self.grace_period),
            Ok(false) => None,
            Err(err) => {
                warn!(handle = %self.id, error = %err, "graceful termination failed; killing");
                self.force_kill(false);
                None
            }
        }
    }

    fn force_kill(&mut self, reaped: bool) {
        if let Err(err) = super::terminate::kill_forcefully(&mut self.child, self.pid, reaped) {
            warn!(handle = %self.id, error = %err, "failed to kill process");
        }
    }

    fn finish(self, exit_code: i32, cancelled: bool) {
        let result =
            self.sink
                .completion(exit_code, cancelled, self.started_at, self.started.elapsed());

        info!(
            handle = %self.id,
            exit_code,
            status = %result.status,
            elapsed_ms = result.elapsed.as_millis() as u64,
            events = self.sink.seq,
            "process finished"
        );

        self.registry.remove(self.id);
        self.result.send_replace(Some(result));
    }
}
