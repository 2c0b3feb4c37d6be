// src/exec/runner.rs

//! The process runner: validation, spawning and the child registry.

use std::path::Path;
use std::process::Stdio;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use chrono::Local;
use tokio::process::Command;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::errors::RunnerError;

use super::registry::{ActiveProcess, Registry};
use super::validate::{resolve_executable, validate_arguments};
use super::worker::{OutputSink, Worker};
use super::{HandleId, InvocationRequest, ProcessHandle};

/// Default delay between the graceful signal and the forced kill.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerOptions {
    /// How long a cancelled child gets to exit after SIGTERM before it is
    /// killed.
    pub grace_period: Duration,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }
}

/// Launches external tools and keeps track of the ones still running.
///
/// Cloning is cheap; clones share the registry, so a Ctrl-C handler can hold
/// one clone while the main flow launches through another.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    options: RunnerOptions,
    registry: Arc<Registry>,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(RunnerOptions::default())
    }
}

impl ProcessRunner {
    pub fn new(options: RunnerOptions) -> Self {
        Self {
            options,
            registry: Arc::new(Registry::default()),
        }
    }

    pub fn options(&self) -> RunnerOptions {
        self.options
    }

    /// Validate the request, spawn the child and start its worker.
    ///
    /// Must be called from within a Tokio runtime. On error no process has
    /// been created and nothing is registered.
    pub fn launch(&self, request: InvocationRequest) -> Result<ProcessHandle, RunnerError> {
        let program = resolve_executable(request.program(), request.working_dir())?;
        validate_arguments(&request)?;

        if tokio::runtime::Handle::try_current().is_err() {
            return Err(RunnerError::SpawnError {
                path: program,
                source: std::io::Error::other("no Tokio runtime to drive the child process"),
            });
        }

        let mut cmd = build_command(&program, &request);
        let child = cmd.spawn().map_err(|source| RunnerError::SpawnError {
            path: program.clone(),
            source,
        })?;

        let id = self.registry.next_id();
        let pid = child.id();
        let started_at = Local::now();

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (result_tx, result_rx) = watch::channel(None);
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let cancel_tx = Arc::new(cancel_tx);

        self.registry.insert(
            ActiveProcess {
                id,
                pid,
                program: program.clone(),
                started_at,
            },
            Arc::clone(&cancel_tx),
        );

        info!(
            handle = %id,
            pid = ?pid,
            cmd = %request.display_command(),
            "launched process"
        );

        let worker = Worker {
            id,
            child,
            pid,
            sink: OutputSink::new(id, events_tx),
            result: result_tx,
            cancel: cancel_rx,
            registry: Arc::clone(&self.registry),
            grace_period: self.options.grace_period,
            started_at,
            started: tokio::time::Instant::now(),
        };
        tokio::spawn(worker.run());

        Ok(ProcessHandle {
            id,
            events: events_rx,
            result: result_rx,
            cancel: cancel_tx,
            abandoned: OnceLock::new(),
        })
    }

    /// Request termination of a registered child.
    ///
    /// Returns `false` when the id is unknown, already finished, or already
    /// being cancelled.
    pub fn cancel(&self, id: HandleId) -> bool {
        let delivered = self.registry.cancel(id);
        debug!(handle = %id, delivered, "cancel requested via runner");
        delivered
    }

    /// Cancel every registered child; returns how many requests were new.
    pub fn cancel_all(&self) -> usize {
        let count = self.registry.cancel_all();
        if count > 0 {
            info!(count, "cancelling all running processes");
        }
        count
    }

    pub fn is_active(&self, id: HandleId) -> bool {
        self.registry.contains(id)
    }

    /// Children that have not finished yet, ordered by handle id.
    pub fn active(&self) -> Vec<ActiveProcess> {
        self.registry.snapshot()
    }
}

fn build_command(program: &Path, request: &InvocationRequest) -> Command {
    let mut std_cmd = std::process::Command::new(program);
    std_cmd
        .args(request.arguments())
        .envs(request.env_overrides())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    if let Some(dir) = request.working_dir() {
        std_cmd.current_dir(dir);
    }

    // Own process group, so cancellation reaches whatever the tool forks
    // and a terminal Ctrl-C is left to us to forward.
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        std_cmd.process_group(0);
    }

    let mut cmd = Command::from(std_cmd);
    cmd.kill_on_drop(true);
    cmd
}
