// src/exec/mod.rs

//! Process execution layer.
//!
//! This module launches the external tools (`odin4`, `adb`) with
//! `tokio::process::Command` and streams what they print back to the caller.
//!
//! - [`request`] defines the [`InvocationRequest`] a caller builds.
//! - [`runner`] owns [`ProcessRunner`]: validation, spawning, the registry.
//! - [`handle`] is the caller-side [`ProcessHandle`] (events, wait, cancel).
//! - [`event`] holds the output / completion value types.
//! - `worker` drives one child per Tokio task; `terminate` signals it.

pub mod event;
pub mod handle;
pub mod registry;
pub mod request;
pub mod runner;
mod terminate;
mod validate;
mod worker;

pub use event::{CompletionResult, CompletionStatus, HandleId, OutputEvent, OutputStream};
pub use handle::ProcessHandle;
pub use registry::ActiveProcess;
pub use request::InvocationRequest;
pub use runner::{DEFAULT_GRACE_PERIOD, ProcessRunner, RunnerOptions};
