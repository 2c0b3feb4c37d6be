// src/errors.rs

//! Crate-wide error types.
//!
//! Each layer has its own `thiserror` enum; [`FlashrunError`] wraps them for
//! the application edge.

use std::path::PathBuf;

use thiserror::Error;

/// Synchronous failures of [`crate::exec::ProcessRunner::launch`].
///
/// A child that spawns and then exits non-zero is *not* an error; that is a
/// normal `Failure` completion.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("invalid executable '{}': {reason}", path.display())]
    InvalidExecutable { path: PathBuf, reason: String },

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("failed to spawn '{}': {source}", path.display())]
    SpawnError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while building odin4 / adb argument vectors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ToolError {
    #[error("select at least one firmware file")]
    NoFirmwareFiles,

    #[error("{partition} file does not exist: {}", path.display())]
    MissingFile { partition: String, path: PathBuf },

    #[error("missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("could not split shell command: {0}")]
    ShellSyntax(String),
}

/// Errors raised by firmware autodiscovery.
#[derive(Error, Debug)]
pub enum FirmwareError {
    #[error("firmware folder does not exist: {}", .0.display())]
    FolderNotFound(PathBuf),

    #[error("invalid {key} pattern '{pattern}': {source}")]
    Pattern {
        key: String,
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum FlashrunError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error(transparent)]
    Firmware(#[from] FirmwareError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, FlashrunError>;
