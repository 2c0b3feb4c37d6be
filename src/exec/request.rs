// src/exec/request.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::tools::shell::command_preview;

/// Everything needed to start one external tool.
///
/// Built with the chained setters, then moved into
/// [`ProcessRunner::launch`](super::ProcessRunner::launch), so the argument
/// list cannot change once the launch begins.
///
/// ```
/// use flashrun::exec::InvocationRequest;
///
/// let req = InvocationRequest::new("adb")
///     .args(["devices", "-l"])
///     .env("ANDROID_ADB_SERVER_PORT", "5037");
/// assert_eq!(req.arguments(), ["devices", "-l"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRequest {
    program: PathBuf,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    env: BTreeMap<String, String>,
}

impl InvocationRequest {
    /// A bare name (no path separator) is looked up in `PATH` at launch.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            env: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Add (or replace) one environment override; the rest of the parent's
    /// environment is inherited.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    pub fn env_overrides(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Shell-quoted command line, for logs and copy/paste.
    pub fn display_command(&self) -> String {
        command_preview(&self.program, &self.args)
    }
}
