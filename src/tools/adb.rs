// src/tools/adb.rs

//! Argument construction and output parsing for `adb`.

use std::fmt;

use crate::errors::ToolError;

use super::shell::split_words;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebootTarget {
    System,
    Download,
    Recovery,
}

/// The adb operations the front-end exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdbAction {
    Devices,
    Push { local: String, remote: String },
    Pull { remote: String, local: String },
    Install { apk: String },
    /// Raw command line, split with POSIX shell rules.
    Shell(String),
    Reboot(RebootTarget),
    KillServer,
    StartServer,
}

impl fmt::Display for AdbAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AdbAction::Devices => "devices",
            AdbAction::Push { .. } => "push",
            AdbAction::Pull { .. } => "pull",
            AdbAction::Install { .. } => "install",
            AdbAction::Shell(_) => "shell",
            AdbAction::Reboot(_) => "reboot",
            AdbAction::KillServer => "kill-server",
            AdbAction::StartServer => "start-server",
        };
        f.write_str(name)
    }
}

fn required<'a>(value: &'a str, what: &'static str) -> Result<&'a str, ToolError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ToolError::MissingArgument(what));
    }
    Ok(value)
}

/// Build the adb argv for `action`, targeting `serial` when given.
///
/// Server management (`kill-server`, `start-server`) and `devices` ignore the
/// serial.
pub fn adb_args(serial: Option<&str>, action: &AdbAction) -> Result<Vec<String>, ToolError> {
    let mut args = Vec::new();

    let targets_device = !matches!(
        action,
        AdbAction::Devices | AdbAction::KillServer | AdbAction::StartServer
    );
    if targets_device {
        if let Some(serial) = serial.map(str::trim).filter(|s| !s.is_empty()) {
            args.push("-s".to_string());
            args.push(serial.to_string());
        }
    }

    match action {
        AdbAction::Devices => args.extend(["devices".to_string(), "-l".to_string()]),
        AdbAction::Push { local, remote } => {
            let local = required(local, "push requires a local path")?;
            let remote = required(remote, "push requires a remote path")?;
            args.extend(["push".to_string(), local.to_string(), remote.to_string()]);
        }
        AdbAction::Pull { remote, local } => {
            let remote = required(remote, "pull requires a remote path")?;
            let local = required(local, "pull requires a local path")?;
            args.extend(["pull".to_string(), remote.to_string(), local.to_string()]);
        }
        AdbAction::Install { apk } => {
            let apk = required(apk, "install requires an APK path")?;
            args.extend(["install".to_string(), "-r".to_string(), apk.to_string()]);
        }
        AdbAction::Shell(cmd) => {
            let words = split_words(required(cmd, "shell requires a command")?)?;
            args.push("shell".to_string());
            args.extend(words);
        }
        AdbAction::Reboot(target) => {
            args.push("reboot".to_string());
            match target {
                RebootTarget::System => {}
                RebootTarget::Download => args.push("download".to_string()),
                RebootTarget::Recovery => args.push("recovery".to_string()),
            }
        }
        AdbAction::KillServer => args.push("kill-server".to_string()),
        AdbAction::StartServer => args.push("start-server".to_string()),
    }

    Ok(args)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdbDevice {
    pub serial: String,
    /// `device`, `offline`, `unauthorized`, ...
    pub state: String,
    /// Remaining `key:value` words from `devices -l`.
    pub details: Vec<String>,
}

/// Parse `adb devices -l`. The first line is the "List of devices" header.
pub fn parse_adb_devices(stdout: &str) -> Vec<AdbDevice> {
    stdout
        .lines()
        .skip(1)
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let serial = parts.next()?;
            Some(AdbDevice {
                serial: serial.to_string(),
                state: parts.next().unwrap_or_default().to_string(),
                details: parts.map(str::to_string).collect(),
            })
        })
        .collect()
}
