// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::types::parse_duration;

/// Command-line arguments for `flashrun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "flashrun",
    version,
    about = "Front-end for odin4 and adb: build the command, run it, stream its log.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `$FLASHRUN_CONFIG`, then `flashrun/flashrun.toml` in the
    /// platform config directory. Missing default file means built-in
    /// defaults.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `FLASHRUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    /// Cancel the external tool if it runs longer than this (e.g. `90s`).
    #[arg(long, value_name = "DURATION", value_parser = parse_duration, global = true)]
    pub timeout: Option<Duration>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Flash firmware with odin4.
    Flash(FlashArgs),
    /// List devices seen by odin4 and adb.
    Devices,
    /// Run one adb action.
    Adb(AdbArgs),
    /// Show which firmware files would be picked from a folder.
    Detect(DetectArgs),
    /// List configured device profiles.
    Profiles,
}

#[derive(Debug, Clone, Default, Args)]
pub struct FlashArgs {
    #[arg(long, value_name = "FILE")]
    pub bl: Option<PathBuf>,
    #[arg(long, value_name = "FILE")]
    pub ap: Option<PathBuf>,
    #[arg(long, value_name = "FILE")]
    pub cp: Option<PathBuf>,
    #[arg(long, value_name = "FILE")]
    pub csc: Option<PathBuf>,
    #[arg(long, value_name = "FILE")]
    pub ums: Option<PathBuf>,

    /// Autodetect firmware files in this folder. Explicit file flags win.
    #[arg(long, value_name = "DIR")]
    pub firmware_dir: Option<PathBuf>,

    /// Apply a device profile's patterns and flags.
    #[arg(long, value_name = "ID")]
    pub profile: Option<String>,

    /// Use CSC instead of HOME_CSC during autodetection.
    #[arg(long)]
    pub no_home_csc: bool,

    /// Nand erase (`-e`).
    #[arg(long)]
    pub nand_erase: bool,

    /// Home binary validation (`-V`).
    #[arg(long)]
    pub home_validate: bool,

    /// Reboot after flashing (`--reboot`).
    #[arg(long, overrides_with = "no_reboot")]
    pub reboot: bool,

    /// Do not reboot after flashing.
    #[arg(long)]
    pub no_reboot: bool,

    /// Reboot into download mode again (`--redownload`).
    #[arg(long)]
    pub redownload: bool,

    /// Device path passed as `-d`.
    #[arg(long, value_name = "PATH")]
    pub device: Option<String>,

    /// Print the command without running it.
    #[arg(long)]
    pub dry_run: bool,

    /// Confirm that flashing may brick the device and the device is in
    /// download mode.
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(Debug, Clone, Args)]
pub struct AdbArgs {
    /// Target device serial (`-s`).
    #[arg(long, short = 's', value_name = "SERIAL")]
    pub serial: Option<String>,

    #[command(subcommand)]
    pub action: AdbCommand,
}

#[derive(Debug, Clone, Subcommand)]
pub enum AdbCommand {
    Devices,
    Push {
        local: String,
        remote: String,
    },
    Pull {
        remote: String,
        local: String,
    },
    Install {
        apk: String,
    },
    Shell {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    Reboot {
        #[arg(value_enum)]
        target: Option<RebootArg>,
    },
    KillServer,
    StartServer,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum RebootArg {
    System,
    Download,
    Recovery,
}

#[derive(Debug, Clone, Args)]
pub struct DetectArgs {
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,

    #[arg(long, value_name = "ID")]
    pub profile: Option<String>,

    #[arg(long)]
    pub no_home_csc: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flash_with_global_timeout() {
        let args = CliArgs::try_parse_from([
            "flashrun", "flash", "--ap", "/fw/AP.tar.md5", "--no-reboot", "--timeout", "90s",
        ])
        .unwrap();
        assert_eq!(args.timeout, Some(Duration::from_secs(90)));
        match args.command {
            Command::Flash(flash) => {
                assert_eq!(flash.ap, Some(PathBuf::from("/fw/AP.tar.md5")));
                assert!(flash.no_reboot);
                assert!(!flash.reboot);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn adb_shell_keeps_hyphenated_words() {
        let args =
            CliArgs::try_parse_from(["flashrun", "adb", "-s", "R58M", "shell", "ls", "-la"]).unwrap();
        match args.command {
            Command::Adb(adb) => {
                assert_eq!(adb.serial.as_deref(), Some("R58M"));
                match adb.action {
                    AdbCommand::Shell { command } => assert_eq!(command, vec!["ls", "-la"]),
                    other => panic!("unexpected action: {other:?}"),
                }
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn bad_timeout_is_rejected() {
        assert!(CliArgs::try_parse_from(["flashrun", "--timeout", "soon", "devices"]).is_err());
    }
}
