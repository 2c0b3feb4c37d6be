// src/app/mod.rs

//! Command handlers behind the CLI.
//!
//! The [`App`] plays the part of the rendering collaborator: it builds
//! invocation requests from flags, profiles and detected files, hands them
//! to the [`ProcessRunner`], and renders what comes back into the session
//! log on stdout.

pub mod session;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::{AdbArgs, AdbCommand, DetectArgs, FlashArgs, RebootArg};
use crate::config::{Config, Profile};
use crate::errors::{FlashrunError, ToolError};
use crate::exec::{InvocationRequest, ProcessHandle, ProcessRunner};
use crate::firmware::{FirmwarePatterns, detect_firmware};
use crate::log_buffer::LogBuffer;
use crate::tools::{
    AdbAction, FlashPlan, Partition, RebootTarget, adb_args, command_preview,
    list_devices_args, parse_adb_devices, parse_odin_devices, quote_word,
};

use session::{Captured, arm_timeout, collect, exit_code_for, stream_to_log};

/// Exit code when flashing was not confirmed with `--yes`.
pub const EXIT_NOT_CONFIRMED: i32 = 2;

pub struct App {
    config: Config,
    runner: ProcessRunner,
    log: LogBuffer,
    timeout: Option<Duration>,
}

impl App {
    pub fn new(config: Config, runner: ProcessRunner, timeout: Option<Duration>) -> Self {
        let log = LogBuffer::new(config.log.max_lines, config.log.timestamps);
        Self {
            config,
            runner,
            log,
            timeout,
        }
    }

    pub fn log(&self) -> &LogBuffer {
        &self.log
    }

    /// Record a front-end message in the session log and print it.
    fn note(&mut self, message: &str) {
        if let Some(line) = self.log.push(message) {
            println!("{line}");
        }
    }

    /// Write the session log to `[log].file`, if configured.
    pub fn save_log(&self) -> Result<()> {
        if let Some(path) = &self.config.log.file {
            self.log.save(path)?;
            info!(path = %path.display(), lines = self.log.len(), "session log saved");
        }
        Ok(())
    }

    fn profile(&self, id: Option<&str>) -> Result<Option<&Profile>> {
        match id {
            None => Ok(None),
            Some(id) => self
                .config
                .profile(id)
                .map(Some)
                .ok_or_else(|| FlashrunError::ProfileNotFound(id.to_string()).into()),
        }
    }

    /// Launch `request`, stream its output into the log, return the exit code.
    async fn run_streaming(&mut self, request: InvocationRequest) -> Result<i32> {
        let mut handle = self
            .runner
            .launch(request)
            .context("launching external tool")?;
        let timer = arm_timeout(&self.runner, handle.id(), self.timeout);

        let result = stream_to_log(&mut handle, &mut self.log).await;
        if let Some(timer) = timer {
            timer.abort();
        }

        self.note(&format!(
            "Finished with code {} ({}) after {:.1}s",
            result.exit_code,
            result.status,
            result.elapsed.as_secs_f64()
        ));
        Ok(exit_code_for(&result))
    }

    pub async fn flash(&mut self, args: &FlashArgs) -> Result<i32> {
        let profile = self.profile(args.profile.as_deref())?.cloned();

        let base_options = profile
            .as_ref()
            .map(|p| p.options)
            .unwrap_or_else(|| self.config.flash.options());
        let prefer_home_csc = !args.no_home_csc
            && profile
                .as_ref()
                .map(|p| p.prefer_home_csc)
                .unwrap_or(self.config.flash.prefer_home_csc);

        let mut plan = FlashPlan::default();

        if let Some(dir) = &args.firmware_dir {
            let patterns = profile
                .as_ref()
                .map(|p| p.patterns.clone())
                .unwrap_or_default();
            let found = detect_firmware(dir, &patterns, prefer_home_csc)?;
            if found.is_empty() {
                self.note("No firmware files matched the patterns");
            } else {
                self.note("Firmware auto-detect completed");
            }
            plan.files.extend(found);
        }

        let explicit = [
            (Partition::Bl, &args.bl),
            (Partition::Ap, &args.ap),
            (Partition::Cp, &args.cp),
            (Partition::Csc, &args.csc),
            (Partition::Ums, &args.ums),
        ];
        for (partition, path) in explicit {
            if let Some(path) = path {
                plan.set_file(partition, path);
            }
        }

        plan.options = base_options;
        plan.options.nand_erase |= args.nand_erase;
        plan.options.home_validate |= args.home_validate;
        plan.options.redownload |= args.redownload;
        if args.no_reboot {
            plan.options.reboot = false;
        } else if args.reboot {
            plan.options.reboot = true;
        }
        plan.device = args.device.clone();

        if let Some(profile) = &profile {
            self.note(&format!("Profile applied: {} ({})", profile.name, profile.id));
        }

        let odin = self.config.tools.odin_path();
        let odin_args = plan.to_args();
        let preview = command_preview(&odin, &odin_args);

        if args.dry_run {
            if plan.files.is_empty() {
                return Err(ToolError::NoFirmwareFiles.into());
            }
            println!("{preview}");
            return Ok(0);
        }

        plan.validate()?;

        if !args.yes {
            self.note(&format!("Command: {preview}"));
            self.note("Flashing can brick the device. Put it in download mode and re-run with --yes.");
            return Ok(EXIT_NOT_CONFIRMED);
        }

        self.note(&format!("Starting flash: {preview}"));
        let request = InvocationRequest::new(odin).args(odin_args);
        self.run_streaming(request).await
    }

    pub async fn devices(&mut self) -> Result<i32> {
        let odin = self.launch_quiet(
            "odin4",
            InvocationRequest::new(self.config.tools.odin_path()).args(list_devices_args()),
        );
        let adb_request = InvocationRequest::new(self.config.tools.adb_path())
            .args(adb_args(None, &AdbAction::Devices)?);
        let adb = self.launch_quiet("adb", adb_request);

        let (odin, adb) = tokio::join!(self.collect_timed(odin), self.collect_timed(adb));

        let mut any_ok = false;

        if let Some(odin) = odin {
            if odin.result.is_success() {
                any_ok = true;
                let devices = parse_odin_devices(&odin.stdout_text());
                self.note(&format!("odin4 devices: {}", devices.len()));
                for device in devices {
                    self.note(&format!("  {device}"));
                }
            } else {
                self.note("odin4 -l failed");
                self.note_events(&odin);
            }
        }

        if let Some(adb) = adb {
            if adb.result.is_success() {
                any_ok = true;
                let devices = parse_adb_devices(&adb.stdout_text());
                self.note(&format!("adb devices: {}", devices.len()));
                for device in devices {
                    self.note(&format!(
                        "  {} {} {}",
                        device.serial,
                        device.state,
                        device.details.join(" ")
                    ));
                }
            } else {
                self.note("adb devices failed");
                self.note_events(&adb);
            }
        }

        Ok(if any_ok { 0 } else { 1 })
    }

    fn launch_quiet(&mut self, name: &str, request: InvocationRequest) -> Option<ProcessHandle> {
        match self.runner.launch(request) {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!(tool = name, error = %err, "could not launch");
                self.note(&format!("{name}: {err}"));
                None
            }
        }
    }

    async fn collect_timed(&self, handle: Option<ProcessHandle>) -> Option<Captured> {
        let handle = handle?;
        let timer = arm_timeout(&self.runner, handle.id(), self.timeout);
        let captured = collect(handle).await;
        if let Some(timer) = timer {
            timer.abort();
        }
        Some(captured)
    }

    fn note_events(&mut self, captured: &Captured) {
        for event in &captured.events {
            if let Some(line) = self.log.push_event(event) {
                println!("{line}");
            }
        }
    }

    pub async fn adb(&mut self, args: &AdbArgs) -> Result<i32> {
        let action = match &args.action {
            AdbCommand::Devices => AdbAction::Devices,
            AdbCommand::Push { local, remote } => AdbAction::Push {
                local: local.clone(),
                remote: remote.clone(),
            },
            AdbCommand::Pull { remote, local } => AdbAction::Pull {
                remote: remote.clone(),
                local: local.clone(),
            },
            AdbCommand::Install { apk } => AdbAction::Install { apk: apk.clone() },
            AdbCommand::Shell { command } => AdbAction::Shell(
                command
                    .iter()
                    .map(|w| quote_word(w))
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            AdbCommand::Reboot { target } => AdbAction::Reboot(match target {
                None | Some(RebootArg::System) => RebootTarget::System,
                Some(RebootArg::Download) => RebootTarget::Download,
                Some(RebootArg::Recovery) => RebootTarget::Recovery,
            }),
            AdbCommand::KillServer => AdbAction::KillServer,
            AdbCommand::StartServer => AdbAction::StartServer,
        };

        let argv = adb_args(args.serial.as_deref(), &action)?;
        let adb = self.config.tools.adb_path();
        self.note(&format!("adb {action}: {}", command_preview(&adb, &argv)));
        self.run_streaming(InvocationRequest::new(adb).args(argv)).await
    }

    pub fn detect(&mut self, args: &DetectArgs) -> Result<i32> {
        let profile = self.profile(args.profile.as_deref())?.cloned();
        let patterns = profile
            .as_ref()
            .map(|p| p.patterns.clone())
            .unwrap_or_else(FirmwarePatterns::default);
        let prefer_home_csc = !args.no_home_csc
            && profile
                .as_ref()
                .map(|p| p.prefer_home_csc)
                .unwrap_or(self.config.flash.prefer_home_csc);

        let found: BTreeMap<Partition, PathBuf> = detect_firmware(&args.dir, &patterns, prefer_home_csc)?;
        if found.is_empty() {
            self.note("No firmware files matched the patterns");
        }
        for (partition, path) in &found {
            println!("{partition}: {}", path.display());
        }
        Ok(0)
    }

    pub fn profiles(&self) -> Result<i32> {
        if self.config.profiles.is_empty() {
            println!("no profiles configured");
            return Ok(0);
        }

        for profile in self.config.profiles.values() {
            println!("{} ({})", profile.id, profile.name);
            if !profile.model.is_empty() {
                println!("    model: {}", profile.model);
            }
            if !profile.notes.is_empty() {
                println!("    notes: {}", profile.notes);
            }
            println!("    prefer HOME_CSC: {}", profile.prefer_home_csc);
            println!("    flags: {:?}", profile.options);
            for (key, pattern) in [
                ("BL", &profile.patterns.bl),
                ("AP", &profile.patterns.ap),
                ("CP", &profile.patterns.cp),
                ("CSC", &profile.patterns.csc),
                ("HOME_CSC", &profile.patterns.home_csc),
                ("UMS", &profile.patterns.ums),
            ] {
                if let Some(pattern) = pattern {
                    println!("    {key}: {pattern}");
                }
            }
        }
        Ok(0)
    }
}
