// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::exec::RunnerOptions;
use crate::firmware::FirmwarePatterns;
use crate::log_buffer::DEFAULT_MAX_LINES;
use crate::tools::FlashOptions;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [tools]
/// odin = "/opt/odin4/odin4"
///
/// [runner]
/// grace_period = "3s"
///
/// [flash]
/// reboot = true
///
/// [profile.s21]
/// name = "Galaxy S21"
/// patterns = { AP = "AP_G991B*.tar.md5" }
/// flags = { nand_erase = false }
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub tools: ToolsSection,

    #[serde(default)]
    pub runner: RunnerSection,

    #[serde(default)]
    pub log: LogSection,

    #[serde(default)]
    pub flash: FlashSection,

    /// All profiles from `[profile.<id>]`.
    #[serde(default)]
    pub profile: BTreeMap<String, ProfileConfig>,
}

/// `[tools]` section: where the external binaries live.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct ToolsSection {
    #[serde(default)]
    pub odin: Option<PathBuf>,

    #[serde(default)]
    pub adb: Option<PathBuf>,
}

impl ToolsSection {
    pub fn odin_path(&self) -> PathBuf {
        resolve_tool(self.odin.as_deref(), "odin4")
    }

    pub fn adb_path(&self) -> PathBuf {
        resolve_tool(self.adb.as_deref(), "adb")
    }
}

/// Configured path, else a binary shipped next to our own executable, else
/// the bare name (resolved through `PATH` with `which` at launch).
fn resolve_tool(configured: Option<&Path>, name: &str) -> PathBuf {
    if let Some(path) = configured.filter(|p| !p.as_os_str().is_empty()) {
        return path.to_path_buf();
    }

    let bundled = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(name)))
        .filter(|candidate| candidate.is_file());

    bundled.unwrap_or_else(|| PathBuf::from(name))
}

/// `[runner]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerSection {
    /// SIGTERM → SIGKILL escalation delay, e.g. `"3s"`.
    #[serde(default = "default_grace_period")]
    pub grace_period: String,
}

fn default_grace_period() -> String {
    "3s".to_string()
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            grace_period: default_grace_period(),
        }
    }
}

/// `[log]` section.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LogSection {
    #[serde(default = "default_true")]
    pub timestamps: bool,

    #[serde(default = "default_max_lines")]
    pub max_lines: usize,

    /// If set, the session log is written here when the command finishes.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_max_lines() -> usize {
    DEFAULT_MAX_LINES
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            timestamps: true,
            max_lines: DEFAULT_MAX_LINES,
            file: None,
        }
    }
}

/// `[flash]` section: defaults for odin4 switches.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct FlashSection {
    #[serde(default = "default_true")]
    pub prefer_home_csc: bool,

    #[serde(default = "default_true")]
    pub reboot: bool,

    #[serde(default)]
    pub nand_erase: bool,

    #[serde(default)]
    pub home_validate: bool,

    #[serde(default)]
    pub redownload: bool,
}

impl Default for FlashSection {
    fn default() -> Self {
        Self {
            prefer_home_csc: true,
            reboot: true,
            nand_erase: false,
            home_validate: false,
            redownload: false,
        }
    }
}

impl FlashSection {
    pub fn options(&self) -> FlashOptions {
        FlashOptions {
            nand_erase: self.nand_erase,
            home_validate: self.home_validate,
            reboot: self.reboot,
            redownload: self.redownload,
        }
    }
}

/// `[profile.<id>]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProfileConfig {
    /// Display name; defaults to the profile id.
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub model: String,

    #[serde(default)]
    pub notes: String,

    /// Overrides `[flash].prefer_home_csc`.
    #[serde(default)]
    pub prefer_home_csc: Option<bool>,

    /// Keys `BL`, `AP`, `CP`, `CSC`, `HOME_CSC`, `UMS`; each replaces the
    /// built-in default pattern for that slot.
    #[serde(default)]
    pub patterns: BTreeMap<String, String>,

    #[serde(default)]
    pub flags: FlagOverrides,
}

/// Per-profile overrides of the `[flash]` switches.
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
pub struct FlagOverrides {
    #[serde(default)]
    pub nand_erase: Option<bool>,
    #[serde(default)]
    pub home_validate: Option<bool>,
    #[serde(default)]
    pub reboot: Option<bool>,
    #[serde(default)]
    pub redownload: Option<bool>,
}

impl FlagOverrides {
    pub fn apply(&self, base: FlashOptions) -> FlashOptions {
        FlashOptions {
            nand_erase: self.nand_erase.unwrap_or(base.nand_erase),
            home_validate: self.home_validate.unwrap_or(base.home_validate),
            reboot: self.reboot.unwrap_or(base.reboot),
            redownload: self.redownload.unwrap_or(base.redownload),
        }
    }
}

/// A validated device profile with defaults already merged in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub model: String,
    pub notes: String,
    pub patterns: FirmwarePatterns,
    pub options: FlashOptions,
    pub prefer_home_csc: bool,
}

/// Validated configuration. Build it through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct Config {
    pub tools: ToolsSection,
    pub grace_period: Duration,
    pub log: LogSection,
    pub flash: FlashSection,
    pub profiles: BTreeMap<String, Profile>,
}

impl Config {
    pub(crate) fn new_unchecked(
        tools: ToolsSection,
        grace_period: Duration,
        log: LogSection,
        flash: FlashSection,
        profiles: BTreeMap<String, Profile>,
    ) -> Self {
        Self {
            tools,
            grace_period,
            log,
            flash,
            profiles,
        }
    }

    pub fn runner_options(&self) -> RunnerOptions {
        RunnerOptions {
            grace_period: self.grace_period,
        }
    }

    pub fn profile(&self, id: &str) -> Option<&Profile> {
        self.profiles.get(id)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tools: ToolsSection::default(),
            grace_period: crate::exec::DEFAULT_GRACE_PERIOD,
            log: LogSection::default(),
            flash: FlashSection::default(),
            profiles: BTreeMap::new(),
        }
    }
}
