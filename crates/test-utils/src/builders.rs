#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use flashrun::config::{Config, FlagOverrides, ProfileConfig, RawConfigFile};

/// Builder for `Config` to simplify test setup.
pub struct ConfigBuilder {
    config: RawConfigFile,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_odin(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tools.odin = Some(path.into());
        self
    }

    pub fn with_adb(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tools.adb = Some(path.into());
        self
    }

    pub fn with_grace_period(mut self, grace: &str) -> Self {
        self.config.runner.grace_period = grace.to_string();
        self
    }

    pub fn with_max_lines(mut self, max_lines: usize) -> Self {
        self.config.log.max_lines = max_lines;
        self
    }

    pub fn with_profile(mut self, id: &str, profile: ProfileConfig) -> Self {
        self.config.profile.insert(id.to_string(), profile);
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> Config {
        Config::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `ProfileConfig`.
pub struct ProfileBuilder {
    profile: ProfileConfig,
}

impl ProfileBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            profile: ProfileConfig {
                name: Some(name.to_string()),
                model: String::new(),
                notes: String::new(),
                prefer_home_csc: None,
                patterns: BTreeMap::new(),
                flags: FlagOverrides::default(),
            },
        }
    }

    pub fn model(mut self, model: &str) -> Self {
        self.profile.model = model.to_string();
        self
    }

    pub fn pattern(mut self, key: &str, pattern: &str) -> Self {
        self.profile
            .patterns
            .insert(key.to_string(), pattern.to_string());
        self
    }

    pub fn prefer_home_csc(mut self, val: bool) -> Self {
        self.profile.prefer_home_csc = Some(val);
        self
    }

    pub fn nand_erase(mut self, val: bool) -> Self {
        self.profile.flags.nand_erase = Some(val);
        self
    }

    pub fn reboot(mut self, val: bool) -> Self {
        self.profile.flags.reboot = Some(val);
        self
    }

    pub fn build(self) -> ProfileConfig {
        self.profile
    }
}
