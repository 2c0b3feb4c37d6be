// src/tools/odin.rs

//! Argument construction and output parsing for `odin4`.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::errors::ToolError;

/// Firmware slots odin4 accepts, in the order their flags are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Partition {
    Bl,
    Ap,
    Cp,
    Csc,
    Ums,
}

impl Partition {
    pub fn flag(self) -> &'static str {
        match self {
            Partition::Bl => "-b",
            Partition::Ap => "-a",
            Partition::Cp => "-c",
            Partition::Csc => "-s",
            Partition::Ums => "-u",
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Partition::Bl => "BL",
            Partition::Ap => "AP",
            Partition::Cp => "CP",
            Partition::Csc => "CSC",
            Partition::Ums => "UMS",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Boolean odin4 switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlashOptions {
    /// `-e`
    pub nand_erase: bool,
    /// `-V`
    pub home_validate: bool,
    /// `--reboot`
    pub reboot: bool,
    /// `--redownload`
    pub redownload: bool,
}

impl FlashOptions {
    fn args(&self) -> impl Iterator<Item = &'static str> {
        [
            (self.nand_erase, "-e"),
            (self.home_validate, "-V"),
            (self.reboot, "--reboot"),
            (self.redownload, "--redownload"),
        ]
        .into_iter()
        .filter_map(|(on, flag)| on.then_some(flag))
    }
}

/// Everything one odin4 flash run needs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FlashPlan {
    pub files: BTreeMap<Partition, PathBuf>,
    pub options: FlashOptions,
    /// Device path for `-d`; `None` lets odin4 pick.
    pub device: Option<String>,
}

impl FlashPlan {
    pub fn set_file(&mut self, partition: Partition, path: impl Into<PathBuf>) {
        self.files.insert(partition, path.into());
    }

    /// At least one firmware file, and every selected file exists.
    pub fn validate(&self) -> Result<(), ToolError> {
        if self.files.is_empty() {
            return Err(ToolError::NoFirmwareFiles);
        }
        for (partition, path) in &self.files {
            if !path.is_file() {
                return Err(ToolError::MissingFile {
                    partition: partition.to_string(),
                    path: path.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        // BTreeMap iteration follows `Partition`'s declaration order.
        for (partition, path) in &self.files {
            args.push(partition.flag().to_string());
            args.push(path.to_string_lossy().into_owned());
        }

        args.extend(self.options.args().map(str::to_string));

        if let Some(device) = self.device.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            args.push("-d".to_string());
            args.push(device.to_string());
        }

        args
    }
}

pub fn list_devices_args() -> Vec<String> {
    vec!["-l".to_string()]
}

/// One device path per non-blank line of `odin4 -l`.
pub fn parse_odin_devices(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_follow_partition_then_option_order() {
        let mut plan = FlashPlan {
            options: FlashOptions {
                nand_erase: true,
                home_validate: false,
                reboot: true,
                redownload: true,
            },
            device: Some("/dev/bus/usb/001/004".to_string()),
            ..FlashPlan::default()
        };
        plan.set_file(Partition::Csc, "/fw/CSC.tar.md5");
        plan.set_file(Partition::Bl, "/fw/BL.tar.md5");
        plan.set_file(Partition::Ap, "/fw/AP.tar.md5");

        assert_eq!(
            plan.to_args(),
            vec![
                "-b", "/fw/BL.tar.md5",
                "-a", "/fw/AP.tar.md5",
                "-s", "/fw/CSC.tar.md5",
                "-e", "--reboot", "--redownload",
                "-d", "/dev/bus/usb/001/004",
            ]
        );
    }

    #[test]
    fn blank_device_is_omitted() {
        let mut plan = FlashPlan {
            device: Some("  ".to_string()),
            ..FlashPlan::default()
        };
        plan.set_file(Partition::Ap, "/fw/AP.tar.md5");
        assert_eq!(plan.to_args(), vec!["-a", "/fw/AP.tar.md5"]);
    }

    #[test]
    fn validate_requires_a_file() {
        assert_eq!(FlashPlan::default().validate(), Err(ToolError::NoFirmwareFiles));
    }

    #[test]
    fn validate_reports_missing_file() {
        let mut plan = FlashPlan::default();
        plan.set_file(Partition::Ap, "/no/such/AP.tar.md5");
        assert!(matches!(
            plan.validate(),
            Err(ToolError::MissingFile { ref partition, .. }) if partition == "AP"
        ));
    }

    #[test]
    fn device_listing_skips_blank_lines() {
        let out = "\n/dev/bus/usb/001/004\n  \n/dev/bus/usb/001/005  \n";
        assert_eq!(
            parse_odin_devices(out),
            vec!["/dev/bus/usb/001/004", "/dev/bus/usb/001/005"]
        );
    }
}
