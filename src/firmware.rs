// src/firmware.rs

//! Firmware autodiscovery.
//!
//! Given a folder and per-partition glob patterns, pick the firmware archive
//! for each odin4 slot. Matching is on file names only and non-recursive;
//! when several files match, the lexicographically first one wins.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};
use tracing::debug;

use crate::errors::FirmwareError;
use crate::tools::Partition;

/// Glob per slot. `None` disables detection for that slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwarePatterns {
    pub bl: Option<String>,
    pub ap: Option<String>,
    pub cp: Option<String>,
    pub csc: Option<String>,
    pub home_csc: Option<String>,
    pub ums: Option<String>,
}

impl Default for FirmwarePatterns {
    fn default() -> Self {
        Self {
            bl: Some("BL_*.tar.md5".to_string()),
            ap: Some("AP_*.tar.md5".to_string()),
            cp: Some("CP_*.tar.md5".to_string()),
            csc: Some("CSC_*.tar.md5".to_string()),
            home_csc: Some("HOME_CSC_*.tar.md5".to_string()),
            ums: None,
        }
    }
}

/// Pattern keys as written in config files.
pub const PATTERN_KEYS: [&str; 6] = ["BL", "AP", "CP", "CSC", "HOME_CSC", "UMS"];

impl FirmwarePatterns {
    /// Mutable slot for a config key (`"BL"`, `"HOME_CSC"`, ...).
    pub fn slot_mut(&mut self, key: &str) -> Option<&mut Option<String>> {
        match key.trim().to_uppercase().as_str() {
            "BL" => Some(&mut self.bl),
            "AP" => Some(&mut self.ap),
            "CP" => Some(&mut self.cp),
            "CSC" => Some(&mut self.csc),
            "HOME_CSC" => Some(&mut self.home_csc),
            "UMS" => Some(&mut self.ums),
            _ => None,
        }
    }

    fn entries(&self) -> [(&'static str, Option<&str>); 6] {
        [
            ("BL", self.bl.as_deref()),
            ("AP", self.ap.as_deref()),
            ("CP", self.cp.as_deref()),
            ("CSC", self.csc.as_deref()),
            ("HOME_CSC", self.home_csc.as_deref()),
            ("UMS", self.ums.as_deref()),
        ]
    }

    /// Compile every pattern, failing on the first invalid one.
    pub fn check(&self) -> Result<(), FirmwareError> {
        for (key, pattern) in self.entries() {
            if let Some(pattern) = pattern {
                compile(key, pattern)?;
            }
        }
        Ok(())
    }
}

fn compile(key: &str, pattern: &str) -> Result<GlobMatcher, FirmwareError> {
    Glob::new(pattern)
        .map(|g| g.compile_matcher())
        .map_err(|source| FirmwareError::Pattern {
            key: key.to_string(),
            pattern: pattern.to_string(),
            source,
        })
}

/// Detect firmware archives in `folder`.
///
/// With `prefer_home_csc`, a HOME_CSC match takes the CSC slot; otherwise (or
/// if no HOME_CSC file exists) the plain CSC match is used.
pub fn detect_firmware(
    folder: &Path,
    patterns: &FirmwarePatterns,
    prefer_home_csc: bool,
) -> Result<BTreeMap<Partition, PathBuf>, FirmwareError> {
    if !folder.is_dir() {
        return Err(FirmwareError::FolderNotFound(folder.to_path_buf()));
    }

    let mut names: Vec<(String, PathBuf)> = Vec::new();
    for entry in fs::read_dir(folder)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            names.push((name.to_string(), path.clone()));
        }
    }
    names.sort();

    let first_match = |key: &str, pattern: Option<&str>| -> Result<Option<PathBuf>, FirmwareError> {
        let Some(pattern) = pattern.filter(|p| !p.trim().is_empty()) else {
            return Ok(None);
        };
        let matcher = compile(key, pattern)?;
        Ok(names
            .iter()
            .find(|(name, _)| matcher.is_match(name))
            .map(|(_, path)| path.clone()))
    };

    let mut found = BTreeMap::new();
    let slots = [
        (Partition::Bl, "BL", patterns.bl.as_deref()),
        (Partition::Ap, "AP", patterns.ap.as_deref()),
        (Partition::Cp, "CP", patterns.cp.as_deref()),
        (Partition::Ums, "UMS", patterns.ums.as_deref()),
    ];
    for (partition, key, pattern) in slots {
        if let Some(path) = first_match(key, pattern)? {
            found.insert(partition, path);
        }
    }

    let csc = first_match("CSC", patterns.csc.as_deref())?;
    let home_csc = first_match("HOME_CSC", patterns.home_csc.as_deref())?;
    let chosen = match (prefer_home_csc, home_csc) {
        (true, Some(home)) => Some(home),
        _ => csc,
    };
    if let Some(path) = chosen {
        found.insert(Partition::Csc, path);
    }

    debug!(folder = %folder.display(), found = found.len(), "firmware detection finished");
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_keys_are_case_insensitive() {
        let mut patterns = FirmwarePatterns::default();
        *patterns.slot_mut("home_csc").unwrap() = Some("H_*".to_string());
        assert_eq!(patterns.home_csc.as_deref(), Some("H_*"));
        assert!(patterns.slot_mut("PIT").is_none());
    }

    #[test]
    fn invalid_pattern_is_reported_with_its_key() {
        let patterns = FirmwarePatterns {
            ap: Some("AP_[*.tar".to_string()),
            ..FirmwarePatterns::default()
        };
        match patterns.check() {
            Err(FirmwareError::Pattern { key, .. }) => assert_eq!(key, "AP"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn missing_folder_is_an_error() {
        let err = detect_firmware(Path::new("/no/such/folder"), &FirmwarePatterns::default(), true)
            .unwrap_err();
        assert!(matches!(err, FirmwareError::FolderNotFound(_)));
    }
}
