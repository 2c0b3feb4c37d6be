// src/config/validate.rs

use std::collections::BTreeMap;

use crate::config::model::{Config, Profile, ProfileConfig, RawConfigFile};
use crate::errors::{FlashrunError, Result};
use crate::firmware::{FirmwarePatterns, PATTERN_KEYS};
use crate::types::parse_duration;

impl TryFrom<RawConfigFile> for Config {
    type Error = FlashrunError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let grace_period = parse_duration(&raw.runner.grace_period)
            .map_err(|e| FlashrunError::ConfigError(format!("[runner].grace_period: {e}")))?;
        if grace_period.is_zero() {
            return Err(FlashrunError::ConfigError(
                "[runner].grace_period must be greater than zero".to_string(),
            ));
        }

        if raw.log.max_lines == 0 {
            return Err(FlashrunError::ConfigError(
                "[log].max_lines must be >= 1 (got 0)".to_string(),
            ));
        }

        let mut profiles = BTreeMap::new();
        for (id, profile) in raw.profile.iter() {
            let resolved = resolve_profile(id, profile, &raw)?;
            profiles.insert(id.clone(), resolved);
        }

        Ok(Config::new_unchecked(
            raw.tools,
            grace_period,
            raw.log,
            raw.flash,
            profiles,
        ))
    }
}

fn resolve_profile(id: &str, cfg: &ProfileConfig, raw: &RawConfigFile) -> Result<Profile> {
    if id.trim().is_empty() {
        return Err(FlashrunError::ConfigError(
            "profile id must not be empty".to_string(),
        ));
    }

    let mut patterns = FirmwarePatterns::default();
    for (key, pattern) in cfg.patterns.iter() {
        let slot = patterns.slot_mut(key).ok_or_else(|| {
            FlashrunError::ConfigError(format!(
                "profile '{}' has unknown pattern key '{}' (expected one of {})",
                id,
                key,
                PATTERN_KEYS.join(", ")
            ))
        })?;
        *slot = Some(pattern.clone());
    }
    patterns.check().map_err(|e| {
        FlashrunError::ConfigError(format!("profile '{}': {}", id, e))
    })?;

    Ok(Profile {
        id: id.to_string(),
        name: cfg.name.clone().unwrap_or_else(|| id.to_string()),
        model: cfg.model.clone(),
        notes: cfg.notes.clone(),
        patterns,
        options: cfg.flags.apply(raw.flash.options()),
        prefer_home_csc: cfg.prefer_home_csc.unwrap_or(raw.flash.prefer_home_csc),
    })
}
