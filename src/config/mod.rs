// src/config/mod.rs

//! Configuration loading and validation for flashrun.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate it into a [`Config`] with profiles resolved (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{
    Config, FlagOverrides, FlashSection, LogSection, Profile, ProfileConfig, RawConfigFile,
    RunnerSection, ToolsSection,
};
