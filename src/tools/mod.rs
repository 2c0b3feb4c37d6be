// src/tools/mod.rs

//! Translating user intent into the external tools' command lines.
//!
//! The tools' CLI conventions are treated as an opaque contract: these
//! builders only produce argument vectors and parse listings, they never
//! interpret exit codes.

pub mod adb;
pub mod odin;
pub mod shell;

pub use adb::{AdbAction, AdbDevice, RebootTarget, adb_args, parse_adb_devices};
pub use odin::{FlashOptions, FlashPlan, Partition, list_devices_args, parse_odin_devices};
pub use shell::{command_preview, quote_word, split_words};
