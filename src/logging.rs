// src/logging.rs

//! Logging setup for `flashrun` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the filter:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `FLASHRUN_LOG` environment variable, either a bare level ("debug") or
//!    full directives ("flashrun::exec=trace,warn")
//! 3. default to `warn`
//!
//! Logs are sent to STDERR; stdout carries the session log (tool output
//! plus front-end messages).

use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "FLASHRUN_LOG";

const DEFAULT_DIRECTIVES: &str = "warn";

/// Initialise the global logging subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = build_filter(cli_level, std::env::var(LOG_ENV).ok().as_deref());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("initialising logging: {e}"))
}

fn build_filter(cli_level: Option<LogLevel>, env_value: Option<&str>) -> EnvFilter {
    if let Some(level) = cli_level {
        return EnvFilter::new(level_directive(level));
    }

    env_value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| {
            let lowered = v.to_lowercase();
            let directives = if lowered == "warning" { "warn" } else { lowered.as_str() };
            EnvFilter::try_new(directives).ok()
        })
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVES))
}

fn level_directive(lvl: LogLevel) -> &'static str {
    match lvl {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::level_filters::LevelFilter;

    #[test]
    fn cli_level_wins_over_env() {
        let filter = build_filter(Some(LogLevel::Debug), Some("error"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn env_accepts_levels_and_directives() {
        let filter = build_filter(None, Some(" Warning "));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));

        let filter = build_filter(None, Some("flashrun::exec=trace,warn"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));
    }

    #[test]
    fn garbage_falls_back_to_warn() {
        let filter = build_filter(None, Some("flashrun=loudest"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));
        let filter = build_filter(None, None);
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));
    }
}
