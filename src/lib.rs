// src/lib.rs

pub mod app;
pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod firmware;
pub mod log_buffer;
pub mod logging;
pub mod tools;
pub mod types;

use anyhow::Result;
use tracing::{debug, info};

use crate::app::App;
use crate::cli::{CliArgs, Command};
use crate::config::load_or_default;
use crate::exec::ProcessRunner;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the process runner
/// - Ctrl-C handling (cancels every running tool)
/// - the selected command
///
/// Returns the process exit code.
pub async fn run(args: CliArgs) -> Result<i32> {
    let config = load_or_default(args.config.as_deref())?;
    debug!(
        odin = %config.tools.odin_path().display(),
        adb = %config.tools.adb_path().display(),
        grace_ms = config.grace_period.as_millis() as u64,
        profiles = config.profiles.len(),
        "configuration loaded"
    );

    let runner = ProcessRunner::new(config.runner_options());

    // Ctrl-C → cancel running tools; their completion ends the command.
    {
        let runner = runner.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("Ctrl+C received");
            runner.cancel_all();
        });
    }

    let mut app = App::new(config, runner, args.timeout);

    let code = match &args.command {
        Command::Flash(flash) => app.flash(flash).await?,
        Command::Devices => app.devices().await?,
        Command::Adb(adb) => app.adb(adb).await?,
        Command::Detect(detect) => app.detect(detect)?,
        Command::Profiles => app.profiles()?,
    };

    app.save_log()?;
    Ok(code)
}
