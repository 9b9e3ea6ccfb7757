//! Tracing subscriber setup.
//!
//! Filter comes from `LIFESYNC_LOG` (e.g. `lifesync=debug,lifesync::child=warn`),
//! falling back to `debug` with `-v` and `info` otherwise. Output goes to
//! stderr so command output on stdout stays clean.

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

pub const LOG_ENV: &str = "LIFESYNC_LOG";
pub const MONITOR_LOG_FILE: &str = "monitor.log";

fn filter(verbose: bool) -> EnvFilter {
    let default = if verbose { "debug" } else { "info" };
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default))
}

/// Install the stderr subscriber for ordinary commands.
pub fn init(verbose: bool) {
    // A second init (tests calling into main paths) is harmless.
    let _ = tracing_subscriber::registry()
        .with(filter(verbose))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(verbose))
        .try_init();
}

/// Install stderr plus a daily-rolling `monitor.log` under `log_dir`.
///
/// The returned guard flushes the file writer on drop; keep it alive for the
/// life of the process.
pub fn init_with_file(verbose: bool, log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;
    let appender = tracing_appender::rolling::daily(log_dir, MONITOR_LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter(verbose))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()
        .context("Failed to install logging")?;
    Ok(guard)
}
