//! Server watchdog command: `lifesync monitor`.

use std::path::Path;

use anyhow::{Result, bail};
use console::style;
use lifesync::config::Settings;
use lifesync::ui::icons::{CHECK, HEART, RESTART};
use lifesync::watchdog::config::MONITOR_FILE;
use lifesync::watchdog::{MonitorConfig, Watchdog, WatchdogExit, WatchdogState};

pub async fn cmd_monitor(
    settings: &Settings,
    config_path: Option<&Path>,
    init: bool,
    verbose: bool,
) -> Result<()> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| settings.config_dir.join(MONITOR_FILE));

    if init {
        if path.exists() {
            bail!("{} already exists", path.display());
        }
        MonitorConfig::default().save(&path)?;
        println!("{}Wrote default monitor config to {}", CHECK, path.display());
        return Ok(());
    }

    let _log_guard = lifesync::logging::init_with_file(verbose, &settings.data_dir)?;
    settings.warn_config_error();

    let mut config = MonitorConfig::load(&path)?;
    config.apply_env(|key| std::env::var(key).ok())?;
    let problems = config.validate();
    if !problems.is_empty() {
        bail!("Invalid monitor config:\n  {}", problems.join("\n  "));
    }

    let command = config.command();
    println!(
        "{}Monitoring `{}` (checks against {}, up to {} restarts)",
        HEART,
        command.display(),
        config.base_url(),
        config.restart.max_restarts
    );
    println!("   Press Ctrl+C to stop.");

    let (watchdog, handle) =
        Watchdog::new(command, config.probe()?, config.policy(), config.schedule());
    let mut task = tokio::spawn(watchdog.run());

    let mut status = handle.subscribe();
    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let current = *status.borrow_and_update();
            if current.state == WatchdogState::Restarting {
                eprintln!(
                    "{}Restarting server (attempt {})",
                    RESTART,
                    current.restarts
                );
            }
        }
    });

    let exit = tokio::select! {
        exit = &mut task => exit?,
        _ = shutdown_signal() => {
            handle.stop();
            task.await?
        }
    };

    match exit {
        WatchdogExit::Stopped => {
            println!("{}Server stopped", CHECK);
            Ok(())
        }
        WatchdogExit::GaveUp { restarts } => {
            eprintln!(
                "{}",
                style(format!("Server failed {} times in a row; giving up.", restarts)).red()
            );
            bail!("Watchdog exhausted its restart budget")
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    println!("\nShutting down...");
}
