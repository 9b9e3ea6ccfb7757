//! Environment diagnostics: `lifesync diagnose`.
//!
//! Walks the same path a sync would take (config, data directory, each
//! collection file, the web app's health and data endpoints) and reports
//! the first thing that looks wrong at each step.

use anyhow::{Result, bail};
use console::style;
use lifesync::config::Settings;
use lifesync::store::CollectionStatus;
use lifesync::sync::{HttpApi, RemoteApi};
use lifesync::ui::icons::{CHECK, CROSS, FOLDER, WARN};
use lifesync::watchdog::{HealthProbe, HttpProbe};
use lifesync_common::EntityKind;

use super::open_store;

pub async fn cmd_diagnose(settings: &Settings) -> Result<()> {
    let mut problems = 0usize;

    println!();
    println!("{}", style("LifeSync diagnostics").bold());
    println!();

    // Configuration
    let config_file = settings.config_file();
    if config_file.exists() {
        println!("{}Config file {}", CHECK, config_file.display());
    } else {
        println!("{}No config file (defaults in use)", WARN);
    }
    println!("   api_url  = {}", settings.api_url);
    println!("   data_dir = {}", settings.data_dir.display());

    // Data directory and collections
    println!();
    let store = open_store(settings);
    if store.dir().is_dir() {
        println!("{}Data directory {}", FOLDER, store.dir().display());
    } else {
        println!(
            "{}Data directory does not exist yet; it is created on first write",
            WARN
        );
    }
    for &kind in EntityKind::ALL {
        match store.inspect(kind) {
            CollectionStatus::Missing => {
                println!("   {:<15} {}", kind, style("no file").dim());
            }
            CollectionStatus::Healthy { records } => {
                println!("   {:<15} {}{} record(s)", kind, CHECK, records);
            }
            CollectionStatus::Corrupt { message } => {
                problems += 1;
                println!("   {:<15} {}{}", kind, CROSS, style(message).red());
            }
        }
    }

    // Web app
    println!();
    let api = HttpApi::new(&settings.api_url)?;
    match api.health().await {
        Ok(()) => println!("{}Web app health endpoint responds", CHECK),
        Err(e) => {
            problems += 1;
            println!("{}{}", CROSS, style(&e).red());
            if e.is_connectivity() {
                println!("   Start the server, or run `lifesync monitor` to start and supervise it.");
            }
        }
    }
    let probe = HttpProbe::new(&settings.api_url)?;
    match probe.check_data().await {
        Ok(()) => println!("{}Web app data endpoint responds", CHECK),
        Err(e) => {
            problems += 1;
            println!("{}{}", CROSS, style(&e).red());
        }
    }
    for &kind in EntityKind::SYNCED {
        match api.fetch(kind).await {
            Ok(records) => println!("   {:<15} {} remote record(s)", kind, records.len()),
            Err(e) => println!("   {:<15} {}{}", kind, CROSS, style(&e).red()),
        }
    }

    println!();
    if problems > 0 {
        bail!("{} problem(s) found", problems);
    }
    println!("{}All checks passed", CHECK);
    Ok(())
}
