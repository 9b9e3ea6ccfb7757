//! Sync and backup commands: `lifesync sync`, `export`, `import`.

use std::path::Path;

use anyhow::{Result, bail};
use console::style;
use lifesync::config::Settings;
use lifesync::sync::{HttpApi, SyncDirection, SyncReport, WebSync, export_data, import_data};
use lifesync::ui::Spinner;
use lifesync::ui::icons::{CHECK, CROSS, FILE, PULL, PUSH, SYNC};
use lifesync_common::EntityKind;

use super::open_store;

pub async fn cmd_sync(
    settings: &Settings,
    direction: SyncDirection,
    only: Option<EntityKind>,
) -> Result<()> {
    let store = open_store(settings);
    let api = HttpApi::new(&settings.api_url)?;
    let sync = WebSync::new(api);

    let spinner = Spinner::new(format!("{}Syncing ({}) with {}", SYNC, direction, settings.api_url));

    if let Some(kind) = only {
        if !kind.is_synced() {
            spinner.fail(format!("{} is local only", kind));
            bail!("Only shopping, recipes and meals sync with the web app");
        }
        let result = sync.sync_collection(&store, kind, direction).await;
        return match result {
            Ok(report) => {
                spinner.success(format!("Synced {}", kind));
                print_report(kind, &report);
                Ok(())
            }
            Err(e) => {
                spinner.fail(format!("Sync of {} failed", kind));
                Err(e.into())
            }
        };
    }

    let report = match sync.sync_all(&store, direction).await {
        Ok(report) => report,
        Err(e) => {
            spinner.fail("Sync failed");
            return Err(e.into());
        }
    };

    if report.is_success() {
        spinner.success(format!("Sync complete ({})", direction));
    } else {
        spinner.fail("Sync finished with errors");
    }
    for outcome in &report.collections {
        match &outcome.result {
            Ok(collection) => print_report(outcome.kind, collection),
            Err(e) => println!("  {}{:<9} {}", CROSS, outcome.kind, style(e).red()),
        }
    }

    let failed = report.failures().count();
    if failed > 0 {
        bail!("{} collection(s) failed to sync", failed);
    }
    Ok(())
}

fn print_report(kind: EntityKind, report: &SyncReport) {
    println!(
        "  {}{:<9} {}{} new, {} updated, {} unchanged  {}{} created, {} updated remotely{}",
        CHECK,
        kind,
        PULL,
        report.inserted,
        report.updated,
        report.unchanged,
        PUSH,
        report.created_remote,
        report.updated_remote,
        if report.failed > 0 {
            format!("  {}", style(format!("{} failed", report.failed)).yellow())
        } else {
            String::new()
        }
    );
}

pub fn cmd_export(settings: &Settings, path: &Path) -> Result<()> {
    let store = open_store(settings);
    let bundle = export_data(&store, path)?;
    println!(
        "{}Exported {} shopping item(s), {} recipe(s), {} meal plan(s) to {}",
        FILE,
        bundle.shopping_items.len(),
        bundle.recipes.len(),
        bundle.meal_plans.len(),
        path.display()
    );
    Ok(())
}

pub fn cmd_import(settings: &Settings, path: &Path) -> Result<()> {
    let store = open_store(settings);
    let report = import_data(&store, path)?;
    for (kind, counts) in &report.collections {
        println!(
            "  {:<9} {} imported, {} already present",
            kind, counts.imported, counts.skipped
        );
    }
    println!(
        "{}Imported {} record(s) from {}",
        CHECK,
        report.imported(),
        path.display()
    );
    Ok(())
}
