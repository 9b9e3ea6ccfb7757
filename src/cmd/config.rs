//! Configuration commands: `lifesync config`.

use anyhow::{Context, Result};
use console::style;
use lifesync::config::{LifeSyncConfig, Settings};
use lifesync::ui::icons::CHECK;

use super::super::ConfigCommands;

pub fn cmd_config(settings: &Settings, command: Option<ConfigCommands>, yes: bool) -> Result<()> {
    let path = settings.config_file();

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("LifeSync Configuration");
            println!("======================");
            println!();
            if let Some(error) = &settings.config_error {
                println!("Config file: {} {}", path.display(), style("(unreadable, ignored)").red());
                println!("  {}", error);
            } else if path.exists() {
                println!("Config file: {}", path.display());
            } else {
                println!("No config file at {} (using defaults)", path.display());
            }
            println!();
            for key in LifeSyncConfig::KEYS {
                let value = settings
                    .config
                    .get(key)
                    .map(|v| format!("\"{}\"", v))
                    .unwrap_or_else(|| style("(unset)").dim().to_string());
                println!("  {:<16} {}", key, value);
            }
            println!();
            println!("Effective values (with env/CLI overrides):");
            println!("  api_url  = \"{}\"", settings.api_url);
            println!("  data_dir = \"{}\"", settings.data_dir.display());
            println!();
        }
        Some(ConfigCommands::Set { key, value }) => {
            let mut config = settings.config.clone();
            config.set(&key, &value)?;
            config.save(&path)?;
            match config.get(&key) {
                Some(value) => println!("{}Set {} = \"{}\"", CHECK, key, value),
                None => println!("{}Unset {}", CHECK, key),
            }
        }
        Some(ConfigCommands::Reset) => {
            if !path.exists() {
                println!("No config file to reset.");
                return Ok(());
            }
            if !lifesync::ui::confirm("Delete config.json and return to defaults?", yes) {
                println!("Reset cancelled.");
                return Ok(());
            }
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
            println!("{}Configuration reset", CHECK);
        }
        Some(ConfigCommands::Path) => println!("{}", path.display()),
    }

    Ok(())
}
