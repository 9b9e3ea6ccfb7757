//! Grocery store commands: `lifesync store`.

use anyhow::{Context, Result};
use console::style;
use lifesync::config::Settings;
use lifesync::ui::icons::{CHECK, STAR, STORE};
use lifesync_common::{GroceryStore, Rating};
use serde_json::json;

use super::super::StoreCommands;
use super::{find_record, open_store, remove_record, short_id};

pub fn cmd_store(settings: &Settings, command: StoreCommands, yes: bool) -> Result<()> {
    let store = open_store(settings);

    match command {
        StoreCommands::List => {
            let mut shops = store.list::<GroceryStore>();
            if shops.is_empty() {
                println!("No stores yet.");
                return Ok(());
            }
            shops.sort_by(|a, b| {
                b.favorite
                    .cmp(&a.favorite)
                    .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            });
            println!("{}{}", STORE, style("Stores").bold());
            for shop in &shops {
                let favorite = if shop.favorite { STAR.to_string() } else { "   ".to_string() };
                let rating = shop
                    .ratings
                    .average()
                    .map(|avg| format!("{:.1}/5", avg))
                    .unwrap_or_else(|| "unrated".to_string());
                println!(
                    "  {}{} {} {} {}{}",
                    favorite,
                    style(short_id(&shop.id)).dim(),
                    style(&shop.name).bold(),
                    style(shop.store_type.as_str()).cyan(),
                    rating,
                    shop.address
                        .as_deref()
                        .map(|a| format!("  {}", style(a).dim()))
                        .unwrap_or_default(),
                );
            }
        }
        StoreCommands::Add {
            name,
            store_type,
            address,
            notes,
        } => {
            let mut shop = GroceryStore::new(name, store_type);
            shop.address = address;
            shop.notes = notes;
            let shop = store.add(shop).context("Failed to save store")?;
            println!(
                "{}Added store {} [{}]",
                CHECK,
                style(&shop.name).bold(),
                short_id(&shop.id)
            );
        }
        StoreCommands::Rate {
            id,
            price,
            quality,
            service,
            selection,
        } => {
            let shop = find_record::<GroceryStore>(&store, &id)?;
            let mut ratings = shop.ratings.clone();
            let rate = |value: Option<u8>, slot: &mut Option<Rating>| -> Result<()> {
                if let Some(value) = value {
                    *slot = Some(Rating::try_from(value)?);
                }
                Ok(())
            };
            rate(price, &mut ratings.price)?;
            rate(quality, &mut ratings.quality)?;
            rate(service, &mut ratings.service)?;
            rate(selection, &mut ratings.selection)?;

            let updated = store
                .update::<GroceryStore>(&shop.id, &json!({ "ratings": ratings }))
                .context("Failed to update store")?
                .with_context(|| format!("Store '{}' disappeared", id))?;
            println!(
                "{}Rated {}: {}",
                CHECK,
                style(&updated.name).bold(),
                updated
                    .ratings
                    .average()
                    .map(|avg| format!("{:.1}/5 average", avg))
                    .unwrap_or_else(|| "unrated".to_string())
            );
        }
        StoreCommands::Favorite { id } => {
            let shop = find_record::<GroceryStore>(&store, &id)?;
            let updated = store
                .update::<GroceryStore>(&shop.id, &json!({ "favorite": !shop.favorite }))
                .context("Failed to update store")?
                .with_context(|| format!("Store '{}' disappeared", id))?;
            if updated.favorite {
                println!("{}{} is now a favorite", STAR, updated.name);
            } else {
                println!("{}{} is no longer a favorite", CHECK, updated.name);
            }
        }
        StoreCommands::Remove { id } => {
            let shop = find_record::<GroceryStore>(&store, &id)?;
            if remove_record::<GroceryStore>(&store, &shop.id, &shop.name, yes)? {
                println!("{}Removed store {}", CHECK, shop.name);
            }
        }
    }

    Ok(())
}
