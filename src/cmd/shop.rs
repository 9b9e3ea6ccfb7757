//! Shopping list commands: `lifesync shop`.

use anyhow::{Context, Result};
use console::style;
use lifesync::config::Settings;
use lifesync::ui::icons::{CART, CHECK};
use lifesync_common::{ShoppingCategory, ShoppingItem};
use serde_json::json;

use super::super::ShopCommands;
use super::{find_record, open_store, parse_assignments, remove_record, short_id};

pub fn cmd_shop(settings: &Settings, command: ShopCommands, yes: bool) -> Result<()> {
    let store = open_store(settings);

    match command {
        ShopCommands::List { all } => {
            let mut items: Vec<ShoppingItem> = store
                .list::<ShoppingItem>()
                .into_iter()
                .filter(|item| all || !item.purchased)
                .collect();
            if items.is_empty() {
                println!("Shopping list is empty.");
                return Ok(());
            }
            // Highest priority first, then by category, stable within ties.
            items.sort_by(|a, b| {
                b.priority
                    .cmp(&a.priority)
                    .then_with(|| a.category.as_str().cmp(b.category.as_str()))
            });

            println!("{}{}", CART, style("Shopping list").bold());
            for item in &items {
                print_item(item);
            }
            let total: f64 = items
                .iter()
                .filter(|i| !i.purchased)
                .filter_map(|i| i.price.or(i.estimated_price))
                .sum();
            if total > 0.0 {
                println!();
                println!("  Estimated total: ${:.2}", total);
            }
        }
        ShopCommands::Add {
            name,
            quantity,
            unit,
            category,
            priority,
            price,
            store: shop,
            brand,
            notes,
        } => {
            let mut item = ShoppingItem::new(name);
            item.quantity = quantity;
            if let Some(unit) = unit {
                item.unit = unit;
            }
            item.category = category
                .or_else(|| default_category(settings))
                .unwrap_or_default();
            item.priority = priority.unwrap_or_default();
            item.price = price;
            item.store = shop.or_else(|| settings.config.default_store.clone());
            item.brand = brand;
            item.notes = notes;

            let item = store.add(item).context("Failed to save shopping item")?;
            println!(
                "{}Added {} ({} {}) [{}]",
                CHECK,
                style(&item.name).bold(),
                item.quantity,
                item.unit,
                short_id(&item.id)
            );
        }
        ShopCommands::Done { id, undo } => {
            let item = find_record::<ShoppingItem>(&store, &id)?;
            let updated = store
                .update::<ShoppingItem>(&item.id, &json!({ "purchased": !undo }))
                .context("Failed to update shopping item")?
                .with_context(|| format!("Shopping item '{}' disappeared", id))?;
            let verb = if undo { "Unmarked" } else { "Purchased" };
            println!("{}{} {}", CHECK, verb, style(&updated.name).bold());
        }
        ShopCommands::Update { id, fields } => {
            let item = find_record::<ShoppingItem>(&store, &id)?;
            let patch = parse_assignments(&fields)?;
            let updated = store
                .update::<ShoppingItem>(&item.id, &patch)
                .context("Failed to update shopping item")?
                .with_context(|| format!("Shopping item '{}' disappeared", id))?;
            println!("{}Updated {}", CHECK, style(&updated.name).bold());
            print_item(&updated);
        }
        ShopCommands::Remove { id } => {
            let item = find_record::<ShoppingItem>(&store, &id)?;
            if remove_record::<ShoppingItem>(&store, &item.id, &item.name, yes)? {
                println!("{}Removed {}", CHECK, item.name);
            }
        }
    }

    Ok(())
}

fn default_category(settings: &Settings) -> Option<ShoppingCategory> {
    let raw = settings.config.default_category.as_deref()?;
    match raw.parse() {
        Ok(category) => Some(category),
        Err(e) => {
            tracing::warn!(value = raw, error = %e, "Ignoring invalid defaultCategory");
            None
        }
    }
}

fn print_item(item: &ShoppingItem) {
    let mark = if item.purchased { "[x]" } else { "[ ]" };
    let name = if item.purchased {
        style(item.name.clone()).dim().strikethrough()
    } else {
        style(item.name.clone()).bold()
    };
    let mut line = format!(
        "  {} {} {} {} {}",
        mark,
        style(short_id(&item.id)).dim(),
        name,
        style(format!("{} {}", item.quantity, item.unit)).cyan(),
        style(item.category.as_str()).dim(),
    );
    if item.priority == lifesync_common::Priority::High {
        line.push_str(&format!(" {}", style("!").red().bold()));
    }
    if let Some(price) = item.price.or(item.estimated_price) {
        line.push_str(&format!(" ${:.2}", price));
    }
    if let Some(shop) = &item.store {
        line.push_str(&format!(" @ {}", shop));
    }
    println!("{}", line);
}
