//! Meal planning commands: `lifesync meal`.

use anyhow::{Context, Result};
use console::style;
use lifesync::config::Settings;
use lifesync::ui::icons::{CALENDAR, CHECK};
use lifesync_common::{MealPlan, MealStatus, Recipe};
use serde_json::json;

use super::super::MealCommands;
use super::{find_record, open_store, remove_record, short_id};

const DEFAULT_MEAL_TYPE: &str = "dinner";

pub fn cmd_meal(settings: &Settings, command: MealCommands, yes: bool) -> Result<()> {
    let store = open_store(settings);

    match command {
        MealCommands::List { date } => {
            let mut meals: Vec<MealPlan> = store
                .list::<MealPlan>()
                .into_iter()
                .filter(|m| date.is_none_or(|d| m.date == d))
                .collect();
            if meals.is_empty() {
                println!("No meals planned.");
                return Ok(());
            }
            meals.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.meal_type.cmp(&b.meal_type)));

            println!("{}{}", CALENDAR, style("Meal plan").bold());
            let mut current = None;
            for meal in &meals {
                if current != Some(meal.date) {
                    println!();
                    println!("  {}", style(meal.date.format("%a %Y-%m-%d")).bold());
                    current = Some(meal.date);
                }
                let status = match meal.status {
                    MealStatus::Planned => style(meal.status.as_str()).dim(),
                    MealStatus::Prepped => style(meal.status.as_str()).yellow(),
                    MealStatus::Cooked | MealStatus::Eaten => style(meal.status.as_str()).green(),
                };
                println!(
                    "    {} {:<10} {} x{} {}",
                    style(short_id(&meal.id)).dim(),
                    meal.meal_type,
                    meal.recipe_name.as_deref().unwrap_or("(no recipe)"),
                    meal.servings,
                    status
                );
            }
        }
        MealCommands::Plan {
            date,
            meal_type,
            recipe,
            servings,
            notes,
        } => {
            let meal_type = meal_type
                .or_else(|| settings.config.default_meal_type.clone())
                .unwrap_or_else(|| DEFAULT_MEAL_TYPE.to_string());
            let mut meal = MealPlan::new(date, meal_type);
            if let Some(recipe_id) = recipe {
                let recipe = find_record::<Recipe>(&store, &recipe_id)?;
                meal.servings = recipe.servings;
                meal.recipe_id = Some(recipe.id);
                meal.recipe_name = Some(recipe.name);
            }
            if let Some(servings) = servings {
                meal.servings = servings;
            }
            meal.notes = notes;

            let meal = store.add(meal).context("Failed to save meal plan")?;
            println!(
                "{}Planned {} on {}{} [{}]",
                CHECK,
                meal.meal_type,
                meal.date,
                meal.recipe_name
                    .as_deref()
                    .map(|name| format!(": {}", name))
                    .unwrap_or_default(),
                short_id(&meal.id)
            );
        }
        MealCommands::Status { id, status } => {
            let meal = find_record::<MealPlan>(&store, &id)?;
            let updated = store
                .update::<MealPlan>(&meal.id, &json!({ "status": status.as_str() }))
                .context("Failed to update meal plan")?
                .with_context(|| format!("Meal plan '{}' disappeared", id))?;
            println!(
                "{}{} on {} is now {}",
                CHECK,
                updated.meal_type,
                updated.date,
                updated.status.as_str()
            );
        }
        MealCommands::Remove { id } => {
            let meal = find_record::<MealPlan>(&store, &id)?;
            let label = format!("{} on {}", meal.meal_type, meal.date);
            if remove_record::<MealPlan>(&store, &meal.id, &label, yes)? {
                println!("{}Removed {}", CHECK, label);
            }
        }
    }

    Ok(())
}
