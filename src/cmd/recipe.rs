//! Recipe commands: `lifesync recipe`.

use anyhow::{Context, Result};
use console::style;
use lifesync::config::Settings;
use lifesync::ui::icons::{BOOK, CHECK};
use lifesync_common::Recipe;

use super::super::RecipeCommands;
use super::{find_record, open_store, remove_record, short_id};

pub fn cmd_recipe(settings: &Settings, command: RecipeCommands, yes: bool) -> Result<()> {
    let store = open_store(settings);

    match command {
        RecipeCommands::List => {
            let mut recipes = store.list::<Recipe>();
            if recipes.is_empty() {
                println!("No recipes yet. Add one with `lifesync recipe add <name>`.");
                return Ok(());
            }
            recipes.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
            println!("{}{}", BOOK, style("Recipes").bold());
            for recipe in &recipes {
                println!(
                    "  {} {} {} {} {}",
                    style(short_id(&recipe.id)).dim(),
                    style(&recipe.name).bold(),
                    style(recipe.cuisine.as_str()).cyan(),
                    recipe.difficulty.as_str(),
                    style(format!("{} min", recipe.total_time())).dim(),
                );
            }
        }
        RecipeCommands::Show { id } => {
            let recipe = find_record::<Recipe>(&store, &id)?;
            print_recipe(&recipe);
        }
        RecipeCommands::Add {
            name,
            description,
            cuisine,
            difficulty,
            prep,
            cook,
            servings,
            ingredients,
            steps,
            tags,
        } => {
            let mut recipe = Recipe::new(name);
            recipe.description = description;
            recipe.cuisine = cuisine.unwrap_or_default();
            recipe.difficulty = difficulty.unwrap_or_default();
            recipe.prep_time = prep.unwrap_or(0);
            recipe.cook_time = cook.unwrap_or(0);
            if let Some(servings) = servings {
                recipe.servings = servings;
            }
            recipe.ingredients = ingredients;
            recipe.instructions = steps;
            recipe.tags = tags;

            let recipe = store.add(recipe).context("Failed to save recipe")?;
            println!(
                "{}Added recipe {} with {} ingredient(s) [{}]",
                CHECK,
                style(&recipe.name).bold(),
                recipe.ingredients.len(),
                short_id(&recipe.id)
            );
        }
        RecipeCommands::Remove { id } => {
            let recipe = find_record::<Recipe>(&store, &id)?;
            if remove_record::<Recipe>(&store, &recipe.id, &recipe.name, yes)? {
                println!("{}Removed recipe {}", CHECK, recipe.name);
            }
        }
    }

    Ok(())
}

fn print_recipe(recipe: &Recipe) {
    println!();
    println!("{}{}", BOOK, style(&recipe.name).bold().underlined());
    if let Some(description) = &recipe.description {
        for line in textwrap::wrap(description, 72) {
            println!("  {}", line);
        }
    }
    println!();
    println!(
        "  Cuisine: {}  Difficulty: {}  Serves: {}",
        recipe.cuisine.as_str(),
        recipe.difficulty.as_str(),
        recipe.servings
    );
    println!(
        "  Prep: {} min  Cook: {} min  Total: {} min",
        recipe.prep_time,
        recipe.cook_time,
        recipe.total_time()
    );
    if !recipe.tags.is_empty() {
        println!("  Tags: {}", recipe.tags.join(", "));
    }

    if !recipe.ingredients.is_empty() {
        println!();
        println!("  {}", style("Ingredients").bold());
        for ingredient in &recipe.ingredients {
            let amount = if ingredient.amount.fract() == 0.0 {
                format!("{}", ingredient.amount as i64)
            } else {
                format!("{}", ingredient.amount)
            };
            println!("    - {} {} {}", amount, ingredient.unit, ingredient.name);
        }
    }

    if !recipe.instructions.is_empty() {
        println!();
        println!("  {}", style("Instructions").bold());
        for (i, step) in recipe.instructions.iter().enumerate() {
            let mut lines = textwrap::wrap(step, 68).into_iter();
            if let Some(first) = lines.next() {
                println!("    {}. {}", i + 1, first);
            }
            for line in lines {
                println!("       {}", line);
            }
        }
    }
    println!();
    println!("  {}", style(format!("id: {}", recipe.id)).dim());
}
