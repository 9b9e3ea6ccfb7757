//! Todo commands: `lifesync todo`.

use std::collections::HashMap;

use anyhow::{Context, Result};
use console::style;
use lifesync::config::Settings;
use lifesync::store::DataStore;
use lifesync::ui::icons::{CHECK, TODO};
use lifesync_common::{Priority, Record, TodoCategory, TodoItem, TodoStatus};
use serde_json::json;

use super::super::TodoCommands;
use super::{find_record, open_store, remove_record, short_id};

pub fn cmd_todo(settings: &Settings, command: TodoCommands, yes: bool) -> Result<()> {
    let store = open_store(settings);

    match command {
        TodoCommands::List { status } => {
            let categories: HashMap<String, String> = store
                .list::<TodoCategory>()
                .into_iter()
                .map(|c| (c.id, c.name))
                .collect();
            let mut todos: Vec<TodoItem> = store
                .list::<TodoItem>()
                .into_iter()
                .filter(|t| status.is_none_or(|s| t.status == s))
                .collect();
            if todos.is_empty() {
                println!("Nothing to do.");
                return Ok(());
            }
            todos.sort_by(|a, b| {
                (a.status == TodoStatus::Done)
                    .cmp(&(b.status == TodoStatus::Done))
                    .then_with(|| b.priority.cmp(&a.priority))
                    .then_with(|| a.due_date.cmp(&b.due_date))
            });

            println!("{}{}", TODO, style("Todos").bold());
            for todo in &todos {
                let title = if todo.status == TodoStatus::Done {
                    style(todo.title.clone()).dim().strikethrough()
                } else {
                    style(todo.title.clone()).bold()
                };
                let priority = match todo.priority {
                    Priority::High => style("high").red(),
                    Priority::Medium => style("medium").yellow(),
                    Priority::Low => style("low").dim(),
                };
                let mut line = format!(
                    "  {} {} {} {}",
                    style(short_id(&todo.id)).dim(),
                    title,
                    style(todo.status.as_str()).cyan(),
                    priority
                );
                if let Some(name) = todo.category_id.as_ref().and_then(|id| categories.get(id)) {
                    line.push_str(&format!(" #{}", name));
                }
                if let Some(due) = todo.due_date {
                    line.push_str(&format!(" due {}", due));
                }
                println!("{}", line);
            }
        }
        TodoCommands::Add {
            title,
            description,
            priority,
            category,
            due,
        } => {
            let mut todo = TodoItem::new(title);
            todo.description = description;
            todo.priority = priority.unwrap_or_default();
            todo.due_date = due;
            if let Some(category) = category {
                todo.category_id = Some(resolve_category(&store, &category)?);
            }
            let todo = store.add(todo).context("Failed to save todo")?;
            println!(
                "{}Added todo {} [{}]",
                CHECK,
                style(&todo.title).bold(),
                short_id(&todo.id)
            );
        }
        TodoCommands::Status { id, status } => {
            let todo = find_record::<TodoItem>(&store, &id)?;
            let updated = store
                .update::<TodoItem>(&todo.id, &json!({ "status": status.as_str() }))
                .context("Failed to update todo")?
                .with_context(|| format!("Todo '{}' disappeared", id))?;
            println!(
                "{}{} is now {}",
                CHECK,
                style(&updated.title).bold(),
                updated.status.as_str()
            );
        }
        TodoCommands::Remove { id } => {
            let todo = find_record::<TodoItem>(&store, &id)?;
            if remove_record::<TodoItem>(&store, &todo.id, &todo.title, yes)? {
                println!("{}Removed todo {}", CHECK, todo.title);
            }
        }
        TodoCommands::Categories => {
            let categories = store.list::<TodoCategory>();
            if categories.is_empty() {
                println!("No categories yet.");
                return Ok(());
            }
            let todos = store.list::<TodoItem>();
            for category in &categories {
                let open = todos
                    .iter()
                    .filter(|t| {
                        t.category_id.as_deref() == Some(category.id())
                            && t.status != TodoStatus::Done
                    })
                    .count();
                println!(
                    "  {} {} {} {}",
                    style(short_id(&category.id)).dim(),
                    style(&category.name).bold(),
                    category.color.as_deref().unwrap_or(""),
                    style(format!("{} open", open)).dim()
                );
            }
        }
        TodoCommands::CategoryAdd { name, color } => {
            let mut category = TodoCategory::new(name);
            category.color = color;
            let category = store.add(category).context("Failed to save category")?;
            println!(
                "{}Added category {} [{}]",
                CHECK,
                style(&category.name).bold(),
                short_id(&category.id)
            );
        }
    }

    Ok(())
}

/// Category by case-insensitive name, else by id or id prefix.
fn resolve_category(store: &DataStore, name_or_id: &str) -> Result<String> {
    if let Some(category) = store
        .list::<TodoCategory>()
        .into_iter()
        .find(|c| c.name.eq_ignore_ascii_case(name_or_id))
    {
        return Ok(category.id);
    }
    find_record::<TodoCategory>(store, name_or_id)
        .map(|c| c.id)
        .with_context(|| format!("Unknown todo category '{}'", name_or_id))
}
