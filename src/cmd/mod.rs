//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module      | Commands handled                 |
//! |-------------|----------------------------------|
//! | `shop`      | `Shop`                           |
//! | `recipe`    | `Recipe`                         |
//! | `meal`      | `Meal`                           |
//! | `stores`    | `Store`                          |
//! | `todo`      | `Todo`                           |
//! | `sync`      | `Sync`, `Export`, `Import`       |
//! | `config`    | `Config`                         |
//! | `monitor`   | `Monitor`                        |
//! | `diagnose`  | `Diagnose`                       |

pub mod config;
pub mod diagnose;
pub mod meal;
pub mod monitor;
pub mod recipe;
pub mod shop;
pub mod stores;
pub mod sync;
pub mod todo;

pub use config::cmd_config;
pub use diagnose::cmd_diagnose;
pub use meal::cmd_meal;
pub use monitor::cmd_monitor;
pub use recipe::cmd_recipe;
pub use shop::cmd_shop;
pub use stores::cmd_store;
pub use sync::{cmd_export, cmd_import, cmd_sync};
pub use todo::cmd_todo;

use anyhow::{Context, Result, bail};
use lifesync::config::Settings;
use lifesync::store::DataStore;
use lifesync_common::Record;
use serde_json::{Map, Value};

pub(crate) fn open_store(settings: &Settings) -> DataStore {
    DataStore::new(&settings.data_dir)
}

/// Find a record by full id or by a unique id prefix.
pub(crate) fn find_record<T: Record>(store: &DataStore, id: &str) -> Result<T> {
    let records = store.list::<T>();
    if let Some(exact) = records.iter().find(|r| r.id() == id) {
        return Ok(exact.clone());
    }
    let mut matches = records.into_iter().filter(|r| r.id().starts_with(id));
    match (matches.next(), matches.next()) {
        (Some(record), None) if !id.is_empty() => Ok(record),
        (Some(_), Some(_)) => bail!("Id '{}' is ambiguous in {}; use more characters", id, T::KIND),
        _ => bail!("No record '{}' found in {}", id, T::KIND),
    }
}

/// First eight characters of an id, for listings.
pub(crate) fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Turn `field=value` arguments into a JSON patch object.
///
/// Values that parse as JSON (`3`, `true`, `null`, `["a"]`) keep their type;
/// anything else is a string.
pub(crate) fn parse_assignments(fields: &[String]) -> Result<Value> {
    let mut patch = Map::new();
    for field in fields {
        let (key, raw) = field
            .split_once('=')
            .with_context(|| format!("Expected FIELD=VALUE, got '{}'", field))?;
        let key = key.trim();
        if key.is_empty() {
            bail!("Empty field name in '{}'", field);
        }
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        patch.insert(key.to_string(), value);
    }
    Ok(Value::Object(patch))
}

/// Delete a record after confirmation. Returns whether it was removed.
pub(crate) fn remove_record<T: Record>(
    store: &DataStore,
    id: &str,
    label: &str,
    yes: bool,
) -> Result<bool> {
    let record = find_record::<T>(store, id)?;
    if !lifesync::ui::confirm(format!("Delete {} '{}'?", T::KIND, label), yes) {
        println!("Deletion cancelled.");
        return Ok(false);
    }
    let removed = store
        .delete::<T>(record.id())
        .with_context(|| format!("Failed to delete from {}", T::KIND))?;
    Ok(removed)
}
