//! Export and import of the synced collections as one JSON bundle.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use lifesync_common::{EntityKind, MealPlan, Recipe, Record, ShoppingItem};
use serde::{Deserialize, Serialize};

use crate::errors::SyncError;
use crate::store::DataStore;

/// Format version written to `version`.
pub const EXPORT_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    #[serde(default)]
    pub shopping_items: Vec<ShoppingItem>,
    #[serde(default)]
    pub recipes: Vec<Recipe>,
    #[serde(default)]
    pub meal_plans: Vec<MealPlan>,
    pub exported_at: DateTime<Utc>,
    pub version: String,
}

impl ExportBundle {
    pub fn from_store(store: &DataStore) -> Self {
        Self {
            shopping_items: store.list(),
            recipes: store.list(),
            meal_plans: store.list(),
            exported_at: Utc::now(),
            version: EXPORT_VERSION.to_string(),
        }
    }

    pub fn record_count(&self) -> usize {
        self.shopping_items.len() + self.recipes.len() + self.meal_plans.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportCounts {
    pub imported: usize,
    /// Records whose identifier already existed locally.
    pub skipped: usize,
}

#[derive(Debug, Clone)]
pub struct ImportReport {
    pub version: String,
    pub collections: Vec<(EntityKind, ImportCounts)>,
}

impl ImportReport {
    pub fn imported(&self) -> usize {
        self.collections.iter().map(|(_, c)| c.imported).sum()
    }

    pub fn skipped(&self) -> usize {
        self.collections.iter().map(|(_, c)| c.skipped).sum()
    }
}

/// Write shopping items, recipes and meal plans to `path`.
pub fn export_data(store: &DataStore, path: &Path) -> Result<ExportBundle, SyncError> {
    let bundle = ExportBundle::from_store(store);
    let json = serde_json::to_string_pretty(&bundle).map_err(|source| SyncError::InvalidExport {
        path: path.to_path_buf(),
        source,
    })?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| SyncError::WriteFile {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, json).map_err(|source| SyncError::WriteFile {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), records = bundle.record_count(), "Exported data");
    Ok(bundle)
}

/// Load a bundle written by [`export_data`] into the store. Records whose
/// identifier already exists are skipped, never overwritten.
pub fn import_data(store: &DataStore, path: &Path) -> Result<ImportReport, SyncError> {
    let content = fs::read_to_string(path).map_err(|source| SyncError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let bundle: ExportBundle =
        serde_json::from_str(&content).map_err(|source| SyncError::InvalidExport {
            path: path.to_path_buf(),
            source,
        })?;
    if bundle.version != EXPORT_VERSION {
        tracing::warn!(version = %bundle.version, "Importing bundle with unknown format version");
    }

    let collections = vec![
        (EntityKind::Shopping, import_records(store, bundle.shopping_items)?),
        (EntityKind::Recipes, import_records(store, bundle.recipes)?),
        (EntityKind::Meals, import_records(store, bundle.meal_plans)?),
    ];
    let report = ImportReport {
        version: bundle.version,
        collections,
    };
    tracing::info!(
        path = %path.display(),
        imported = report.imported(),
        skipped = report.skipped(),
        "Imported data"
    );
    Ok(report)
}

fn import_records<T: Record>(store: &DataStore, records: Vec<T>) -> Result<ImportCounts, SyncError> {
    let mut counts = ImportCounts::default();
    for record in records {
        if store.insert(record)? {
            counts.imported += 1;
        } else {
            counts.skipped += 1;
        }
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_export_writes_tagged_bundle() {
        let dir = TempDir::new().unwrap();
        let store = DataStore::new(dir.path().join("data"));
        store.add(ShoppingItem::new("Milk")).unwrap();
        store.add(Recipe::new("Soup")).unwrap();

        let path = dir.path().join("out/backup.json");
        let bundle = export_data(&store, &path).unwrap();
        assert_eq!(bundle.record_count(), 2);

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["version"], EXPORT_VERSION);
        assert!(value["exportedAt"].is_string());
        assert_eq!(value["shoppingItems"].as_array().unwrap().len(), 1);
        assert_eq!(value["recipes"].as_array().unwrap().len(), 1);
        assert!(value["mealPlans"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_import_into_empty_store() {
        let dir = TempDir::new().unwrap();
        let source = DataStore::new(dir.path().join("a"));
        let milk = source.add(ShoppingItem::new("Milk")).unwrap();
        let path = dir.path().join("bundle.json");
        export_data(&source, &path).unwrap();

        let target = DataStore::new(dir.path().join("b"));
        let report = import_data(&target, &path).unwrap();
        assert_eq!(report.imported(), 1);
        assert_eq!(report.skipped(), 0);
        assert_eq!(target.list::<ShoppingItem>(), vec![milk]);
    }

    #[test]
    fn test_import_skips_existing_records() {
        let dir = TempDir::new().unwrap();
        let store = DataStore::new(dir.path().join("data"));
        store.add(ShoppingItem::new("Milk")).unwrap();
        let path = dir.path().join("bundle.json");
        export_data(&store, &path).unwrap();

        store.add(ShoppingItem::new("Bread")).unwrap();
        let report = import_data(&store, &path).unwrap();
        assert_eq!(report.imported(), 0);
        assert_eq!(report.skipped(), 1);
        assert_eq!(store.list::<ShoppingItem>().len(), 2);
    }

    #[test]
    fn test_import_accepts_partial_bundle() {
        let dir = TempDir::new().unwrap();
        let store = DataStore::new(dir.path().join("data"));
        let path = dir.path().join("bundle.json");
        fs::write(
            &path,
            r#"{"recipes": [{"name": "Toast"}], "exportedAt": "2024-01-01T00:00:00Z", "version": "1.0"}"#,
        )
        .unwrap();

        let report = import_data(&store, &path).unwrap();
        assert_eq!(report.imported(), 1);
        let recipes = store.list::<Recipe>();
        assert_eq!(recipes[0].name, "Toast");
        assert!(!recipes[0].id.is_empty());
    }

    #[test]
    fn test_import_rejects_malformed_file() {
        let dir = TempDir::new().unwrap();
        let store = DataStore::new(dir.path().join("data"));
        let path = dir.path().join("bundle.json");
        fs::write(&path, "[]").unwrap();
        assert!(matches!(
            import_data(&store, &path),
            Err(SyncError::InvalidExport { .. })
        ));
        assert!(matches!(
            import_data(&store, &dir.path().join("missing.json")),
            Err(SyncError::ReadFile { .. })
        ));
    }
}
