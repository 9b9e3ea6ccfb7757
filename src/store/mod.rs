//! Local JSON data store.
//!
//! One pretty-printed JSON array per collection under the data directory
//! (`shopping.json`, `recipes.json`, ...). Reads are forgiving: a missing or
//! unparseable file is an empty collection. Every mutation is a full
//! read-modify-write of the collection file, serialised across processes by
//! an exclusive advisory lock on a sibling `<file>.lock`.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use fs2::FileExt;
use lifesync_common::{EntityKind, Record, new_id};
use serde_json::Value;

use crate::errors::StoreError;

/// Fields a patch may not overwrite.
const PROTECTED_FIELDS: &[&str] = &["id", "createdAt"];

/// What `inspect` found on disk for one collection.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionStatus {
    Missing,
    Healthy { records: usize },
    Corrupt { message: String },
}

/// Per-entity JSON collection store rooted at a data directory.
#[derive(Debug, Clone)]
pub struct DataStore {
    dir: PathBuf,
}

impl DataStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, kind: EntityKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }

    /// All records of a collection, in stored order.
    pub fn list<T: Record>(&self) -> Vec<T> {
        read_collection(&self.path_for(T::KIND)).unwrap_or_default()
    }

    pub fn get<T: Record>(&self, id: &str) -> Option<T> {
        self.list::<T>().into_iter().find(|r| r.id() == id)
    }

    /// Store a new record under a fresh identifier, stamping `createdAt` and
    /// `updatedAt`. Returns the stored record.
    pub fn add<T: Record>(&self, mut record: T) -> Result<T, StoreError> {
        let now = Utc::now();
        record.set_id(new_id());
        record.set_created_at(now);
        record.set_updated_at(now);
        record.normalize(now);

        let stored = record.clone();
        self.modify::<T, _>(move |records| records.push(record))?;
        tracing::debug!(kind = %T::KIND, id = stored.id(), "Added record");
        Ok(stored)
    }

    /// Store a record under its own identifier. Returns `false`, leaving the
    /// existing record untouched, when the identifier is already taken.
    /// Records without an identifier get a fresh one.
    pub fn insert<T: Record>(&self, mut record: T) -> Result<bool, StoreError> {
        if record.id().is_empty() {
            record.set_id(new_id());
        }
        self.modify::<T, _>(move |records| {
            if records.iter().any(|r| r.id() == record.id()) {
                false
            } else {
                records.push(record);
                true
            }
        })
    }

    /// Merge the fields of a JSON object into the record with `id`.
    ///
    /// Returns `Ok(None)` when no such record exists. `id` and `createdAt`
    /// cannot be patched; `updatedAt` is always re-stamped and is strictly
    /// later than the previous value.
    pub fn update<T: Record>(&self, id: &str, patch: &Value) -> Result<Option<T>, StoreError> {
        let Some(fields) = patch.as_object() else {
            return Err(StoreError::PatchNotObject {
                kind: T::KIND,
                id: id.to_string(),
            });
        };

        self.try_modify::<T, _>(|records| {
            let Some(slot) = records.iter_mut().find(|r| r.id() == id) else {
                return Ok(None);
            };

            let mut value = serde_json::to_value(&*slot).map_err(|source| {
                StoreError::Serialize {
                    kind: T::KIND,
                    source,
                }
            })?;
            if let Some(object) = value.as_object_mut() {
                for (key, field) in fields {
                    if !PROTECTED_FIELDS.contains(&key.as_str()) {
                        object.insert(key.clone(), field.clone());
                    }
                }
            }

            let mut updated: T =
                serde_json::from_value(value).map_err(|source| StoreError::InvalidPatch {
                    kind: T::KIND,
                    id: id.to_string(),
                    source,
                })?;
            let stamp = next_stamp(slot.updated_at());
            updated.set_updated_at(stamp);
            updated.normalize(stamp);
            *slot = updated.clone();
            Ok(Some(updated))
        })
    }

    /// Remove the record with `id`. Returns whether anything was removed; the
    /// file is left untouched when nothing matched.
    pub fn delete<T: Record>(&self, id: &str) -> Result<bool, StoreError> {
        let path = self.path_for(T::KIND);
        let _lock = self.lock(T::KIND)?;
        let mut records: Vec<T> = load_for_write(&path);
        let before = records.len();
        records.retain(|r| r.id() != id);
        if records.len() == before {
            return Ok(false);
        }
        write_collection(T::KIND, &path, &records)?;
        tracing::debug!(kind = %T::KIND, id, "Deleted record");
        Ok(true)
    }

    /// Locked read-modify-write of a whole collection.
    pub fn modify<T: Record, R>(
        &self,
        f: impl FnOnce(&mut Vec<T>) -> R,
    ) -> Result<R, StoreError> {
        self.try_modify(|records| Ok(f(records)))
    }

    /// Like [`DataStore::modify`], but nothing is written when `f` fails.
    fn try_modify<T: Record, R>(
        &self,
        f: impl FnOnce(&mut Vec<T>) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let path = self.path_for(T::KIND);
        let _lock = self.lock(T::KIND)?;
        let mut records: Vec<T> = load_for_write(&path);
        let out = f(&mut records)?;
        write_collection(T::KIND, &path, &records)?;
        Ok(out)
    }

    /// Report on a collection file without decoding it into records.
    pub fn inspect(&self, kind: EntityKind) -> CollectionStatus {
        let path = self.path_for(kind);
        if !path.exists() {
            return CollectionStatus::Missing;
        }
        let parsed = fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|content| {
                serde_json::from_str::<Vec<Value>>(&content).map_err(|e| e.to_string())
            });
        match parsed {
            Ok(records) => CollectionStatus::Healthy {
                records: records.len(),
            },
            Err(message) => CollectionStatus::Corrupt { message },
        }
    }

    fn lock(&self, kind: EntityKind) -> Result<File, StoreError> {
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::Write {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.dir.join(format!("{}.lock", kind.file_name()));
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|source| StoreError::Lock {
                path: path.clone(),
                source,
            })?;
        FileExt::lock_exclusive(&file).map_err(|source| StoreError::Lock { path, source })?;
        // Released when the handle is dropped.
        Ok(file)
    }
}

/// Next `updatedAt` for a record: now, or one millisecond past the previous
/// stamp when the clock has not moved on.
fn next_stamp(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match previous {
        Some(prev) if now <= prev => prev + Duration::milliseconds(1),
        _ => now,
    }
}

/// Read a collection file. `None` when the file is absent, unreadable or
/// not a valid collection; failures are logged.
fn read_collection<T: Record>(path: &Path) -> Option<Vec<T>> {
    if !path.exists() {
        return None;
    }
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read collection");
            return None;
        }
    };
    match serde_json::from_str(&content) {
        Ok(records) => Some(records),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to parse collection, treating as empty");
            None
        }
    }
}

/// Load a collection that is about to be rewritten. A corrupt file is copied
/// aside to `<file>.corrupt` first so the rewrite does not destroy it.
fn load_for_write<T: Record>(path: &Path) -> Vec<T> {
    if let Some(records) = read_collection(path) {
        return records;
    }
    if path.exists() {
        let backup = path.with_extension("json.corrupt");
        match fs::copy(path, &backup) {
            Ok(_) => tracing::warn!(backup = %backup.display(), "Preserved unreadable collection"),
            Err(e) => tracing::warn!(error = %e, "Failed to preserve unreadable collection"),
        }
    }
    Vec::new()
}

fn write_collection<T: Record>(
    kind: EntityKind,
    path: &Path,
    records: &[T],
) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(records)
        .map_err(|source| StoreError::Serialize { kind, source })?;
    fs::write(path, json).map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lifesync_common::{
        GroceryStore, MealPlan, Recipe, ShoppingItem, StoreType, TodoCategory, TodoItem,
        TodoStatus,
    };
    use serde_json::json;
    use tempfile::TempDir;

    fn setup_store() -> (DataStore, TempDir) {
        let dir = TempDir::new().expect("failed to create temp dir");
        let store = DataStore::new(dir.path().join("data"));
        (store, dir)
    }

    #[test]
    fn test_list_missing_file_is_empty() {
        let (store, _dir) = setup_store();
        assert!(store.list::<ShoppingItem>().is_empty());
        assert_eq!(store.inspect(EntityKind::Shopping), CollectionStatus::Missing);
    }

    #[test]
    fn test_list_corrupt_file_is_empty() {
        let (store, _dir) = setup_store();
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(store.path_for(EntityKind::Recipes), "{not json").unwrap();
        assert!(store.list::<Recipe>().is_empty());
        assert!(matches!(
            store.inspect(EntityKind::Recipes),
            CollectionStatus::Corrupt { .. }
        ));
    }

    #[test]
    fn test_add_then_list_contains_exactly_one_record() {
        let (store, _dir) = setup_store();
        let mut item = ShoppingItem::new("Milk");
        item.quantity = 2;
        let stored = store.add(item).unwrap();

        let items = store.list::<ShoppingItem>();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Milk");
        assert_eq!(items[0].quantity, 2);
        assert!(!items[0].id.is_empty());
        assert_eq!(items[0].id, stored.id);
        assert_eq!(items[0].created_at, stored.created_at);
    }

    #[test]
    fn test_add_for_every_collection() {
        let (store, _dir) = setup_store();
        store.add(ShoppingItem::new("Milk")).unwrap();
        store.add(Recipe::new("Soup")).unwrap();
        store
            .add(MealPlan::new(
                chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                "dinner",
            ))
            .unwrap();
        store
            .add(GroceryStore::new("Corner", StoreType::Convenience))
            .unwrap();
        store.add(TodoItem::new("Call mum")).unwrap();
        store.add(TodoCategory::new("Home")).unwrap();

        for kind in EntityKind::ALL {
            assert_eq!(
                store.inspect(*kind),
                CollectionStatus::Healthy { records: 1 },
                "{kind}"
            );
        }
    }

    #[test]
    fn test_add_assigns_distinct_ids() {
        let (store, _dir) = setup_store();
        let a = store.add(ShoppingItem::new("A")).unwrap();
        let b = store.add(ShoppingItem::new("B")).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_collection_file_is_pretty_printed_array() {
        let (store, _dir) = setup_store();
        store.add(ShoppingItem::new("Milk")).unwrap();
        let content = fs::read_to_string(store.path_for(EntityKind::Shopping)).unwrap();
        assert!(content.starts_with("[\n"));
        assert!(content.contains("\"name\": \"Milk\""));
    }

    #[test]
    fn test_update_patches_fields_and_advances_updated_at() {
        let (store, _dir) = setup_store();
        let stored = store.add(ShoppingItem::new("Milk")).unwrap();

        let updated: ShoppingItem = store
            .update(&stored.id, &json!({"name": "Oat milk", "quantity": 3}))
            .unwrap()
            .expect("record exists");
        assert_eq!(updated.name, "Oat milk");
        assert!(updated.updated_at > stored.updated_at);

        let listed = store.get::<ShoppingItem>(&stored.id).unwrap();
        assert_eq!(listed.name, "Oat milk");
        assert_eq!(listed.quantity, 3);
        assert_eq!(listed.updated_at, updated.updated_at);
    }

    #[test]
    fn test_rapid_updates_keep_updated_at_strictly_increasing() {
        let (store, _dir) = setup_store();
        let stored = store.add(TodoItem::new("Write report")).unwrap();
        let mut last = stored.updated_at;
        for i in 0..5 {
            let todo: TodoItem = store
                .update(&stored.id, &json!({"description": format!("draft {i}")}))
                .unwrap()
                .unwrap();
            assert!(todo.updated_at > last);
            last = todo.updated_at;
        }
    }

    #[test]
    fn test_update_cannot_change_id_or_created_at() {
        let (store, _dir) = setup_store();
        let stored = store.add(Recipe::new("Soup")).unwrap();
        let updated: Recipe = store
            .update(
                &stored.id,
                &json!({"id": "hijack", "createdAt": "2000-01-01T00:00:00Z", "servings": 2}),
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.id, stored.id);
        assert_eq!(updated.created_at, stored.created_at);
        assert_eq!(updated.servings, 2);
        assert!(updated.updated_at.is_some());
    }

    #[test]
    fn test_update_missing_record_returns_none() {
        let (store, _dir) = setup_store();
        store.add(ShoppingItem::new("Milk")).unwrap();
        let result = store
            .update::<ShoppingItem>("nope", &json!({"name": "x"}))
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_update_marks_purchased_at() {
        let (store, _dir) = setup_store();
        let stored = store.add(ShoppingItem::new("Milk")).unwrap();
        let updated: ShoppingItem = store
            .update(&stored.id, &json!({"purchased": true}))
            .unwrap()
            .unwrap();
        assert!(updated.purchased);
        assert!(updated.purchased_at.is_some());
    }

    #[test]
    fn test_update_todo_done_sets_completed_at() {
        let (store, _dir) = setup_store();
        let stored = store.add(TodoItem::new("Ship it")).unwrap();
        let updated: TodoItem = store
            .update(&stored.id, &json!({"status": "done"}))
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, TodoStatus::Done);
        assert!(updated.completed_at.is_some());
    }

    #[test]
    fn test_invalid_patch_is_rejected_and_not_written() {
        let (store, _dir) = setup_store();
        let stored = store.add(ShoppingItem::new("Milk")).unwrap();
        let result = store.update::<ShoppingItem>(&stored.id, &json!({"quantity": "lots"}));
        assert!(matches!(result, Err(StoreError::InvalidPatch { .. })));

        let result = store.update::<ShoppingItem>(&stored.id, &json!(["not", "an", "object"]));
        assert!(matches!(result, Err(StoreError::PatchNotObject { .. })));

        assert_eq!(store.get::<ShoppingItem>(&stored.id).unwrap(), stored);
    }

    #[test]
    fn test_delete_removes_record() {
        let (store, _dir) = setup_store();
        let a = store.add(ShoppingItem::new("A")).unwrap();
        let b = store.add(ShoppingItem::new("B")).unwrap();

        assert!(store.delete::<ShoppingItem>(&a.id).unwrap());
        let items = store.list::<ShoppingItem>();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, b.id);
    }

    #[test]
    fn test_delete_nonexistent_returns_false_and_leaves_collection() {
        let (store, _dir) = setup_store();
        store.add(ShoppingItem::new("A")).unwrap();
        let before = fs::read_to_string(store.path_for(EntityKind::Shopping)).unwrap();

        assert!(!store.delete::<ShoppingItem>("missing").unwrap());
        let after = fs::read_to_string(store.path_for(EntityKind::Shopping)).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_insert_keeps_id_and_skips_duplicates() {
        let (store, _dir) = setup_store();
        let mut item = ShoppingItem::new("Milk");
        item.id = "fixed".to_string();
        assert!(store.insert(item.clone()).unwrap());
        assert!(!store.insert(item).unwrap());
        let items = store.list::<ShoppingItem>();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "fixed");
    }

    #[test]
    fn test_insert_without_id_generates_one() {
        let (store, _dir) = setup_store();
        assert!(store.insert(TodoCategory::new("Work")).unwrap());
        assert!(!store.list::<TodoCategory>()[0].id.is_empty());
    }

    #[test]
    fn test_write_over_corrupt_file_preserves_backup() {
        let (store, _dir) = setup_store();
        fs::create_dir_all(store.dir()).unwrap();
        let path = store.path_for(EntityKind::Shopping);
        fs::write(&path, "garbage").unwrap();

        store.add(ShoppingItem::new("Milk")).unwrap();
        assert_eq!(store.list::<ShoppingItem>().len(), 1);
        let backup = path.with_extension("json.corrupt");
        assert_eq!(fs::read_to_string(backup).unwrap(), "garbage");
    }

    #[test]
    fn test_concurrent_adds_do_not_lose_records() {
        let (store, _dir) = setup_store();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    store.add(ShoppingItem::new(format!("item {i}"))).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.list::<ShoppingItem>().len(), 8);
    }

    #[test]
    fn test_next_stamp_bumps_when_clock_is_behind() {
        let future = Utc::now() + Duration::hours(1);
        assert_eq!(next_stamp(Some(future)), future + Duration::milliseconds(1));
        let past = Utc::now() - Duration::hours(1);
        assert!(next_stamp(Some(past)) > past + Duration::minutes(59));
    }
}
