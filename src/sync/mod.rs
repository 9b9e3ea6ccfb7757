//! Two-way sync between the local data store and the web app.
//!
//! Reconciliation is last-write-wins per record, keyed by identifier:
//!
//! - **Pull** inserts remote records missing locally and overwrites local
//!   records whose remote comparison timestamp is strictly newer. It never
//!   regresses local state.
//! - **Push** submits every local record as a create, falling back to an
//!   update when the create is refused. A record that fails both is logged
//!   and skipped.
//!
//! Collections and records are processed strictly sequentially. The client
//! holds no state between passes.

pub mod remote;
pub mod transfer;

use std::str::FromStr;

use chrono::{DateTime, Utc};
use lifesync_common::{EntityKind, MealPlan, Recipe, Record, ShoppingItem};

use crate::errors::SyncError;
use crate::store::DataStore;

pub use remote::{HttpApi, RemoteApi};
pub use transfer::{EXPORT_VERSION, ExportBundle, ImportReport, export_data, import_data};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncDirection {
    Pull,
    Push,
    /// Pull, then push.
    #[default]
    Both,
}

impl SyncDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pull => "pull",
            Self::Push => "push",
            Self::Both => "both",
        }
    }

    fn pulls(&self) -> bool {
        matches!(self, Self::Pull | Self::Both)
    }

    fn pushes(&self) -> bool {
        matches!(self, Self::Push | Self::Both)
    }
}

impl std::fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pull" => Ok(Self::Pull),
            "push" => Ok(Self::Push),
            "both" => Ok(Self::Both),
            _ => Err(format!("Invalid sync direction '{}'. Valid values: pull, push, both", s)),
        }
    }
}

/// Counts for one collection's sync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Remote records that were new locally.
    pub inserted: usize,
    /// Local records overwritten by newer remote copies.
    pub updated: usize,
    /// Remote records that were equal or older than the local copy.
    pub unchanged: usize,
    /// Local records accepted by the remote as creates.
    pub created_remote: usize,
    /// Local records that fell back to, and succeeded as, remote updates.
    pub updated_remote: usize,
    /// Records skipped after a decode or request failure.
    pub failed: usize,
}

impl SyncReport {
    pub fn pulled(&self) -> usize {
        self.inserted + self.updated
    }

    pub fn pushed(&self) -> usize {
        self.created_remote + self.updated_remote
    }
}

/// Outcome of one collection inside [`WebSync::sync_all`].
#[derive(Debug)]
pub struct CollectionOutcome {
    pub kind: EntityKind,
    pub result: Result<SyncReport, SyncError>,
}

#[derive(Debug)]
pub struct SyncAllReport {
    pub direction: SyncDirection,
    pub collections: Vec<CollectionOutcome>,
}

impl SyncAllReport {
    pub fn is_success(&self) -> bool {
        self.collections.iter().all(|c| c.result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &CollectionOutcome> {
        self.collections.iter().filter(|c| c.result.is_err())
    }
}

/// Sync client bound to one remote API.
pub struct WebSync<A> {
    api: A,
}

impl<A: RemoteApi> WebSync<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Check the remote, then sync shopping, recipes and meals in order.
    ///
    /// An unreachable remote aborts before any collection is touched. Once
    /// the health check passes, a failing collection is recorded in the
    /// report and the remaining collections are still attempted.
    pub async fn sync_all(
        &self,
        store: &DataStore,
        direction: SyncDirection,
    ) -> Result<SyncAllReport, SyncError> {
        self.api.health().await?;
        tracing::info!(url = self.api.base_url(), %direction, "Web app reachable, syncing");

        let mut collections = Vec::with_capacity(EntityKind::SYNCED.len());
        for &kind in EntityKind::SYNCED {
            let result = self.sync_collection(store, kind, direction).await;
            if let Err(e) = &result {
                tracing::error!(%kind, error = %e, "Collection sync failed");
            }
            collections.push(CollectionOutcome { kind, result });
        }
        Ok(SyncAllReport {
            direction,
            collections,
        })
    }

    /// Sync one collection by kind. Only shopping, recipes and meals exist
    /// on the web app.
    pub async fn sync_collection(
        &self,
        store: &DataStore,
        kind: EntityKind,
        direction: SyncDirection,
    ) -> Result<SyncReport, SyncError> {
        match kind {
            EntityKind::Shopping => self.sync::<ShoppingItem>(store, direction).await,
            EntityKind::Recipes => self.sync::<Recipe>(store, direction).await,
            EntityKind::Meals => self.sync::<MealPlan>(store, direction).await,
            other => Err(SyncError::NotSynced { kind: other }),
        }
    }

    pub async fn sync<T: Record>(
        &self,
        store: &DataStore,
        direction: SyncDirection,
    ) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::default();
        if direction.pulls() {
            self.pull::<T>(store, &mut report).await?;
        }
        if direction.pushes() {
            self.push::<T>(store, &mut report).await;
        }
        tracing::info!(
            kind = %T::KIND,
            pulled = report.pulled(),
            pushed = report.pushed(),
            failed = report.failed,
            "Collection synced"
        );
        Ok(report)
    }

    async fn pull<T: Record>(
        &self,
        store: &DataStore,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        let remote = self.api.fetch(T::KIND).await?;
        let mut incoming = Vec::with_capacity(remote.len());
        for value in remote {
            let stamp = T::remote_sync_timestamp(&value);
            match serde_json::from_value::<T>(value) {
                Ok(record) if !record.id().is_empty() => incoming.push((record, stamp)),
                Ok(_) => {
                    tracing::warn!(kind = %T::KIND, "Skipping remote record without an id");
                    report.failed += 1;
                }
                Err(e) => {
                    tracing::warn!(kind = %T::KIND, error = %e, "Skipping undecodable remote record");
                    report.failed += 1;
                }
            }
        }

        let merged = store.modify::<T, _>(|local| merge_pulled(local, incoming))?;
        report.inserted += merged.inserted;
        report.updated += merged.updated;
        report.unchanged += merged.unchanged;
        Ok(())
    }

    async fn push<T: Record>(&self, store: &DataStore, report: &mut SyncReport) {
        for record in store.list::<T>() {
            let body = match serde_json::to_value(&record) {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(kind = %T::KIND, id = record.id(), error = %e, "Failed to encode record");
                    report.failed += 1;
                    continue;
                }
            };

            let create_err = match self.api.create(T::KIND, &body).await {
                Ok(()) => {
                    report.created_remote += 1;
                    continue;
                }
                Err(e) => e,
            };
            tracing::debug!(kind = %T::KIND, id = record.id(), error = %create_err, "Create refused, trying update");

            match self.api.update(T::KIND, record.id(), &body).await {
                Ok(()) => report.updated_remote += 1,
                Err(e) => {
                    tracing::warn!(
                        kind = %T::KIND,
                        id = record.id(),
                        create_error = %create_err,
                        update_error = %e,
                        "Failed to push record"
                    );
                    report.failed += 1;
                }
            }
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct MergeOutcome {
    inserted: usize,
    updated: usize,
    unchanged: usize,
}

/// Fold remote records into the local collection (last write wins).
///
/// Each remote record is paired with the comparison timestamp it was sent
/// with. A record sent without one never replaces a local copy.
fn merge_pulled<T: Record>(
    local: &mut Vec<T>,
    remote: Vec<(T, Option<DateTime<Utc>>)>,
) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();
    for (incoming, stamp) in remote {
        match local.iter_mut().find(|r| r.id() == incoming.id()) {
            None => {
                local.push(incoming);
                outcome.inserted += 1;
            }
            Some(existing) if stamp.is_some_and(|at| at > existing.sync_timestamp()) => {
                *existing = incoming;
                outcome.updated += 1;
            }
            Some(_) => outcome.unchanged += 1,
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::{Value, json};
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// In-memory web app double that records every call.
    #[derive(Default)]
    struct FakeApi {
        down: bool,
        collections: HashMap<EntityKind, Vec<Value>>,
        failing_fetch: HashSet<EntityKind>,
        existing_ids: HashSet<String>,
        rejected_updates: HashSet<String>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeApi {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl RemoteApi for FakeApi {
        fn base_url(&self) -> &str {
            "http://fake"
        }

        async fn health(&self) -> Result<(), SyncError> {
            self.record("GET /api/health".to_string());
            if self.down {
                return Err(SyncError::WebAppNotRunning {
                    url: "http://fake".to_string(),
                });
            }
            Ok(())
        }

        async fn fetch(&self, kind: EntityKind) -> Result<Vec<Value>, SyncError> {
            self.record(format!("GET {kind}"));
            if self.failing_fetch.contains(&kind) {
                return Err(SyncError::Status {
                    method: "GET",
                    url: format!("http://fake/api/{kind}"),
                    status: 500,
                });
            }
            Ok(self.collections.get(&kind).cloned().unwrap_or_default())
        }

        async fn create(&self, kind: EntityKind, record: &Value) -> Result<(), SyncError> {
            let id = record["id"].as_str().unwrap_or_default().to_string();
            self.record(format!("POST {kind} {id}"));
            if self.existing_ids.contains(&id) {
                return Err(SyncError::Status {
                    method: "POST",
                    url: format!("http://fake/api/{kind}"),
                    status: 409,
                });
            }
            Ok(())
        }

        async fn update(&self, kind: EntityKind, id: &str, _record: &Value) -> Result<(), SyncError> {
            self.record(format!("PUT {kind} {id}"));
            if self.rejected_updates.contains(id) {
                return Err(SyncError::Status {
                    method: "PUT",
                    url: format!("http://fake/api/{kind}/{id}"),
                    status: 500,
                });
            }
            Ok(())
        }
    }

    fn setup_store() -> (DataStore, TempDir) {
        let dir = TempDir::new().expect("failed to create temp dir");
        (DataStore::new(dir.path()), dir)
    }

    fn t(hours: i64) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + Duration::hours(hours)
    }

    fn milk(name: &str, updated_at: chrono::DateTime<Utc>) -> ShoppingItem {
        let mut item = ShoppingItem::new(name);
        item.id = "1".to_string();
        item.created_at = t(0);
        item.updated_at = updated_at;
        item
    }

    fn remote_shopping(items: &[ShoppingItem]) -> FakeApi {
        let mut api = FakeApi::default();
        api.collections.insert(
            EntityKind::Shopping,
            items.iter().map(|i| serde_json::to_value(i).unwrap()).collect(),
        );
        api
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!("pull".parse::<SyncDirection>().unwrap(), SyncDirection::Pull);
        assert!("sideways".parse::<SyncDirection>().is_err());
        assert!(SyncDirection::Both.pulls() && SyncDirection::Both.pushes());
        assert!(!SyncDirection::Pull.pushes());
    }

    #[test]
    fn test_merge_inserts_unknown_and_keeps_older() {
        let mut local = vec![milk("Milk", t(2))];
        let mut other = milk("Bread", t(1));
        other.id = "2".to_string();
        let outcome = merge_pulled(
            &mut local,
            vec![(milk("Stale", t(1)), Some(t(1))), (other.clone(), Some(t(1)))],
        );
        assert_eq!(
            outcome,
            MergeOutcome {
                inserted: 1,
                updated: 0,
                unchanged: 1
            }
        );
        assert_eq!(local[0].name, "Milk");
        assert_eq!(local[1], other);
    }

    #[tokio::test]
    async fn test_pull_newer_remote_overwrites_local() {
        let (store, _dir) = setup_store();
        store.insert(milk("Milk", t(1))).unwrap();
        let remote = milk("Milk 2%", t(2));
        let sync = WebSync::new(remote_shopping(&[remote.clone()]));

        let report = sync
            .sync::<ShoppingItem>(&store, SyncDirection::Pull)
            .await
            .unwrap();

        assert_eq!(report.updated, 1);
        let local = store.list::<ShoppingItem>();
        assert_eq!(local.len(), 1);
        assert_eq!(local[0], remote);
        assert_eq!(local[0].name, "Milk 2%");
    }

    #[tokio::test]
    async fn test_pull_older_remote_leaves_local() {
        let (store, _dir) = setup_store();
        store.insert(milk("Milk", t(2))).unwrap();
        let sync = WebSync::new(remote_shopping(&[milk("Milk 2%", t(1))]));

        let report = sync
            .sync::<ShoppingItem>(&store, SyncDirection::Pull)
            .await
            .unwrap();

        assert_eq!(report.unchanged, 1);
        assert_eq!(store.list::<ShoppingItem>()[0].name, "Milk");
    }

    #[tokio::test]
    async fn test_pull_equal_timestamp_leaves_local() {
        let (store, _dir) = setup_store();
        store.insert(milk("Milk", t(1))).unwrap();
        let sync = WebSync::new(remote_shopping(&[milk("Milk 2%", t(1))]));

        sync.sync::<ShoppingItem>(&store, SyncDirection::Pull)
            .await
            .unwrap();
        assert_eq!(store.list::<ShoppingItem>()[0].name, "Milk");
    }

    #[tokio::test]
    async fn test_pull_remote_without_timestamp_never_overwrites_local() {
        let (store, _dir) = setup_store();
        let mut local = milk("Milk (edited locally)", Utc::now());
        local.id = "1".to_string();
        store.insert(local).unwrap();

        let mut api = FakeApi::default();
        api.collections.insert(
            EntityKind::Shopping,
            vec![
                json!({"id": 1, "name": "Milk (stale server copy)"}),
                json!({"id": 2, "name": "Bread"}),
            ],
        );
        let sync = WebSync::new(api);

        let report = sync
            .sync::<ShoppingItem>(&store, SyncDirection::Pull)
            .await
            .unwrap();

        assert_eq!(report.updated, 0);
        assert_eq!(report.unchanged, 1);
        assert_eq!(report.inserted, 1);
        let items = store.list::<ShoppingItem>();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Milk (edited locally)");
        assert_eq!(items[1].name, "Bread");
    }

    #[tokio::test]
    async fn test_pull_inserts_missing_record_unchanged() {
        let (store, _dir) = setup_store();
        let remote = milk("Eggs", t(3));
        let sync = WebSync::new(remote_shopping(&[remote.clone()]));

        let report = sync
            .sync::<ShoppingItem>(&store, SyncDirection::Pull)
            .await
            .unwrap();
        assert_eq!(report.inserted, 1);
        assert_eq!(store.list::<ShoppingItem>(), vec![remote]);
    }

    #[tokio::test]
    async fn test_pull_recipes_compare_created_at() {
        let (store, _dir) = setup_store();
        let mut local = Recipe::new("Soup");
        local.id = "r1".to_string();
        local.created_at = t(1);
        local.updated_at = Some(t(10));
        store.insert(local).unwrap();

        let mut remote = Recipe::new("Better soup");
        remote.id = "r1".to_string();
        remote.created_at = t(2);

        let mut api = FakeApi::default();
        api.collections
            .insert(EntityKind::Recipes, vec![serde_json::to_value(&remote).unwrap()]);
        let sync = WebSync::new(api);

        sync.sync::<Recipe>(&store, SyncDirection::Pull).await.unwrap();
        assert_eq!(store.list::<Recipe>()[0].name, "Better soup");
    }

    #[tokio::test]
    async fn test_pull_skips_undecodable_and_idless_records() {
        let (store, _dir) = setup_store();
        let mut api = FakeApi::default();
        api.collections.insert(
            EntityKind::Shopping,
            vec![
                json!({"name": "No id"}),
                json!({"id": "x", "quantity": "many"}),
                json!({"id": 9, "name": "Numeric id"}),
            ],
        );
        let sync = WebSync::new(api);

        let report = sync
            .sync::<ShoppingItem>(&store, SyncDirection::Pull)
            .await
            .unwrap();
        assert_eq!(report.failed, 2);
        assert_eq!(report.inserted, 1);
        assert_eq!(store.list::<ShoppingItem>()[0].id, "9");
    }

    #[tokio::test]
    async fn test_push_creates_every_local_record() {
        let (store, _dir) = setup_store();
        for name in ["A", "B", "C"] {
            store.add(ShoppingItem::new(name)).unwrap();
        }
        let sync = WebSync::new(FakeApi::default());

        let report = sync
            .sync::<ShoppingItem>(&store, SyncDirection::Push)
            .await
            .unwrap();

        assert_eq!(report.created_remote, 3);
        let calls = sync.api().calls();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|c| c.starts_with("POST shopping ")));
    }

    #[tokio::test]
    async fn test_push_conflict_retries_as_update_exactly_once() {
        let (store, _dir) = setup_store();
        let conflicting = store.add(ShoppingItem::new("Milk")).unwrap();
        store.add(ShoppingItem::new("Bread")).unwrap();

        let mut api = FakeApi::default();
        api.existing_ids.insert(conflicting.id.clone());
        let sync = WebSync::new(api);

        let report = sync
            .sync::<ShoppingItem>(&store, SyncDirection::Push)
            .await
            .unwrap();

        assert_eq!(report.created_remote, 1);
        assert_eq!(report.updated_remote, 1);
        let calls = sync.api().calls();
        let puts: Vec<_> = calls.iter().filter(|c| c.starts_with("PUT")).collect();
        assert_eq!(puts, vec![&format!("PUT shopping {}", conflicting.id)]);
    }

    #[tokio::test]
    async fn test_push_failure_on_one_record_does_not_abort() {
        let (store, _dir) = setup_store();
        let bad = store.add(ShoppingItem::new("Bad")).unwrap();
        store.add(ShoppingItem::new("Good")).unwrap();

        let mut api = FakeApi::default();
        api.existing_ids.insert(bad.id.clone());
        api.rejected_updates.insert(bad.id.clone());
        let sync = WebSync::new(api);

        let report = sync
            .sync::<ShoppingItem>(&store, SyncDirection::Push)
            .await
            .unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.created_remote, 1);
    }

    #[tokio::test]
    async fn test_sync_all_aborts_when_remote_is_down() {
        let (store, _dir) = setup_store();
        store.add(ShoppingItem::new("Milk")).unwrap();
        let sync = WebSync::new(FakeApi {
            down: true,
            ..Default::default()
        });

        let err = sync
            .sync_all(&store, SyncDirection::Both)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::WebAppNotRunning { .. }));
        assert_eq!(sync.api().calls(), vec!["GET /api/health".to_string()]);
    }

    #[tokio::test]
    async fn test_sync_all_continues_after_collection_failure() {
        let (store, _dir) = setup_store();
        let mut api = FakeApi::default();
        api.failing_fetch.insert(EntityKind::Shopping);
        let sync = WebSync::new(api);

        let report = sync.sync_all(&store, SyncDirection::Pull).await.unwrap();

        assert!(!report.is_success());
        let kinds: Vec<_> = report.collections.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, EntityKind::SYNCED.to_vec());
        assert_eq!(report.failures().count(), 1);
        assert_eq!(
            sync.api().calls(),
            vec!["GET /api/health", "GET shopping", "GET recipes", "GET meals"]
        );
    }

    #[tokio::test]
    async fn test_sync_collection_rejects_unsynced_kind() {
        let (store, _dir) = setup_store();
        let sync = WebSync::new(FakeApi::default());
        let err = sync
            .sync_collection(&store, EntityKind::Todos, SyncDirection::Both)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::NotSynced { .. }));
    }
}
