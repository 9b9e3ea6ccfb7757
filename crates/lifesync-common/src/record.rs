use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// The collections LifeSync knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    Shopping,
    Recipes,
    Meals,
    Stores,
    Todos,
    TodoCategories,
}

impl EntityKind {
    pub const ALL: &'static [EntityKind] = &[
        Self::Shopping,
        Self::Recipes,
        Self::Meals,
        Self::Stores,
        Self::Todos,
        Self::TodoCategories,
    ];

    /// Collections that exist on the web app and take part in sync, in sync order.
    pub const SYNCED: &'static [EntityKind] = &[Self::Shopping, Self::Recipes, Self::Meals];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shopping => "shopping",
            Self::Recipes => "recipes",
            Self::Meals => "meals",
            Self::Stores => "stores",
            Self::Todos => "todos",
            Self::TodoCategories => "todoCategories",
        }
    }

    /// Backing file name inside the data directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Shopping => "shopping.json",
            Self::Recipes => "recipes.json",
            Self::Meals => "meals.json",
            Self::Stores => "stores.json",
            Self::Todos => "todos.json",
            Self::TodoCategories => "todoCategories.json",
        }
    }

    /// REST collection path on the web app, for synced kinds only.
    pub fn api_path(&self) -> Option<&'static str> {
        match self {
            Self::Shopping => Some("/api/shopping"),
            Self::Recipes => Some("/api/recipes"),
            Self::Meals => Some("/api/meals"),
            _ => None,
        }
    }

    pub fn is_synced(&self) -> bool {
        self.api_path().is_some()
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shopping" => Ok(Self::Shopping),
            "recipes" => Ok(Self::Recipes),
            "meals" => Ok(Self::Meals),
            "stores" => Ok(Self::Stores),
            "todos" => Ok(Self::Todos),
            "todoCategories" | "todo-categories" => Ok(Self::TodoCategories),
            _ => Err(format!("Invalid collection: {}", s)),
        }
    }
}

/// A persisted LifeSync record.
///
/// Implementors are plain serde structs. The store uses the setters to stamp
/// identifiers and timestamps; the sync client uses [`Record::sync_timestamp`]
/// to decide whether a remote copy is newer than the local one.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: EntityKind;

    /// JSON key holding the timestamp compared during pull.
    const SYNC_TIMESTAMP_FIELD: &'static str = "updatedAt";

    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);

    fn created_at(&self) -> DateTime<Utc>;
    fn set_created_at(&mut self, at: DateTime<Utc>);

    fn updated_at(&self) -> Option<DateTime<Utc>>;
    fn set_updated_at(&mut self, at: DateTime<Utc>);

    /// Timestamp compared during pull. Defaults to `updatedAt`, falling back
    /// to `createdAt` for records that were never updated.
    fn sync_timestamp(&self) -> DateTime<Utc> {
        self.updated_at().unwrap_or_else(|| self.created_at())
    }

    /// The comparison timestamp exactly as the web app sent it, read before
    /// decoding fills in defaults. `None` when the field is absent or not a
    /// valid RFC 3339 string.
    fn remote_sync_timestamp(value: &serde_json::Value) -> Option<DateTime<Utc>> {
        value
            .get(Self::SYNC_TIMESTAMP_FIELD)?
            .as_str()?
            .parse::<DateTime<Utc>>()
            .ok()
    }

    /// Restore derived-field invariants after a create or update.
    fn normalize(&mut self, _now: DateTime<Utc>) {}
}

/// Generate a fresh record identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        }
    }
}

/// Accept identifiers as JSON strings or integers (the web app's database
/// hands out integer keys).
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    RawId::deserialize(deserializer).map(String::from)
}

pub(crate) fn deserialize_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<RawId>::deserialize(deserializer).map(|raw| raw.map(String::from))
}

/// Implements the identifier and timestamp plumbing of [`Record`] for structs
/// with `id`, `created_at` and `updated_at: DateTime<Utc>` fields.
macro_rules! stamped_record {
    ($ty:ty, $kind:expr) => {
        impl $crate::record::Record for $ty {
            const KIND: $crate::record::EntityKind = $kind;

            fn id(&self) -> &str {
                &self.id
            }

            fn set_id(&mut self, id: String) {
                self.id = id;
            }

            fn created_at(&self) -> chrono::DateTime<chrono::Utc> {
                self.created_at
            }

            fn set_created_at(&mut self, at: chrono::DateTime<chrono::Utc>) {
                self.created_at = at;
            }

            fn updated_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
                Some(self.updated_at)
            }

            fn set_updated_at(&mut self, at: chrono::DateTime<chrono::Utc>) {
                self.updated_at = at;
            }

            fn normalize(&mut self, now: chrono::DateTime<chrono::Utc>) {
                self.apply_invariants(now);
            }
        }
    };
}

pub(crate) use stamped_record;
