use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::record::{EntityKind, deserialize_id, deserialize_opt_id, stamped_record};
use crate::shopping::Priority;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TodoStatus {
    #[default]
    NeedToStart,
    CurrentlyWorking,
    PendingOthers,
    Done,
}

impl TodoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NeedToStart => "need-to-start",
            Self::CurrentlyWorking => "currently-working",
            Self::PendingOthers => "pending-others",
            Self::Done => "done",
        }
    }
}

impl FromStr for TodoStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "need-to-start" => Ok(Self::NeedToStart),
            "currently-working" => Ok(Self::CurrentlyWorking),
            "pending-others" => Ok(Self::PendingOthers),
            "done" => Ok(Self::Done),
            _ => Err(format!("Invalid todo status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TodoStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(
        default,
        deserialize_with = "deserialize_opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub category_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl TodoItem {
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            title: title.into(),
            description: None,
            status: TodoStatus::default(),
            priority: Priority::default(),
            category_id: None,
            due_date: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_invariants(&mut self, now: DateTime<Utc>) {
        match (self.status, self.completed_at) {
            (TodoStatus::Done, None) => self.completed_at = Some(now),
            (TodoStatus::Done, Some(_)) => {}
            (_, Some(_)) => self.completed_at = None,
            _ => {}
        }
    }
}

stamped_record!(TodoItem, EntityKind::Todos);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoCategory {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl TodoCategory {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            name: name.into(),
            color: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_invariants(&mut self, _now: DateTime<Utc>) {}
}

stamped_record!(TodoCategory, EntityKind::TodoCategories);
