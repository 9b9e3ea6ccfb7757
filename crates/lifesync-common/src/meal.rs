use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::record::{EntityKind, deserialize_id, deserialize_opt_id, stamped_record};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealStatus {
    #[default]
    Planned,
    Prepped,
    Cooked,
    Eaten,
}

impl MealStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Prepped => "prepped",
            Self::Cooked => "cooked",
            Self::Eaten => "eaten",
        }
    }
}

impl FromStr for MealStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "planned" => Ok(Self::Planned),
            "prepped" => Ok(Self::Prepped),
            "cooked" => Ok(Self::Cooked),
            "eaten" => Ok(Self::Eaten),
            _ => Err(format!("Invalid meal status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlan {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: String,
    pub date: NaiveDate,
    pub meal_type: String,
    #[serde(
        default,
        deserialize_with = "deserialize_opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub recipe_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe_name: Option<String>,
    #[serde(default = "default_servings")]
    pub servings: u32,
    #[serde(default)]
    pub status: MealStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn default_servings() -> u32 {
    1
}

impl MealPlan {
    pub fn new(date: NaiveDate, meal_type: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            date,
            meal_type: meal_type.into(),
            recipe_id: None,
            recipe_name: None,
            servings: default_servings(),
            status: MealStatus::default(),
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_invariants(&mut self, _now: DateTime<Utc>) {}
}

stamped_record!(MealPlan, EntityKind::Meals);
