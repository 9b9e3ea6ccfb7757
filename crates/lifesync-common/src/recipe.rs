use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::{EntityKind, Record, deserialize_id};
use crate::shopping::ShoppingCategory;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cuisine {
    American,
    Italian,
    Mexican,
    Chinese,
    Japanese,
    Indian,
    Thai,
    French,
    Mediterranean,
    #[default]
    Other,
}

impl Cuisine {
    pub const ALL: &'static [Cuisine] = &[
        Self::American,
        Self::Italian,
        Self::Mexican,
        Self::Chinese,
        Self::Japanese,
        Self::Indian,
        Self::Thai,
        Self::French,
        Self::Mediterranean,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::American => "american",
            Self::Italian => "italian",
            Self::Mexican => "mexican",
            Self::Chinese => "chinese",
            Self::Japanese => "japanese",
            Self::Indian => "indian",
            Self::Thai => "thai",
            Self::French => "french",
            Self::Mediterranean => "mediterranean",
            Self::Other => "other",
        }
    }
}

impl FromStr for Cuisine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("Invalid cuisine: {}", s))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            _ => Err(format!("Invalid difficulty: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub category: ShoppingCategory,
}

impl FromStr for Ingredient {
    type Err = String;

    /// Parses `"<amount> <unit> <name>"`, e.g. `"2 cups flour"`. A line that
    /// does not start with a number is taken as a bare name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("Ingredient cannot be empty".to_string());
        }
        let mut parts = s.splitn(3, char::is_whitespace);
        let first = parts.next().unwrap_or_default();
        let Ok(amount) = first.parse::<f64>() else {
            return Ok(Self {
                name: s.to_string(),
                amount: 1.0,
                unit: String::new(),
                category: ShoppingCategory::Other,
            });
        };
        let (unit, name) = match (parts.next(), parts.next()) {
            (Some(unit), Some(name)) => (unit.to_string(), name.trim().to_string()),
            (Some(name), None) => (String::new(), name.to_string()),
            _ => return Err(format!("Ingredient '{}' has an amount but no name", s)),
        };
        Ok(Self {
            name,
            amount,
            unit,
            category: ShoppingCategory::Other,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub cuisine: Cuisine,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub prep_time: u32,
    #[serde(default)]
    pub cook_time: u32,
    #[serde(default = "default_servings")]
    pub servings: u32,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_servings() -> u32 {
    4
}

impl Recipe {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            description: None,
            cuisine: Cuisine::default(),
            difficulty: Difficulty::default(),
            prep_time: 0,
            cook_time: 0,
            servings: default_servings(),
            ingredients: Vec::new(),
            instructions: Vec::new(),
            tags: Vec::new(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    pub fn total_time(&self) -> u32 {
        self.prep_time + self.cook_time
    }
}

impl Record for Recipe {
    const KIND: EntityKind = EntityKind::Recipes;
    const SYNC_TIMESTAMP_FIELD: &'static str = "createdAt";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn set_created_at(&mut self, at: DateTime<Utc>) {
        self.created_at = at;
    }

    fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = Some(at);
    }

    /// The web app never re-stamps recipes, so creation time is the only
    /// timestamp both sides agree on.
    fn sync_timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }
}
