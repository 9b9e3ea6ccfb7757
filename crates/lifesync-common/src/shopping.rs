use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::{EntityKind, deserialize_id, stamped_record};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShoppingCategory {
    Produce,
    Dairy,
    Meat,
    Seafood,
    Bakery,
    Pantry,
    Frozen,
    Beverages,
    Snacks,
    Household,
    PersonalCare,
    #[default]
    Other,
}

impl ShoppingCategory {
    pub const ALL: &'static [ShoppingCategory] = &[
        Self::Produce,
        Self::Dairy,
        Self::Meat,
        Self::Seafood,
        Self::Bakery,
        Self::Pantry,
        Self::Frozen,
        Self::Beverages,
        Self::Snacks,
        Self::Household,
        Self::PersonalCare,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Produce => "produce",
            Self::Dairy => "dairy",
            Self::Meat => "meat",
            Self::Seafood => "seafood",
            Self::Bakery => "bakery",
            Self::Pantry => "pantry",
            Self::Frozen => "frozen",
            Self::Beverages => "beverages",
            Self::Snacks => "snacks",
            Self::Household => "household",
            Self::PersonalCare => "personal-care",
            Self::Other => "other",
        }
    }
}

impl FromStr for ShoppingCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("Invalid category: {}", s))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(format!("Invalid priority: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingItem {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub category: ShoppingCategory,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub purchased: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchased_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn default_quantity() -> u32 {
    1
}

impl ShoppingItem {
    /// A new, unsaved item. The store assigns the id and timestamps on `add`.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            name: name.into(),
            quantity: default_quantity(),
            unit: "item".to_string(),
            category: ShoppingCategory::default(),
            priority: Priority::default(),
            purchased: false,
            purchased_at: None,
            price: None,
            estimated_price: None,
            store: None,
            brand: None,
            notes: None,
            barcode: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_invariants(&mut self, now: DateTime<Utc>) {
        match (self.purchased, self.purchased_at) {
            (true, None) => self.purchased_at = Some(now),
            (false, Some(_)) => self.purchased_at = None,
            _ => {}
        }
    }
}

stamped_record!(ShoppingItem, EntityKind::Shopping);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;

    #[test]
    fn test_category_serializes_kebab_case() {
        let json = serde_json::to_string(&ShoppingCategory::PersonalCare).unwrap();
        assert_eq!(json, "\"personal-care\"");
        assert_eq!(
            "personal-care".parse::<ShoppingCategory>().unwrap(),
            ShoppingCategory::PersonalCare
        );
        assert!("toys".parse::<ShoppingCategory>().is_err());
    }

    #[test]
    fn test_priority_orders_low_to_high() {
        assert!(Priority::High > Priority::Medium);
        assert!(Priority::Medium > Priority::Low);
    }

    #[test]
    fn test_purchased_sets_purchased_at() {
        let mut item = ShoppingItem::new("Milk");
        item.purchased = true;
        let now = Utc::now();
        item.normalize(now);
        assert_eq!(item.purchased_at, Some(now));
    }

    #[test]
    fn test_unpurchased_clears_purchased_at() {
        let mut item = ShoppingItem::new("Milk");
        item.purchased_at = Some(Utc::now());
        item.normalize(Utc::now());
        assert!(item.purchased_at.is_none());
    }

    #[test]
    fn test_decodes_camel_case_with_defaults() {
        let item: ShoppingItem = serde_json::from_str(
            r#"{"id": 3, "name": "Eggs", "estimatedPrice": 2.5, "updatedAt": "2024-01-02T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(item.id, "3");
        assert_eq!(item.quantity, 1);
        assert_eq!(item.estimated_price, Some(2.5));
        assert_eq!(item.category, ShoppingCategory::Other);
        assert_eq!(item.sync_timestamp().to_rfc3339(), "2024-01-02T00:00:00+00:00");
    }

    #[test]
    fn test_remote_sync_timestamp_ignores_decode_defaults() {
        let raw = serde_json::json!({"id": 1, "name": "Milk"});
        let item: ShoppingItem = serde_json::from_value(raw.clone()).unwrap();
        assert!(item.updated_at <= Utc::now());
        assert_eq!(ShoppingItem::remote_sync_timestamp(&raw), None);

        let raw = serde_json::json!({"updatedAt": "not a date"});
        assert_eq!(ShoppingItem::remote_sync_timestamp(&raw), None);

        let raw = serde_json::json!({"updatedAt": "2024-01-02T00:00:00Z"});
        assert_eq!(
            ShoppingItem::remote_sync_timestamp(&raw).unwrap().to_rfc3339(),
            "2024-01-02T00:00:00+00:00"
        );
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let value = serde_json::to_value(ShoppingItem::new("Bread")).unwrap();
        assert!(value.get("price").is_none());
        assert!(value.get("purchasedAt").is_none());
        assert_eq!(value["name"], "Bread");
        assert!(value.get("createdAt").is_some());
    }
}
