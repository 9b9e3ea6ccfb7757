use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::{EntityKind, deserialize_id, stamped_record};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoreType {
    #[default]
    Supermarket,
    Grocery,
    Warehouse,
    Specialty,
    FarmersMarket,
    Online,
    Convenience,
}

impl StoreType {
    pub const ALL: &'static [StoreType] = &[
        Self::Supermarket,
        Self::Grocery,
        Self::Warehouse,
        Self::Specialty,
        Self::FarmersMarket,
        Self::Online,
        Self::Convenience,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Supermarket => "supermarket",
            Self::Grocery => "grocery",
            Self::Warehouse => "warehouse",
            Self::Specialty => "specialty",
            Self::FarmersMarket => "farmers-market",
            Self::Online => "online",
            Self::Convenience => "convenience",
        }
    }
}

impl FromStr for StoreType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Invalid store type: {}", s))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Rating must be between 1 and 5, got {0}")]
pub struct RatingError(pub u8);

/// A 1–5 star rating. Out-of-range values are rejected when decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = RatingError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (1..=5).contains(&value) {
            Ok(Self(value))
        } else {
            Err(RatingError(value))
        }
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreRatings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Rating>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<Rating>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<Rating>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<Rating>,
}

impl StoreRatings {
    /// Mean of the ratings that are set.
    pub fn average(&self) -> Option<f64> {
        let set: Vec<u8> = [self.price, self.quality, self.service, self.selection]
            .into_iter()
            .flatten()
            .map(Rating::get)
            .collect();
        if set.is_empty() {
            None
        } else {
            Some(set.iter().map(|&r| f64::from(r)).sum::<f64>() / set.len() as f64)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroceryStore {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub store_type: StoreType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default)]
    pub ratings: StoreRatings,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl GroceryStore {
    pub fn new(name: impl Into<String>, store_type: StoreType) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            name: name.into(),
            store_type,
            address: None,
            ratings: StoreRatings::default(),
            favorite: false,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_invariants(&mut self, _now: DateTime<Utc>) {}
}

stamped_record!(GroceryStore, EntityKind::Stores);
