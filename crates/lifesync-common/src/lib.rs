//! Shared domain types for LifeSync.
//!
//! Every collection the CLI persists locally (and the subset it syncs with the
//! web app) is modelled here. The [`Record`] trait gives the data store and the
//! sync client one uniform view over all of them: identifier, timestamps and
//! the timestamp used for last-write-wins comparison.

pub mod grocery;
pub mod meal;
pub mod recipe;
pub mod record;
pub mod shopping;
pub mod todo;

pub use grocery::{GroceryStore, Rating, RatingError, StoreRatings, StoreType};
pub use meal::{MealPlan, MealStatus};
pub use recipe::{Cuisine, Difficulty, Ingredient, Recipe};
pub use record::{EntityKind, Record, new_id};
pub use shopping::{Priority, ShoppingCategory, ShoppingItem};
pub use todo::{TodoCategory, TodoItem, TodoStatus};
