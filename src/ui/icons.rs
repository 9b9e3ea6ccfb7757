//! Shared UI icons.
//!
//! `console::Emoji` falls back to the plain variant on terminals without
//! Unicode support.

use console::Emoji;

// Status indicators
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[WARN]");

// Sync
pub static PULL: Emoji<'_, '_> = Emoji("⬇️  ", "<-");
pub static PUSH: Emoji<'_, '_> = Emoji("⬆️  ", "->");
pub static SYNC: Emoji<'_, '_> = Emoji("🔄 ", "[SYNC]");

// Files and data
pub static FOLDER: Emoji<'_, '_> = Emoji("📁 ", "");
pub static FILE: Emoji<'_, '_> = Emoji("📄 ", "");

// Domain
pub static CART: Emoji<'_, '_> = Emoji("🛒 ", "");
pub static BOOK: Emoji<'_, '_> = Emoji("📖 ", "");
pub static CALENDAR: Emoji<'_, '_> = Emoji("📅 ", "");
pub static STORE: Emoji<'_, '_> = Emoji("🏪 ", "");
pub static STAR: Emoji<'_, '_> = Emoji("⭐ ", "*");
pub static TODO: Emoji<'_, '_> = Emoji("📝 ", "");

// Watchdog
pub static HEART: Emoji<'_, '_> = Emoji("💓 ", "[UP]");
pub static RESTART: Emoji<'_, '_> = Emoji("🔁 ", "[RESTART]");
