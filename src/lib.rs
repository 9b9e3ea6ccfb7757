pub mod config;
pub mod errors;
pub mod logging;
pub mod store;
pub mod sync;
pub mod ui;
pub mod watchdog;
