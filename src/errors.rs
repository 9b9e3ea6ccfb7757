//! Typed error hierarchy for LifeSync.
//!
//! Three top-level enums cover the three subsystems:
//! - `StoreError`: local JSON collection writes and patches
//! - `SyncError`: web app sync, export and import
//! - `WatchdogError`: server process supervision

use std::path::PathBuf;

use lifesync_common::EntityKind;
use thiserror::Error;

/// Errors from the local data store.
///
/// Reads never fail (a missing or corrupt file is an empty collection), so
/// every variant here comes from a mutating call.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to lock {path}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize {kind} collection: {source}")]
    Serialize {
        kind: EntityKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("Patch for {kind} record {id} is invalid: {source}")]
    InvalidPatch {
        kind: EntityKind,
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Patch for {kind} record {id} must be a JSON object")]
    PatchNotObject { kind: EntityKind, id: String },
}

/// Errors from the web sync client.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Connection refused: the web app server is not listening.
    #[error("Web app is not running at {url}. Start it (or `lifesync monitor`) and try again.")]
    WebAppNotRunning { url: String },

    #[error("{method} {url} returned HTTP {status}")]
    Status {
        method: &'static str,
        url: String,
        status: u16,
    },

    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid web app URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("{kind} is not synced with the web app")]
    NotSynced { kind: EntityKind },

    #[error("Failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid export file {path}: {source}")]
    InvalidExport {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SyncError {
    /// True for failures that mean the remote side is unreachable.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, SyncError::WebAppNotRunning { .. })
            || matches!(self, SyncError::Request { source, .. } if source.is_timeout())
    }
}

/// Errors from the process watchdog.
#[derive(Debug, Error)]
pub enum WatchdogError {
    #[error("Failed to spawn server process `{command}`: {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server process exited with {status}")]
    Exited { status: String },

    #[error("Server process is no longer running")]
    NotAlive,

    #[error("Health check failed: {0}")]
    HealthCheck(String),

    #[error("Data check failed: {0}")]
    DataCheck(String),
}
