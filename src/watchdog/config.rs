//! `monitor.toml`: what to run and how to watch it.
//!
//! ```toml
//! [server]
//! command = "npm"
//! args = ["run", "server"]
//! working_dir = "/srv/lifesync"
//! port = 3001
//!
//! [server.env]
//! NODE_ENV = "production"
//!
//! [checks]
//! base_url = "http://localhost:3001"
//! initial_delay_secs = 10
//! interval_secs = 15
//! health_timeout_secs = 5
//! data_timeout_secs = 10
//!
//! [restart]
//! max_restarts = 10
//! delay_secs = 5
//! ```
//!
//! Every key is optional. `PORT` in the environment overrides `server.port`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::{CheckSchedule, HttpProbe, RestartPolicy, ServerCommand};

pub const MONITOR_FILE: &str = "monitor.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub checks: ChecksSection,
    #[serde(default)]
    pub restart: RestartSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_command")]
    pub command: String,
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

fn default_command() -> String {
    "npm".to_string()
}

fn default_args() -> Vec<String> {
    vec!["run".to_string(), "server".to_string()]
}

fn default_port() -> u16 {
    3001
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: default_args(),
            working_dir: None,
            port: default_port(),
            env: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecksSection {
    /// Defaults to `http://localhost:<port>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_initial_delay")]
    pub initial_delay_secs: u64,
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_health_timeout")]
    pub health_timeout_secs: u64,
    #[serde(default = "default_data_timeout")]
    pub data_timeout_secs: u64,
}

fn default_initial_delay() -> u64 {
    10
}

fn default_interval() -> u64 {
    15
}

fn default_health_timeout() -> u64 {
    5
}

fn default_data_timeout() -> u64 {
    10
}

impl Default for ChecksSection {
    fn default() -> Self {
        Self {
            base_url: None,
            initial_delay_secs: default_initial_delay(),
            interval_secs: default_interval(),
            health_timeout_secs: default_health_timeout(),
            data_timeout_secs: default_data_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestartSection {
    #[serde(default = "default_max_restarts")]
    pub max_restarts: u32,
    #[serde(default = "default_delay")]
    pub delay_secs: u64,
}

fn default_max_restarts() -> u32 {
    10
}

fn default_delay() -> u64 {
    5
}

impl Default for RestartSection {
    fn default() -> Self {
        Self {
            max_restarts: default_max_restarts(),
            delay_secs: default_delay(),
        }
    }
}

impl MonitorConfig {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read monitor config: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Invalid monitor config: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse monitor.toml")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize monitor config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write monitor config: {}", path.display()))
    }

    /// Apply `PORT` from the environment lookup.
    pub fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(port) = env("PORT").filter(|p| !p.trim().is_empty()) {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("PORT is not a valid port number: {port}"))?;
        }
        Ok(())
    }

    pub fn base_url(&self) -> String {
        self.checks
            .base_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", self.server.port))
    }

    /// The server command, with `PORT` exported to the child.
    pub fn command(&self) -> ServerCommand {
        let mut command = ServerCommand::new(&self.server.command).args(self.server.args.clone());
        if let Some(dir) = &self.server.working_dir {
            command = command.working_dir(dir);
        }
        for (key, value) in &self.server.env {
            command = command.env(key, value);
        }
        command.env("PORT", self.server.port.to_string())
    }

    pub fn policy(&self) -> RestartPolicy {
        RestartPolicy::fixed(
            self.restart.max_restarts,
            Duration::from_secs(self.restart.delay_secs),
        )
    }

    pub fn schedule(&self) -> CheckSchedule {
        CheckSchedule {
            initial_delay: Duration::from_secs(self.checks.initial_delay_secs),
            interval: Duration::from_secs(self.checks.interval_secs),
        }
    }

    pub fn probe(&self) -> Result<HttpProbe> {
        Ok(HttpProbe::new(self.base_url())?.with_timeouts(
            Duration::from_secs(self.checks.health_timeout_secs),
            Duration::from_secs(self.checks.data_timeout_secs),
        ))
    }

    /// Problems that make the configuration unusable.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.server.command.trim().is_empty() {
            problems.push("server.command is empty".to_string());
        }
        if self.checks.interval_secs == 0 {
            problems.push("checks.interval_secs must be greater than 0".to_string());
        }
        if self.restart.max_restarts == 0 {
            problems.push("restart.max_restarts must be greater than 0".to_string());
        }
        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = MonitorConfig::load(&dir.path().join(MONITOR_FILE)).unwrap();
        assert_eq!(config, MonitorConfig::default());
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.restart.max_restarts, 10);
        assert_eq!(config.base_url(), "http://localhost:3001");
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = MonitorConfig::parse(
            r#"
[server]
command = "node"
args = ["server/index.js"]

[restart]
max_restarts = 3
"#,
        )
        .unwrap();
        assert_eq!(config.server.command, "node");
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.restart.max_restarts, 3);
        assert_eq!(config.restart.delay_secs, 5);
        assert_eq!(config.checks.interval_secs, 15);
    }

    #[test]
    fn test_port_env_overrides_file() {
        let mut config = MonitorConfig::default();
        config
            .apply_env(|key| (key == "PORT").then(|| "4000".to_string()))
            .unwrap();
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.base_url(), "http://localhost:4000");
        assert!(
            config
                .command()
                .env
                .contains(&("PORT".to_string(), "4000".to_string()))
        );

        let mut unchanged = MonitorConfig::default();
        unchanged.apply_env(no_env).unwrap();
        assert_eq!(unchanged.server.port, 3001);
    }

    #[test]
    fn test_invalid_port_env_is_an_error() {
        let mut config = MonitorConfig::default();
        assert!(
            config
                .apply_env(|_| Some("not-a-port".to_string()))
                .is_err()
        );
    }

    #[test]
    fn test_explicit_base_url_wins() {
        let mut config = MonitorConfig::default();
        config.checks.base_url = Some("http://10.0.0.2:8080".to_string());
        assert_eq!(config.base_url(), "http://10.0.0.2:8080");
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(MONITOR_FILE);
        let mut config = MonitorConfig::default();
        config.server.env.insert("NODE_ENV".into(), "production".into());
        config.save(&path).unwrap();
        assert_eq!(MonitorConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_validate_flags_unusable_values() {
        let mut config = MonitorConfig::default();
        config.server.command = " ".into();
        config.restart.max_restarts = 0;
        assert_eq!(config.validate().len(), 2);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(MONITOR_FILE);
        std::fs::write(&path, "[server\ncommand = ").unwrap();
        assert!(MonitorConfig::load(&path).is_err());
    }
}
