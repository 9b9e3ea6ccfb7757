use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.json";
pub const DEFAULT_API_URL: &str = "http://localhost:3001";

/// User preferences stored in `config.json`.
///
/// Every field is optional; unset fields fall back to the environment and
/// then to built-in defaults when [`Settings`] are resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifeSyncConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_store: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_meal_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl LifeSyncConfig {
    /// Keys accepted by `config set`.
    pub const KEYS: [&'static str; 6] = [
        "apiUrl",
        "dataPath",
        "defaultStore",
        "defaultMealType",
        "defaultCategory",
        "username",
    ];

    /// Load from `path`. A missing file yields the empty configuration.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "apiUrl" => self.api_url.clone(),
            "dataPath" => self.data_path.as_ref().map(|p| p.display().to_string()),
            "defaultStore" => self.default_store.clone(),
            "defaultMealType" => self.default_meal_type.clone(),
            "defaultCategory" => self.default_category.clone(),
            "username" => self.username.clone(),
            _ => None,
        }
    }

    /// Set one key by its JSON name. An empty value unsets it.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = Some(value.trim().to_string()).filter(|v| !v.is_empty());
        match key {
            "apiUrl" => self.api_url = value,
            "dataPath" => self.data_path = value.map(PathBuf::from),
            "defaultStore" => self.default_store = value,
            "defaultMealType" => self.default_meal_type = value,
            "defaultCategory" => self.default_category = value,
            "username" => self.username = value,
            _ => bail!(
                "Unknown config key '{}'. Valid keys: {}",
                key,
                Self::KEYS.join(", ")
            ),
        }
        Ok(())
    }
}

/// Flags given on the command line; they win over everything else.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_url: Option<String>,
    pub data_dir: Option<PathBuf>,
}

/// Effective configuration after layering file → environment → CLI.
#[derive(Debug, Clone)]
pub struct Settings {
    pub config_dir: PathBuf,
    pub config: LifeSyncConfig,
    /// Why `config.json` was ignored, when it could not be read or parsed.
    pub config_error: Option<String>,
    pub api_url: String,
    pub data_dir: PathBuf,
}

impl Settings {
    pub fn resolve(overrides: &Overrides) -> Result<Self> {
        Self::resolve_with(overrides, |key| std::env::var(key).ok())
    }

    /// Resolve with an explicit environment lookup.
    pub fn resolve_with(
        overrides: &Overrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        let config_dir = config_dir_with(&env)?;
        // An unreadable file must not lock the user out of `config reset`.
        let (config, config_error) = match LifeSyncConfig::load(&config_dir.join(CONFIG_FILE)) {
            Ok(config) => (config, None),
            Err(e) => (LifeSyncConfig::default(), Some(format!("{:#}", e))),
        };

        let api_url = overrides
            .api_url
            .clone()
            .or_else(|| env("LIFESYNC_API_URL"))
            .or_else(|| config.api_url.clone())
            .or_else(|| env("VITE_API_BASE_URL").map(|url| strip_api_suffix(&url)))
            .or_else(|| env("PORT").map(|port| format!("http://localhost:{}", port.trim())))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let data_dir = overrides
            .data_dir
            .clone()
            .or_else(|| env("LIFESYNC_DATA_PATH").map(PathBuf::from))
            .or_else(|| config.data_path.clone())
            .unwrap_or_else(|| config_dir.join("data"));

        Ok(Self {
            config_dir,
            config,
            config_error,
            api_url: api_url.trim_end_matches('/').to_string(),
            data_dir,
        })
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    /// Log the config file problem, if any. Call once logging is installed.
    pub fn warn_config_error(&self) {
        if let Some(error) = &self.config_error {
            tracing::warn!(error = %error, "Ignoring unreadable config file, using defaults");
        }
    }
}

/// `LIFESYNC_CONFIG_DIR`, else the per-user config directory.
fn config_dir_with(env: impl Fn(&str) -> Option<String>) -> Result<PathBuf> {
    if let Some(dir) = env("LIFESYNC_CONFIG_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::config_dir()
        .map(|dir| dir.join("lifesync"))
        .context("Could not determine the user configuration directory; set LIFESYNC_CONFIG_DIR")
}

/// The frontend base URL usually ends in `/api`; request paths already carry it.
fn strip_api_suffix(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    url.strip_suffix("/api").unwrap_or(url).to_string()
}
