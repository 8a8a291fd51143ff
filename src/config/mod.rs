//! Configuration management for spotlight.

use std::path::{Path, PathBuf};
use std::time::Duration;

use relay_core::RelayLimits;
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model configuration.
    pub model: ModelConfig,

    /// Nirvana API configuration.
    pub nirvana: NirvanaConfig,

    /// Task cache configuration.
    pub cache: CacheConfig,

    /// Relay loop limits.
    pub relay: RelayConfig,

    /// Credential storage configuration.
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// Loads global config first, then merges project-local config if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;

        if let Ok(project_path) = Self::project_config_path() {
            if project_path.exists() {
                config.merge(Self::load_from(&project_path)?);
            }
        }

        Ok(config)
    }

    /// Load a single configuration file, falling back to defaults when it is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("invalid config {}: {e}", path.display()))
    }

    /// Get the project-local configuration file path.
    ///
    /// Looks for `.spotlight/config.toml` in the current directory.
    pub fn project_config_path() -> anyhow::Result<PathBuf> {
        let cwd = std::env::current_dir()?;
        Ok(cwd.join(".spotlight").join("config.toml"))
    }

    /// Merge another config into this one (project overrides global).
    fn merge(&mut self, other: Self) {
        let defaults = Self::default();

        if other.model.model != defaults.model.model {
            self.model.model = other.model.model;
        }
        if other.model.base_url != defaults.model.base_url {
            self.model.base_url = other.model.base_url;
        }
        if other.model.api_key_env != defaults.model.api_key_env {
            self.model.api_key_env = other.model.api_key_env;
        }

        if other.nirvana != defaults.nirvana {
            self.nirvana = other.nirvana;
        }
        if other.cache != defaults.cache {
            self.cache = other.cache;
        }
        if other.relay.max_rounds != defaults.relay.max_rounds {
            self.relay.max_rounds = other.relay.max_rounds;
        }
        if other.relay.timeout_secs != defaults.relay.timeout_secs {
            self.relay.timeout_secs = other.relay.timeout_secs;
        }
        if other.storage != defaults.storage {
            self.storage = other.storage;
        }
    }

    /// Get the configuration file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined.
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Get the config directory path (`~/.config/nirvana/spotlight/`).
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined.
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
            return Ok(PathBuf::from(xdg_config_home)
                .join("nirvana")
                .join("spotlight"));
        }

        if cfg!(target_os = "macos") {
            if let Ok(home) = std::env::var("HOME") {
                return Ok(PathBuf::from(home)
                    .join(".config")
                    .join("nirvana")
                    .join("spotlight"));
            }
        }

        let base = directories::BaseDirs::new()
            .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;

        Ok(base.config_dir().join("nirvana").join("spotlight"))
    }

    /// Get the data directory path (`~/.local/share/nirvana/spotlight/`).
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be determined.
    pub fn data_dir() -> anyhow::Result<PathBuf> {
        let base = directories::BaseDirs::new()
            .ok_or_else(|| anyhow::anyhow!("could not determine data directory"))?;

        Ok(base.data_dir().join("nirvana").join("spotlight"))
    }

    /// Get the credential file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be determined.
    pub fn credentials_path() -> anyhow::Result<PathBuf> {
        Ok(Self::data_dir()?.join("credentials.json"))
    }
}

/// Model provider settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model identifier sent with every request.
    pub model: String,

    /// Responses API base URL.
    pub base_url: String,

    /// Environment variable consulted before the stored key.
    pub api_key_env: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: "gpt-5-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: Some("OPENAI_API_KEY".to_string()),
        }
    }
}

impl ModelConfig {
    /// Resolve the model API key: environment variable first, then `stored`.
    #[must_use]
    pub fn resolve_api_key(&self, stored: Option<String>) -> Option<String> {
        self.api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|key| !key.trim().is_empty())
            .or(stored)
    }
}

/// Nirvana API settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NirvanaConfig {
    pub base_url: String,
    pub app_id: String,
    pub app_version: String,
}

impl Default for NirvanaConfig {
    fn default() -> Self {
        Self {
            base_url: "https://gc-api.nirvanahq.com/api".to_string(),
            app_id: "com.nirvanahq.focus".to_string(),
            app_version: "3.10.4".to_string(),
        }
    }
}

/// Task snapshot cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Seconds before a snapshot is considered stale.
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 300 }
    }
}

impl CacheConfig {
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Relay loop settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Tool-call rounds allowed per turn.
    pub max_rounds: usize,

    /// Wall-clock budget per turn in seconds.
    pub timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        let limits = RelayLimits::default();
        Self {
            max_rounds: limits.max_rounds,
            timeout_secs: limits.timeout.as_secs(),
        }
    }
}

impl RelayConfig {
    #[must_use]
    pub const fn limits(&self) -> RelayLimits {
        RelayLimits {
            max_rounds: self.max_rounds,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

/// Credential storage settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Seconds a credential write may take before it is abandoned.
    pub persist_timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            persist_timeout_secs: 5,
        }
    }
}

impl StorageConfig {
    #[must_use]
    pub const fn persist_timeout(&self) -> Duration {
        Duration::from_secs(self.persist_timeout_secs)
    }
}
