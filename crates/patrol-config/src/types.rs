//! Configuration types.
//!
//! Every section and field is optional on disk so that layers can be merged;
//! the accessor methods on [`PatrolConfig`] apply the defaults.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

/// Default API base URL.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000/api";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatrolConfig {
    /// Backend connection settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,

    /// Credential storage settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageConfig>,
}

/// `[server]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// API base URL, e.g. `https://patrol.example.com/api`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Custom user agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// `[storage]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the durable credential file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl PatrolConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: PatrolConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Merging is field-wise so a project file can override just the URL
    /// while keeping the user's timeout.
    pub fn merge(&mut self, other: PatrolConfig) {
        if let Some(other_server) = other.server {
            let server = self.server.get_or_insert_with(ServerConfig::default);
            if other_server.url.is_some() {
                server.url = other_server.url;
            }
            if other_server.timeout_secs.is_some() {
                server.timeout_secs = other_server.timeout_secs;
            }
            if other_server.user_agent.is_some() {
                server.user_agent = other_server.user_agent;
            }
        }

        if let Some(other_storage) = other.storage {
            let storage = self.storage.get_or_insert_with(StorageConfig::default);
            if other_storage.data_dir.is_some() {
                storage.data_dir = other_storage.data_dir;
            }
        }
    }

    /// API base URL, falling back to [`DEFAULT_SERVER_URL`].
    pub fn server_url(&self) -> &str {
        self.server
            .as_ref()
            .and_then(|s| s.url.as_deref())
            .unwrap_or(DEFAULT_SERVER_URL)
    }

    /// Override the server URL (e.g. from a command-line flag).
    pub fn set_server_url(&mut self, url: impl Into<String>) {
        self.server.get_or_insert_with(ServerConfig::default).url = Some(url.into());
    }

    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(
            self.server
                .as_ref()
                .and_then(|s| s.timeout_secs)
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        )
    }

    /// Custom user agent, if configured.
    pub fn user_agent(&self) -> Option<&str> {
        self.server.as_ref().and_then(|s| s.user_agent.as_deref())
    }

    /// Directory for the durable credential tier.
    ///
    /// Falls back to the platform data directory, then to the config directory.
    pub fn data_dir(&self) -> Option<PathBuf> {
        if let Some(dir) = self.storage.as_ref().and_then(|s| s.data_dir.clone()) {
            return Some(dir);
        }
        dirs::data_dir()
            .map(|d| d.join(crate::discovery::APP_NAME))
            .or_else(crate::xdg_config_dir)
    }

    fn validate(&self) -> Result<()> {
        if let Some(server) = &self.server {
            if server.timeout_secs == Some(0) {
                return Err(ConfigError::InvalidValue {
                    field: "server.timeout_secs".to_string(),
                    reason: "must be greater than zero".to_string(),
                });
            }
            if let Some(url) = &server.url
                && url.trim().is_empty()
            {
                return Err(ConfigError::InvalidValue {
                    field: "server.url".to_string(),
                    reason: "must not be empty".to_string(),
                });
            }
        }
        Ok(())
    }
}
