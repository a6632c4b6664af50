//! TOML-based application configuration.
//!
//! Stores:
//! - The hosted application's origin
//! - Endpoint shapes the interceptor watches
//! - Parser contract values (list field, completed status code)
//! - Notification preferences
//! - The bridge object name exposed to the page
//!
//! Configuration is stored at `~/.config/chorebridge/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::bridge::DEFAULT_BRIDGE_NAME;
use crate::error::ConfigError;
use crate::interceptor::{EndpointPatterns, DEFAULT_COMPLETE_ACTION, DEFAULT_LIST_PATH};
use crate::parser::{TaskListParser, DEFAULT_COMPLETED_STATUS, DEFAULT_LIST_FIELD};
use crate::reminder::ReconcilerConfig;
use crate::sanitize::MAX_DESCRIPTION_CHARS;

/// Hosted application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Origin of the hosted application, e.g. `https://chores.example.com`.
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Endpoint shapes watched by the interceptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    #[serde(default = "default_list_path")]
    pub list_path: String,
    #[serde(default = "default_complete_action")]
    pub complete_action: String,
}

/// Chore-list decoding contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    #[serde(default = "default_list_field")]
    pub list_field: String,
    #[serde(default = "default_completed_status")]
    pub completed_status: i64,
}

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Answer given by the headless host's permission gate.
    #[serde(default = "default_true")]
    pub permission_granted: bool,
    #[serde(default = "default_description_max_chars")]
    pub description_max_chars: usize,
}

/// Bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default = "default_bridge_name")]
    pub name: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/chorebridge/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    #[serde(default)]
    pub parser: ParserConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
}

// Default functions
fn default_list_path() -> String {
    DEFAULT_LIST_PATH.into()
}
fn default_complete_action() -> String {
    DEFAULT_COMPLETE_ACTION.into()
}
fn default_list_field() -> String {
    DEFAULT_LIST_FIELD.into()
}
fn default_completed_status() -> i64 {
    DEFAULT_COMPLETED_STATUS
}
fn default_true() -> bool {
    true
}
fn default_description_max_chars() -> usize {
    MAX_DESCRIPTION_CHARS
}
fn default_bridge_name() -> String {
    DEFAULT_BRIDGE_NAME.into()
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            list_path: default_list_path(),
            complete_action: default_complete_action(),
        }
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            list_field: default_list_field(),
            completed_status: default_completed_status(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            permission_granted: true,
            description_max_chars: default_description_max_chars(),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            name: default_bridge_name(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;

            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value
                        .parse::<bool>()
                        .map_err(|e| invalid(format!("'{value}': {e}")))?,
                ),
                serde_json::Value::Number(_) => value
                    .parse::<i64>()
                    .map(|n| serde_json::Value::Number(n.into()))
                    .map_err(|_| invalid(format!("cannot parse '{value}' as integer")))?,
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                }
                // Optional strings serialize as null until first set.
                serde_json::Value::Null if value.is_empty() => serde_json::Value::Null,
                _ => serde_json::Value::String(value.into()),
            };

            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults on first run.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key in memory. Unknown keys and values of the
    /// wrong type are rejected.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "using default configuration");
            Self::default()
        })
    }

    pub fn endpoint_patterns(&self) -> EndpointPatterns {
        EndpointPatterns::new(&self.endpoints.list_path, &self.endpoints.complete_action)
    }

    pub fn task_parser(&self) -> TaskListParser {
        TaskListParser::new(&self.parser.list_field, self.parser.completed_status)
    }

    pub fn reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            notifications_enabled: self.notifications.enabled,
            max_description_chars: self.notifications.description_max_chars,
        }
    }
}
