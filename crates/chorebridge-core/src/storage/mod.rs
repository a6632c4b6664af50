mod config;
pub mod migrations;
pub mod reminder_db;

pub use config::{BridgeConfig, Config, EndpointsConfig, NotificationsConfig, ParserConfig, ServerConfig};
pub use reminder_db::{ReminderRecord, ReminderState, SqliteReminderStore};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/chorebridge[-dev]/` based on CHOREBRIDGE_ENV.
///
/// Set CHOREBRIDGE_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("CHOREBRIDGE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("chorebridge-dev")
    } else {
        base_dir.join("chorebridge")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
