mod config;
pub mod event_store;

pub use config::{Config, NotificationsConfig, RemindersConfig, StorageConfig};
pub use event_store::{EventSource, EventStore, SharedEventStore, StaticEvents, StoreStats};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/agenda[-dev]/` based on AGENDA_ENV.
///
/// Set AGENDA_ENV=dev to use the development data directory, or
/// AGENDA_DATA_DIR to point somewhere else entirely.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("AGENDA_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("AGENDA_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("agenda-dev")
            } else {
                base_dir.join("agenda")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|source| ConfigError::DataDir {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}
