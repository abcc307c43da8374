mod config;
pub mod database;

pub use config::{RemindersConfig, Settings, TelegramConfig, WhatsAppConfig};
pub use database::{ActivityType, Database, StatisticsRecord};

use std::path::PathBuf;

/// Returns `~/.config/breakwise[-dev]/` based on BREAKWISE_ENV.
///
/// Set BREAKWISE_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if the home directory cannot be determined or if
/// creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("BREAKWISE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("breakwise-dev")
    } else {
        base_dir.join("breakwise")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
