//! TOML-based application settings.
//!
//! Stores the reminder configuration:
//! - Master switch and per-kind notification toggles
//! - Daily active window and periodic tick interval
//! - Messenger credentials (opaque to the engine)
//!
//! Settings are stored at `~/.config/breakwise/config.toml`. Validation
//! happens on every save; a malformed window or interval is rejected
//! here, never at fire time.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::error::ConfigError;
use crate::window::ActiveWindow;

/// Reminder cadence and toggles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemindersConfig {
    /// Master switch: gates the periodic break job's lifecycle.
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub break_notifications_enabled: bool,
    #[serde(default = "default_true")]
    pub todo_notifications_enabled: bool,
    /// Periodic tick cadence in minutes; always >= 1.
    #[serde(default = "default_interval")]
    pub interval_minutes: u64,
}

/// Telegram delivery credentials (opaque strings).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TelegramConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub chat_id: String,
}

impl TelegramConfig {
    /// Whether delivery is switched on and both credentials are present.
    pub fn is_configured(&self) -> bool {
        self.enabled && !self.bot_token.trim().is_empty() && !self.chat_id.trim().is_empty()
    }
}

/// WhatsApp settings. There is no automated delivery channel; the number
/// is carried for the interactive share path only.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WhatsAppConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub number: String,
}

fn default_true() -> bool {
    true
}
fn default_interval() -> u64 {
    30
}

impl Default for RemindersConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            break_notifications_enabled: true,
            todo_notifications_enabled: true,
            interval_minutes: default_interval(),
        }
    }
}

/// Application settings.
///
/// Serialized to/from TOML at `~/.config/breakwise/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub reminders: RemindersConfig,
    #[serde(default)]
    pub window: ActiveWindow,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,
}

impl Settings {
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
        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() {
            return Err(ConfigError::InvalidValue {
                key: key.into(),
                message: "config key is empty".into(),
            });
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(|| ConfigError::InvalidValue {
                    key: key.into(),
                    message: "unknown config key".into(),
                })?;
                let existing = obj.get(part).ok_or_else(|| ConfigError::InvalidValue {
                    key: key.into(),
                    message: "unknown config key".into(),
                })?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|_| ConfigError::InvalidValue {
                            key: key.into(),
                            message: format!("cannot parse '{value}' as bool"),
                        })?,
                    ),
                    serde_json::Value::Number(_) => {
                        let n = value.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                            key: key.into(),
                            message: format!("cannot parse '{value}' as number"),
                        })?;
                        serde_json::Value::Number(n.into())
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(|| ConfigError::InvalidValue {
                key: key.into(),
                message: "unknown config key".into(),
            })?;
        }

        Err(ConfigError::InvalidValue {
            key: key.into(),
            message: "unknown config key".into(),
        })
    }

    fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config/breakwise"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Reject malformed windows and intervals. Called on every save.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reminders.interval_minutes < 1 {
            return Err(ConfigError::InvalidValue {
                key: "reminders.interval_minutes".into(),
                message: "must be >= 1".into(),
            });
        }
        self.window.validate()
    }

    /// Load from disk or write and return the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let settings: Settings = toml::from_str(&content)
                    .map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
                Ok(settings)
            }
            Err(_) => {
                let settings = Self::default();
                settings.save()?;
                Ok(settings)
            }
        }
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Validate and persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails or the file cannot be written.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.validate()?;
        let path = Self::path()?;
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        std::fs::write(&path, content).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Get a settings value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a settings value by key, validate, and persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be
    /// parsed, validation fails, or the file cannot be written.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self)
            .map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Settings = serde_json::from_value(json)
            .map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        self.save()?;
        Ok(())
    }
}
