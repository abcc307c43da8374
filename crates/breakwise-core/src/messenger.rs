//! Messenger delivery -- format reminder texts and push them to Telegram.
//!
//! Delivery is best-effort and fire-and-forget: the engine hands over a
//! formatted message and never lets the result touch reminder state. A
//! failed send is logged and dropped.

use serde_json::json;

use crate::storage::Settings;

/// Seam between the dispatcher and the outside world. Implementations
/// must not block the calling tick; the result of delivery is ignored.
pub trait Messenger: Send + Sync {
    /// Deliver `message` on every channel the settings enable.
    fn deliver(&self, settings: &Settings, message: &str);
}

/// Messenger that delivers nowhere. Used when no channel is configured
/// and as the default in tests.
pub struct NullMessenger;

impl Messenger for NullMessenger {
    fn deliver(&self, _settings: &Settings, _message: &str) {}
}

/// Text body for a break reminder.
pub fn format_break_message(title: &str, description: Option<&str>) -> String {
    let mut message = String::new();
    message.push_str("⏰ <b>Time for a break!</b>\n\n");
    message.push_str(&format!("📋 {title}\n"));
    if let Some(description) = description.filter(|d| !d.trim().is_empty()) {
        message.push('\n');
        message.push_str(description);
    }
    message.push_str("\n\n💪 Take care of your health!");
    message
}

/// Text body for a task reminder.
pub fn format_todo_message(title: &str, description: Option<&str>) -> String {
    let mut message = String::new();
    message.push_str("✅ <b>Task reminder!</b>\n\n");
    message.push_str(&format!("📝 {title}\n"));
    if let Some(description) = description.filter(|d| !d.trim().is_empty()) {
        message.push('\n');
        message.push_str(description);
    }
    message.push_str("\n\n⏳ Don't put it off for too long!");
    message
}

/// Telegram Bot API client.
#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    base_url: String,
}

impl Default for TelegramClient {
    fn default() -> Self {
        Self::new()
    }
}

impl TelegramClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: "https://api.telegram.org".to_string(),
        }
    }

    /// Point the client at a different API host (tests).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Send `text` via the Bot API. Returns whether Telegram accepted it;
    /// every failure path is logged and reported as `false`, never as an
    /// error.
    pub async fn send(&self, bot_token: &str, chat_id: &str, text: &str) -> bool {
        let url = format!("{}/bot{}/sendMessage", self.base_url, bot_token);
        let body = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
        });

        match self.http.post(&url).json(&body).send().await {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                let status = resp.status();
                let detail = resp.text().await.unwrap_or_default();
                tracing::warn!(%status, %detail, "telegram rejected message");
                false
            }
            Err(err) => {
                tracing::warn!(error = %err, "telegram delivery failed");
                false
            }
        }
    }
}
