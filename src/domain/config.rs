//! Saved settings document.
//!
//! Holds per-platform credentials, default filter/destination preferences,
//! and the named Notion destinations. The document is always read and written
//! whole; there is no partial update. Keys written by other clients of the
//! same document are kept in `extra` maps and written back unchanged.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::models::{ContentFilter, FileFormat, NotionDestinationRecord, NotionMode, Platform};

/// Export backend connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the export backend.
    #[serde(default = "default_backend_url")]
    pub url: String,

    /// Interval between task status polls in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_backend_url() -> String {
    "http://localhost:8000".into()
}

const fn default_poll_interval_ms() -> u64 {
    800
}

/// Shortest poll interval used, whatever the document says.
pub const MIN_POLL_INTERVAL_MS: u64 = 100;

/// Telegram user-account credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default, deserialize_with = "string_or_number")]
    pub api_id: String,
    #[serde(default)]
    pub api_hash: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Slack credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackConfig {
    #[serde(default)]
    pub token: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Discord credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Saved Notion destinations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotionConfig {
    #[serde(default)]
    pub destinations: Vec<NotionDestinationRecord>,
}

impl NotionConfig {
    /// Looks up a destination by exact name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&NotionDestinationRecord> {
        self.destinations.iter().find(|d| d.name == name)
    }

    /// Inserts or replaces the destination with the same name.
    pub fn upsert(&mut self, record: NotionDestinationRecord) {
        match self.destinations.iter_mut().find(|d| d.name == record.name) {
            Some(existing) => *existing = record,
            None => self.destinations.push(record),
        }
    }

    /// Removes a destination by name. Returns whether one was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.destinations.len();
        self.destinations.retain(|d| d.name != name);
        self.destinations.len() != before
    }
}

/// Defaults applied when the user does not override them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportDefaults {
    #[serde(default = "default_true")]
    pub reverse: bool,
    #[serde(default = "default_true")]
    pub resume: bool,
    #[serde(default)]
    pub format: FileFormat,
    #[serde(default)]
    pub only: ContentFilter,
    #[serde(default)]
    pub last_output_folder: String,
    #[serde(default = "default_filename")]
    pub filename: String,
    /// Destination kind label, e.g. "Folder (local)".
    #[serde(default = "default_destination")]
    pub destination: String,
    #[serde(default)]
    pub notion_mode: NotionMode,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for ExportDefaults {
    fn default() -> Self {
        Self {
            reverse: true,
            resume: true,
            format: FileFormat::default(),
            only: ContentFilter::default(),
            last_output_folder: String::new(),
            filename: default_filename(),
            destination: default_destination(),
            notion_mode: NotionMode::default(),
            extra: BTreeMap::new(),
        }
    }
}

const fn default_true() -> bool {
    true
}

fn default_filename() -> String {
    "messages.jsonl".into()
}

fn default_destination() -> String {
    "Folder (local)".into()
}

fn default_app() -> String {
    "Telegram".into()
}

/// Complete saved settings document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedConfig {
    /// Last selected chat application.
    #[serde(default = "default_app")]
    pub app: String,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub telegram: TelegramConfig,

    #[serde(default)]
    pub slack: SlackConfig,

    #[serde(default)]
    pub discord: DiscordConfig,

    #[serde(default)]
    pub notion: NotionConfig,

    #[serde(default)]
    pub defaults: ExportDefaults,

    /// Top-level keys this client does not use.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for SavedConfig {
    fn default() -> Self {
        Self {
            app: default_app(),
            backend: BackendConfig::default(),
            telegram: TelegramConfig::default(),
            slack: SlackConfig::default(),
            discord: DiscordConfig::default(),
            notion: NotionConfig::default(),
            defaults: ExportDefaults::default(),
            extra: BTreeMap::new(),
        }
    }
}

impl SavedConfig {
    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".chat-export")
    }

    /// Get the default config file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        Self::default_data_dir().join("config.toml")
    }

    /// Poll interval as a duration, never shorter than
    /// `MIN_POLL_INTERVAL_MS`.
    #[must_use]
    pub const fn poll_interval(&self) -> std::time::Duration {
        let ms = if self.backend.poll_interval_ms < MIN_POLL_INTERVAL_MS {
            MIN_POLL_INTERVAL_MS
        } else {
            self.backend.poll_interval_ms
        };
        std::time::Duration::from_millis(ms)
    }

    /// Sets one value addressed by a dotted key, e.g. `defaults.format`.
    ///
    /// # Errors
    /// Returns a message for unknown keys or unparsable values.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), String> {
        let optional = |v: &str| (!v.is_empty()).then(|| v.to_string());

        match key {
            "app" => self.app = value.parse::<Platform>()?.to_string(),
            "backend.url" => self.backend.url = value.to_string(),
            "backend.poll_interval_ms" => {
                self.backend.poll_interval_ms = match value.parse::<u64>() {
                    Ok(ms) if ms >= MIN_POLL_INTERVAL_MS => ms,
                    _ => {
                        return Err(format!(
                            "Invalid poll interval: {value} (minimum {MIN_POLL_INTERVAL_MS} ms)"
                        ))
                    }
                };
            }
            "telegram.api_id" => self.telegram.api_id = value.to_string(),
            "telegram.api_hash" => self.telegram.api_hash = value.to_string(),
            "telegram.phone" => self.telegram.phone = value.to_string(),
            "telegram.session" => self.telegram.session = optional(value),
            "slack.token" => self.slack.token = value.to_string(),
            "discord.token" => self.discord.token = value.to_string(),
            "discord.guild_id" => self.discord.guild_id = optional(value),
            "defaults.reverse" => self.defaults.reverse = parse_bool(value)?,
            "defaults.resume" => self.defaults.resume = parse_bool(value)?,
            "defaults.format" => self.defaults.format = value.parse()?,
            "defaults.only" => self.defaults.only = value.parse()?,
            "defaults.last_output_folder" => self.defaults.last_output_folder = value.to_string(),
            "defaults.filename" => self.defaults.filename = value.to_string(),
            "defaults.destination" => self.defaults.destination = value.to_string(),
            "defaults.notion_mode" => self.defaults.notion_mode = value.parse()?,
            _ => return Err(format!("Unknown setting: {key}")),
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(format!("Expected true or false, got: {value}")),
    }
}

/// Accepts `api_id` saved either as a string or as a bare number.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s,
        Raw::Int(n) => n.to_string(),
    })
}
