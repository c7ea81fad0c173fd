//! Configuration file management.
//!
//! Handles loading and saving the settings document as TOML. The document is
//! always written whole.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::{AppError, Result, SavedConfig};

/// Default configuration file content.
const DEFAULT_CONFIG: &str = r#"# Chat Export Configuration
# Auto-generated - edit as needed

# Chat application used when none is given (Telegram, Slack, Discord)
app = "Telegram"

[backend]
# Base URL of the export backend
url = "http://localhost:8000"

# Interval between task status polls in milliseconds
poll_interval_ms = 800

[telegram]
api_id = ""
api_hash = ""
phone = ""

[slack]
token = ""

[discord]
token = ""

[defaults]
reverse = true
resume = true
format = "jsonl"
only = "all"
last_output_folder = ""
filename = "messages.jsonl"
destination = "Folder (local)"
notion_mode = "per_message"

# Saved Notion destinations
# [[notion.destinations]]
# name = "Team Log"
# type = "database"
# api_key = "secret_..."
# parent_id = "..."
"#;

/// Somewhere the settings document lives.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Load the complete document.
    async fn load(&self) -> Result<SavedConfig>;

    /// Replace the stored document with `config`.
    async fn save(&self, config: &SavedConfig) -> Result<()>;

    /// Human-readable location of the store.
    fn describe(&self) -> String;
}

/// Settings stored in a local TOML file.
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `~/.chat-export/config.toml`.
    #[must_use]
    pub fn default_location() -> Self {
        Self::new(SavedConfig::default_config_path())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the default configuration file if it doesn't exist.
    ///
    /// Returns whether a file was created.
    ///
    /// # Errors
    /// Returns error if the file cannot be created.
    pub fn ensure_exists(&self) -> Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }

        create_parent(&self.path)?;
        fs::write(&self.path, DEFAULT_CONFIG)
            .map_err(|e| AppError::io("Failed to create default config", e))?;

        tracing::info!(path = %self.path.display(), "Created default configuration");
        Ok(true)
    }
}

#[async_trait]
impl ConfigStore for FileConfigStore {
    async fn load(&self) -> Result<SavedConfig> {
        if self.path.exists() {
            load_config_from_file(&self.path)
        } else {
            tracing::debug!(path = %self.path.display(), "No config file, using defaults");
            Ok(SavedConfig::default())
        }
    }

    async fn save(&self, config: &SavedConfig) -> Result<()> {
        save_config_to_file(&self.path, config)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Load configuration from a specific file.
///
/// # Errors
/// Returns error if file cannot be read or parsed.
pub fn load_config_from_file(path: &Path) -> Result<SavedConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read config file: {}", path.display()), e))?;

    toml::from_str(&content).map_err(|e| AppError::Config {
        message: format!("Failed to parse config file: {e}"),
    })
}

/// Save configuration to a specific file.
///
/// # Errors
/// Returns error if file cannot be written.
pub fn save_config_to_file(path: &Path, config: &SavedConfig) -> Result<()> {
    create_parent(path)?;

    let content = toml::to_string_pretty(config).map_err(|e| AppError::Config {
        message: format!("Failed to serialize config: {e}"),
    })?;

    fs::write(path, content)
        .map_err(|e| AppError::io(format!("Failed to write config file: {}", path.display()), e))?;

    tracing::info!(path = %path.display(), "Configuration saved");

    Ok(())
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::io("Failed to create config directory", e))?;
    }
    Ok(())
}
