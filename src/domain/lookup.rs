//! Results of auxiliary backend lookups (credential checks, searches).
//!
//! None of these feed the job lifecycle; they help the user fill in a job.

use serde::{Deserialize, Serialize};

use super::models::NotionParentType;

/// A Slack channel the token can see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackChannel {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_private: bool,
}

/// A Discord text channel in a guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordChannel {
    pub id: String,
    pub name: String,
}

/// Identity of a Discord bot token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordBot {
    #[serde(default)]
    pub bot_id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

/// A Notion database or page matching a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotionSearchResult {
    pub id: String,
    #[serde(rename = "type")]
    pub parent_type: NotionParentType,
    pub title: String,
}

/// Outcome of a Telegram login step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelegramLogin {
    #[serde(default)]
    pub ok: bool,
    /// Whether a login code must be submitted next.
    #[serde(default)]
    pub code_required: bool,
    /// Session file the backend stored the login in.
    #[serde(default)]
    pub session: Option<String>,
}
