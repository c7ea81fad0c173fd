//! Domain models for export jobs.
//!
//! These models describe what to export (source), how to filter it, where to
//! write it (destination), and the backend's view of a running job.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Chat platform a job exports from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Telegram,
    Slack,
    Discord,
}

impl Platform {
    /// Backend endpoint that accepts extraction jobs for this platform.
    #[must_use]
    pub const fn extract_path(self) -> &'static str {
        match self {
            Self::Telegram => "/api/telegram/extract",
            Self::Slack => "/api/slack/extract",
            Self::Discord => "/api/discord/extract",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Telegram => write!(f, "Telegram"),
            Self::Slack => write!(f, "Slack"),
            Self::Discord => write!(f, "Discord"),
        }
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "telegram" | "tg" => Ok(Self::Telegram),
            "slack" => Ok(Self::Slack),
            "discord" => Ok(Self::Discord),
            _ => Err(format!("Unknown platform: {s}. Use: telegram, slack, discord")),
        }
    }
}

/// Telegram user-account credentials plus the chat to export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramSource {
    /// Numeric application id, kept as entered.
    pub api_id: String,
    pub api_hash: String,
    pub phone: String,
    /// Session file path on the backend host.
    pub session: Option<String>,
    /// Username, link, or numeric id.
    pub chat: String,
}

/// Slack bot/app token plus the channel to export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlackSource {
    pub token: String,
    /// Channel id or `#name`.
    pub channel: String,
}

/// Discord bot token plus the channel to export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscordSource {
    pub token: String,
    /// Channel id or URL.
    pub channel: String,
}

/// The active source platform with its credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSelection {
    Telegram(TelegramSource),
    Slack(SlackSource),
    Discord(DiscordSource),
}

impl SourceSelection {
    /// Platform of the active variant.
    #[must_use]
    pub const fn platform(&self) -> Platform {
        match self {
            Self::Telegram(_) => Platform::Telegram,
            Self::Slack(_) => Platform::Slack,
            Self::Discord(_) => Platform::Discord,
        }
    }

    /// Chat or channel reference, whichever the platform uses.
    #[must_use]
    pub fn chat(&self) -> &str {
        match self {
            Self::Telegram(tg) => &tg.chat,
            Self::Slack(slack) => &slack.channel,
            Self::Discord(discord) => &discord.channel,
        }
    }
}

/// Content selector as stored in saved defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentFilter {
    #[default]
    All,
    Media,
    Text,
}

impl std::str::FromStr for ContentFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "media" => Ok(Self::Media),
            "text" => Ok(Self::Text),
            _ => Err(format!("Unknown content filter: {s}. Use: all, media, text")),
        }
    }
}

/// Platform-independent filters applied by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
    /// Oldest to newest when true.
    pub reverse: bool,
    /// Continue from existing output.
    pub resume: bool,
    /// Maximum message count, as entered.
    pub limit: Option<String>,
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
    pub only_media: bool,
    pub only_text: bool,
    /// Allow-list of user ids/usernames.
    pub users: BTreeSet<String>,
    /// Substring filters.
    pub keywords: BTreeSet<String>,
    pub download_media: bool,
}

impl FilterOptions {
    /// Set `only_media` / `only_text` from a content selector.
    pub fn apply_content(&mut self, content: ContentFilter) {
        self.only_media = content == ContentFilter::Media;
        self.only_text = content == ContentFilter::Text;
    }
}

/// Splits a comma-separated list, trimming entries and dropping empties.
#[must_use]
pub fn parse_list(input: &str) -> BTreeSet<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// File format for folder exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    #[default]
    Jsonl,
    Csv,
}

impl FileFormat {
    /// Format implied by a file extension, if recognized.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .as_deref()
        {
            Some("jsonl") => Some(Self::Jsonl),
            Some("csv") => Some(Self::Csv),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Jsonl => "jsonl",
            Self::Csv => "csv",
        }
    }
}

impl std::str::FromStr for FileFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jsonl" => Ok(Self::Jsonl),
            "csv" => Ok(Self::Csv),
            _ => Err(format!("Unknown format: {s}. Use: jsonl, csv")),
        }
    }
}

/// Kind of Notion parent a destination writes under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotionParentType {
    #[serde(alias = "database")]
    Database,
    #[serde(alias = "page")]
    Page,
}

impl std::fmt::Display for NotionParentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Database => write!(f, "Database"),
            Self::Page => write!(f, "Page"),
        }
    }
}

impl std::str::FromStr for NotionParentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "database" | "db" => Ok(Self::Database),
            "page" => Ok(Self::Page),
            _ => Err(format!("Unknown Notion parent type: {s}. Use: database, page")),
        }
    }
}

/// How messages are written into Notion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotionMode {
    /// One page/entry per message.
    #[default]
    PerMessage,
    /// One page per calendar day.
    GroupByDay,
}

impl NotionMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PerMessage => "per_message",
            Self::GroupByDay => "group_by_day",
        }
    }
}

impl std::str::FromStr for NotionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "per_message" => Ok(Self::PerMessage),
            "group_by_day" => Ok(Self::GroupByDay),
            _ => Err(format!("Unknown Notion mode: {s}. Use: per_message, group_by_day")),
        }
    }
}

/// Saved Notion destination, looked up by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotionDestinationRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub parent_type: NotionParentType,
    pub api_key: String,
    pub parent_id: String,
}

/// Where the backend writes exported messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationDescriptor {
    Folder {
        path: PathBuf,
        format: FileFormat,
    },
    Notion {
        api_key: String,
        parent_type: NotionParentType,
        parent_id: String,
        mode: NotionMode,
    },
}

/// A validated, backend-ready export job.
///
/// Only the request builder constructs these; there is no mutating API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    source: SourceSelection,
    filters: FilterOptions,
    limit: Option<u64>,
    destination: DestinationDescriptor,
}

impl JobRequest {
    pub(crate) const fn new(
        source: SourceSelection,
        filters: FilterOptions,
        limit: Option<u64>,
        destination: DestinationDescriptor,
    ) -> Self {
        Self {
            source,
            filters,
            limit,
            destination,
        }
    }

    #[must_use]
    pub const fn source(&self) -> &SourceSelection {
        &self.source
    }

    #[must_use]
    pub const fn filters(&self) -> &FilterOptions {
        &self.filters
    }

    /// Parsed message limit.
    #[must_use]
    pub const fn limit(&self) -> Option<u64> {
        self.limit
    }

    #[must_use]
    pub const fn destination(&self) -> &DestinationDescriptor {
        &self.destination
    }

    #[must_use]
    pub const fn platform(&self) -> Platform {
        self.source.platform()
    }
}

/// Backend-reported job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Running,
    Done,
    Error,
}

impl TaskStatus {
    /// Whether the job will not change any more.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Done => write!(f, "done"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Status snapshot as returned by `GET /api/tasks/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub status: TaskStatus,
    #[serde(default)]
    pub logs: Vec<String>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub started_at: Option<f64>,
    #[serde(default)]
    pub finished_at: Option<f64>,
}

/// Latest known state of one submitted job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskHandle {
    pub job_id: String,
    pub status: TaskStatus,
    pub logs: Vec<String>,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub started_at: Option<f64>,
    pub finished_at: Option<f64>,
}

impl TaskHandle {
    /// Fresh handle for a just-submitted job.
    #[must_use]
    pub fn running(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            status: TaskStatus::Running,
            logs: Vec::new(),
            result: None,
            error: None,
            started_at: None,
            finished_at: None,
        }
    }

    /// Handle replaced wholesale by a backend snapshot.
    #[must_use]
    pub fn from_snapshot(job_id: impl Into<String>, snapshot: TaskSnapshot) -> Self {
        Self {
            job_id: job_id.into(),
            status: snapshot.status,
            logs: snapshot.logs,
            result: snapshot.result,
            error: snapshot.error,
            started_at: snapshot.started_at,
            finished_at: snapshot.finished_at,
        }
    }

    /// Marks the handle errored, keeping its logs and appending `message`.
    #[must_use]
    pub fn errored(mut self, message: impl Into<String>) -> Self {
        let message = message.into();
        self.logs.push(message.clone());
        self.status = TaskStatus::Error;
        self.error = Some(message);
        self
    }
}
