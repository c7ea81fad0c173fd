//! CLI interface using clap.
//!
//! Provides command-line arguments and subcommands for the tool.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::application::{ExportInput, OutputFormat};
use crate::domain::{ContentFilter, FileFormat, NotionMode, NotionParentType, Platform};

/// Chat Export - export Telegram, Slack, and Discord chats via an export backend.
///
/// chat-export export @channel -o ~/exports | watch <job-id> | status <job-id>
#[derive(Parser, Debug)]
#[command(name = "chat-export")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (use multiple times for more verbosity).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output format: text or json.
    #[arg(short, long, default_value = "text", global = true)]
    pub format: String,

    /// Settings file (defaults to ~/.chat-export/config.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Export backend URL (overrides the saved one).
    #[arg(long, env = "CHAT_EXPORT_BACKEND", global = true)]
    pub backend: Option<String>,

    /// Read and write settings on the backend instead of the local file.
    #[arg(long, global = true)]
    pub remote_config: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Submit an export job and follow it to completion.
    Export(ExportArgs),

    /// Follow a previously submitted job until it finishes.
    Watch {
        /// Job id returned on submission.
        job_id: String,
    },

    /// Show the current status of a job once.
    Status {
        /// Job id returned on submission.
        job_id: String,
    },

    /// Manage saved settings.
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Manage saved Notion destinations.
    #[command(subcommand)]
    Notion(NotionCommand),

    /// Telegram account helpers.
    #[command(subcommand)]
    Telegram(TelegramCommand),

    /// Slack token helpers.
    #[command(subcommand)]
    Slack(SlackCommand),

    /// Discord token helpers.
    #[command(subcommand)]
    Discord(DiscordCommand),

    /// Check that the export backend is reachable.
    Health,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ExportArgs {
    /// Chat to export: username, link, numeric id, or #channel.
    pub chat: String,

    /// Source platform (defaults to the saved one).
    #[arg(short, long)]
    pub platform: Option<Platform>,

    /// Destination kind: folder or notion (defaults to the saved one).
    #[arg(short, long)]
    pub destination: Option<String>,

    /// Output folder for folder destinations.
    #[arg(short, long)]
    pub output: Option<String>,

    /// Output file name inside the folder.
    #[arg(long)]
    pub filename: Option<String>,

    /// File format: jsonl or csv (inferred from the file name if omitted).
    #[arg(long)]
    pub file_format: Option<FileFormat>,

    /// Saved Notion destination name.
    #[arg(long)]
    pub notion: Option<String>,

    /// Notion mode: per_message or group_by_day.
    #[arg(long)]
    pub notion_mode: Option<NotionMode>,

    /// Content: all, media, or text.
    #[arg(long)]
    pub only: Option<ContentFilter>,

    /// Oldest messages first.
    #[arg(long, overrides_with = "newest_first")]
    pub oldest_first: bool,

    /// Newest messages first.
    #[arg(long)]
    pub newest_first: bool,

    /// Continue from the last exported message.
    #[arg(long, overrides_with = "no_resume")]
    pub resume: bool,

    /// Start from scratch.
    #[arg(long)]
    pub no_resume: bool,

    /// Maximum number of messages.
    #[arg(short, long)]
    pub limit: Option<String>,

    /// Earliest message date (YYYY-MM-DD).
    #[arg(long)]
    pub min_date: Option<NaiveDate>,

    /// Latest message date (YYYY-MM-DD).
    #[arg(long)]
    pub max_date: Option<NaiveDate>,

    /// Only messages from these users (comma-separated).
    #[arg(long)]
    pub users: Option<String>,

    /// Only messages containing these keywords (comma-separated).
    #[arg(long)]
    pub keywords: Option<String>,

    /// Download media files next to the export.
    #[arg(long)]
    pub download_media: bool,

    /// Submit and exit without following the job.
    #[arg(long)]
    pub detach: bool,

    /// Store the choices made here as the new defaults.
    #[arg(long)]
    pub save_defaults: bool,
}

impl ExportArgs {
    /// Converts parsed arguments into export input.
    #[must_use]
    pub fn to_input(&self) -> ExportInput {
        ExportInput {
            platform: self.platform,
            chat: self.chat.clone(),
            destination: self.destination.clone(),
            folder: self.output.clone(),
            filename: self.filename.clone(),
            format: self.file_format,
            notion_name: self.notion.clone(),
            notion_mode: self.notion_mode,
            content: self.only,
            reverse: flag_pair(self.oldest_first, self.newest_first),
            resume: flag_pair(self.resume, self.no_resume),
            limit: self.limit.clone(),
            min_date: self.min_date,
            max_date: self.max_date,
            users: self.users.clone(),
            keywords: self.keywords.clone(),
            download_media: self.download_media,
        }
    }
}

/// `Some(true)` for `--x`, `Some(false)` for `--no-x`, `None` for neither.
const fn flag_pair(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (false, true) => Some(false),
        (false, false) => None,
    }
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the saved settings.
    Show,

    /// Print where settings are stored.
    Path,

    /// Write a default settings file if none exists.
    Init,

    /// Change one saved value.
    Set {
        /// Key, e.g. app, backend.url, telegram.api_id, defaults.format.
        key: String,

        /// New value.
        value: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum NotionCommand {
    /// List saved destinations.
    List,

    /// Save (or replace) a named destination.
    Add {
        /// Destination name.
        name: String,

        /// Parent type: database or page.
        #[arg(short = 't', long = "type", default_value = "database")]
        parent_type: NotionParentType,

        /// Notion integration key.
        #[arg(long)]
        api_key: String,

        /// Parent database or page id.
        #[arg(long)]
        parent_id: String,
    },

    /// Delete a saved destination.
    Remove {
        /// Destination name.
        name: String,
    },

    /// Check that a saved destination is reachable.
    Test {
        /// Destination name.
        name: String,
    },

    /// Search pages and databases visible to a key.
    Search {
        /// Search text.
        query: String,

        /// Key to search with (defaults to the first saved destination's).
        #[arg(long)]
        api_key: Option<String>,

        /// Only this parent type.
        #[arg(short = 't', long = "type")]
        parent_type: Option<NotionParentType>,
    },
}

#[derive(Subcommand, Debug)]
pub enum TelegramCommand {
    /// Log in with the saved credentials; prompts for the code.
    Login {
        /// Two-factor password, if the account has one.
        #[arg(long)]
        password: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum SlackCommand {
    /// Check the saved token.
    Test,

    /// List channels visible to the saved token.
    Channels {
        /// Name filter.
        query: Option<String>,

        /// Maximum number of channels.
        #[arg(short, long, default_value = "200")]
        limit: usize,
    },
}

#[derive(Subcommand, Debug)]
pub enum DiscordCommand {
    /// Check the saved bot token.
    Test,

    /// List text channels of a guild.
    Channels {
        /// Name filter.
        query: Option<String>,

        /// Guild id (defaults to the saved one).
        #[arg(long)]
        guild: Option<String>,
    },
}

impl Cli {
    /// Parse the output format argument.
    pub fn output_format(&self) -> Result<OutputFormat, String> {
        self.format.parse()
    }
}
