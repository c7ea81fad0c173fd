//! Export orchestration.
//!
//! Merges user input with the saved settings document into a validated
//! `JobRequest`, submits it, and hands the returned job id to a
//! `TaskMonitor`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{
    parse_list, AppError, ContentFilter, DestinationDescriptor, DiscordSource, FileFormat,
    FilterOptions, JobRequest, NotionMode, Platform, Result, SavedConfig, SlackSource,
    SourceSelection, SubmissionError, TelegramSource,
};

use super::destination::{resolve, DestinationKind, DestinationParams};
use super::monitor::TaskMonitor;
use super::request_builder::build;

/// Something that accepts job requests and returns job ids.
#[async_trait]
pub trait JobSubmitter: Send + Sync {
    /// Submit one job. Implementations must not retry.
    async fn submit(&self, request: &JobRequest) -> std::result::Result<String, SubmissionError>;
}

/// What the user asked for. Unset fields fall back to saved defaults.
#[derive(Debug, Clone, Default)]
pub struct ExportInput {
    pub platform: Option<Platform>,
    pub chat: String,
    pub destination: Option<String>,
    pub folder: Option<String>,
    pub filename: Option<String>,
    pub format: Option<FileFormat>,
    pub notion_name: Option<String>,
    pub notion_mode: Option<NotionMode>,
    pub content: Option<ContentFilter>,
    pub reverse: Option<bool>,
    pub resume: Option<bool>,
    pub limit: Option<String>,
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
    /// Comma-separated user allow-list.
    pub users: Option<String>,
    /// Comma-separated keyword filters.
    pub keywords: Option<String>,
    pub download_media: bool,
}

/// Resolves the active platform: explicit choice, else the saved one.
///
/// # Errors
/// Returns a config error if the saved platform is not supported.
pub fn active_platform(input: &ExportInput, config: &SavedConfig) -> Result<Platform> {
    match input.platform {
        Some(platform) => Ok(platform),
        None => config
            .app
            .parse()
            .map_err(|message| AppError::Config { message }),
    }
}

/// Builds the source selection from saved credentials for `platform`.
#[must_use]
pub fn source_for(platform: Platform, chat: &str, config: &SavedConfig) -> SourceSelection {
    match platform {
        Platform::Telegram => SourceSelection::Telegram(TelegramSource {
            api_id: config.telegram.api_id.clone(),
            api_hash: config.telegram.api_hash.clone(),
            phone: config.telegram.phone.clone(),
            session: config.telegram.session.clone(),
            chat: chat.to_string(),
        }),
        Platform::Slack => SourceSelection::Slack(SlackSource {
            token: config.slack.token.clone(),
            channel: chat.to_string(),
        }),
        Platform::Discord => SourceSelection::Discord(DiscordSource {
            token: config.discord.token.clone(),
            channel: chat.to_string(),
        }),
    }
}

/// Merges input filters over saved defaults.
#[must_use]
pub fn filters_for(input: &ExportInput, config: &SavedConfig) -> FilterOptions {
    let defaults = &config.defaults;
    let mut filters = FilterOptions {
        reverse: input.reverse.unwrap_or(defaults.reverse),
        resume: input.resume.unwrap_or(defaults.resume),
        limit: input.limit.clone(),
        min_date: input.min_date,
        max_date: input.max_date,
        users: input.users.as_deref().map(parse_list).unwrap_or_default(),
        keywords: input.keywords.as_deref().map(parse_list).unwrap_or_default(),
        download_media: input.download_media,
        ..Default::default()
    };
    filters.apply_content(input.content.unwrap_or(defaults.only));
    filters
}

/// Resolves the destination from input and saved defaults.
///
/// # Errors
/// Returns a validation error for unknown kinds, empty paths, or unknown
/// Notion destinations.
pub fn destination_for(input: &ExportInput, config: &SavedConfig) -> Result<DestinationDescriptor> {
    let defaults = &config.defaults;
    let kind: DestinationKind = input
        .destination
        .as_deref()
        .unwrap_or(&defaults.destination)
        .parse()?;

    let notion_name = input.notion_name.clone().unwrap_or_default();

    let params = DestinationParams {
        folder: input
            .folder
            .clone()
            .unwrap_or_else(|| defaults.last_output_folder.clone()),
        filename: input
            .filename
            .clone()
            .unwrap_or_else(|| defaults.filename.clone()),
        format: input.format,
        fallback_format: defaults.format,
        notion_name,
        notion_mode: input.notion_mode.unwrap_or(defaults.notion_mode),
    };

    Ok(resolve(kind, &params, &config.notion.destinations)?)
}

/// Resolves, merges, and validates everything into a `JobRequest`.
///
/// # Errors
/// Returns the first configuration or validation error.
pub fn prepare(input: &ExportInput, config: &SavedConfig) -> Result<JobRequest> {
    let platform = active_platform(input, config)?;
    let destination = destination_for(input, config)?;
    let source = source_for(platform, &input.chat, config);
    let filters = filters_for(input, config);
    Ok(build(source, filters, destination)?)
}

/// Returns `config` with the choices from `input` stored as new defaults.
///
/// The result is the complete document, ready to be saved whole.
#[must_use]
pub fn remember_choices(config: &SavedConfig, input: &ExportInput) -> SavedConfig {
    let mut next = config.clone();
    if let Some(platform) = input.platform {
        next.app = platform.to_string();
    }
    let defaults = &mut next.defaults;
    if let Some(reverse) = input.reverse {
        defaults.reverse = reverse;
    }
    if let Some(resume) = input.resume {
        defaults.resume = resume;
    }
    if let Some(format) = input.format {
        defaults.format = format;
    }
    if let Some(content) = input.content {
        defaults.only = content;
    }
    if let Some(folder) = &input.folder {
        defaults.last_output_folder.clone_from(folder);
    }
    if let Some(filename) = &input.filename {
        defaults.filename.clone_from(filename);
    }
    if let Some(kind) = input
        .destination
        .as_deref()
        .and_then(|d| d.parse::<DestinationKind>().ok())
    {
        defaults.destination = kind.label().to_string();
    }
    if let Some(mode) = input.notion_mode {
        defaults.notion_mode = mode;
    }
    next
}

/// Submits jobs and tracks the latest one.
pub struct ExportService {
    submitter: Arc<dyn JobSubmitter>,
    monitor: TaskMonitor,
}

impl ExportService {
    #[must_use]
    pub fn new(submitter: Arc<dyn JobSubmitter>, monitor: TaskMonitor) -> Self {
        Self { submitter, monitor }
    }

    /// Submit `request` and start monitoring it.
    ///
    /// On submission failure nothing is attached and any job already being
    /// monitored keeps running.
    ///
    /// # Errors
    /// Returns the classified submission error.
    pub async fn start(&mut self, request: &JobRequest) -> Result<String> {
        let job_id = self.submitter.submit(request).await?;
        self.monitor.attach(job_id.clone());
        Ok(job_id)
    }

    /// Monitor tracking the latest submitted job.
    pub fn monitor(&mut self) -> &mut TaskMonitor {
        &mut self.monitor
    }
}
