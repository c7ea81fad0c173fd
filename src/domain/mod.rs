//! Domain layer - core types for export jobs.
//!
//! This layer contains pure domain models, the saved settings document,
//! and error types without any I/O.

pub mod config;
pub mod error;
pub mod lookup;
pub mod models;

pub use config::{
    BackendConfig, DiscordConfig, ExportDefaults, NotionConfig, SavedConfig, SlackConfig,
    TelegramConfig,
};
pub use error::{AppError, PollError, Result, SubmissionError, ValidationError};
pub use lookup::{DiscordBot, DiscordChannel, NotionSearchResult, SlackChannel, TelegramLogin};
pub use models::{
    parse_list, ContentFilter, DestinationDescriptor, DiscordSource, FileFormat, FilterOptions,
    JobRequest, NotionDestinationRecord, NotionMode, NotionParentType, Platform, SlackSource,
    SourceSelection, TaskHandle, TaskSnapshot, TaskStatus, TelegramSource,
};
