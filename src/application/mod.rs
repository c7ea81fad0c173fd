//! Application layer - use cases and orchestration.
//!
//! This layer turns user input into validated export jobs and tracks
//! submitted jobs to completion.

pub mod destination;
pub mod export_service;
pub mod formatter;
pub mod monitor;
pub mod request_builder;

pub use destination::{resolve, DestinationKind, DestinationParams};
pub use export_service::{prepare, remember_choices, ExportInput, ExportService, JobSubmitter};
pub use formatter::{
    format_discord_channels, format_notion_destinations, format_notion_results, format_outcome,
    format_request_summary, format_slack_channels, format_status, format_task, unseen_logs,
    OutputFormat,
};
pub use monitor::{MonitorState, StatusSource, TaskMonitor};
pub use request_builder::{build, payload};
