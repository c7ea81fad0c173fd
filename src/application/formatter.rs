//! Terminal output formatting.
//!
//! Renders task progress, job summaries, and lookup results as text or
//! tables.

use colored::{ColoredString, Colorize};
use comfy_table::{presets::UTF8_FULL, Table};

use crate::domain::{
    DestinationDescriptor, DiscordChannel, JobRequest, NotionDestinationRecord,
    NotionSearchResult, SlackChannel, SourceSelection, TaskHandle, TaskStatus,
};

/// Output format options.
#[derive(Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// JSON format for programmatic use.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {s}. Use: text, json")),
        }
    }
}

/// Colored status label.
#[must_use]
pub fn format_status(status: TaskStatus) -> ColoredString {
    match status {
        TaskStatus::Running => "running".yellow().bold(),
        TaskStatus::Done => "done".green().bold(),
        TaskStatus::Error => "error".red().bold(),
    }
}

/// Lines of `current` that follow the longest overlap with the end of
/// `previous`.
///
/// The backend sends a bounded window of the newest lines, so a snapshot can
/// drop old lines from the front while adding new ones at the back. A
/// snapshot with no overlap is treated as entirely new.
#[must_use]
pub fn unseen_logs<'a>(previous: &[String], current: &'a [String]) -> &'a [String] {
    let longest = previous.len().min(current.len());
    let overlap = (0..=longest)
        .rev()
        .find(|&k| previous[previous.len() - k..] == current[..k])
        .unwrap_or(0);
    &current[overlap..]
}

/// Formats the full state of a task.
pub fn format_task(handle: &TaskHandle) -> String {
    let mut out = format!(
        "{} {} [{}]\n",
        "📦 Job".bold(),
        handle.job_id.cyan(),
        format_status(handle.status)
    );

    if let Some(elapsed) = elapsed_secs(handle) {
        out.push_str(&format!("  Elapsed: {elapsed:.1}s\n"));
    }

    if !handle.logs.is_empty() {
        out.push_str(&format!("  Logs ({}):\n", handle.logs.len()));
        for line in &handle.logs {
            out.push_str(&format!("    {line}\n"));
        }
    }

    if let Some(error) = &handle.error {
        out.push_str(&format!("  {} {error}\n", "Error:".red()));
    }

    if let Some(result) = &handle.result {
        let rendered = serde_json::to_string_pretty(result).unwrap_or_else(|_| result.to_string());
        out.push_str(&format!("  Result:\n{}\n", indent(&rendered, 4)));
    }

    out
}

/// One-line outcome shown when monitoring finishes.
pub fn format_outcome(handle: &TaskHandle) -> String {
    match handle.status {
        TaskStatus::Done => format!("{} Export {} finished", "✓".green().bold(), handle.job_id),
        TaskStatus::Error => format!(
            "{} Export {} failed: {}",
            "✗".red().bold(),
            handle.job_id,
            handle.error.as_deref().unwrap_or("unknown error")
        ),
        TaskStatus::Running => format!("{} Export {} still running", "…".yellow(), handle.job_id),
    }
}

/// Summary of what a job will do, printed before submission.
pub fn format_request_summary(request: &JobRequest) -> String {
    let source = match request.source() {
        SourceSelection::Telegram(t) => format!("Telegram chat {}", t.chat),
        SourceSelection::Slack(s) => format!("Slack channel {}", s.channel),
        SourceSelection::Discord(d) => format!("Discord channel {}", d.channel),
    };

    let destination = match request.destination() {
        DestinationDescriptor::Folder { path, format } => {
            format!("{} ({})", path.display(), format.as_str())
        }
        DestinationDescriptor::Notion {
            parent_type,
            parent_id,
            mode,
            ..
        } => format!("Notion {parent_type} {parent_id} ({})", mode.as_str()),
    };

    let filters = request.filters();
    let mut out = format!(
        "{}\n  Source: {}\n  Destination: {}\n  Order: {}",
        "📤 Export".bold(),
        source.cyan(),
        destination.cyan(),
        if filters.reverse { "oldest first" } else { "newest first" }
    );

    if let Some(limit) = request.limit() {
        out.push_str(&format!("\n  Limit: {limit}"));
    }
    if filters.min_date.is_some() || filters.max_date.is_some() {
        let from = filters.min_date.map_or_else(|| "…".to_string(), |d| d.to_string());
        let to = filters.max_date.map_or_else(|| "…".to_string(), |d| d.to_string());
        out.push_str(&format!("\n  Dates: {from} → {to}"));
    }
    if filters.only_media {
        out.push_str("\n  Content: media only");
    } else if filters.only_text {
        out.push_str("\n  Content: text only");
    }
    if !filters.users.is_empty() {
        out.push_str(&format!("\n  Users: {}", join(&filters.users)));
    }
    if !filters.keywords.is_empty() {
        out.push_str(&format!("\n  Keywords: {}", join(&filters.keywords)));
    }

    out
}

/// Formats saved Notion destinations. API keys are masked.
pub fn format_notion_destinations(records: &[NotionDestinationRecord]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Name", "Type", "Parent ID", "API key"]);

    for record in records {
        table.add_row(vec![
            record.name.clone(),
            record.parent_type.to_string(),
            record.parent_id.clone(),
            mask_secret(&record.api_key),
        ]);
    }

    table.to_string()
}

pub fn format_slack_channels(channels: &[SlackChannel]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["ID", "Name", "Private"]);

    for channel in channels {
        table.add_row(vec![
            channel.id.clone(),
            format!("#{}", channel.name),
            if channel.is_private { "yes" } else { "no" }.to_string(),
        ]);
    }

    table.to_string()
}

pub fn format_discord_channels(channels: &[DiscordChannel]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["ID", "Name"]);

    for channel in channels {
        table.add_row(vec![channel.id.clone(), format!("#{}", channel.name)]);
    }

    table.to_string()
}

pub fn format_notion_results(results: &[NotionSearchResult]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["ID", "Type", "Title"]);

    for result in results {
        table.add_row(vec![
            result.id.clone(),
            result.parent_type.to_string(),
            truncate(&result.title, 50),
        ]);
    }

    table.to_string()
}

fn elapsed_secs(handle: &TaskHandle) -> Option<f64> {
    let start = handle.started_at?;
    let end = handle.finished_at?;
    (end >= start).then_some(end - start)
}

fn join(items: &std::collections::BTreeSet<String>) -> String {
    items.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

fn indent(text: &str, width: usize) -> String {
    let pad = " ".repeat(width);
    text.lines()
        .map(|line| format!("{pad}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Keeps the last four characters of a secret.
fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("****{tail}")
}

/// Truncates a string to max length with ellipsis.
fn truncate(s: &str, max_len: usize) -> String {
    let s = s.lines().next().unwrap_or(s);
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{head}...")
    }
}
