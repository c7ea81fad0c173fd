//! Chat Export - export Telegram, Slack, and Discord chat history.
//!
//! Builds and validates an export job from saved settings plus command-line
//! choices, submits it to an export backend over HTTP, and follows the job's
//! progress until it finishes.
//!
//! QUICK START:
//!   chat-export config init                       # Write a default settings file
//!   chat-export config set telegram.api_id 12345  # Store credentials
//!   chat-export export @channel -o ~/exports      # Export and follow
//!   chat-export export '#general' -p slack --detach
//!   chat-export watch <job-id>                    # Follow a submitted job

mod application;
mod cli;
mod domain;
mod infrastructure;

use std::io::{BufRead, Write};
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use serde::Serialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use application::{
    format_discord_channels, format_notion_destinations, format_notion_results, format_outcome,
    format_request_summary, format_slack_channels, format_task, prepare, remember_choices,
    unseen_logs, DestinationKind, ExportService, MonitorState, OutputFormat, TaskMonitor,
};
use cli::{
    Cli, Commands, ConfigCommand, DiscordCommand, ExportArgs, NotionCommand, SlackCommand,
    TelegramCommand,
};
use domain::{AppError, NotionDestinationRecord, SavedConfig, TaskHandle, ValidationError};
use infrastructure::{BackendClient, ConfigStore, FileConfigStore, TelegramCredentials};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Everything a command needs.
struct Context {
    local: FileConfigStore,
    store: Box<dyn ConfigStore>,
    backend: BackendClient,
    format: OutputFormat,
    remote: bool,
}

impl Context {
    async fn new(cli: &Cli) -> domain::Result<Self> {
        let format = cli
            .output_format()
            .map_err(|e| AppError::Config { message: e })?;

        let local = cli
            .config
            .as_ref()
            .map_or_else(FileConfigStore::default_location, |path| {
                FileConfigStore::new(path.clone())
            });

        let backend_url = match &cli.backend {
            Some(url) => url.clone(),
            None => local.load().await?.backend.url,
        };
        let backend = BackendClient::new(&backend_url)?;
        tracing::debug!(backend = %backend.base_url(), remote = cli.remote_config, "Using backend");

        let store: Box<dyn ConfigStore> = if cli.remote_config {
            Box::new(backend.clone())
        } else {
            Box::new(local.clone())
        };

        Ok(Self {
            local,
            store,
            backend,
            format,
            remote: cli.remote_config,
        })
    }

    async fn load(&self) -> domain::Result<SavedConfig> {
        self.store.load().await
    }

    /// Load, modify, and save the whole document.
    async fn update<F>(&self, change: F) -> domain::Result<SavedConfig>
    where
        F: FnOnce(&mut SavedConfig) -> domain::Result<()>,
    {
        let mut config = self.load().await?;
        change(&mut config)?;
        self.store.save(&config).await?;
        Ok(config)
    }

    fn monitor(&self, config: &SavedConfig) -> TaskMonitor {
        TaskMonitor::new(Arc::new(self.backend.clone()), config.poll_interval())
    }
}

/// Main application logic.
async fn run(cli: Cli) -> domain::Result<()> {
    let ctx = Context::new(&cli).await?;

    match cli.command {
        Commands::Export(args) => cmd_export(&ctx, &args).await?,
        Commands::Watch { job_id } => cmd_watch(&ctx, &job_id).await?,
        Commands::Status { job_id } => cmd_status(&ctx, &job_id).await?,
        Commands::Config(command) => cmd_config(&ctx, command).await?,
        Commands::Notion(command) => cmd_notion(&ctx, command).await?,
        Commands::Telegram(TelegramCommand::Login { password }) => {
            cmd_telegram_login(&ctx, password.as_deref()).await?;
        }
        Commands::Slack(command) => cmd_slack(&ctx, command).await?,
        Commands::Discord(command) => cmd_discord(&ctx, command).await?,
        Commands::Health => cmd_health(&ctx).await?,
    }

    Ok(())
}

/// Validate, submit, and follow an export job.
async fn cmd_export(ctx: &Context, args: &ExportArgs) -> domain::Result<()> {
    let config = ctx.load().await?;
    let input = args.to_input();
    let request = prepare(&input, &config)?;

    println!("{}", format_request_summary(&request));

    if args.save_defaults {
        ctx.store.save(&remember_choices(&config, &input)).await?;
    }

    let mut service = ExportService::new(Arc::new(ctx.backend.clone()), ctx.monitor(&config));
    let job_id = service.start(&request).await?;
    tracing::info!(job_id = %job_id, platform = %request.platform(), "Job submitted");

    println!("{} Submitted job {}", "✓".green().bold(), job_id.cyan());

    if args.detach {
        println!("  Follow it with: chat-export watch {job_id}");
        return Ok(());
    }

    follow(service.monitor(), ctx.format).await
}

/// Follow a previously submitted job.
async fn cmd_watch(ctx: &Context, job_id: &str) -> domain::Result<()> {
    let config = ctx.load().await?;
    let mut monitor = ctx.monitor(&config);
    monitor.attach(job_id);
    follow(&mut monitor, ctx.format).await
}

/// Print log lines as they arrive until the monitor stops.
async fn follow(monitor: &mut TaskMonitor, format: OutputFormat) -> domain::Result<()> {
    let mut updates = monitor.subscribe();
    let mut printed: Vec<String> = Vec::new();

    while updates.changed().await.is_ok() {
        let Some(handle) = updates.borrow_and_update().clone() else {
            continue;
        };

        if matches!(format, OutputFormat::Text) {
            for line in unseen_logs(&printed, &handle.logs) {
                println!("  {line}");
            }
        }
        printed = handle.logs;

        if handle.status.is_terminal() {
            break;
        }
    }

    let state = monitor.wait().await;
    let handle = monitor.handle();

    match format {
        OutputFormat::Json => print_json(&handle)?,
        OutputFormat::Text => {
            if let Some(handle) = &handle {
                println!("{}", format_outcome(handle));
            }
        }
    }

    match state {
        MonitorState::Errored => Err(AppError::backend(
            handle
                .and_then(|h| h.error)
                .unwrap_or_else(|| "Export failed".into()),
        )),
        _ => Ok(()),
    }
}

/// Show one status snapshot.
async fn cmd_status(ctx: &Context, job_id: &str) -> domain::Result<()> {
    let snapshot = ctx.backend.get_task_status(job_id).await?;
    let handle = TaskHandle::from_snapshot(job_id, snapshot);

    match ctx.format {
        OutputFormat::Json => print_json(&handle)?,
        OutputFormat::Text => print!("{}", format_task(&handle)),
    }

    Ok(())
}

/// Settings commands.
async fn cmd_config(ctx: &Context, command: ConfigCommand) -> domain::Result<()> {
    match command {
        ConfigCommand::Show => {
            let config = ctx.load().await?;
            match ctx.format {
                OutputFormat::Json => print_json(&config)?,
                OutputFormat::Text => {
                    let content = toml::to_string_pretty(&config).map_err(|e| AppError::Config {
                        message: format!("Failed to serialize config: {e}"),
                    })?;
                    println!("{content}");
                }
            }
        }
        ConfigCommand::Path => {
            println!("{}", ctx.store.describe());
        }
        ConfigCommand::Init => {
            if ctx.remote {
                return Err(AppError::Config {
                    message: "init only applies to the local settings file".into(),
                });
            }
            if ctx.local.ensure_exists()? {
                println!("{} Created {}", "✓".green().bold(), ctx.local.path().display());
            } else {
                println!("Settings already exist at {}", ctx.local.path().display());
            }
        }
        ConfigCommand::Set { key, value } => {
            let value = if key == "defaults.destination" {
                value.parse::<DestinationKind>()?.label().to_string()
            } else {
                value
            };
            ctx.update(|config| {
                config
                    .set_value(&key, &value)
                    .map_err(|message| AppError::Config { message })
            })
            .await?;
            println!("{} {key} = {value}", "✓".green().bold());
        }
    }

    Ok(())
}

/// Saved Notion destination commands.
async fn cmd_notion(ctx: &Context, command: NotionCommand) -> domain::Result<()> {
    match command {
        NotionCommand::List => {
            let config = ctx.load().await?;
            match ctx.format {
                OutputFormat::Json => print_json(&config.notion.destinations)?,
                OutputFormat::Text if config.notion.destinations.is_empty() => {
                    println!("No saved Notion destinations.");
                }
                OutputFormat::Text => {
                    println!("{}", format_notion_destinations(&config.notion.destinations));
                }
            }
        }
        NotionCommand::Add {
            name,
            parent_type,
            api_key,
            parent_id,
        } => {
            let name = name.trim().to_string();
            if name.is_empty() || api_key.trim().is_empty() || parent_id.trim().is_empty() {
                return Err(AppError::Config {
                    message: "Name, API key, and parent id are required".into(),
                });
            }
            let record = NotionDestinationRecord {
                name: name.clone(),
                parent_type,
                api_key: api_key.trim().to_string(),
                parent_id: parent_id.trim().to_string(),
            };
            ctx.update(move |config| {
                config.notion.upsert(record);
                Ok(())
            })
            .await?;
            println!("{} Saved Notion destination '{name}'", "✓".green().bold());
        }
        NotionCommand::Remove { name } => {
            ctx.update(|config| {
                if config.notion.remove(&name) {
                    Ok(())
                } else {
                    Err(ValidationError::UnknownDestination { name: name.clone() }.into())
                }
            })
            .await?;
            println!("{} Removed Notion destination '{name}'", "✓".green().bold());
        }
        NotionCommand::Test { name } => {
            let config = ctx.load().await?;
            let record = config
                .notion
                .find(&name)
                .ok_or(ValidationError::UnknownDestination { name: name.clone() })?;
            let message = ctx
                .backend
                .test_notion(&record.api_key, record.parent_type, &record.parent_id)
                .await?;
            println!("{} {message}", "✓".green().bold());
        }
        NotionCommand::Search {
            query,
            api_key,
            parent_type,
        } => {
            let api_key = match api_key {
                Some(key) => key,
                None => ctx
                    .load()
                    .await?
                    .notion
                    .destinations
                    .first()
                    .map(|d| d.api_key.clone())
                    .ok_or_else(|| AppError::Config {
                        message: "No API key given and no saved Notion destination".into(),
                    })?,
            };
            let results = ctx.backend.search_notion(&api_key, &query, parent_type).await?;
            match ctx.format {
                OutputFormat::Json => print_json(&results)?,
                OutputFormat::Text => println!("{}", format_notion_results(&results)),
            }
        }
    }

    Ok(())
}

/// Log in to Telegram with the saved credentials and store the session.
async fn cmd_telegram_login(ctx: &Context, password: Option<&str>) -> domain::Result<()> {
    let config = ctx.load().await?;
    let telegram = &config.telegram;

    let api_id = telegram
        .api_id
        .trim()
        .parse::<i64>()
        .map_err(|_| ValidationError::InvalidCredentials {
            message: "Telegram api_id must be a number".into(),
        })?;
    if telegram.api_hash.is_empty() || telegram.phone.is_empty() {
        return Err(ValidationError::InvalidCredentials {
            message: "Telegram api_hash and phone are required".into(),
        }
        .into());
    }

    let creds = TelegramCredentials {
        api_id,
        api_hash: telegram.api_hash.clone(),
        phone: telegram.phone.clone(),
        session: telegram.session.clone(),
    };

    let mut login = ctx.backend.telegram_login_start(&creds).await?;
    if login.code_required {
        let code = prompt("Login code: ")?;
        login = ctx
            .backend
            .telegram_login_complete(&creds, &code, password)
            .await?;
    }

    if let Some(session) = login.session.filter(|s| !s.is_empty()) {
        if telegram.session.as_deref() != Some(session.as_str()) {
            ctx.update(|config| {
                config.telegram.session = Some(session.clone());
                Ok(())
            })
            .await?;
        }
        println!("{} Logged in (session {session})", "✓".green().bold());
    } else if login.ok {
        println!("{} Logged in", "✓".green().bold());
    }

    Ok(())
}

/// Slack token commands.
async fn cmd_slack(ctx: &Context, command: SlackCommand) -> domain::Result<()> {
    let config = ctx.load().await?;
    let token = require(&config.slack.token, "slack.token")?;

    match command {
        SlackCommand::Test => {
            let message = ctx.backend.test_slack(token).await?;
            println!("{} {message}", "✓".green().bold());
        }
        SlackCommand::Channels { query, limit } => {
            let channels = ctx
                .backend
                .list_slack_channels(token, query.as_deref(), limit)
                .await?;
            match ctx.format {
                OutputFormat::Json => print_json(&channels)?,
                OutputFormat::Text => println!("{}", format_slack_channels(&channels)),
            }
        }
    }

    Ok(())
}

/// Discord token commands.
async fn cmd_discord(ctx: &Context, command: DiscordCommand) -> domain::Result<()> {
    let config = ctx.load().await?;
    let token = require(&config.discord.token, "discord.token")?;

    match command {
        DiscordCommand::Test => {
            let bot = ctx.backend.test_discord(token).await?;
            println!(
                "{} Bot OK: {}",
                "✓".green().bold(),
                bot.username.or(bot.bot_id).unwrap_or_else(|| "unknown".into())
            );
        }
        DiscordCommand::Channels { query, guild } => {
            let guild = guild
                .or_else(|| config.discord.guild_id.clone())
                .ok_or_else(|| AppError::Config {
                    message: "No guild given and discord.guild_id is not set".into(),
                })?;
            let channels = ctx
                .backend
                .list_discord_channels(token, &guild, query.as_deref())
                .await?;
            match ctx.format {
                OutputFormat::Json => print_json(&channels)?,
                OutputFormat::Text => println!("{}", format_discord_channels(&channels)),
            }
        }
    }

    Ok(())
}

/// Backend health check.
async fn cmd_health(ctx: &Context) -> domain::Result<()> {
    if ctx.backend.health().await? {
        println!("{} Backend OK at {}", "✓".green().bold(), ctx.backend.base_url());
        Ok(())
    } else {
        Err(AppError::backend(format!(
            "Backend at {} reported unhealthy",
            ctx.backend.base_url()
        )))
    }
}

fn require<'a>(value: &'a str, key: &str) -> domain::Result<&'a str> {
    if value.trim().is_empty() {
        Err(ValidationError::InvalidCredentials {
            message: format!("{key} is not set (chat-export config set {key} <value>)"),
        }
        .into())
    } else {
        Ok(value.trim())
    }
}

fn prompt(label: &str) -> domain::Result<String> {
    print!("{label}");
    std::io::stdout()
        .flush()
        .map_err(|e| AppError::io("Failed to write prompt", e))?;

    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| AppError::io("Failed to read input", e))?;
    Ok(line.trim().to_string())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> domain::Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(AppError::json_parse)?;
    println!("{json}");
    Ok(())
}

/// Setup tracing/logging based on verbosity level.
fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}
