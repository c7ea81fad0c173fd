//! Job request building.
//!
//! Validates a source selection, filter options, and a resolved destination
//! into a `JobRequest`, and shapes the per-platform wire payload the backend
//! expects. No network or storage access.

use serde_json::{json, Map, Value};

use crate::domain::{
    DestinationDescriptor, DiscordSource, FilterOptions, JobRequest, SlackSource,
    SourceSelection, TelegramSource, ValidationError,
};

/// Validates inputs into a `JobRequest`.
///
/// Rules are checked in order and the first failure wins: chat present,
/// content filters not conflicting, limit positive, date range ordered,
/// credentials well-formed.
///
/// # Errors
/// Returns the first `ValidationError` encountered.
pub fn build(
    source: SourceSelection,
    filters: FilterOptions,
    destination: DestinationDescriptor,
) -> Result<JobRequest, ValidationError> {
    if source.chat().trim().is_empty() {
        return Err(ValidationError::EmptyChat);
    }

    if filters.only_media && filters.only_text {
        return Err(ValidationError::ConflictingContentFilter);
    }

    let limit = filters.limit.as_deref().map(parse_limit).transpose()?;

    if let (Some(min), Some(max)) = (filters.min_date, filters.max_date) {
        if min > max {
            return Err(ValidationError::InvalidDateRange { min, max });
        }
    }

    if let SourceSelection::Telegram(tg) = &source {
        parse_api_id(&tg.api_id)?;
    }

    tracing::debug!(platform = %source.platform(), chat = source.chat(), "Job request validated");

    Ok(JobRequest::new(source, filters, limit, destination))
}

fn parse_limit(raw: &str) -> Result<u64, ValidationError> {
    match raw.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ValidationError::InvalidLimit {
            value: raw.to_string(),
        }),
    }
}

fn parse_api_id(raw: &str) -> Result<i64, ValidationError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ValidationError::InvalidCredentials {
            message: format!("Telegram api_id must be numeric, got: {raw:?}"),
        })
}

/// Shapes the JSON body for the platform's extract endpoint.
///
/// Only the active platform's fields are emitted and optional values are
/// omitted rather than sent as `null`.
#[must_use]
pub fn payload(request: &JobRequest) -> Value {
    let mut body = match request.source() {
        SourceSelection::Telegram(tg) => telegram_fields(tg),
        SourceSelection::Slack(slack) => slack_fields(slack),
        SourceSelection::Discord(discord) => discord_fields(discord),
    };
    common_fields(&mut body, request.filters(), request.limit());
    destination_fields(&mut body, request.destination(), request.filters().download_media);
    Value::Object(body)
}

fn telegram_fields(tg: &TelegramSource) -> Map<String, Value> {
    let mut body = Map::new();
    if let Ok(api_id) = parse_api_id(&tg.api_id) {
        body.insert("api_id".into(), json!(api_id));
    }
    body.insert("api_hash".into(), json!(tg.api_hash));
    if let Some(session) = tg.session.as_deref().filter(|s| !s.is_empty()) {
        body.insert("session".into(), json!(session));
    }
    body.insert("chat".into(), json!(tg.chat.trim()));
    body
}

fn slack_fields(slack: &SlackSource) -> Map<String, Value> {
    let mut body = Map::new();
    body.insert("token".into(), json!(slack.token));
    body.insert("channel".into(), json!(slack.channel.trim()));
    body
}

fn discord_fields(discord: &DiscordSource) -> Map<String, Value> {
    let mut body = Map::new();
    body.insert("token".into(), json!(discord.token));
    body.insert("channel".into(), json!(discord.channel.trim()));
    body
}

fn common_fields(body: &mut Map<String, Value>, filters: &FilterOptions, limit: Option<u64>) {
    body.insert("reverse".into(), json!(filters.reverse));
    body.insert("resume".into(), json!(filters.resume));
    body.insert("only_media".into(), json!(filters.only_media));
    body.insert("only_text".into(), json!(filters.only_text));
    if let Some(limit) = limit {
        body.insert("limit".into(), json!(limit));
    }
    if let Some(min) = filters.min_date {
        body.insert("min_date".into(), json!(min.format("%Y-%m-%d").to_string()));
    }
    if let Some(max) = filters.max_date {
        body.insert("max_date".into(), json!(max.format("%Y-%m-%d").to_string()));
    }
    if !filters.users.is_empty() {
        body.insert("users".into(), json!(filters.users));
    }
    if !filters.keywords.is_empty() {
        body.insert("keywords".into(), json!(filters.keywords));
    }
}

fn destination_fields(
    body: &mut Map<String, Value>,
    destination: &DestinationDescriptor,
    download_media: bool,
) {
    match destination {
        DestinationDescriptor::Folder { path, format } => {
            body.insert("out".into(), json!(path.to_string_lossy()));
            body.insert("format".into(), json!(format.as_str()));
            if download_media {
                if let Some(folder) = path.parent() {
                    body.insert(
                        "media_dir".into(),
                        json!(folder.join("media").to_string_lossy()),
                    );
                }
            }
        }
        DestinationDescriptor::Notion {
            api_key,
            parent_type,
            parent_id,
            mode,
        } => {
            if download_media {
                tracing::warn!("Media download is not supported for Notion destinations; skipping");
            }
            body.insert("notion_api_key".into(), json!(api_key));
            body.insert("notion_dest_type".into(), json!(parent_type.to_string()));
            body.insert("notion_parent_id".into(), json!(parent_id));
            body.insert("notion_mode".into(), json!(mode.as_str()));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::NaiveDate;

    use super::*;
    use crate::application::destination::{resolve, DestinationKind, DestinationParams};
    use crate::domain::{FileFormat, NotionMode, NotionParentType};

    const TELEGRAM_KEYS: &[&str] = &["api_id", "api_hash", "session", "chat"];
    const TOKEN_KEYS: &[&str] = &["token", "channel"];

    fn telegram(chat: &str) -> SourceSelection {
        SourceSelection::Telegram(TelegramSource {
            api_id: "12345".into(),
            api_hash: "hash".into(),
            phone: "+10000000000".into(),
            session: Some("/data/tg.session".into()),
            chat: chat.into(),
        })
    }

    fn slack(channel: &str) -> SourceSelection {
        SourceSelection::Slack(SlackSource {
            token: "xoxb-token".into(),
            channel: channel.into(),
        })
    }

    fn discord(channel: &str) -> SourceSelection {
        SourceSelection::Discord(DiscordSource {
            token: "bot-token".into(),
            channel: channel.into(),
        })
    }

    fn folder() -> DestinationDescriptor {
        DestinationDescriptor::Folder {
            path: PathBuf::from("/tmp/out/messages.jsonl"),
            format: FileFormat::Jsonl,
        }
    }

    fn notion() -> DestinationDescriptor {
        DestinationDescriptor::Notion {
            api_key: "secret".into(),
            parent_type: NotionParentType::Page,
            parent_id: "page-1".into(),
            mode: NotionMode::PerMessage,
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn keys(value: &Value) -> Vec<String> {
        value.as_object().unwrap().keys().cloned().collect()
    }

    #[test]
    fn test_scenario_telegram_folder() {
        let params = DestinationParams {
            folder: "/tmp/out".into(),
            filename: "messages.jsonl".into(),
            format: Some(FileFormat::Jsonl),
            ..Default::default()
        };
        let destination = resolve(DestinationKind::Folder, &params, &[]).unwrap();
        let filters = FilterOptions {
            reverse: false,
            ..Default::default()
        };
        let request = build(telegram("@testchan"), filters, destination).unwrap();
        let body = payload(&request);

        assert_eq!(body["out"], "/tmp/out/messages.jsonl");
        assert_eq!(body["format"], "jsonl");
        assert_eq!(body["reverse"], false);
        assert_eq!(body["chat"], "@testchan");
        assert_eq!(body["api_id"], 12345);
    }

    #[test]
    fn test_only_active_platform_fields() {
        for destination in [folder(), notion()] {
            let body = payload(&build(telegram("@c"), FilterOptions::default(), destination.clone()).unwrap());
            let k = keys(&body);
            assert!(TOKEN_KEYS.iter().all(|key| !k.contains(&(*key).to_string())));
            assert!(k.contains(&"api_id".to_string()));

            for source in [slack("#general"), discord("123")] {
                let body = payload(&build(source, FilterOptions::default(), destination.clone()).unwrap());
                let k = keys(&body);
                assert!(TELEGRAM_KEYS.iter().all(|key| !k.contains(&(*key).to_string())));
                assert!(k.contains(&"token".to_string()));
                assert!(k.contains(&"channel".to_string()));
            }
        }
    }

    #[test]
    fn test_no_null_placeholders() {
        let sources = [
            SourceSelection::Telegram(TelegramSource {
                api_id: "1".into(),
                api_hash: "h".into(),
                phone: String::new(),
                session: None,
                chat: "@c".into(),
            }),
            slack("#c"),
            discord("1"),
        ];
        for source in sources {
            for destination in [folder(), notion()] {
                let body = payload(&build(source.clone(), FilterOptions::default(), destination).unwrap());
                for (key, value) in body.as_object().unwrap() {
                    assert!(!value.is_null(), "{key} is null");
                }
                for optional in ["limit", "min_date", "max_date", "users", "keywords", "media_dir", "session"] {
                    assert!(body.get(optional).is_none(), "{optional} should be omitted");
                }
            }
        }
    }

    #[test]
    fn test_notion_destination_fields() {
        let body = payload(&build(slack("C123"), FilterOptions::default(), notion()).unwrap());
        assert_eq!(body["notion_api_key"], "secret");
        assert_eq!(body["notion_dest_type"], "Page");
        assert_eq!(body["notion_parent_id"], "page-1");
        assert_eq!(body["notion_mode"], "per_message");
        assert!(body.get("out").is_none());
        assert!(body.get("format").is_none());
    }

    #[test]
    fn test_media_dir_next_to_output() {
        let filters = FilterOptions {
            download_media: true,
            ..Default::default()
        };
        let body = payload(&build(discord("1"), filters.clone(), folder()).unwrap());
        assert_eq!(body["media_dir"], "/tmp/out/media");

        let body = payload(&build(discord("1"), filters, notion()).unwrap());
        assert!(body.get("media_dir").is_none());
    }

    #[test]
    fn test_optional_filters_emitted_when_set() {
        let filters = FilterOptions {
            limit: Some(" 50 ".into()),
            min_date: Some(date("2024-01-01")),
            max_date: Some(date("2024-02-01")),
            users: ["bob".to_string(), "alice".to_string()].into(),
            keywords: ["release".to_string()].into(),
            only_text: true,
            ..Default::default()
        };
        let body = payload(&build(slack("#c"), filters, folder()).unwrap());
        assert_eq!(body["limit"], 50);
        assert_eq!(body["min_date"], "2024-01-01");
        assert_eq!(body["max_date"], "2024-02-01");
        assert_eq!(body["users"], json!(["alice", "bob"]));
        assert_eq!(body["keywords"], json!(["release"]));
        assert_eq!(body["only_text"], true);
        assert_eq!(body["only_media"], false);
    }

    #[test]
    fn test_empty_chat() {
        assert_eq!(
            build(telegram("  "), FilterOptions::default(), folder()),
            Err(ValidationError::EmptyChat)
        );
        assert_eq!(
            build(slack(""), FilterOptions::default(), folder()),
            Err(ValidationError::EmptyChat)
        );
    }

    #[test]
    fn test_conflicting_content_filter_always_wins() {
        let cases = [
            FilterOptions::default(),
            FilterOptions {
                limit: Some("abc".into()),
                ..Default::default()
            },
            FilterOptions {
                min_date: Some(date("2024-05-01")),
                max_date: Some(date("2024-01-01")),
                ..Default::default()
            },
        ];
        for mut filters in cases {
            filters.only_media = true;
            filters.only_text = true;
            for destination in [folder(), notion()] {
                assert_eq!(
                    build(discord("1"), filters.clone(), destination),
                    Err(ValidationError::ConflictingContentFilter)
                );
            }
        }
    }

    #[test]
    fn test_invalid_limit() {
        for raw in ["0", "-3", "ten", "", "1.5"] {
            let filters = FilterOptions {
                limit: Some(raw.into()),
                ..Default::default()
            };
            assert_eq!(
                build(slack("#c"), filters, folder()),
                Err(ValidationError::InvalidLimit { value: raw.into() })
            );
        }
    }

    #[test]
    fn test_date_range() {
        let filters = FilterOptions {
            min_date: Some(date("2024-03-02")),
            max_date: Some(date("2024-03-01")),
            ..Default::default()
        };
        assert!(matches!(
            build(slack("#c"), filters, folder()),
            Err(ValidationError::InvalidDateRange { .. })
        ));

        let same = FilterOptions {
            min_date: Some(date("2024-03-01")),
            max_date: Some(date("2024-03-01")),
            ..Default::default()
        };
        assert!(build(slack("#c"), same, folder()).is_ok());

        let open_ended = FilterOptions {
            min_date: Some(date("2030-01-01")),
            ..Default::default()
        };
        assert!(build(slack("#c"), open_ended, folder()).is_ok());
    }

    #[test]
    fn test_filter_rules_win_over_bad_telegram_api_id() {
        for api_id in ["", "abc"] {
            let source = || {
                SourceSelection::Telegram(TelegramSource {
                    api_id: api_id.into(),
                    api_hash: String::new(),
                    phone: String::new(),
                    session: None,
                    chat: "@c".into(),
                })
            };

            let conflicting = FilterOptions {
                only_media: true,
                only_text: true,
                ..Default::default()
            };
            assert_eq!(
                build(source(), conflicting, folder()),
                Err(ValidationError::ConflictingContentFilter)
            );

            let bad_limit = FilterOptions {
                limit: Some("0".into()),
                ..Default::default()
            };
            assert!(matches!(
                build(source(), bad_limit, folder()),
                Err(ValidationError::InvalidLimit { .. })
            ));

            let reversed = FilterOptions {
                min_date: Some(date("2024-05-01")),
                max_date: Some(date("2024-01-01")),
                ..Default::default()
            };
            assert!(matches!(
                build(source(), reversed, folder()),
                Err(ValidationError::InvalidDateRange { .. })
            ));

            assert!(matches!(
                build(source(), FilterOptions::default(), folder()),
                Err(ValidationError::InvalidCredentials { .. })
            ));
        }
    }

    #[test]
    fn test_telegram_api_id_must_be_numeric() {
        let source = SourceSelection::Telegram(TelegramSource {
            api_id: "abc".into(),
            api_hash: "h".into(),
            phone: String::new(),
            session: None,
            chat: "@c".into(),
        });
        assert!(matches!(
            build(source, FilterOptions::default(), folder()),
            Err(ValidationError::InvalidCredentials { .. })
        ));
    }

    #[test]
    fn test_request_keeps_parsed_limit() {
        let filters = FilterOptions {
            limit: Some("7".into()),
            ..Default::default()
        };
        let request = build(slack("#c"), filters, folder()).unwrap();
        assert_eq!(request.limit(), Some(7));
        assert_eq!(request.platform(), crate::domain::Platform::Slack);
    }
}
