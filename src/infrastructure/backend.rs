//! HTTP client for the export backend.
//!
//! Submits extraction jobs, fetches task status snapshots, and wraps the
//! auxiliary request/response endpoints (credential checks, channel and
//! Notion searches, the hosted settings document). Nothing here retries.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::application::export_service::JobSubmitter;
use crate::application::monitor::StatusSource;
use crate::application::request_builder;
use crate::domain::{
    AppError, DiscordBot, DiscordChannel, JobRequest, NotionParentType, NotionSearchResult,
    PollError, Result, SavedConfig, SlackChannel, SubmissionError, TaskSnapshot, TelegramLogin,
};

use super::config::ConfigStore;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Telegram credentials for the login endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct TelegramCredentials {
    pub api_id: i64,
    pub api_hash: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    task_id: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    #[serde(default)]
    ok: bool,
}

/// Client for one export backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
    http: Client,
}

impl BackendClient {
    /// Create a client for the backend at `base_url`.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be constructed.
    pub fn new(base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Config {
                message: format!("Failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Submit a validated job. Exactly one request, no retries.
    ///
    /// # Errors
    /// `Network` if the backend is unreachable, `Rejected` with the backend's
    /// detail for non-success responses, `Unknown` for anything else.
    pub async fn submit_job(&self, request: &JobRequest) -> std::result::Result<String, SubmissionError> {
        let platform = request.platform();
        let body = request_builder::payload(request);
        tracing::info!(%platform, endpoint = platform.extract_path(), "Submitting export job");

        let response = self
            .http
            .post(self.url(platform.extract_path()))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() || e.is_request() {
                    SubmissionError::Network {
                        message: e.to_string(),
                    }
                } else {
                    SubmissionError::Unknown {
                        message: e.to_string(),
                    }
                }
            })?;

        if !response.status().is_success() {
            return Err(SubmissionError::Rejected {
                detail: error_detail(response).await,
            });
        }

        let parsed: SubmitResponse = response.json().await.map_err(|e| SubmissionError::Unknown {
            message: format!("Unexpected submit response: {e}"),
        })?;

        tracing::info!(job_id = %parsed.task_id, "Export job accepted");
        Ok(parsed.task_id)
    }

    /// Fetch the current status snapshot of a job.
    ///
    /// # Errors
    /// `Network`, `Rejected` (e.g. unknown task), or `Malformed`.
    pub async fn get_task_status(&self, job_id: &str) -> std::result::Result<TaskSnapshot, PollError> {
        let response = self
            .http
            .get(self.url(&format!("/api/tasks/{job_id}")))
            .send()
            .await
            .map_err(|e| PollError::Network {
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(PollError::Rejected {
                detail: error_detail(response).await,
            });
        }

        let text = response.text().await.map_err(|e| PollError::Network {
            message: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| PollError::Malformed {
            message: e.to_string(),
        })
    }

    /// Whether the backend answers its health check.
    ///
    /// # Errors
    /// Returns error if the backend cannot be reached.
    pub async fn health(&self) -> Result<bool> {
        let health: HealthResponse = self.get_json("/api/health").await?;
        Ok(health.ok)
    }

    /// Start a Telegram login; the backend sends a code to the phone.
    ///
    /// # Errors
    /// Returns the backend's detail on failure.
    pub async fn telegram_login_start(&self, creds: &TelegramCredentials) -> Result<TelegramLogin> {
        self.post_json("/api/telegram/login/start", creds).await
    }

    /// Finish a Telegram login with the received code (and 2FA password).
    ///
    /// # Errors
    /// Returns the backend's detail on failure.
    pub async fn telegram_login_complete(
        &self,
        creds: &TelegramCredentials,
        code: &str,
        password: Option<&str>,
    ) -> Result<TelegramLogin> {
        let mut body = serde_json::to_value(creds).map_err(AppError::json_parse)?;
        if let Value::Object(map) = &mut body {
            map.insert("code".into(), json!(code));
            if let Some(password) = password.filter(|p| !p.is_empty()) {
                map.insert("password".into(), json!(password));
            }
        }
        self.post_json("/api/telegram/login/complete", &body).await
    }

    /// Check a Slack token. Returns the backend's description of it.
    ///
    /// # Errors
    /// Returns the backend's detail on failure.
    pub async fn test_slack(&self, token: &str) -> Result<String> {
        let res: MessageResponse = self
            .post_json("/api/slack/test", &json!({ "token": token }))
            .await?;
        Ok(res.message)
    }

    /// List Slack channels whose name contains `query`.
    ///
    /// # Errors
    /// Returns the backend's detail on failure.
    pub async fn list_slack_channels(
        &self,
        token: &str,
        query: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SlackChannel>> {
        let mut body = json!({ "token": token, "limit": limit });
        if let Some(query) = query {
            body["query"] = json!(query);
        }
        let res: SearchResponse<SlackChannel> = self.post_json("/api/slack/channels", &body).await?;
        Ok(res.results)
    }

    /// Check a Discord bot token.
    ///
    /// # Errors
    /// Returns the backend's detail on failure.
    pub async fn test_discord(&self, token: &str) -> Result<DiscordBot> {
        self.post_json("/api/discord/test", &json!({ "token": token }))
            .await
    }

    /// List text channels of a Discord guild whose name contains `query`.
    ///
    /// # Errors
    /// Returns the backend's detail on failure.
    pub async fn list_discord_channels(
        &self,
        token: &str,
        guild_id: &str,
        query: Option<&str>,
    ) -> Result<Vec<DiscordChannel>> {
        let mut body = json!({ "token": token, "guild_id": guild_id });
        if let Some(query) = query {
            body["query"] = json!(query);
        }
        let res: SearchResponse<DiscordChannel> =
            self.post_json("/api/discord/channels", &body).await?;
        Ok(res.results)
    }

    /// Check that a Notion key can reach a parent page/database.
    ///
    /// # Errors
    /// Returns the backend's detail on failure.
    pub async fn test_notion(
        &self,
        api_key: &str,
        parent_type: NotionParentType,
        parent_id: &str,
    ) -> Result<String> {
        let body = json!({
            "api_key": api_key,
            "dest_type": parent_type.to_string(),
            "parent_id": parent_id,
        });
        let res: MessageResponse = self.post_json("/api/notion/test", &body).await?;
        Ok(res.message)
    }

    /// Search Notion pages/databases visible to `api_key`.
    ///
    /// # Errors
    /// Returns the backend's detail on failure.
    pub async fn search_notion(
        &self,
        api_key: &str,
        query: &str,
        only: Option<NotionParentType>,
    ) -> Result<Vec<NotionSearchResult>> {
        let mut body = json!({ "api_key": api_key, "query": query });
        if let Some(only) = only {
            body["type"] = json!(only.to_string().to_lowercase());
        }
        let res: SearchResponse<NotionSearchResult> =
            self.post_json("/api/notion/search", &body).await?;
        Ok(res.results)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .http
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| AppError::backend(e.to_string()))?;
        decode(response).await
    }

    async fn post_json<T: DeserializeOwned, B: Serialize + Sync + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        tracing::debug!(path, "Backend request");
        let response = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::backend(e.to_string()))?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    if !response.status().is_success() {
        return Err(AppError::backend(error_detail(response).await));
    }
    let text = response
        .text()
        .await
        .map_err(|e| AppError::backend(e.to_string()))?;
    serde_json::from_str(&text).map_err(AppError::json_parse)
}

/// Human-readable reason from an error response.
///
/// Prefers the `detail` field of a JSON body, then the raw body, then the
/// status line.
async fn error_detail(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&body) {
        match map.get("detail") {
            Some(Value::String(detail)) => return detail.clone(),
            Some(other) => return other.to_string(),
            None => {}
        }
    }

    if body.trim().is_empty() {
        status.to_string()
    } else {
        body.trim().to_string()
    }
}

#[async_trait]
impl StatusSource for BackendClient {
    async fn fetch_status(&self, job_id: &str) -> std::result::Result<TaskSnapshot, PollError> {
        self.get_task_status(job_id).await
    }
}

#[async_trait]
impl JobSubmitter for BackendClient {
    async fn submit(&self, request: &JobRequest) -> std::result::Result<String, SubmissionError> {
        self.submit_job(request).await
    }
}

#[async_trait]
impl ConfigStore for BackendClient {
    async fn load(&self) -> Result<SavedConfig> {
        self.get_json("/api/config").await
    }

    async fn save(&self, config: &SavedConfig) -> Result<()> {
        let _: Value = self
            .post_json("/api/config", &json!({ "config": config }))
            .await?;
        tracing::info!(url = %self.base_url, "Configuration saved to backend");
        Ok(())
    }

    fn describe(&self) -> String {
        self.url("/api/config")
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::application::request_builder::build;
    use crate::domain::{
        DestinationDescriptor, FileFormat, FilterOptions, SlackSource, SourceSelection,
        TaskStatus, TelegramSource,
    };

    fn slack_request() -> JobRequest {
        build(
            SourceSelection::Slack(SlackSource {
                token: "xoxb-1".into(),
                channel: "#general".into(),
            }),
            FilterOptions::default(),
            DestinationDescriptor::Folder {
                path: PathBuf::from("/tmp/out/messages.csv"),
                format: FileFormat::Csv,
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_submit_posts_to_platform_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/slack/extract"))
            .and(body_partial_json(json!({
                "token": "xoxb-1",
                "channel": "#general",
                "out": "/tmp/out/messages.csv",
                "format": "csv",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "task_id": "abc123" })))
            .expect(1)
            .mount(&server)
            .await;

        let client = BackendClient::new(&server.uri()).unwrap();
        assert_eq!(client.submit_job(&slack_request()).await.unwrap(), "abc123");
    }

    #[tokio::test]
    async fn test_submit_telegram_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/telegram/extract"))
            .and(body_partial_json(json!({ "api_id": 42, "chat": "@testchan" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "task_id": "t1" })))
            .expect(1)
            .mount(&server)
            .await;

        let request = build(
            SourceSelection::Telegram(TelegramSource {
                api_id: "42".into(),
                api_hash: "h".into(),
                phone: String::new(),
                session: None,
                chat: "@testchan".into(),
            }),
            FilterOptions::default(),
            DestinationDescriptor::Folder {
                path: PathBuf::from("/tmp/out/messages.jsonl"),
                format: FileFormat::Jsonl,
            },
        )
        .unwrap();

        let client = BackendClient::new(&format!("{}/", server.uri())).unwrap();
        assert_eq!(client.submit_job(&request).await.unwrap(), "t1");
    }

    #[tokio::test]
    async fn test_submit_rejected_passes_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/slack/extract"))
            .respond_with(ResponseTemplate::new(400).set_body_json(
                json!({ "detail": "Missing 'out' path for filesystem export" }),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let client = BackendClient::new(&server.uri()).unwrap();
        let err = client.submit_job(&slack_request()).await.unwrap_err();
        assert!(matches!(
            err,
            SubmissionError::Rejected { detail } if detail == "Missing 'out' path for filesystem export"
        ));
    }

    #[tokio::test]
    async fn test_submit_unexpected_body_is_unknown() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .mount(&server)
            .await;

        let client = BackendClient::new(&server.uri()).unwrap();
        assert!(matches!(
            client.submit_job(&slack_request()).await,
            Err(SubmissionError::Unknown { .. })
        ));
    }

    #[tokio::test]
    async fn test_submit_unreachable_is_network() {
        // Bind then drop a server so its port refuses connections.
        let uri = {
            let server = MockServer::start().await;
            server.uri()
        };
        let client = BackendClient::new(&uri).unwrap();
        assert!(matches!(
            client.submit_job(&slack_request()).await,
            Err(SubmissionError::Network { .. })
        ));
    }

    #[tokio::test]
    async fn test_task_status_parsed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tasks/abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "running",
                "logs": ["[12:00:01] Starting Telegram export..."],
                "result": null,
                "error": null,
                "started_at": 1_700_000_000.0,
                "finished_at": null,
            })))
            .mount(&server)
            .await;

        let client = BackendClient::new(&server.uri()).unwrap();
        let snap = client.fetch_status("abc123").await.unwrap();
        assert_eq!(snap.status, TaskStatus::Running);
        assert_eq!(snap.logs.len(), 1);
        assert!(snap.finished_at.is_none());
    }

    #[tokio::test]
    async fn test_task_status_errors_classified() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tasks/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "detail": "Task not found" })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/tasks/garbled"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let client = BackendClient::new(&server.uri()).unwrap();
        assert_eq!(
            client.get_task_status("missing").await,
            Err(PollError::Rejected {
                detail: "Task not found".into()
            })
        );
        assert!(matches!(
            client.get_task_status("garbled").await,
            Err(PollError::Malformed { .. })
        ));
    }

    #[tokio::test]
    async fn test_remote_config_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/config"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "app": "Discord",
                "discord": { "token": "bot" },
                "notion": { "destinations": [] },
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/config"))
            .and(body_partial_json(json!({ "config": { "app": "Discord", "discord": { "token": "bot" } } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "saved": true })))
            .expect(1)
            .mount(&server)
            .await;

        let client = BackendClient::new(&server.uri()).unwrap();
        let config = ConfigStore::load(&client).await.unwrap();
        assert_eq!(config.app, "Discord");
        ConfigStore::save(&client, &config).await.unwrap();
    }

    #[tokio::test]
    async fn test_auxiliary_lookups() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/slack/channels"))
            .and(body_partial_json(json!({ "token": "xoxb", "query": "gen", "limit": 50 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{ "id": "C1", "name": "general", "is_private": false }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/notion/search"))
            .and(body_partial_json(json!({ "type": "database" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{ "id": "db-1", "type": "Database", "title": "Exports" }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/discord/test"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "detail": "Discord API error: 401 Unauthorized"
            })))
            .mount(&server)
            .await;

        let client = BackendClient::new(&server.uri()).unwrap();

        let channels = client.list_slack_channels("xoxb", Some("gen"), 50).await.unwrap();
        assert_eq!(channels[0].name, "general");

        let found = client
            .search_notion("secret", "Exp", Some(NotionParentType::Database))
            .await
            .unwrap();
        assert_eq!(found[0].parent_type, NotionParentType::Database);

        let err = client.test_discord("bad").await.unwrap_err();
        assert!(err.to_string().contains("401 Unauthorized"));
    }

    #[tokio::test]
    async fn test_telegram_login_complete_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/telegram/login/complete"))
            .and(body_partial_json(json!({ "api_id": 7, "phone": "+1", "code": "12345" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true, "session": "/srv/tg.session"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = BackendClient::new(&server.uri()).unwrap();
        let creds = TelegramCredentials {
            api_id: 7,
            api_hash: "h".into(),
            phone: "+1".into(),
            session: None,
        };
        let login = client
            .telegram_login_complete(&creds, "12345", None)
            .await
            .unwrap();
        assert!(login.ok);
        assert_eq!(login.session.as_deref(), Some("/srv/tg.session"));
    }
}
