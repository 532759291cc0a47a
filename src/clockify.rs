use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, info, warn};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::time_entry::TimeEntry;

const CLOCKIFY_API_URL: &str = "https://api.clockify.me/api/v1";
const PAGE_SIZE: usize = 50;
const MAX_ATTEMPTS: u32 = 5;

/// Clockify APIのワークスペース情報をデシリアライズするための構造体。
#[derive(Debug, Deserialize)]
struct ClockifyWorkspace {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ClockifyNamed {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClockifyTimeInterval {
    start: String,
    end: Option<String>,
}

/// Clockify APIのレスポンスをデシリアライズするための構造体。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClockifyTimeEntry {
    description: Option<String>,
    time_interval: ClockifyTimeInterval,
    project: Option<ClockifyNamed>,
    task: Option<ClockifyNamed>,
}

impl From<ClockifyTimeEntry> for TimeEntry {
    fn from(entry: ClockifyTimeEntry) -> Self {
        TimeEntry {
            start: entry.time_interval.start,
            end: entry.time_interval.end.unwrap_or_default(),
            description: entry.description.unwrap_or_default(),
            project: entry.project.map(|project| project.name).unwrap_or_default(),
            task: entry.task.map(|task| task.name).unwrap_or_default(),
        }
    }
}

/// タイムエントリーの取得元。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClockifyRepository {
    /// 利用するワークスペースのIDを返す。
    async fn default_workspace_id(&self) -> Result<String>;

    /// ユーザーの`[start_at, end_at)`に含まれるタイムエントリーを全ページ取得する。
    async fn read_time_entries(
        &self,
        workspace_id: &str,
        user_id: &str,
        start_at: &DateTime<Utc>,
        end_at: &DateTime<Utc>,
    ) -> Result<Vec<TimeEntry>>;
}

/// Clockify APIと通信するためのクライアント。
///
/// リクエストは1件ずつ間隔を空けて送り、429が返った場合は一定時間待って再送する。
///
/// # Examples
///
/// ```no_run
/// # async fn run() -> anyhow::Result<()> {
/// use time_warden::clockify::{ClockifyClient, ClockifyRepository};
///
/// let client = ClockifyClient::new("api-key");
/// let workspace_id = client.default_workspace_id().await?;
/// # Ok(())
/// # }
/// ```
pub struct ClockifyClient {
    client: Client,
    api_url: String,
    api_key: String,
    request_interval: Duration,
    retry_delay: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl ClockifyClient {
    /// 新しい`ClockifyClient`を返す。
    pub fn new(api_key: &str) -> Self {
        Self::with_api_url(api_key, CLOCKIFY_API_URL)
    }

    /// 接続先を指定して`ClockifyClient`を返す。
    pub fn with_api_url(api_key: &str, api_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            request_interval: Duration::from_millis(50),
            retry_delay: Duration::from_secs(1),
            last_request: Mutex::new(None),
        }
    }

    /// リクエスト間隔と429の再送待ち時間を変更する。
    pub fn with_delays(mut self, request_interval: Duration, retry_delay: Duration) -> Self {
        self.request_interval = request_interval;
        self.retry_delay = retry_delay;
        self
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{}", self.api_url, path);
        let request = self
            .client
            .get(&url)
            .header("X-Api-Key", &self.api_key)
            .query(query);

        self.send(request)
            .await
            .with_context(|| format!("Failed to send request to Clockify API at {}", url))?
            .error_for_status()
            .context("Request returned an error status")?
            .json::<T>()
            .await
            .context("Failed to deserialize response")
    }

    // 前回のリクエストから`request_interval`空けて送信し、429なら待って再送する。
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        for attempt in 1..=MAX_ATTEMPTS {
            let request = request
                .try_clone()
                .context("Failed to clone request for retry")?;
            self.throttle().await;
            let response = request.send().await?;
            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                return Ok(response);
            }
            warn!(
                "Rate limit hit (attempt {}/{}), waiting before retry...",
                attempt, MAX_ATTEMPTS
            );
            tokio::time::sleep(self.retry_delay).await;
        }

        bail!("Rate limited after {} attempts", MAX_ATTEMPTS)
    }

    async fn throttle(&self) {
        let mut last_request = self.last_request.lock().await;
        if let Some(last) = *last_request {
            tokio::time::sleep_until(last + self.request_interval).await;
        }
        *last_request = Some(Instant::now());
    }
}

#[async_trait]
impl ClockifyRepository for ClockifyClient {
    /// 最初のワークスペースを利用する。
    async fn default_workspace_id(&self) -> Result<String> {
        let workspaces: Vec<ClockifyWorkspace> = self
            .get_json("/workspaces", &[])
            .await
            .context("Failed to get workspace list from Clockify")?;
        let workspace = workspaces
            .into_iter()
            .next()
            .context("No workspace is available for this API key")?;
        info!("Using workspace: {} ({})", workspace.name, workspace.id);

        Ok(workspace.id)
    }

    async fn read_time_entries(
        &self,
        workspace_id: &str,
        user_id: &str,
        start_at: &DateTime<Utc>,
        end_at: &DateTime<Utc>,
    ) -> Result<Vec<TimeEntry>> {
        let path = format!("/workspaces/{}/user/{}/time-entries", workspace_id, user_id);
        // APIの`end`は終端を含むため、1ms手前を指定する
        let last_instant = *end_at - chrono::Duration::milliseconds(1);
        let mut time_entries = Vec::new();
        for page in 1.. {
            let query = [
                ("start", start_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
                ("end", last_instant.to_rfc3339_opts(SecondsFormat::Millis, true)),
                ("page", page.to_string()),
                ("page-size", PAGE_SIZE.to_string()),
                ("hydrated", "true".to_string()),
            ];
            let page_entries: Vec<ClockifyTimeEntry> = self
                .get_json(&path, &query)
                .await
                .with_context(|| format!("Failed to read page {} of time entries for {}", page, user_id))?;
            debug!("Page {} for {}: {} entries", page, user_id, page_entries.len());

            let is_last = page_entries.len() < PAGE_SIZE;
            time_entries.extend(page_entries.into_iter().map(TimeEntry::from));
            if is_last {
                break;
            }
        }
        info!("Found {} entries for user {}", time_entries.len(), user_id);

        Ok(time_entries)
    }
}
