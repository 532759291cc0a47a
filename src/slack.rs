use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::DateTime;
use chrono_tz::Tz;
use log::info;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::SlackSettings;
use crate::directory::Team;
use crate::formatter::{
    daily_summary_blocks, monthly_report_blocks, DAILY_FALLBACK_TEXT, MONTHLY_FALLBACK_TEXT,
};
use crate::report::{DailyReport, MonthlyReport};

const SLACK_API_URL: &str = "https://slack.com/api";

/// Slack APIのレスポンス。HTTPステータスが200でも`ok`がfalseの場合がある。
#[derive(Debug, Deserialize)]
struct SlackResponse {
    ok: bool,
    error: Option<String>,
}

/// メッセージの投稿先。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SlackRepository {
    /// ブロックを含むメッセージを投稿する。
    ///
    /// # Arguments
    ///
    /// * `text` - 通知に表示される代替テキスト
    /// * `blocks` - メッセージ本文のブロック
    async fn post_message(&self, text: &str, blocks: &[Value]) -> Result<()>;
}

/// Slack APIと通信するためのクライアント。
pub struct SlackClient {
    client: Client,
    api_url: String,
    bot_token: String,
    channel_id: String,
}

impl SlackClient {
    pub fn new(settings: &SlackSettings) -> Self {
        Self::with_api_url(settings, SLACK_API_URL)
    }

    pub fn with_api_url(settings: &SlackSettings, api_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            bot_token: settings.bot_token.clone(),
            channel_id: settings.channel_id.clone(),
        }
    }
}

#[async_trait]
impl SlackRepository for SlackClient {
    async fn post_message(&self, text: &str, blocks: &[Value]) -> Result<()> {
        let url = format!("{}/chat.postMessage", self.api_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.bot_token)
            .json(&json!({
                "channel": self.channel_id,
                "text": text,
                "blocks": blocks,
            }))
            .send()
            .await
            .with_context(|| format!("Failed to send request to Slack API at {}", url))?
            .error_for_status()
            .context("Request returned an error status")?
            .json::<SlackResponse>()
            .await
            .context("Failed to deserialize response")?;
        if !response.ok {
            bail!(
                "Slack rejected the message: {}",
                response.error.unwrap_or_else(|| "unknown error".to_string())
            );
        }
        info!("Posted {} blocks to channel {}", blocks.len(), self.channel_id);

        Ok(())
    }
}

/// 日次チェックの結果を投稿する。
pub async fn notify_daily<S: SlackRepository>(
    slack: &S,
    report: &DailyReport,
    generated_at: &DateTime<Tz>,
) -> Result<()> {
    let blocks = daily_summary_blocks(report, generated_at);
    slack
        .post_message(DAILY_FALLBACK_TEXT, &blocks)
        .await
        .context("Failed to send daily report to Slack")
}

/// 月次レポートを投稿する。
pub async fn notify_monthly<S: SlackRepository>(
    slack: &S,
    report: &MonthlyReport,
    teams: &BTreeMap<String, Team>,
    generated_at: &DateTime<Tz>,
) -> Result<()> {
    let blocks = monthly_report_blocks(report, teams, generated_at);
    slack
        .post_message(MONTHLY_FALLBACK_TEXT, &blocks)
        .await
        .context("Failed to send monthly report to Slack")
}
