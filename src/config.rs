use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono_tz::Tz;

use crate::batch::BatchOptions;
use crate::calendar::Holidays;
use crate::directory::{User, UsersSource};

pub const DEFAULT_REQUIRED_HOURS: f64 = 8.0;
pub const DEFAULT_SUSPICIOUS_GAP_HOURS: f64 = 4.0;
pub const DEFAULT_SUSPICIOUS_DURATION_HOURS: f64 = 10.0;
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Kolkata;

/// 解析の閾値と方針。
///
/// 解析処理の中では環境変数を読まず、必ずこの値を渡す。
#[derive(Clone, Debug, PartialEq)]
pub struct AnalyzerConfig {
    pub required_hours: f64,
    pub suspicious_gap_hours: f64,
    pub suspicious_duration_hours: f64,
    /// 日次の合計を対象日の範囲に切り詰めて計算する。
    pub clip_to_day: bool,
    /// 重なっているtime entryを異常として報告する。
    pub detect_overlaps: bool,
    /// 「1日」「1ヶ月」「稼働日」を判定するタイムゾーン。
    pub timezone: Tz,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            required_hours: DEFAULT_REQUIRED_HOURS,
            suspicious_gap_hours: DEFAULT_SUSPICIOUS_GAP_HOURS,
            suspicious_duration_hours: DEFAULT_SUSPICIOUS_DURATION_HOURS,
            clip_to_day: false,
            detect_overlaps: false,
            timezone: DEFAULT_TIMEZONE,
        }
    }
}

impl AnalyzerConfig {
    /// ユーザー個別の必要時間数を反映した設定を返す。
    pub fn for_user(&self, user: &User) -> Self {
        Self {
            required_hours: user.required_hours.unwrap_or(self.required_hours),
            ..self.clone()
        }
    }
}

/// Slackの投稿先。
#[derive(Clone, Debug, PartialEq)]
pub struct SlackSettings {
    pub bot_token: String,
    pub channel_id: String,
}

/// アプリケーション全体の設定。
#[derive(Clone, Debug)]
pub struct Settings {
    pub clockify_api_key: String,
    pub slack: Option<SlackSettings>,
    pub users: UsersSource,
    pub holidays: Holidays,
    pub analyzer: AnalyzerConfig,
    pub batch: BatchOptions,
}

impl Settings {
    /// 環境変数から設定を読み込む。
    ///
    /// 環境変数`CLOCKIFY_API_KEY`が設定されていない場合はエラーを返す。
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// `lookup`で得られる値から設定を組み立てる。
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let clockify_api_key = lookup("CLOCKIFY_API_KEY")
            .filter(|key| !key.is_empty())
            .context("CLOCKIFY_API_KEY must be set")?;
        let slack = match (lookup("SLACK_BOT_TOKEN"), lookup("SLACK_CHANNEL_ID")) {
            (Some(bot_token), Some(channel_id)) => Some(SlackSettings {
                bot_token,
                channel_id,
            }),
            _ => None,
        };

        let users = match (lookup("USERS"), lookup("USERS_FILE")) {
            (Some(json), _) => UsersSource::Json(json),
            (None, Some(path)) => UsersSource::File(path.into()),
            (None, None) => UsersSource::File(
                dirs::config_dir()
                    .context("Failed to find the config directory")?
                    .join("time-warden")
                    .join("users.json"),
            ),
        };

        let holidays = Holidays::parse_list(&lookup("HOLIDAYS").unwrap_or_default())
            .context("Invalid HOLIDAYS")?;

        let timezone = match lookup("TIMEZONE") {
            Some(name) => name
                .parse::<Tz>()
                .map_err(|err| anyhow!("Invalid TIMEZONE {}: {}", name, err))?,
            None => DEFAULT_TIMEZONE,
        };
        let analyzer = AnalyzerConfig {
            required_hours: parse_or(&lookup, "REQUIRED_HOURS", DEFAULT_REQUIRED_HOURS)?,
            suspicious_gap_hours: parse_or(
                &lookup,
                "SUSPICIOUS_GAP_HOURS",
                DEFAULT_SUSPICIOUS_GAP_HOURS,
            )?,
            suspicious_duration_hours: parse_or(
                &lookup,
                "SUSPICIOUS_DURATION_HOURS",
                DEFAULT_SUSPICIOUS_DURATION_HOURS,
            )?,
            clip_to_day: parse_flag(&lookup, "CLIP_TO_DAY"),
            detect_overlaps: parse_flag(&lookup, "DETECT_OVERLAPS"),
            timezone,
        };

        let defaults = BatchOptions::default();
        let batch = BatchOptions {
            size: parse_or(&lookup, "BATCH_SIZE", defaults.size)?,
            delay: Duration::from_millis(parse_or(
                &lookup,
                "BATCH_DELAY_MS",
                defaults.delay.as_millis() as u64,
            )?),
        };

        Ok(Self {
            clockify_api_key,
            slack,
            users,
            holidays,
            analyzer,
            batch,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}: {}", key, value)),
        None => Ok(default),
    }
}

fn parse_flag<F>(lookup: &F, key: &str) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use chrono::NaiveDate;
    use rstest::rstest;

    use super::{AnalyzerConfig, Settings, DEFAULT_TIMEZONE};
    use crate::directory::{User, UsersSource};

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_defaults() {
        let settings =
            Settings::from_lookup(lookup_from(&[("CLOCKIFY_API_KEY", "key"), ("USERS", "{}")]))
                .unwrap();

        assert_eq!(settings.clockify_api_key, "key");
        assert_eq!(settings.slack, None);
        assert_eq!(settings.users, UsersSource::Json("{}".to_string()));
        assert!(settings.holidays.is_empty());
        assert_eq!(settings.analyzer, AnalyzerConfig::default());
        assert_eq!(settings.analyzer.timezone, DEFAULT_TIMEZONE);
        assert_eq!(settings.batch.size, 5);
        assert_eq!(settings.batch.delay, Duration::from_secs(1));
    }

    #[test]
    fn test_from_lookup_overrides() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("CLOCKIFY_API_KEY", "key"),
            ("SLACK_BOT_TOKEN", "xoxb-token"),
            ("SLACK_CHANNEL_ID", "C123"),
            ("USERS_FILE", "/etc/time-warden/users.json"),
            ("HOLIDAYS", "2025-03-14, 2025-08-15"),
            ("TIMEZONE", "Europe/Berlin"),
            ("REQUIRED_HOURS", "7.5"),
            ("SUSPICIOUS_GAP_HOURS", "3"),
            ("CLIP_TO_DAY", "true"),
            ("DETECT_OVERLAPS", "1"),
            ("BATCH_SIZE", "2"),
            ("BATCH_DELAY_MS", "0"),
        ]))
        .unwrap();

        let slack = settings.slack.unwrap();
        assert_eq!(slack.bot_token, "xoxb-token");
        assert_eq!(slack.channel_id, "C123");
        assert_eq!(
            settings.users,
            UsersSource::File("/etc/time-warden/users.json".into())
        );
        assert!(settings
            .holidays
            .contains(&NaiveDate::from_ymd_opt(2025, 8, 15).unwrap()));
        assert_eq!(settings.analyzer.timezone, chrono_tz::Europe::Berlin);
        assert_eq!(settings.analyzer.required_hours, 7.5);
        assert_eq!(settings.analyzer.suspicious_gap_hours, 3.0);
        assert_eq!(settings.analyzer.suspicious_duration_hours, 10.0);
        assert!(settings.analyzer.clip_to_day);
        assert!(settings.analyzer.detect_overlaps);
        assert_eq!(settings.batch.size, 2);
        assert_eq!(settings.batch.delay, Duration::ZERO);
    }

    /// 異常系のテスト。
    #[rstest]
    #[case::missing_api_key(&[("USERS", "{}")])]
    #[case::bad_timezone(&[("CLOCKIFY_API_KEY", "key"), ("USERS", "{}"), ("TIMEZONE", "Mars/Olympus")])]
    #[case::bad_hours(&[("CLOCKIFY_API_KEY", "key"), ("USERS", "{}"), ("REQUIRED_HOURS", "eight")])]
    #[case::bad_holiday(&[("CLOCKIFY_API_KEY", "key"), ("USERS", "{}"), ("HOLIDAYS", "14/03/2025")])]
    fn test_from_lookup_invalid(#[case] pairs: &[(&str, &str)]) {
        assert!(Settings::from_lookup(lookup_from(pairs)).is_err());
    }

    #[test]
    fn test_for_user() {
        let config = AnalyzerConfig::default();
        let mut user = User {
            id: "u1".to_string(),
            name: "Asha".to_string(),
            email: String::new(),
            team: None,
            check_enabled: true,
            required_hours: None,
        };

        assert_eq!(config.for_user(&user).required_hours, 8.0);
        user.required_hours = Some(6.0);
        assert_eq!(config.for_user(&user).required_hours, 6.0);
    }
}
