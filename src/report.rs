use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::daily_analyzer::DailyAnalysisResult;
use crate::directory::User;
use crate::monthly_analyzer::MonthlyAnalysisResult;
use crate::team::TeamAggregateResult;
use crate::time_entry::TimeEntry;

/// 1ユーザー分の日次チェック結果。
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UserDailyReport {
    pub user: String,
    pub email: String,
    pub team: Option<String>,
    #[serde(flatten)]
    pub analysis: DailyAnalysisResult,
    pub entries: Vec<TimeEntry>,
    /// time entryの取得に失敗した場合のエラーメッセージ。
    pub error: Option<String>,
}

impl UserDailyReport {
    pub fn analyzed(user: &User, analysis: DailyAnalysisResult, entries: Vec<TimeEntry>) -> Self {
        Self {
            user: user.name.clone(),
            email: user.email.clone(),
            team: user.team.clone(),
            analysis,
            entries,
            error: None,
        }
    }

    /// 取得に失敗したユーザーは未記録として扱う。
    pub fn failed(user: &User, error: String, required_hours: f64) -> Self {
        Self {
            user: user.name.clone(),
            email: user.email.clone(),
            team: user.team.clone(),
            analysis: DailyAnalysisResult::missing(required_hours),
            entries: Vec::new(),
            error: Some(error),
        }
    }
}

/// 日次チェック全体の結果。
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DailyReport {
    pub date: NaiveDate,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub users: Vec<UserDailyReport>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UserMonthlyReport {
    #[serde(flatten)]
    pub analysis: MonthlyAnalysisResult,
    pub error: Option<String>,
}

/// 月次レポート全体の結果。
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MonthlyReport {
    pub report_date: NaiveDate,
    pub month_start: NaiveDate,
    pub working_days: u32,
    pub expected_hours: f64,
    pub users: Vec<UserMonthlyReport>,
    pub teams: TeamAggregateResult,
}
