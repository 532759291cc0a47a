use std::collections::BTreeMap;

use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::calendar::{is_working_day, Holidays};
use crate::config::AnalyzerConfig;
use crate::directory::User;
use crate::duration::{civil_date, clip_to_day, hours_between, round_hours};
use crate::sorter::sort_by_start;
use crate::time_entry::TimeEntry;

/// 1ユーザー・1ヶ月分の解析結果。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonthlyAnalysisResult {
    pub user_name: String,
    pub team_id: Option<String>,
    pub total_hours: f64,
    pub working_days: u32,
    pub daily_average_actual: f64,
    pub daily_average_expected: f64,
    /// 日ごとの合計と期待値との差の絶対値の平均。
    pub hours_variance: f64,
}

impl MonthlyAnalysisResult {
    /// time entryが1件もない場合の結果。
    pub fn empty(user: &User, expected_hours: f64) -> Self {
        Self {
            user_name: user.name.clone(),
            team_id: user.team.clone(),
            total_hours: 0.0,
            working_days: 0,
            daily_average_actual: 0.0,
            daily_average_expected: expected_hours,
            hours_variance: 0.0,
        }
    }
}

/// 1ヶ月分のtime entryを解析する。
#[derive(Clone, Debug, Default)]
pub struct MonthlyAnalyzer {
    config: AnalyzerConfig,
    holidays: Holidays,
}

impl MonthlyAnalyzer {
    pub fn new(config: AnalyzerConfig, holidays: Holidays) -> Self {
        Self { config, holidays }
    }

    /// ユーザーの1ヶ月分のtime entryを解析する。
    ///
    /// 各time entryは開始した日に計上し、その日の終わりで切り詰める。
    /// 対象月以外の日も除外しないため、取得範囲は呼び出し側で決める。
    pub fn analyze(&self, entries: &[TimeEntry], user: &User) -> MonthlyAnalysisResult {
        let expected_hours = user.required_hours.unwrap_or(self.config.required_hours);
        if entries.is_empty() {
            return MonthlyAnalysisResult::empty(user, expected_hours);
        }

        let daily_hours = self.daily_hours(entries);
        let total_hours: f64 = daily_hours.values().sum();
        let working_days = daily_hours
            .keys()
            .filter(|date| is_working_day(**date, &self.holidays))
            .count() as u32;
        let daily_average_actual = if working_days > 0 {
            total_hours / f64::from(working_days)
        } else {
            0.0
        };
        let hours_variance = if daily_hours.is_empty() {
            0.0
        } else {
            daily_hours
                .values()
                .map(|hours| (hours - expected_hours).abs())
                .sum::<f64>()
                / daily_hours.len() as f64
        };
        debug!(
            "{}: {:.2}h over {} days ({} working days)",
            user.name,
            total_hours,
            daily_hours.len(),
            working_days
        );

        MonthlyAnalysisResult {
            user_name: user.name.clone(),
            team_id: user.team.clone(),
            total_hours: round_hours(total_hours),
            working_days,
            daily_average_actual: round_hours(daily_average_actual),
            daily_average_expected: expected_hours,
            hours_variance: round_hours(hours_variance),
        }
    }

    /// 暦日ごとの合計時間。
    pub fn daily_hours(&self, entries: &[TimeEntry]) -> BTreeMap<NaiveDate, f64> {
        let tz = &self.config.timezone;
        sort_by_start(entries)
            .valid
            .iter()
            .fold(BTreeMap::new(), |mut accumulate, timed| {
                let date = civil_date(&timed.interval.start, tz);
                let end = clip_to_day(timed.interval.end, date, tz);
                *accumulate.entry(date).or_insert(0.0) += hours_between(&timed.interval.start, &end);
                accumulate
            })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime, TimeZone};
    use chrono_tz::Asia::Kolkata;
    use rstest::rstest;

    use super::{MonthlyAnalysisResult, MonthlyAnalyzer};
    use crate::calendar::Holidays;
    use crate::config::AnalyzerConfig;
    use crate::directory::User;
    use crate::time_entry::TimeEntry;

    fn ist_entry(start: &str, end: &str) -> TimeEntry {
        let parse = |s: &str| {
            let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap();
            Kolkata.from_local_datetime(&naive).unwrap().to_utc()
        };
        TimeEntry::new(parse(start), parse(end))
    }

    fn user(required_hours: Option<f64>) -> User {
        User {
            id: "user1".to_string(),
            name: "Test User".to_string(),
            email: "test@example.com".to_string(),
            team: Some("teamAlpha".to_string()),
            check_enabled: true,
            required_hours,
        }
    }

    fn analyzer(holidays: &str) -> MonthlyAnalyzer {
        MonthlyAnalyzer::new(
            AnalyzerConfig::default(),
            Holidays::parse_list(holidays).unwrap(),
        )
    }

    #[rstest]
    #[case::default_hours(None, 8.0)]
    #[case::user_hours(Some(6.0), 6.0)]
    fn test_no_entry(#[case] required_hours: Option<f64>, #[case] expected: f64) {
        let user = user(required_hours);

        let result = analyzer("").analyze(&[], &user);

        assert_eq!(result, MonthlyAnalysisResult::empty(&user, expected));
        assert_eq!(result.daily_average_expected, expected);
    }

    /// 土曜日の記録も合計には含めるが、稼働日には数えない。
    #[test]
    fn test_working_days_and_averages() {
        let entries = [
            ist_entry("2025-03-01 09:00", "2025-03-01 17:00"), // 土曜日
            ist_entry("2025-03-03 09:00", "2025-03-03 17:00"),
            ist_entry("2025-03-04 09:00", "2025-03-04 18:00"),
        ];

        let result = analyzer("").analyze(&entries, &user(None));

        assert_eq!(result.user_name, "Test User");
        assert_eq!(result.team_id.as_deref(), Some("teamAlpha"));
        assert_eq!(result.total_hours, 25.0);
        assert_eq!(result.working_days, 2);
        assert_eq!(result.daily_average_actual, 12.5);
        assert_eq!(result.daily_average_expected, 8.0);
        assert_eq!(result.hours_variance, 0.33);
    }

    #[test]
    fn test_holidays_are_not_working_days() {
        let entries = [
            ist_entry("2025-03-14 09:00", "2025-03-14 17:00"),
            ist_entry("2025-03-13 09:00", "2025-03-13 17:00"),
        ];

        let result = analyzer("2025-03-14").analyze(&entries, &user(None));

        assert_eq!(result.working_days, 1);
        assert_eq!(result.total_hours, 16.0);
        assert_eq!(result.daily_average_actual, 16.0);
        assert_eq!(result.hours_variance, 0.0);
    }

    /// 日付を跨ぐtime entryは開始日の終わりまでを計上する。
    #[test]
    fn test_entries_spanning_midnight() {
        let entries = [
            ist_entry("2025-02-28 22:00", "2025-03-01 02:00"),
            ist_entry("2025-03-15 09:00", "2025-03-15 17:00"),
            ist_entry("2025-03-31 22:00", "2025-04-01 02:00"),
        ];

        let analyzer = analyzer("");
        let daily_hours = analyzer.daily_hours(&entries);

        assert_eq!(daily_hours.len(), 3);
        assert_eq!(daily_hours[&NaiveDate::from_ymd_opt(2025, 2, 28).unwrap()], 2.0);
        assert_eq!(daily_hours[&NaiveDate::from_ymd_opt(2025, 3, 31).unwrap()], 2.0);
        assert_eq!(analyzer.analyze(&entries, &user(None)).total_hours, 12.0);
    }

    #[test]
    fn test_malformed_entries_are_excluded() {
        let entries = [
            ist_entry("2025-03-03 17:00", "2025-03-03 09:00"),
            TimeEntry {
                start: "garbage".to_string(),
                end: "2025-03-03T10:00:00Z".to_string(),
                ..TimeEntry::default()
            },
            ist_entry("2025-03-04 09:00", "2025-03-04 17:00"),
        ];

        let analyzer = analyzer("");
        let result = analyzer.analyze(&entries, &user(None));

        assert_eq!(analyzer.daily_hours(&entries).len(), 1);
        assert_eq!(result.total_hours, 8.0);
        assert_eq!(result.working_days, 1);
    }

    #[test]
    fn test_weekend_only() {
        let entries = [ist_entry("2025-03-08 10:00", "2025-03-08 14:00")];

        let result = analyzer("").analyze(&entries, &user(Some(4.0)));

        assert_eq!(result.working_days, 0);
        assert_eq!(result.daily_average_actual, 0.0);
        assert_eq!(result.hours_variance, 0.0);
    }
}
