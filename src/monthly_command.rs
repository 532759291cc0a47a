use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use log::{info, warn};

use crate::batch::run_in_batches;
use crate::calendar::count_working_days;
use crate::clockify::ClockifyRepository;
use crate::config::Settings;
use crate::daily_command::parse_date;
use crate::datetime;
use crate::directory::{User, UserDirectory};
use crate::duration::{end_of_day, start_of_day};
use crate::monthly_analyzer::{MonthlyAnalysisResult, MonthlyAnalyzer};
use crate::report::{MonthlyReport, UserMonthlyReport};
use crate::team::{group_by_team, MemberHours};

/// `monthly`サブコマンドの引数を表す構造体。
#[derive(Debug, Default, clap::Args)]
pub struct MonthlyArgs {
    #[clap(
        short = 'd',
        long = "date",
        help = "Sets the report date in the format YYYY-MM-DD",
        parse(try_from_str = parse_date),
    )]
    pub date: Option<NaiveDate>,

    #[clap(long = "dry-run", help = "Prints the report instead of posting it to Slack")]
    pub dry_run: bool,
}

pub struct MonthlyCommand<'a, C: ClockifyRepository> {
    clockify: &'a C,
    directory: &'a UserDirectory,
    settings: &'a Settings,
}

impl<'a, C: ClockifyRepository> MonthlyCommand<'a, C> {
    /// 新しい`MonthlyCommand`を返す。
    pub fn new(clockify: &'a C, directory: &'a UserDirectory, settings: &'a Settings) -> Self {
        Self {
            clockify,
            directory,
            settings,
        }
    }

    /// `monthly`サブコマンドの処理を行う。
    ///
    /// 基準日の月初から基準日までのtime entryを全ユーザー分取得し、ユーザーごととチームごとに集計する。
    /// 基準日が指定されていない場合は、設定したタイムゾーンでの今日を利用する。
    ///
    /// # Arguments
    ///
    /// * `args` - `monthly`サブコマンドの引数
    pub async fn run(&self, args: &MonthlyArgs) -> Result<MonthlyReport> {
        let tz = &self.settings.analyzer.timezone;
        let report_date = args.date.unwrap_or_else(|| datetime::today(tz));
        let month_start = report_date
            .with_day(1)
            .context("Failed to set day")?;
        let month_end = month_start
            .checked_add_months(Months::new(1))
            .and_then(|next_month| next_month.pred_opt())
            .context("Failed to find the end of the month")?;
        let window_end = report_date.min(month_end);
        let start_at = start_of_day(month_start, tz);
        let end_at = end_of_day(window_end, tz);
        info!("Start at: {}, End at: {}", start_at, end_at);

        let working_days = count_working_days(month_start, window_end, &self.settings.holidays);
        let expected_hours = f64::from(working_days) * self.settings.analyzer.required_hours;
        info!(
            "{} working days, {:.1} hours expected",
            working_days, expected_hours
        );

        let workspace_id = self
            .clockify
            .default_workspace_id()
            .await
            .context("Failed to retrieve workspace")?;
        let analyzer = MonthlyAnalyzer::new(
            self.settings.analyzer.clone(),
            self.settings.holidays.clone(),
        );
        let users = self.directory.all_users();
        let reports = run_in_batches(&users, &self.settings.batch, |user| {
            self.analyze_user(&analyzer, &workspace_id, user, &start_at, &end_at)
        })
        .await;

        let members: Vec<MemberHours> = reports
            .iter()
            .map(|report| MemberHours {
                user: report.analysis.user_name.clone(),
                team: report.analysis.team_id.clone(),
                total_hours: report.analysis.total_hours,
            })
            .collect();
        let teams = group_by_team(&members, self.directory.teams());

        Ok(MonthlyReport {
            report_date,
            month_start,
            working_days,
            expected_hours,
            users: reports,
            teams,
        })
    }

    async fn analyze_user(
        &self,
        analyzer: &MonthlyAnalyzer,
        workspace_id: &str,
        user: &User,
        start_at: &DateTime<Utc>,
        end_at: &DateTime<Utc>,
    ) -> UserMonthlyReport {
        match self
            .clockify
            .read_time_entries(workspace_id, &user.id, start_at, end_at)
            .await
        {
            Ok(entries) => UserMonthlyReport {
                analysis: analyzer.analyze(&entries, user),
                error: None,
            },
            Err(err) => {
                warn!("Failed to analyze {}: {:#}", user.name, err);
                let expected_hours = user
                    .required_hours
                    .unwrap_or(self.settings.analyzer.required_hours);
                UserMonthlyReport {
                    analysis: MonthlyAnalysisResult::empty(user, expected_hours),
                    error: Some(format!("{:#}", err)),
                }
            }
        }
    }
}
