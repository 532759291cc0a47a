use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use log::{info, warn};

use crate::batch::run_in_batches;
use crate::calendar::previous_working_day;
use crate::clockify::ClockifyRepository;
use crate::config::Settings;
use crate::daily_analyzer::DailyAnalyzer;
use crate::datetime;
use crate::directory::{User, UserDirectory};
use crate::duration::{end_of_day, start_of_day};
use crate::report::{DailyReport, UserDailyReport};

/// 日次チェックを行うためのサブコマンド。
#[derive(Debug, Default, clap::Args)]
pub struct DailyArgs {
    #[clap(
        short = 'd',
        long = "date",
        help = "Sets a custom date in the format YYYY-MM-DD",
        parse(try_from_str = parse_date),
    )]
    pub date: Option<NaiveDate>,

    #[clap(long = "dry-run", help = "Prints the report instead of posting it to Slack")]
    pub dry_run: bool,
}

pub struct DailyCommand<'a, C: ClockifyRepository> {
    clockify: &'a C,
    directory: &'a UserDirectory,
    settings: &'a Settings,
}

impl<'a, C: ClockifyRepository> DailyCommand<'a, C> {
    /// 新しい`DailyCommand`を返す。
    ///
    /// # Arguments
    /// * `clockify` - Clockify APIと通信するためのリポジトリ
    /// * `directory` - チェック対象のユーザー一覧
    /// * `settings` - 閾値、祝日、バッチの設定
    pub fn new(clockify: &'a C, directory: &'a UserDirectory, settings: &'a Settings) -> Self {
        Self {
            clockify,
            directory,
            settings,
        }
    }

    /// `daily`サブコマンドの処理を行う。
    ///
    /// 日付が指定されていない場合は、設定したタイムゾーンでの今日より前の直近の稼働日を対象にする。
    /// 日次チェックが有効なユーザーごとにtime entryを取得して解析する。
    /// 取得に失敗したユーザーはエラーとして結果に含め、処理全体は止めない。
    pub async fn run(&self, args: &DailyArgs) -> Result<DailyReport> {
        let tz = &self.settings.analyzer.timezone;
        let date = match args.date {
            Some(date) => date,
            None => previous_working_day(datetime::today(tz), &self.settings.holidays)
                .context("Failed to find the previous working day")?,
        };
        let start_at = start_of_day(date, tz);
        let end_at = end_of_day(date, tz);
        info!("Checking {}: Start at: {}, End at: {}", date, start_at, end_at);

        let workspace_id = self
            .clockify
            .default_workspace_id()
            .await
            .context("Failed to retrieve workspace")?;
        let users = self.directory.enabled_users();
        info!("Checking {} users", users.len());

        let reports = run_in_batches(&users, &self.settings.batch, |user| {
            self.check_user(&workspace_id, user, date, &start_at, &end_at)
        })
        .await;

        Ok(DailyReport {
            date,
            start_at,
            end_at,
            users: reports,
        })
    }

    async fn check_user(
        &self,
        workspace_id: &str,
        user: &User,
        date: NaiveDate,
        start_at: &DateTime<Utc>,
        end_at: &DateTime<Utc>,
    ) -> UserDailyReport {
        let config = self.settings.analyzer.for_user(user);
        match self
            .clockify
            .read_time_entries(workspace_id, &user.id, start_at, end_at)
            .await
        {
            Ok(entries) => {
                let analysis = DailyAnalyzer::new(config).analyze(&entries, date);
                info!(
                    "{}: {:.2}h, {} anomalies",
                    user.name,
                    analysis.total_hours,
                    analysis.anomalies().len()
                );
                UserDailyReport::analyzed(user, analysis, entries)
            }
            Err(err) => {
                warn!("Failed to check {}: {:#}", user.name, err);
                UserDailyReport::failed(user, format!("{:#}", err), config.required_hours)
            }
        }
    }
}

/// 日付をパースする。
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("Failed to parse date: {}", s))
}
