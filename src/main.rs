use std::io;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use time_warden::clockify::ClockifyClient;
use time_warden::config::Settings;
use time_warden::console::{ConsoleMarkdownList, ConsolePresenter};
use time_warden::daily_command::{DailyArgs, DailyCommand};
use time_warden::datetime;
use time_warden::directory::UserDirectory;
use time_warden::logger;
use time_warden::monthly_command::{MonthlyArgs, MonthlyCommand};
use time_warden::slack::{notify_daily, notify_monthly, SlackClient};

/// Clockifyのtime entryをチェックし、結果をSlackに投稿するためのCLIアプリケーション。
///
/// # Examples
/// ```
/// $ cargo run -- daily
/// $ cargo run -- daily --date 2025-03-14 --dry-run
/// $ cargo run -- monthly
/// ```
#[derive(Debug, Parser)]
#[clap(version, about)]
struct Args {
    #[clap(subcommand)]
    subcommand: SubCommands,

    #[clap(short = 'v', long = "verbose", global = true, help = "Enables debug logging")]
    verbose: bool,
}

/// サブコマンドを表す列挙型。
#[derive(Debug, Subcommand)]
enum SubCommands {
    /// 前の稼働日の記録漏れと不審な記録をチェックする
    Daily(DailyArgs),
    /// 今月のユーザーごと、チームごとの合計時間を集計する
    Monthly(MonthlyArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logger::init(args.verbose)?;

    let settings = Settings::from_env().context("Failed to load settings")?;
    let directory = UserDirectory::load(&settings.users).context("Failed to load users")?;
    let clockify = ClockifyClient::new(&settings.clockify_api_key);
    let tz = settings.analyzer.timezone;

    match args.subcommand {
        SubCommands::Daily(daily) => {
            let report = DailyCommand::new(&clockify, &directory, &settings)
                .run(&daily)
                .await
                .context("Failed to run daily check")?;
            if daily.dry_run {
                ConsoleMarkdownList::new(&mut io::stdout()).show_daily_report(&report)?;
            } else {
                let slack = SlackClient::new(
                    settings
                        .slack
                        .as_ref()
                        .context("SLACK_BOT_TOKEN and SLACK_CHANNEL_ID must be set")?,
                );
                notify_daily(&slack, &report, &datetime::now_in(&tz)).await?;
            }
        }
        SubCommands::Monthly(monthly) => {
            let report = MonthlyCommand::new(&clockify, &directory, &settings)
                .run(&monthly)
                .await
                .context("Failed to run monthly report")?;
            if monthly.dry_run {
                ConsoleMarkdownList::new(&mut io::stdout()).show_monthly_report(&report)?;
            } else {
                let slack = SlackClient::new(
                    settings
                        .slack
                        .as_ref()
                        .context("SLACK_BOT_TOKEN and SLACK_CHANNEL_ID must be set")?,
                );
                notify_monthly(&slack, &report, directory.teams(), &datetime::now_in(&tz)).await?;
            }
        }
    }
    info!("Done.");

    Ok(())
}
