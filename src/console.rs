use std::io::Write;

use anyhow::{Context, Result};

use crate::formatter::{describe_anomaly, long_date};
use crate::report::{DailyReport, MonthlyReport};

/// Consoleにレポートを表示するためのtrait。
pub trait ConsolePresenter {
    /// 日次チェックの結果を表示する。
    ///
    /// # Arguments
    ///
    /// * `report` - 表示する日次チェックの結果
    fn show_daily_report(&mut self, report: &DailyReport) -> Result<()>;

    /// 月次レポートを表示する。
    fn show_monthly_report(&mut self, report: &MonthlyReport) -> Result<()>;
}

/// レポートをMarkdownのlist形式で表示する。
pub struct ConsoleMarkdownList<'a, W: Write> {
    writer: &'a mut W,
}

impl<'a, W: Write> ConsoleMarkdownList<'a, W> {
    /// 新しい`ConsoleMarkdownList`を返す。
    pub fn new(writer: &'a mut W) -> Self {
        Self { writer }
    }
}

impl<'a, W: Write> ConsolePresenter for ConsoleMarkdownList<'a, W> {
    // ユーザーごとに合計時間と異常をlist形式で表示する。
    fn show_daily_report(&mut self, report: &DailyReport) -> Result<()> {
        writeln!(self.writer, "## {}", long_date(report.date)).context("Failed to write header")?;

        for user in &report.users {
            let status = match (&user.error, user.analysis.is_missing) {
                (Some(error), _) => format!("error: {}", error),
                (None, true) => "missing".to_string(),
                (None, false) => format!("{:.1}h", user.analysis.total_hours),
            };
            writeln!(self.writer, "- {}: {}", user.user, status)
                .with_context(|| format!("Failed to write report for {}", user.user))?;
            for anomaly in user.analysis.anomalies() {
                writeln!(self.writer, "  {}", describe_anomaly(&user.user, anomaly))
                    .with_context(|| format!("Failed to write anomaly: {:?}", anomaly))?;
            }
        }

        Ok(())
    }

    fn show_monthly_report(&mut self, report: &MonthlyReport) -> Result<()> {
        writeln!(
            self.writer,
            "## {} ({} working days, {:.1}h expected)",
            report.report_date.format("%B %Y"),
            report.working_days,
            report.expected_hours
        )
        .context("Failed to write header")?;

        for (team_id, team) in &report.teams.teams {
            writeln!(self.writer, "- {} ({}): {:.1}h", team.name, team_id, team.total_hours)
                .with_context(|| format!("Failed to write team: {}", team_id))?;
            for member in &team.members {
                writeln!(self.writer, "  - {}: {:.1}h", member.name, member.hours)
                    .with_context(|| format!("Failed to write member: {}", member.name))?;
            }
        }
        for user in report.users.iter().filter(|user| user.error.is_some()) {
            writeln!(
                self.writer,
                "- {}: error: {}",
                user.analysis.user_name,
                user.error.as_deref().unwrap_or_default()
            )
            .context("Failed to write error")?;
        }
        writeln!(self.writer, "- Total: {:.1}h", report.teams.grand_total)
            .context("Failed to write total")?;

        Ok(())
    }
}
