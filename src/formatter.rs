//! Slackに投稿するメッセージのブロックを組み立てる。
//!
//! 時間は解析結果で小数点以下2桁に丸めた値を、表示時に1桁で出力する。

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use serde_json::{json, Value};

use crate::daily_analyzer::Anomaly;
use crate::directory::Team;
use crate::report::{DailyReport, MonthlyReport, UserDailyReport};

pub const DAILY_FALLBACK_TEXT: &str = "Time Entry Summary Report";
pub const MONTHLY_FALLBACK_TEXT: &str = "Monthly Time Entry Summary";
const DEFAULT_TEAM_EMOJI: &str = "📌";

pub fn header_block(text: &str) -> Value {
    json!({
        "type": "header",
        "text": {"type": "plain_text", "text": text, "emoji": true}
    })
}

pub fn section_block(text: &str) -> Value {
    json!({
        "type": "section",
        "text": {"type": "mrkdwn", "text": text}
    })
}

pub fn divider_block() -> Value {
    json!({"type": "divider"})
}

pub fn context_block(text: &str) -> Value {
    json!({
        "type": "context",
        "elements": [{"type": "mrkdwn", "text": text}]
    })
}

/// 日付を`Saturday, March 15, 2025`の形式で表示する。
pub fn long_date(date: NaiveDate) -> String {
    date.format("%A, %B %-d, %Y").to_string()
}

fn footer(generated_at: &DateTime<Tz>) -> Value {
    context_block(&format!(
        "⏰ Report generated at {}",
        generated_at.format("%H:%M %Z")
    ))
}

/// 1件の異常を1行の説明にする。
pub fn describe_anomaly(user: &str, anomaly: &Anomaly) -> String {
    match anomaly {
        Anomaly::LongDuration { duration_hours, .. } => format!(
            "• {} - Long duration entry detected ({:.1} hours)",
            user, duration_hours
        ),
        Anomaly::LargeGap {
            gap_start_time,
            gap_end_time,
            ..
        } => format!(
            "• {} - Large gap detected between entries ({} to {})",
            user, gap_start_time, gap_end_time
        ),
        Anomaly::Overlap {
            overlap_start,
            overlap_end,
            ..
        } => format!(
            "• {} - Overlapping entries detected ({} to {})",
            user, overlap_start, overlap_end
        ),
        Anomaly::InsufficientHours {
            total_hours,
            missing_hours,
        } => format!(
            "• {} - Insufficient hours logged ({:.1} hours, {:.1} missing)",
            user, total_hours, missing_hours
        ),
    }
}

fn describe_missing(report: &UserDailyReport) -> String {
    match report.error {
        Some(_) => format!("• {} (check failed)", report.user),
        None => format!("• {}", report.user),
    }
}

/// 日次チェックの結果をまとめたブロック。
pub fn daily_summary_blocks(report: &DailyReport, generated_at: &DateTime<Tz>) -> Vec<Value> {
    let mut blocks = vec![header_block(&format!(
        "Time Entry Summary for {}",
        long_date(report.date)
    ))];

    let missing: Vec<_> = report
        .users
        .iter()
        .filter(|user| user.analysis.is_missing)
        .collect();
    if !missing.is_empty() {
        blocks.push(section_block("🔔 *Missing Time Entries*"));
        blocks.extend(missing.iter().map(|user| section_block(&describe_missing(user))));
    }

    let suspicious: Vec<String> = report
        .users
        .iter()
        .flat_map(|user| {
            user.analysis
                .anomalies()
                .iter()
                .map(move |anomaly| describe_anomaly(&user.user, anomaly))
        })
        .collect();
    if !suspicious.is_empty() {
        blocks.push(section_block("⚠️ *Suspicious Entries*"));
        blocks.extend(suspicious.iter().map(|line| section_block(line)));
    }

    if missing.is_empty() && suspicious.is_empty() {
        blocks.push(section_block("✅ No issues found."));
    }

    blocks.push(divider_block());
    blocks.push(footer(generated_at));

    blocks
}

/// 月次レポートのブロック。
///
/// メンバーのいないチームは表示しない。メンバーは時間の多い順に並べる。
/// 取得に失敗したメンバーは時間の代わりに`(check failed)`と表示する。
pub fn monthly_report_blocks(
    report: &MonthlyReport,
    teams: &BTreeMap<String, Team>,
    generated_at: &DateTime<Tz>,
) -> Vec<Value> {
    let mut blocks = vec![
        header_block(&format!(
            "📊 Time Entry Summary for {}",
            report.report_date.format("%B %Y")
        )),
        section_block(&format!("⏳ Expected Hours: {:.1}", report.expected_hours)),
        divider_block(),
    ];
    let failed: HashSet<&str> = report
        .users
        .iter()
        .filter(|user| user.error.is_some())
        .map(|user| user.analysis.user_name.as_str())
        .collect();

    for (team_id, team) in &report.teams.teams {
        if team.members.is_empty() {
            continue;
        }
        let emoji = teams
            .get(team_id)
            .and_then(|team| team.emoji.as_deref())
            .unwrap_or(DEFAULT_TEAM_EMOJI);
        blocks.push(section_block(&format!(
            "{} *{}* ({:.1} hours)",
            emoji, team.name, team.total_hours
        )));

        let mut members = team.members.clone();
        members.sort_by(|a, b| b.hours.total_cmp(&a.hours));
        let lines: Vec<String> = members
            .iter()
            .map(|member| {
                if failed.contains(member.name.as_str()) {
                    format!("• {} (check failed)", member.name)
                } else {
                    format!("• {} ({:.1} hours)", member.name, member.hours)
                }
            })
            .collect();
        blocks.push(section_block(&lines.join("\n")));
        blocks.push(divider_block());
    }

    blocks.push(section_block(&format!(
        "💫 *Total Hours: {:.1}*",
        report.teams.grand_total
    )));
    blocks.push(footer(generated_at));

    blocks
}
