use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::AnalyzerConfig;
use crate::duration::{clip_to_day, clock_time, hours_between, round_hours};
use crate::sorter::{sort_by_start, TimedEntry};
use crate::time_entry::{Interval, TimeEntry};

/// 1日のtime entryから検出した異常。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Anomaly {
    /// 1件のtime entryが長すぎる。
    LongDuration {
        entry: TimeEntry,
        duration_hours: f64,
        start_time: String,
        end_time: String,
    },
    /// 連続するtime entryの間が空きすぎている。
    LargeGap {
        before: TimeEntry,
        after: TimeEntry,
        gap_hours: f64,
        gap_start_time: String,
        gap_end_time: String,
    },
    /// 連続するtime entryが重なっている。
    Overlap {
        before: TimeEntry,
        after: TimeEntry,
        overlap_start: String,
        overlap_end: String,
    },
    /// 記録はあるが必要な時間数に足りない。
    InsufficientHours { total_hours: f64, missing_hours: f64 },
}

/// 1ユーザー・1日分の解析結果。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailyAnalysisResult {
    pub total_hours: f64,
    pub is_missing: bool,
    pub missing_hours: f64,
    pub anomalies: Option<Vec<Anomaly>>,
}

impl DailyAnalysisResult {
    /// 何も記録されていない日の結果。
    pub fn missing(required_hours: f64) -> Self {
        Self {
            total_hours: 0.0,
            is_missing: true,
            missing_hours: required_hours,
            anomalies: None,
        }
    }

    pub fn anomalies(&self) -> &[Anomaly] {
        self.anomalies.as_deref().unwrap_or_default()
    }
}

/// 1日分のtime entryを解析する。
#[derive(Clone, Debug, Default)]
pub struct DailyAnalyzer {
    config: AnalyzerConfig,
}

impl DailyAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    /// `reference_date`の1日分としてtime entryを解析する。
    ///
    /// 合計時間は既定ではtime entryの長さをそのまま足し合わせる。
    /// `clip_to_day`が有効な場合は対象日の範囲に収まる部分だけを足す。
    /// 長さ・空き時間・重なりの判定は常に切り詰める前の時刻で行う。
    pub fn analyze(&self, entries: &[TimeEntry], reference_date: NaiveDate) -> DailyAnalysisResult {
        let required_hours = self.config.required_hours;
        if entries.is_empty() {
            return DailyAnalysisResult::missing(required_hours);
        }

        let sorted = sort_by_start(entries);
        debug!(
            "Analyzing {} entries for {} ({} malformed)",
            entries.len(),
            reference_date,
            sorted.malformed.len()
        );

        let mut total_hours = 0.0;
        let mut anomalies = Vec::new();
        let mut previous: Option<&TimedEntry> = None;
        for (index, current) in sorted.valid.iter().enumerate() {
            let duration = current.interval.hours();
            total_hours += if self.config.clip_to_day {
                self.hours_within(&current.interval, reference_date)
            } else {
                duration
            };
            debug!(
                "Entry {}: {} ~ {} ({:.2}h, running total {:.2}h)",
                index + 1,
                current.interval.start,
                current.interval.end,
                duration,
                total_hours
            );

            if duration > self.config.suspicious_duration_hours {
                anomalies.push(Anomaly::LongDuration {
                    entry: current.entry.clone(),
                    duration_hours: duration,
                    start_time: self.clock(&current.interval.start),
                    end_time: self.clock(&current.interval.end),
                });
            }

            if let Some(before) = previous {
                anomalies.extend(self.compare_adjacent(before, current));
            }
            previous = Some(current);
        }

        let total_hours = round_hours(total_hours);
        if total_hours > 0.0 && total_hours < required_hours {
            anomalies.push(Anomaly::InsufficientHours {
                total_hours,
                missing_hours: round_hours(required_hours - total_hours),
            });
        }

        DailyAnalysisResult {
            total_hours,
            is_missing: total_hours == 0.0,
            missing_hours: round_hours((required_hours - total_hours).max(0.0)),
            anomalies: if anomalies.is_empty() {
                None
            } else {
                Some(anomalies)
            },
        }
    }

    // 開始時刻順で隣り合う2件の間の空き時間と重なりを調べる。
    fn compare_adjacent(&self, before: &TimedEntry, after: &TimedEntry) -> Vec<Anomaly> {
        let mut anomalies = Vec::new();
        let gap_hours = hours_between(&before.interval.end, &after.interval.start);
        if gap_hours > self.config.suspicious_gap_hours {
            anomalies.push(Anomaly::LargeGap {
                before: before.entry.clone(),
                after: after.entry.clone(),
                gap_hours,
                gap_start_time: self.clock(&before.interval.end),
                gap_end_time: self.clock(&after.interval.start),
            });
        }
        if self.config.detect_overlaps && after.interval.start < before.interval.end {
            anomalies.push(Anomaly::Overlap {
                before: before.entry.clone(),
                after: after.entry.clone(),
                overlap_start: self.clock(&after.interval.start),
                overlap_end: self.clock(&before.interval.end),
            });
        }

        anomalies
    }

    fn hours_within(&self, interval: &Interval, date: NaiveDate) -> f64 {
        let tz = &self.config.timezone;
        let start = clip_to_day(interval.start, date, tz);
        let end = clip_to_day(interval.end, date, tz);
        hours_between(&start, &end).max(0.0)
    }

    fn clock(&self, instant: &chrono::DateTime<chrono::Utc>) -> String {
        clock_time(instant, &self.config.timezone)
    }
}
