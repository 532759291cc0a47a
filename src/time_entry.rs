use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::duration::hours_between;
use crate::error::MalformedEntry;

/// 解析対象となる1件のタイムエントリー。
///
/// 時刻はAPIから受け取ったRFC 3339の文字列のまま保持し、解析時にパースする。
/// 実行中のタイマーは`end`が空文字になる。
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeEntry {
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub task: String,
}

/// パース済みの開始・終了時刻。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    /// 開始から終了までの時間数。
    pub fn hours(&self) -> f64 {
        hours_between(&self.start, &self.end)
    }
}

impl TimeEntry {
    /// 開始・終了時刻から新しい`TimeEntry`を返す。
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: start.to_rfc3339_opts(SecondsFormat::Secs, true),
            end: end.to_rfc3339_opts(SecondsFormat::Secs, true),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// 開始・終了時刻をパースする。
    ///
    /// どちらかがパースできない場合や、終了が開始より前の場合は`MalformedEntry`を返す。
    pub fn interval(&self) -> Result<Interval, MalformedEntry> {
        let start = DateTime::parse_from_rfc3339(self.start.trim())
            .map_err(|_| MalformedEntry::UnparsableStart(self.start.clone()))?
            .to_utc();
        let end = DateTime::parse_from_rfc3339(self.end.trim())
            .map_err(|_| MalformedEntry::UnparsableEnd(self.end.clone()))?
            .to_utc();
        if end < start {
            return Err(MalformedEntry::Reversed { start, end });
        }

        Ok(Interval { start, end })
    }
}
