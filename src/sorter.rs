use log::warn;

use crate::error::MalformedEntry;
use crate::time_entry::{Interval, TimeEntry};

/// 時刻のパースに成功したtime entry。
#[derive(Clone, Debug)]
pub struct TimedEntry<'a> {
    pub entry: &'a TimeEntry,
    pub interval: Interval,
}

/// 開始時刻順に並べたtime entryと、並べられなかったtime entry。
#[derive(Debug, Default)]
pub struct SortedEntries<'a> {
    pub valid: Vec<TimedEntry<'a>>,
    pub malformed: Vec<(&'a TimeEntry, MalformedEntry)>,
}

/// time entryを開始時刻の昇順に並べる。
///
/// 開始時刻が同じ場合は元の順序を保つ。
/// 時刻がパースできないtime entryは並べずに`malformed`へ分け、集計への寄与を0とする。
pub fn sort_by_start(entries: &[TimeEntry]) -> SortedEntries<'_> {
    let mut sorted = SortedEntries::default();
    for entry in entries {
        match entry.interval() {
            Ok(interval) => sorted.valid.push(TimedEntry { entry, interval }),
            Err(reason) => {
                warn!("Skipping malformed time entry {:?}: {}", entry.description, reason);
                sorted.malformed.push((entry, reason));
            }
        }
    }
    sorted.valid.sort_by_key(|timed| timed.interval.start);

    sorted
}
