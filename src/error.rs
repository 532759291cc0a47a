use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

/// 集計に利用できないtime entryの理由。
///
/// 解析は失敗させず、該当entryの寄与を0として扱うために使う。
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedEntry {
    #[error("unparsable start timestamp: {0:?}")]
    UnparsableStart(String),

    #[error("unparsable end timestamp: {0:?}")]
    UnparsableEnd(String),

    #[error("entry ends before it starts ({start} > {end})")]
    Reversed {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// 稼働日の探索に失敗した時のエラー。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalendarError {
    /// 祝日リストの設定ミスなどで遡っても稼働日が見つからない。
    #[error("no working day found within {lookback} days before {from}")]
    LookbackExceeded { from: NaiveDate, lookback: u32 },

    #[error("date out of range while searching before {0}")]
    OutOfRange(NaiveDate),
}
