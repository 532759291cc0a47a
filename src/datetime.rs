use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

#[cfg(not(test))]
/// 現在のUTC時間を取得する。
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// 指定タイムゾーンでの現在時刻。レポートのフッターに使う。
pub fn now_in(tz: &Tz) -> DateTime<Tz> {
    now().with_timezone(tz)
}

/// 指定タイムゾーンでの今日の日付。
pub fn today(tz: &Tz) -> NaiveDate {
    now_in(tz).date_naive()
}


#[cfg(test)]
pub use mock_datetime::now;
