use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// `start`から`end`までの時間数を返す。
///
/// `end`が`start`より前の場合は負の値になる。
pub fn hours_between(start: &DateTime<Utc>, end: &DateTime<Utc>) -> f64 {
    (*end - *start).num_milliseconds() as f64 / MILLIS_PER_HOUR
}

/// 時間数を小数点以下2桁に丸める。
pub fn round_hours(hours: f64) -> f64 {
    (hours * 100.0).round() / 100.0
}

/// 指定タイムゾーンでの`date`の00:00。
pub fn start_of_day(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    local_to_utc(date.and_time(NaiveTime::MIN), tz)
}

/// 指定タイムゾーンでの`date`の終わり。翌日の00:00を返す。
pub fn end_of_day(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    date.succ_opt()
        .map(|next| start_of_day(next, tz))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// `instant`を`date`の1日の範囲に収める。
pub fn clip_to_day(instant: DateTime<Utc>, date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    instant.clamp(start_of_day(date, tz), end_of_day(date, tz))
}

/// 指定タイムゾーンでの暦日。
pub fn civil_date(instant: &DateTime<Utc>, tz: &Tz) -> NaiveDate {
    instant.with_timezone(tz).date_naive()
}

/// 指定タイムゾーンでの`HH:MM`表記。
pub fn clock_time(instant: &DateTime<Utc>, tz: &Tz) -> String {
    instant.with_timezone(tz).format("%H:%M").to_string()
}

// 夏時間の切り替えで00:00が存在しない日は、存在する直後の時刻に寄せる。
fn local_to_utc(naive: NaiveDateTime, tz: &Tz) -> DateTime<Utc> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(datetime) => datetime.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .map(|datetime| datetime.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&naive)),
    }
}
