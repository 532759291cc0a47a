use std::collections::HashSet;

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, Weekday};

use crate::error::CalendarError;

/// 前の稼働日を探す時に遡る最大日数。
pub const MAX_LOOKBACK_DAYS: u32 = 10;

/// 祝日の集合。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Holidays(HashSet<NaiveDate>);

impl Holidays {
    /// カンマ区切りの`YYYY-MM-DD`のリストをパースする。
    ///
    /// 空の要素は無視する。
    pub fn parse_list(s: &str) -> Result<Self> {
        s.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| {
                NaiveDate::parse_from_str(item, "%Y-%m-%d")
                    .with_context(|| format!("Failed to parse holiday: {}", item))
            })
            .collect()
    }

    pub fn contains(&self, date: &NaiveDate) -> bool {
        self.0.contains(date)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<NaiveDate> for Holidays {
    fn from_iter<I: IntoIterator<Item = NaiveDate>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// 土日でも祝日でもなければ稼働日とする。
pub fn is_working_day(date: NaiveDate, holidays: &Holidays) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !holidays.contains(&date)
}

/// `date`より前の直近の稼働日を返す。
///
/// 祝日リストの誤設定で無限に遡らないよう、`MAX_LOOKBACK_DAYS`日で打ち切る。
pub fn previous_working_day(
    date: NaiveDate,
    holidays: &Holidays,
) -> Result<NaiveDate, CalendarError> {
    let mut current = date;
    for _ in 0..MAX_LOOKBACK_DAYS {
        current = current.pred_opt().ok_or(CalendarError::OutOfRange(date))?;
        if is_working_day(current, holidays) {
            return Ok(current);
        }
    }

    Err(CalendarError::LookbackExceeded {
        from: date,
        lookback: MAX_LOOKBACK_DAYS,
    })
}

/// `start`から`end`まで(両端を含む)の稼働日数を数える。
pub fn count_working_days(start: NaiveDate, end: NaiveDate, holidays: &Holidays) -> u32 {
    start
        .iter_days()
        .take_while(|date| *date <= end)
        .filter(|date| is_working_day(*date, holidays))
        .count() as u32
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Duration, NaiveDate, Weekday};
    use once_cell::sync::Lazy;
    use rstest::rstest;

    use super::{
        count_working_days, is_working_day, previous_working_day, Holidays, MAX_LOOKBACK_DAYS,
    };
    use crate::error::CalendarError;

    static HOLIDAYS: Lazy<Holidays> =
        Lazy::new(|| Holidays::parse_list("2025-03-14, ,2025-03-31").unwrap());

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(HOLIDAYS.len(), 2);
        assert!(HOLIDAYS.contains(&date("2025-03-14")));
        assert!(Holidays::parse_list("").unwrap().is_empty());
        assert!(Holidays::parse_list("2025-13-01").is_err());
    }

    #[rstest]
    #[case::monday("2025-03-10", true)]
    #[case::friday_holiday("2025-03-14", false)]
    #[case::saturday("2025-03-15", false)]
    #[case::sunday("2025-03-16", false)]
    fn test_is_working_day(#[case] day: &str, #[case] expected: bool) {
        assert_eq!(is_working_day(date(day), &HOLIDAYS), expected);
    }

    /// 土曜日から遡ると、祝日の金曜日を飛ばして木曜日になる。
    #[rstest]
    #[case::from_saturday("2025-03-15", "2025-03-13")]
    #[case::from_sunday("2025-03-16", "2025-03-13")]
    #[case::from_monday("2025-03-17", "2025-03-13")]
    #[case::from_tuesday("2025-03-18", "2025-03-17")]
    fn test_previous_working_day(#[case] from: &str, #[case] expected: &str) {
        let previous = previous_working_day(date(from), &HOLIDAYS).unwrap();

        assert_eq!(previous, date(expected));
        assert!(!matches!(previous.weekday(), Weekday::Sat | Weekday::Sun));
        assert!(!HOLIDAYS.contains(&previous));
    }

    #[test]
    fn test_previous_working_day_lookback_exceeded() {
        let from = date("2025-03-20");
        let holidays: Holidays = (1..=15).map(|n| from - Duration::days(n)).collect();

        let err = previous_working_day(from, &holidays).unwrap_err();

        assert_eq!(
            err,
            CalendarError::LookbackExceeded {
                from,
                lookback: MAX_LOOKBACK_DAYS
            }
        );
    }

    #[rstest]
    #[case::whole_march("2025-03-01", "2025-03-31", 19)]
    #[case::single_day("2025-03-10", "2025-03-10", 1)]
    #[case::weekend_only("2025-03-15", "2025-03-16", 0)]
    #[case::reversed("2025-03-20", "2025-03-10", 0)]
    fn test_count_working_days(#[case] start: &str, #[case] end: &str, #[case] expected: u32) {
        assert_eq!(count_working_days(date(start), date(end), &HOLIDAYS), expected);
    }

    #[test]
    fn test_count_working_days_is_monotonic() {
        let start = date("2025-03-01");
        let mut previous = 0;
        for end in start.iter_days().take(45) {
            let count = count_working_days(start, end, &HOLIDAYS);
            assert!(count >= previous);
            previous = count;
        }
    }
}
