use chrono::{Datelike, Duration, NaiveDate};

/// Canonical `YYYY-MM-DD` key for a calendar date. Every per-day store is
/// indexed by this string.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn parse_date_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key, "%Y-%m-%d").ok()
}

/// The Sunday that starts the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_sunday() as i64)
}

/// Week key: the date key of the week's Sunday.
pub fn week_key(date: NaiveDate) -> String {
    date_key(week_start(date))
}

pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

pub fn year_key(date: NaiveDate) -> String {
    date.format("%Y").to_string()
}

/// Weekday index with Sunday as 0 and Saturday as 6.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}
