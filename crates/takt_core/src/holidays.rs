use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    pub name: String,
    pub date: NaiveDate,
}

impl Holiday {
    fn new(name: &str, date: NaiveDate) -> Self {
        Self {
            name: name.to_string(),
            date,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HolidaySource {
    /// Remote feed merged with the computed set.
    Merged,
    /// Remote fetch failed; only the computed set is shown. Callers surface
    /// this as a warning to the user.
    LocalOnly,
}

/// Holidays for one year, indexed by date. Built once per displayed year
/// and cached by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayCalendar {
    pub year: i32,
    pub by_date: BTreeMap<NaiveDate, Vec<Holiday>>,
    pub source: HolidaySource,
}

impl HolidayCalendar {
    /// Merges the remote feed (if any) with the computed set. Remote entries
    /// win: a computed holiday is added only when no entry with the identical
    /// name already sits on that date. Two differently-named holidays may
    /// share a date.
    pub fn build(year: i32, remote: Option<Vec<Holiday>>) -> Self {
        let mut by_date: BTreeMap<NaiveDate, Vec<Holiday>> = BTreeMap::new();
        let source = match remote {
            Some(feed) => {
                for holiday in feed {
                    by_date.entry(holiday.date).or_default().push(holiday);
                }
                HolidaySource::Merged
            }
            None => HolidaySource::LocalOnly,
        };
        for holiday in computed_holidays(year) {
            let slot = by_date.entry(holiday.date).or_default();
            if !slot.iter().any(|existing| existing.name == holiday.name) {
                slot.push(holiday);
            }
        }
        Self {
            year,
            by_date,
            source,
        }
    }

    pub fn on(&self, date: NaiveDate) -> &[Holiday] {
        self.by_date.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Easter Sunday by the anonymous Gregorian computus: pure modulo
/// arithmetic on the year, including the century and leap corrections.
pub fn easter(year: i32) -> NaiveDate {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32).expect("computus yields a valid date")
}

/// The computed observance set: fixed dates, nth-weekday and last-weekday
/// rules, and the two Easter-relative days.
pub fn computed_holidays(year: i32) -> Vec<Holiday> {
    let fixed = |month: u32, day: u32| {
        NaiveDate::from_ymd_opt(year, month, day).expect("fixed holiday date is valid")
    };
    let easter_sunday = easter(year);
    let good_friday = easter_sunday - Duration::days(2);
    let thanksgiving = nth_weekday(year, 11, Weekday::Thu, 4);
    let black_friday = thanksgiving + Duration::days(1);

    vec![
        Holiday::new(
            "Martin Luther King, Jr. Day",
            nth_weekday(year, 1, Weekday::Mon, 3),
        ),
        Holiday::new("Groundhog Day", fixed(2, 2)),
        Holiday::new("Valentine's Day", fixed(2, 14)),
        Holiday::new("Presidents Day", nth_weekday(year, 2, Weekday::Mon, 3)),
        Holiday::new("St. Patrick's Day", fixed(3, 17)),
        Holiday::new("April Fools' Day", fixed(4, 1)),
        Holiday::new("Good Friday", good_friday),
        Holiday::new("Easter Sunday", easter_sunday),
        Holiday::new("Earth Day", fixed(4, 22)),
        Holiday::new("Cinco de Mayo", fixed(5, 5)),
        Holiday::new("Mother's Day", nth_weekday(year, 5, Weekday::Sun, 2)),
        Holiday::new("Memorial Day", last_weekday(year, 5, Weekday::Mon)),
        Holiday::new("Flag Day", fixed(6, 14)),
        Holiday::new("Father's Day", nth_weekday(year, 6, Weekday::Sun, 3)),
        Holiday::new("Labor Day", nth_weekday(year, 9, Weekday::Mon, 1)),
        Holiday::new("Patriot Day", fixed(9, 11)),
        Holiday::new(
            "Indigenous Peoples' Day",
            nth_weekday(year, 10, Weekday::Mon, 2),
        ),
        Holiday::new("Halloween", fixed(10, 31)),
        Holiday::new("Thanksgiving Day", thanksgiving),
        Holiday::new("Black Friday", black_friday),
        Holiday::new("Christmas Eve", fixed(12, 24)),
        Holiday::new("New Year's Eve", fixed(12, 31)),
    ]
}

fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u32) -> NaiveDate {
    let mut date = NaiveDate::from_ymd_opt(year, month, 1).expect("month starts on day 1");
    while date.weekday() != weekday {
        date = date.succ_opt().expect("date within the month");
    }
    date + Duration::days(i64::from((n - 1) * 7))
}

fn last_weekday(year: i32, month: u32, weekday: Weekday) -> NaiveDate {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .expect("month starts on day 1");
    let mut date = first_of_next.pred_opt().expect("month has a last day");
    while date.weekday() != weekday {
        date = date.pred_opt().expect("date within the month");
    }
    date
}
