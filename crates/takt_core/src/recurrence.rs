use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::keys::weekday_index;

/// Repeat rule for a reminder. Each variant carries only the fields that
/// apply to it, so switching the rule of an edited reminder cannot leave
/// stale parameters behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Recurrence {
    None,
    Daily,
    /// Weekday indices, 0 = Sunday through 6 = Saturday. Never empty.
    Weekly { days: BTreeSet<u8> },
    /// 1-31. Months without that day are skipped, never clamped.
    Monthly { day_of_month: u8 },
    /// Month index 0 = January through 11 = December, day 1-31.
    Yearly { month_of_year: u8, day_of_month: u8 },
}

impl Recurrence {
    pub fn is_recurring(&self) -> bool {
        !matches!(self, Recurrence::None)
    }

    pub fn validate(&self) -> Result<(), Error> {
        match self {
            Recurrence::None | Recurrence::Daily => Ok(()),
            Recurrence::Weekly { days } => validate_weekdays(days),
            Recurrence::Monthly { day_of_month } => validate_day_of_month(*day_of_month),
            Recurrence::Yearly {
                month_of_year,
                day_of_month,
            } => {
                if *month_of_year > 11 {
                    return Err(Error::InvalidMonth(*month_of_year));
                }
                validate_day_of_month(*day_of_month)
            }
        }
    }

    /// Decides whether `candidate` is an occurrence of this rule anchored at
    /// `anchor`. Dates before the anchor never match; the anchor date itself
    /// matches only the `None` rule, since the anchor day already shows the
    /// original entity.
    pub fn occurs_on(&self, anchor: NaiveDate, candidate: NaiveDate) -> bool {
        if candidate < anchor {
            return false;
        }
        if candidate == anchor {
            return matches!(self, Recurrence::None);
        }
        match self {
            Recurrence::None => false,
            Recurrence::Daily => true,
            Recurrence::Weekly { days } => days.contains(&weekday_index(candidate)),
            Recurrence::Monthly { day_of_month } => candidate.day() == u32::from(*day_of_month),
            Recurrence::Yearly {
                month_of_year,
                day_of_month,
            } => {
                candidate.month0() == u32::from(*month_of_year)
                    && candidate.day() == u32::from(*day_of_month)
            }
        }
    }
}

/// Repeat rule for a recurring checklist item. These items have no anchor
/// date and no one-off variant: they recur indefinitely from inception, so
/// the conditions are evaluated structurally against the candidate date
/// alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemRecurrence {
    Daily,
    Weekly { days: BTreeSet<u8> },
    Monthly { day_of_month: u8 },
    Yearly { month_of_year: u8, day_of_month: u8 },
}

impl ItemRecurrence {
    pub fn validate(&self) -> Result<(), Error> {
        match self {
            ItemRecurrence::Daily => Ok(()),
            ItemRecurrence::Weekly { days } => validate_weekdays(days),
            ItemRecurrence::Monthly { day_of_month } => validate_day_of_month(*day_of_month),
            ItemRecurrence::Yearly {
                month_of_year,
                day_of_month,
            } => {
                if *month_of_year > 11 {
                    return Err(Error::InvalidMonth(*month_of_year));
                }
                validate_day_of_month(*day_of_month)
            }
        }
    }

    pub fn is_due_on(&self, date: NaiveDate) -> bool {
        match self {
            ItemRecurrence::Daily => true,
            ItemRecurrence::Weekly { days } => days.contains(&weekday_index(date)),
            ItemRecurrence::Monthly { day_of_month } => date.day() == u32::from(*day_of_month),
            ItemRecurrence::Yearly {
                month_of_year,
                day_of_month,
            } => {
                date.month0() == u32::from(*month_of_year)
                    && date.day() == u32::from(*day_of_month)
            }
        }
    }
}

fn validate_weekdays(days: &BTreeSet<u8>) -> Result<(), Error> {
    if days.is_empty() {
        return Err(Error::EmptyWeeklyRule);
    }
    if let Some(bad) = days.iter().find(|day| **day > 6) {
        return Err(Error::InvalidDayOfWeek(*bad));
    }
    Ok(())
}

fn validate_day_of_month(day: u8) -> Result<(), Error> {
    if (1..=31).contains(&day) {
        Ok(())
    } else {
        Err(Error::InvalidDayOfMonth(day))
    }
}
