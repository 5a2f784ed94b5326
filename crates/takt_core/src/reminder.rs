use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::recurrence::Recurrence;

/// How completion is recorded. One-off reminders carry a single flag;
/// recurring reminders record each completed occurrence by its date, so the
/// same reminder can be done on Tuesday and still open on Wednesday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Completion {
    Single { done: bool },
    PerDay { dates: BTreeSet<NaiveDate> },
}

/// A reminder stored once at its origin date. Recurring reminders are
/// projected onto later dates at read time and never duplicated in storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: String,
    pub text: String,
    pub time: NaiveTime,
    pub recurrence: Recurrence,
    pub completion: Completion,
}

impl Reminder {
    /// Builds a reminder, pairing the completion representation with the
    /// rule: `Single` for one-off reminders, `PerDay` for recurring ones.
    pub fn new(
        id: String,
        text: String,
        time: NaiveTime,
        recurrence: Recurrence,
    ) -> Result<Self, Error> {
        recurrence.validate()?;
        let completion = if recurrence.is_recurring() {
            Completion::PerDay {
                dates: BTreeSet::new(),
            }
        } else {
            Completion::Single { done: false }
        };
        Ok(Self {
            id,
            text,
            time,
            recurrence,
            completion,
        })
    }

    pub fn done_on(&self, date: NaiveDate) -> bool {
        match &self.completion {
            Completion::Single { done } => *done,
            Completion::PerDay { dates } => dates.contains(&date),
        }
    }

    /// Toggles completion as observed on `date`: the single flag for one-off
    /// reminders, membership of `date` in the completed set otherwise.
    pub fn toggle_on(&mut self, date: NaiveDate) {
        match &mut self.completion {
            Completion::Single { done } => *done = !*done,
            Completion::PerDay { dates } => {
                if !dates.remove(&date) {
                    dates.insert(date);
                }
            }
        }
    }
}
