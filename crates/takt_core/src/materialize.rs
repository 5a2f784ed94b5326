use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::keys;
use crate::state::PlannerState;

const RECURRING_SEPARATOR: &str = "::recurring::";

/// Identity of an instance shown for a date. The stored original keeps its
/// own id; a projection of a recurring source onto a later date is named by
/// the pair (source id, occurrence date). The rendered form of a recurring
/// id is transport-only and is never a day-record lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InstanceId {
    Original { id: String },
    Recurring { source_id: String, occurrence: NaiveDate },
}

impl InstanceId {
    pub fn render(&self) -> String {
        match self {
            InstanceId::Original { id } => id.clone(),
            InstanceId::Recurring {
                source_id,
                occurrence,
            } => format!(
                "{source_id}{RECURRING_SEPARATOR}{}",
                keys::date_key(*occurrence)
            ),
        }
    }

    /// Inverse of [`render`](Self::render). A suffix that does not parse as
    /// a date key leaves the whole string an original id.
    pub fn parse(raw: &str) -> Self {
        if let Some((source, tail)) = raw.split_once(RECURRING_SEPARATOR) {
            if let Some(occurrence) = keys::parse_date_key(tail) {
                return InstanceId::Recurring {
                    source_id: source.to_string(),
                    occurrence,
                };
            }
        }
        InstanceId::Original {
            id: raw.to_string(),
        }
    }
}

/// A reminder as seen on one specific date. Computed fresh on every query,
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderInstance {
    pub id: InstanceId,
    pub text: String,
    pub time: NaiveTime,
    /// The day record that owns the source reminder.
    pub origin: NaiveDate,
    pub recurring: bool,
    pub done: bool,
}

/// Every reminder visible on `date`: the date's own reminders verbatim,
/// then each recurring source from other days whose rule puts an occurrence
/// here. Ordered by time of day, insertion order on ties.
pub fn reminders_on(state: &PlannerState, date: NaiveDate) -> Vec<ReminderInstance> {
    let mut instances = Vec::new();

    if let Some(day) = state.days.get(&date) {
        for reminder in &day.reminders {
            instances.push(ReminderInstance {
                id: InstanceId::Original {
                    id: reminder.id.clone(),
                },
                text: reminder.text.clone(),
                time: reminder.time,
                origin: date,
                recurring: false,
                done: reminder.done_on(date),
            });
        }
    }

    for (anchor, day) in &state.days {
        if *anchor == date {
            continue;
        }
        for reminder in &day.reminders {
            if reminder.recurrence.occurs_on(*anchor, date) {
                instances.push(ReminderInstance {
                    id: InstanceId::Recurring {
                        source_id: reminder.id.clone(),
                        occurrence: date,
                    },
                    text: reminder.text.clone(),
                    time: reminder.time,
                    origin: *anchor,
                    recurring: true,
                    done: reminder.done_on(date),
                });
            }
        }
    }

    instances.sort_by_key(|instance| instance.time);
    instances
}

/// A checklist entry as seen on one date, unifying day-owned items and
/// recurring items due that day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistEntry {
    pub id: String,
    pub text: String,
    pub done: bool,
    pub recurring: bool,
}

/// Recurring items due on `date` (completion read from the day's record),
/// followed by the day's own items.
pub fn checklist_on(state: &PlannerState, date: NaiveDate) -> Vec<ChecklistEntry> {
    let day = state.days.get(&date);
    let mut entries = Vec::new();

    for item in &state.recurring {
        if item.recurrence.is_due_on(date) {
            let done = day.is_some_and(|record| record.done_recurring.contains(&item.id));
            entries.push(ChecklistEntry {
                id: item.id.clone(),
                text: item.text.clone(),
                done,
                recurring: true,
            });
        }
    }

    if let Some(record) = day {
        for item in &record.checklist {
            entries.push(ChecklistEntry {
                id: item.id.clone(),
                text: item.text.clone(),
                done: item.done,
                recurring: false,
            });
        }
    }

    entries
}

// Queries scan every stored day, so cost grows with the number of dated
// records. Fine at personal-planner scale; an index by recurrence kind
// would be the first lever if that assumption breaks.
