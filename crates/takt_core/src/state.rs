use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::checklist::{ChecklistItem, RecurringItem};
use crate::clock::{Alarm, AlarmSchedule, Stopwatch, Timer, TimerControl, TimerStatus};
use crate::error::Error;
use crate::keys;
use crate::materialize::InstanceId;
use crate::notebook::NotebookPage;
use crate::recurrence::{ItemRecurrence, Recurrence};
use crate::reminder::Reminder;

/// Everything attached to a single calendar date. Created lazily on first
/// write; reading an absent date yields the empty default. A reminder lives
/// in exactly one day record, the one for its origin date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayRecord {
    #[serde(default)]
    pub reminders: Vec<Reminder>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub checklist: Vec<ChecklistItem>,
    /// Ids of recurring checklist items completed on this day.
    #[serde(default)]
    pub done_recurring: BTreeSet<String>,
}

/// Checklist and note scoped to a week, month, or year. Indexed purely by
/// the period key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodRecord {
    #[serde(default)]
    pub checklist: Vec<ChecklistItem>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Week,
    Month,
    Year,
}

impl Period {
    pub fn key(self, date: NaiveDate) -> String {
        match self {
            Period::Week => keys::week_key(date),
            Period::Month => keys::month_key(date),
            Period::Year => keys::year_key(date),
        }
    }
}

/// The whole application state: one aggregate passed to and returned from
/// every operation, so state transitions stay deterministic and testable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlannerState {
    #[serde(default)]
    pub days: BTreeMap<NaiveDate, DayRecord>,
    #[serde(default)]
    pub weeks: BTreeMap<String, PeriodRecord>,
    #[serde(default)]
    pub months: BTreeMap<String, PeriodRecord>,
    #[serde(default)]
    pub years: BTreeMap<String, PeriodRecord>,
    #[serde(default)]
    pub recurring: Vec<RecurringItem>,
    #[serde(default)]
    pub alarms: Vec<Alarm>,
    #[serde(default)]
    pub timers: Vec<Timer>,
    #[serde(default)]
    pub stopwatch: Stopwatch,
    #[serde(default)]
    pub notebook: Vec<NotebookPage>,
    /// Monotonic id counter; ids are never reused, even after deletion.
    #[serde(default)]
    next_id: u64,
}

impl PlannerState {
    fn mint_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    pub fn day(&self, date: NaiveDate) -> DayRecord {
        self.days.get(&date).cloned().unwrap_or_default()
    }

    fn day_mut(&mut self, date: NaiveDate) -> &mut DayRecord {
        self.days.entry(date).or_default()
    }

    // ----- reminders -----

    pub fn add_reminder(
        &mut self,
        date: NaiveDate,
        text: String,
        time: NaiveTime,
        recurrence: Recurrence,
    ) -> Result<String, Error> {
        let id = self.mint_id("rem");
        let reminder = Reminder::new(id.clone(), text, time, recurrence)?;
        self.day_mut(date).reminders.push(reminder);
        Ok(id)
    }

    pub fn delete_reminder(&mut self, date: NaiveDate, id: &str) {
        if let Some(day) = self.days.get_mut(&date) {
            day.reminders.retain(|reminder| reminder.id != id);
        }
    }

    /// Toggles completion of the instance as observed on `on`. An id that no
    /// longer resolves to a stored reminder is a benign race with a stale
    /// view and is ignored.
    pub fn toggle_reminder(&mut self, instance: &InstanceId, on: NaiveDate) {
        match instance {
            InstanceId::Original { id } => {
                if let Some(reminder) = self
                    .days
                    .get_mut(&on)
                    .and_then(|day| day.reminders.iter_mut().find(|r| r.id == *id))
                {
                    reminder.toggle_on(on);
                } else {
                    debug!(%id, %on, "toggle on unknown reminder ignored");
                }
            }
            InstanceId::Recurring { source_id, .. } => {
                for day in self.days.values_mut() {
                    if let Some(reminder) =
                        day.reminders.iter_mut().find(|r| r.id == *source_id)
                    {
                        reminder.toggle_on(on);
                        return;
                    }
                }
                debug!(%source_id, %on, "toggle on unknown recurring source ignored");
            }
        }
    }

    // ----- checklists -----

    pub fn add_day_item(&mut self, date: NaiveDate, text: String) -> String {
        let id = self.mint_id("item");
        self.day_mut(date)
            .checklist
            .push(ChecklistItem::new(id.clone(), text));
        id
    }

    pub fn delete_day_item(&mut self, date: NaiveDate, id: &str) {
        if let Some(day) = self.days.get_mut(&date) {
            day.checklist.retain(|item| item.id != id);
        }
    }

    /// Toggles a combined-view checklist entry for `date`: membership in the
    /// day's completed set for recurring items, the item's own flag for
    /// day-owned ones. Unknown ids are ignored.
    pub fn toggle_checklist_entry(&mut self, date: NaiveDate, id: &str) {
        if self.recurring.iter().any(|item| item.id == id) {
            let done = &mut self.day_mut(date).done_recurring;
            if !done.remove(id) {
                done.insert(id.to_string());
            }
            return;
        }
        if let Some(item) = self
            .days
            .get_mut(&date)
            .and_then(|day| day.checklist.iter_mut().find(|item| item.id == id))
        {
            item.done = !item.done;
        } else {
            debug!(%id, %date, "toggle on unknown checklist entry ignored");
        }
    }

    pub fn add_recurring_item(
        &mut self,
        text: String,
        recurrence: ItemRecurrence,
    ) -> Result<String, Error> {
        let id = self.mint_id("item");
        let item = RecurringItem::new(id.clone(), text, recurrence)?;
        self.recurring.push(item);
        Ok(id)
    }

    /// Removes a recurring item. Completion entries recorded for it on past
    /// days are left behind; they are unreachable and harmless.
    pub fn delete_recurring_item(&mut self, id: &str) {
        self.recurring.retain(|item| item.id != id);
    }

    pub fn set_day_note(&mut self, date: NaiveDate, content: &str) {
        self.day_mut(date).note = if content.trim().is_empty() {
            None
        } else {
            Some(content.to_string())
        };
    }

    // ----- period stores -----

    pub fn period(&self, period: Period, date: NaiveDate) -> PeriodRecord {
        self.period_map(period)
            .get(&period.key(date))
            .cloned()
            .unwrap_or_default()
    }

    fn period_map(&self, period: Period) -> &BTreeMap<String, PeriodRecord> {
        match period {
            Period::Week => &self.weeks,
            Period::Month => &self.months,
            Period::Year => &self.years,
        }
    }

    fn period_mut(&mut self, period: Period, date: NaiveDate) -> &mut PeriodRecord {
        let key = period.key(date);
        match period {
            Period::Week => self.weeks.entry(key).or_default(),
            Period::Month => self.months.entry(key).or_default(),
            Period::Year => self.years.entry(key).or_default(),
        }
    }

    pub fn add_period_item(&mut self, period: Period, date: NaiveDate, text: String) -> String {
        let id = self.mint_id("item");
        self.period_mut(period, date)
            .checklist
            .push(ChecklistItem::new(id.clone(), text));
        id
    }

    pub fn toggle_period_item(&mut self, period: Period, date: NaiveDate, id: &str) {
        if let Some(item) = self
            .period_mut(period, date)
            .checklist
            .iter_mut()
            .find(|item| item.id == id)
        {
            item.done = !item.done;
        }
    }

    pub fn delete_period_item(&mut self, period: Period, date: NaiveDate, id: &str) {
        self.period_mut(period, date)
            .checklist
            .retain(|item| item.id != id);
    }

    pub fn set_period_note(&mut self, period: Period, date: NaiveDate, content: &str) {
        self.period_mut(period, date).note = if content.trim().is_empty() {
            None
        } else {
            Some(content.to_string())
        };
    }

    // ----- alarms -----

    pub fn add_alarm(
        &mut self,
        time: NaiveTime,
        label: &str,
        schedule: AlarmSchedule,
    ) -> Result<String, Error> {
        schedule.validate()?;
        let id = self.mint_id("alarm");
        let label = label.trim();
        self.alarms.push(Alarm {
            id: id.clone(),
            time,
            label: if label.is_empty() {
                "New Alarm".to_string()
            } else {
                label.to_string()
            },
            schedule,
            enabled: true,
        });
        Ok(id)
    }

    pub fn update_alarm(
        &mut self,
        id: &str,
        time: NaiveTime,
        label: &str,
        schedule: AlarmSchedule,
    ) -> Result<(), Error> {
        schedule.validate()?;
        if let Some(alarm) = self.alarms.iter_mut().find(|alarm| alarm.id == id) {
            alarm.time = time;
            let label = label.trim();
            if !label.is_empty() {
                alarm.label = label.to_string();
            }
            alarm.schedule = schedule;
        }
        Ok(())
    }

    pub fn set_alarm_enabled(&mut self, id: &str, enabled: bool) {
        if let Some(alarm) = self.alarms.iter_mut().find(|alarm| alarm.id == id) {
            alarm.enabled = enabled;
        }
    }

    pub fn delete_alarm(&mut self, id: &str) {
        self.alarms.retain(|alarm| alarm.id != id);
    }

    // ----- timers -----

    /// Creates a timer and starts it immediately. A zero total duration is
    /// rejected before anything is stored.
    pub fn add_timer(
        &mut self,
        label: &str,
        hours: u32,
        minutes: u32,
        seconds: u32,
    ) -> Result<String, Error> {
        let duration = hours * 3600 + minutes * 60 + seconds;
        if duration == 0 {
            return Err(Error::ZeroDurationTimer);
        }
        let id = self.mint_id("timer");
        let label = label.trim();
        self.timers.push(Timer {
            id: id.clone(),
            label: if label.is_empty() {
                "Timer".to_string()
            } else {
                label.to_string()
            },
            initial: duration,
            remaining: duration,
            status: TimerStatus::Running,
        });
        Ok(id)
    }

    pub fn control_timer(&mut self, id: &str, action: TimerControl) {
        if let Some(timer) = self.timers.iter_mut().find(|timer| timer.id == id) {
            timer.control(action);
        }
    }

    pub fn delete_timer(&mut self, id: &str) {
        self.timers.retain(|timer| timer.id != id);
    }

    // ----- notebook -----

    pub fn add_page(&mut self, now: DateTime<Utc>) -> String {
        let id = self.mint_id("page");
        self.notebook
            .insert(0, NotebookPage::new(id.clone(), "Untitled Page".into(), now));
        id
    }

    pub fn update_page(
        &mut self,
        id: &str,
        title: Option<&str>,
        content: Option<&str>,
        now: DateTime<Utc>,
    ) {
        if let Some(page) = self.notebook.iter_mut().find(|page| page.id == id) {
            if let Some(title) = title {
                page.title = title.to_string();
            }
            if let Some(content) = content {
                page.content = content.to_string();
            }
            page.updated_at = now;
        }
    }

    pub fn delete_page(&mut self, id: &str) {
        self.notebook.retain(|page| page.id != id);
    }
}
