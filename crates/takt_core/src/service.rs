use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use parking_lot::{Mutex, RwLock};
use tracing::warn;

use crate::assistant::AssistantCall;
use crate::clock::{
    self, Alarm, AlarmSchedule, AlertGate, AlertTransition, RingState, StopwatchAction,
    TimerControl,
};
use crate::error::Error;
use crate::holidays::{Holiday, HolidayCalendar};
use crate::materialize::{self, ChecklistEntry, InstanceId, ReminderInstance};
use crate::notifications::{Notification, NotificationSink};
use crate::recurrence::{ItemRecurrence, Recurrence};
use crate::state::{DayRecord, Period, PeriodRecord, PlannerState};

/// Injected persistence pair. The service consumes one snapshot at startup
/// and hands back an updated snapshot after every mutation; it never touches
/// storage on its own.
pub trait SnapshotStore: Send + Sync {
    fn load(&self) -> Result<Option<PlannerState>>;
    fn save(&self, state: &PlannerState) -> Result<()>;
}

pub struct PlannerService {
    state: RwLock<PlannerState>,
    store: Option<Box<dyn SnapshotStore>>,
    sink: Option<Box<dyn NotificationSink>>,
    holidays: RwLock<HashMap<i32, HolidayCalendar>>,
    ring: Mutex<RingState>,
    gate: Mutex<AlertGate>,
}

pub struct PlannerServiceBuilder {
    store: Option<Box<dyn SnapshotStore>>,
    sink: Option<Box<dyn NotificationSink>>,
}

impl PlannerServiceBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            sink: None,
        }
    }

    pub fn with_store(mut self, store: Box<dyn SnapshotStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_notification_sink(mut self, sink: Box<dyn NotificationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn build(self) -> Result<PlannerService> {
        let state = match &self.store {
            Some(store) => store.load()?.unwrap_or_default(),
            None => PlannerState::default(),
        };
        Ok(PlannerService {
            state: RwLock::new(state),
            store: self.store,
            sink: self.sink,
            holidays: RwLock::new(HashMap::new()),
            ring: Mutex::new(RingState::default()),
            gate: Mutex::new(AlertGate::default()),
        })
    }
}

impl Default for PlannerServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PlannerService {
    pub fn builder() -> PlannerServiceBuilder {
        PlannerServiceBuilder::new()
    }

    /// Applies one mutation to a copy of the current snapshot and swaps it
    /// in only after a successful save. A rejected or failed operation
    /// leaves the published state exactly as it was.
    fn commit<T>(&self, op: impl FnOnce(&mut PlannerState) -> Result<T, Error>) -> Result<T> {
        let mut state = self.state.write();
        let mut draft = state.clone();
        let value = op(&mut draft)?;
        if draft != *state {
            if let Some(store) = &self.store {
                store.save(&draft)?;
            }
            *state = draft;
        }
        Ok(value)
    }

    // ----- queries -----

    pub fn snapshot(&self) -> PlannerState {
        self.state.read().clone()
    }

    pub fn reminders_on(&self, date: NaiveDate) -> Vec<ReminderInstance> {
        materialize::reminders_on(&self.state.read(), date)
    }

    pub fn checklist_on(&self, date: NaiveDate) -> Vec<ChecklistEntry> {
        materialize::checklist_on(&self.state.read(), date)
    }

    pub fn alarms_on(&self, date: NaiveDate) -> Vec<Alarm> {
        clock::alarms_on(&self.state.read().alarms, date)
    }

    pub fn day(&self, date: NaiveDate) -> DayRecord {
        self.state.read().day(date)
    }

    pub fn period(&self, period: Period, date: NaiveDate) -> PeriodRecord {
        self.state.read().period(period, date)
    }

    // ----- calendar content -----

    pub fn add_reminder(
        &self,
        date: NaiveDate,
        text: String,
        time: NaiveTime,
        recurrence: Recurrence,
    ) -> Result<String> {
        self.commit(|state| state.add_reminder(date, text, time, recurrence))
    }

    pub fn delete_reminder(&self, date: NaiveDate, id: &str) -> Result<()> {
        self.commit(|state| {
            state.delete_reminder(date, id);
            Ok(())
        })
    }

    pub fn toggle_reminder(&self, instance: &InstanceId, on: NaiveDate) -> Result<()> {
        self.commit(|state| {
            state.toggle_reminder(instance, on);
            Ok(())
        })
    }

    pub fn add_day_item(&self, date: NaiveDate, text: String) -> Result<String> {
        self.commit(|state| Ok(state.add_day_item(date, text)))
    }

    pub fn delete_day_item(&self, date: NaiveDate, id: &str) -> Result<()> {
        self.commit(|state| {
            state.delete_day_item(date, id);
            Ok(())
        })
    }

    pub fn toggle_checklist_entry(&self, date: NaiveDate, id: &str) -> Result<()> {
        self.commit(|state| {
            state.toggle_checklist_entry(date, id);
            Ok(())
        })
    }

    pub fn set_day_note(&self, date: NaiveDate, content: &str) -> Result<()> {
        self.commit(|state| {
            state.set_day_note(date, content);
            Ok(())
        })
    }

    pub fn add_recurring_item(
        &self,
        text: String,
        recurrence: ItemRecurrence,
    ) -> Result<String> {
        self.commit(|state| state.add_recurring_item(text, recurrence))
    }

    pub fn delete_recurring_item(&self, id: &str) -> Result<()> {
        self.commit(|state| {
            state.delete_recurring_item(id);
            Ok(())
        })
    }

    pub fn add_period_item(
        &self,
        period: Period,
        date: NaiveDate,
        text: String,
    ) -> Result<String> {
        self.commit(|state| Ok(state.add_period_item(period, date, text)))
    }

    pub fn toggle_period_item(&self, period: Period, date: NaiveDate, id: &str) -> Result<()> {
        self.commit(|state| {
            state.toggle_period_item(period, date, id);
            Ok(())
        })
    }

    pub fn delete_period_item(&self, period: Period, date: NaiveDate, id: &str) -> Result<()> {
        self.commit(|state| {
            state.delete_period_item(period, date, id);
            Ok(())
        })
    }

    pub fn set_period_note(&self, period: Period, date: NaiveDate, content: &str) -> Result<()> {
        self.commit(|state| {
            state.set_period_note(period, date, content);
            Ok(())
        })
    }

    // ----- alarms, timers, stopwatch -----

    pub fn add_alarm(
        &self,
        time: NaiveTime,
        label: &str,
        schedule: AlarmSchedule,
    ) -> Result<String> {
        self.commit(|state| state.add_alarm(time, label, schedule))
    }

    pub fn update_alarm(
        &self,
        id: &str,
        time: NaiveTime,
        label: &str,
        schedule: AlarmSchedule,
    ) -> Result<()> {
        self.commit(|state| state.update_alarm(id, time, label, schedule))
    }

    pub fn set_alarm_enabled(&self, id: &str, enabled: bool) -> Result<()> {
        self.commit(|state| {
            state.set_alarm_enabled(id, enabled);
            Ok(())
        })
    }

    pub fn delete_alarm(&self, id: &str) -> Result<()> {
        self.ring.lock().dismiss_alarm(id);
        self.commit(|state| {
            state.delete_alarm(id);
            Ok(())
        })
    }

    pub fn add_timer(&self, label: &str, hours: u32, minutes: u32, seconds: u32) -> Result<String> {
        self.commit(|state| state.add_timer(label, hours, minutes, seconds))
    }

    pub fn control_timer(&self, id: &str, action: TimerControl) -> Result<()> {
        self.commit(|state| {
            state.control_timer(id, action);
            Ok(())
        })
    }

    pub fn delete_timer(&self, id: &str) -> Result<()> {
        self.ring.lock().dismiss_timer(id);
        self.commit(|state| {
            state.delete_timer(id);
            Ok(())
        })
    }

    pub fn control_stopwatch(&self, action: StopwatchAction) -> Result<()> {
        self.commit(|state| {
            state.stopwatch.control(action);
            Ok(())
        })
    }

    // ----- notebook -----

    pub fn add_page(&self, now: DateTime<Utc>) -> Result<String> {
        self.commit(|state| Ok(state.add_page(now)))
    }

    pub fn update_page(
        &self,
        id: &str,
        title: Option<&str>,
        content: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.commit(|state| {
            state.update_page(id, title, content, now);
            Ok(())
        })
    }

    pub fn delete_page(&self, id: &str) -> Result<()> {
        self.commit(|state| {
            state.delete_page(id);
            Ok(())
        })
    }

    // ----- assistant -----

    pub fn apply_assistant(&self, call: AssistantCall, now: NaiveDateTime) -> Result<()> {
        self.commit(|state| state.apply_assistant(call, now))
    }

    // ----- holidays -----

    /// Installs the holiday calendar for `year`, merging a fetched feed when
    /// one is supplied. Without a feed, an already-cached calendar is kept
    /// and a computed-only calendar is built otherwise, with a warning: the
    /// holiday set is never left empty.
    pub fn ensure_holidays(&self, year: i32, remote: Option<Vec<Holiday>>) -> HolidayCalendar {
        let mut cache = self.holidays.write();
        if remote.is_none() {
            if let Some(existing) = cache.get(&year) {
                return existing.clone();
            }
            warn!(year, "holiday feed unavailable, showing computed holidays only");
        }
        let calendar = HolidayCalendar::build(year, remote);
        cache.insert(year, calendar.clone());
        calendar
    }

    pub fn holidays(&self, year: i32) -> Option<HolidayCalendar> {
        self.holidays.read().get(&year).cloned()
    }

    // ----- ticks -----

    /// The coarse poll: reminders due at the current minute and alarms going
    /// off. Fired one-time alarms are disabled and persisted; everything due
    /// is delivered through the sink and returned.
    pub fn poll_schedules(&self, now: NaiveDateTime) -> Result<Vec<Notification>> {
        let mut notifications = Vec::new();

        for instance in self.reminders_on(now.date()) {
            if !instance.done && same_minute(instance.time, now.time()) {
                notifications.push(Notification::ReminderDue {
                    text: instance.text,
                    time: instance.time,
                });
            }
        }

        let ringing = self.ring.lock().clone();
        let fired = {
            let mut state = self.state.write();
            let mut draft = state.clone();
            let fired = clock::due_alarms(&mut draft.alarms, now, &ringing);
            if draft != *state {
                if let Some(store) = &self.store {
                    store.save(&draft)?;
                }
                *state = draft;
            }
            fired
        };
        {
            let mut ring = self.ring.lock();
            for alarm in &fired {
                ring.alarms.insert(alarm.id.clone());
            }
        }
        for alarm in fired {
            notifications.push(Notification::AlarmFiring {
                label: alarm.label,
                time: alarm.time,
            });
        }

        self.deliver(&notifications);
        Ok(notifications)
    }

    /// The one-second tick for countdown timers. Timers reaching zero ring
    /// and are reported exactly once.
    pub fn tick_timers(&self) -> Result<Vec<Notification>> {
        let finished = {
            let mut state = self.state.write();
            let mut draft = state.clone();
            let finished = clock::tick_timers(&mut draft.timers);
            if draft != *state {
                if let Some(store) = &self.store {
                    store.save(&draft)?;
                }
                *state = draft;
            }
            finished
        };

        let mut notifications = Vec::new();
        {
            let mut ring = self.ring.lock();
            for timer in &finished {
                ring.timers.insert(timer.id.clone());
            }
        }
        for timer in finished {
            notifications.push(Notification::TimerFinished { label: timer.label });
        }

        self.deliver(&notifications);
        Ok(notifications)
    }

    pub fn advance_stopwatch(&self, delta_ms: u64) -> Result<()> {
        self.commit(|state| {
            state.stopwatch.advance(delta_ms);
            Ok(())
        })
    }

    pub fn dismiss_alarm(&self, id: &str) {
        self.ring.lock().dismiss_alarm(id);
    }

    pub fn dismiss_timer(&self, id: &str) {
        self.ring.lock().dismiss_timer(id);
    }

    pub fn is_ringing(&self) -> bool {
        self.ring.lock().is_ringing()
    }

    /// Edge transition for the shared audible-alert loop, if the ringing
    /// state changed since the last call.
    pub fn alert_transition(&self) -> Option<AlertTransition> {
        let ringing = self.is_ringing();
        self.gate.lock().observe(ringing)
    }

    fn deliver(&self, notifications: &[Notification]) {
        if let Some(sink) = &self.sink {
            for notification in notifications {
                sink.deliver(notification.clone());
            }
        }
    }
}

fn same_minute(a: NaiveTime, b: NaiveTime) -> bool {
    a.hour() == b.hour() && a.minute() == b.minute()
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as PlainMutex;
    use std::sync::Arc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[derive(Default)]
    struct MemoryStore {
        saved: PlainMutex<Option<PlannerState>>,
    }

    impl SnapshotStore for Arc<MemoryStore> {
        fn load(&self) -> Result<Option<PlannerState>> {
            Ok(self.saved.lock().clone())
        }

        fn save(&self, state: &PlannerState) -> Result<()> {
            *self.saved.lock() = Some(state.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        delivered: PlainMutex<Vec<Notification>>,
    }

    impl NotificationSink for Arc<RecordingSink> {
        fn deliver(&self, notification: Notification) {
            self.delivered.lock().push(notification);
        }
    }

    fn service_with(
        store: Arc<MemoryStore>,
        sink: Arc<RecordingSink>,
    ) -> PlannerService {
        PlannerService::builder()
            .with_store(Box::new(store))
            .with_notification_sink(Box::new(sink))
            .build()
            .unwrap()
    }

    #[test]
    fn mutations_persist_and_rejections_do_not() {
        let store = Arc::new(MemoryStore::default());
        let service = service_with(store.clone(), Arc::new(RecordingSink::default()));

        service
            .add_reminder(
                date(2024, 1, 10),
                "sync".into(),
                time(9, 0),
                Recurrence::None,
            )
            .unwrap();
        assert!(store.saved.lock().is_some());

        let before = service.snapshot();
        let rejected = service.add_timer("tea", 0, 0, 0);
        assert!(rejected.is_err());
        assert_eq!(service.snapshot(), before);
    }

    #[test]
    fn startup_consumes_the_stored_snapshot() {
        let store = Arc::new(MemoryStore::default());
        {
            let service = service_with(store.clone(), Arc::new(RecordingSink::default()));
            service
                .add_day_item(date(2024, 1, 10), "buy milk".into())
                .unwrap();
        }
        let service = service_with(store, Arc::new(RecordingSink::default()));
        assert_eq!(service.day(date(2024, 1, 10)).checklist.len(), 1);
    }

    #[test]
    fn poll_reports_due_reminders_and_alarms() {
        let sink = Arc::new(RecordingSink::default());
        let service = service_with(Arc::new(MemoryStore::default()), sink.clone());
        let monday = date(2024, 3, 11);

        service
            .add_reminder(monday, "standup".into(), time(9, 0), Recurrence::None)
            .unwrap();
        service
            .add_alarm(
                time(9, 0),
                "wake",
                AlarmSchedule::Once { date: monday },
            )
            .unwrap();

        let now = monday.and_hms_opt(9, 0, 15).unwrap();
        let notifications = service.poll_schedules(now).unwrap();
        assert_eq!(notifications.len(), 2);
        assert!(service.is_ringing());
        assert_eq!(sink.delivered.lock().len(), 2);

        // Within the same minute nothing fires twice: the alarm is ringing
        // and disabled, the reminder is still pending but a completed toggle
        // silences it.
        let visible = service.reminders_on(monday);
        service.toggle_reminder(&visible[0].id, monday).unwrap();
        let again = service.poll_schedules(now).unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn alert_loop_transitions_only_on_edges() {
        let service = service_with(
            Arc::new(MemoryStore::default()),
            Arc::new(RecordingSink::default()),
        );
        assert_eq!(service.alert_transition(), None);

        service.add_timer("t", 0, 0, 1).unwrap();
        service.tick_timers().unwrap();
        assert_eq!(service.alert_transition(), Some(AlertTransition::Start));
        assert_eq!(service.alert_transition(), None);

        let id = service.snapshot().timers[0].id.clone();
        service.dismiss_timer(&id);
        assert_eq!(service.alert_transition(), Some(AlertTransition::Stop));
        assert_eq!(service.alert_transition(), None);
    }

    #[test]
    fn holiday_cache_keeps_a_merged_calendar_over_a_failed_refetch() {
        let service = service_with(
            Arc::new(MemoryStore::default()),
            Arc::new(RecordingSink::default()),
        );
        let remote = vec![Holiday {
            name: "Christmas Day".into(),
            date: date(2024, 12, 25),
        }];
        let merged = service.ensure_holidays(2024, Some(remote));
        assert_eq!(merged.source, crate::holidays::HolidaySource::Merged);

        let kept = service.ensure_holidays(2024, None);
        assert_eq!(kept.source, crate::holidays::HolidaySource::Merged);

        let fallback = service.ensure_holidays(2025, None);
        assert_eq!(fallback.source, crate::holidays::HolidaySource::LocalOnly);
        assert_eq!(service.holidays(2025), Some(fallback));
    }
}
