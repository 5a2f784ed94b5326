use std::sync::Arc;

use anyhow::Result;
use chrono::{NaiveDate, NaiveTime};
use parking_lot::Mutex;

use takt_core::assistant::AssistantCall;
use takt_core::clock::StopwatchAction;
use takt_core::holidays::{Holiday, HolidaySource};
use takt_core::materialize::InstanceId;
use takt_core::notifications::{Notification, NotificationSink};
use takt_core::recurrence::{ItemRecurrence, Recurrence};
use takt_core::state::Period;
use takt_core::{PlannerService, PlannerState, SnapshotStore};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

#[derive(Default, Clone)]
struct MemoryStore {
    saved: Arc<Mutex<Option<PlannerState>>>,
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Option<PlannerState>> {
        Ok(self.saved.lock().clone())
    }

    fn save(&self, state: &PlannerState) -> Result<()> {
        *self.saved.lock() = Some(state.clone());
        Ok(())
    }
}

#[derive(Default, Clone)]
struct CollectingSink {
    delivered: Arc<Mutex<Vec<Notification>>>,
}

impl NotificationSink for CollectingSink {
    fn deliver(&self, notification: Notification) {
        self.delivered.lock().push(notification);
    }
}

#[test]
fn a_week_in_the_planner_round_trips_through_its_snapshot() {
    let store = MemoryStore::default();
    let sink = CollectingSink::default();

    let wednesday = date(2024, 1, 10);
    let next_wednesday = date(2024, 1, 17);

    {
        let service = PlannerService::builder()
            .with_store(Box::new(store.clone()))
            .with_notification_sink(Box::new(sink.clone()))
            .build()
            .unwrap();

        // A weekly reminder anchored on a Wednesday, a one-off on the same
        // day, and a daily recurring checklist item.
        service
            .add_reminder(
                wednesday,
                "team sync".into(),
                time(9, 30),
                Recurrence::Weekly {
                    days: [3].into_iter().collect(),
                },
            )
            .unwrap();
        service
            .add_reminder(
                wednesday,
                "pick up package".into(),
                time(17, 0),
                Recurrence::None,
            )
            .unwrap();
        service
            .add_recurring_item("stretch".into(), ItemRecurrence::Daily)
            .unwrap();
        service
            .add_period_item(Period::Week, wednesday, "plan meals".into())
            .unwrap();
        service.set_day_note(wednesday, "quiet office day").unwrap();
    }

    // A fresh service over the same store sees the same world.
    let service = PlannerService::builder()
        .with_store(Box::new(store))
        .with_notification_sink(Box::new(sink))
        .build()
        .unwrap();

    // The anchor day shows both reminders as originals, ordered by time.
    let on_anchor = service.reminders_on(wednesday);
    assert_eq!(on_anchor.len(), 2);
    assert!(on_anchor.iter().all(|instance| !instance.recurring));
    assert_eq!(on_anchor[0].text, "team sync");

    // A week later only the weekly reminder projects forward.
    let projected = service.reminders_on(next_wednesday);
    assert_eq!(projected.len(), 1);
    let instance = &projected[0];
    assert!(instance.recurring);
    assert_eq!(instance.origin, wednesday);

    // Completing the occurrence is tracked per day and is idempotent.
    service.toggle_reminder(&instance.id, next_wednesday).unwrap();
    assert!(service.reminders_on(next_wednesday)[0].done);
    assert!(!service.reminders_on(wednesday)[0].done);
    service.toggle_reminder(&instance.id, next_wednesday).unwrap();
    assert!(!service.reminders_on(next_wednesday)[0].done);

    // The recurring checklist item is due everywhere, its completion only
    // where recorded.
    service
        .toggle_checklist_entry(next_wednesday, &service.checklist_on(next_wednesday)[0].id)
        .unwrap();
    assert!(service.checklist_on(next_wednesday)[0].done);
    assert!(!service.checklist_on(date(2024, 1, 18))[0].done);

    // The week record is shared across the whole Sunday-start week.
    assert_eq!(
        service.period(Period::Week, date(2024, 1, 7)).checklist.len(),
        1
    );
}

#[test]
fn rendered_recurring_ids_survive_a_ui_round_trip() {
    let store = MemoryStore::default();
    let service = PlannerService::builder()
        .with_store(Box::new(store))
        .build()
        .unwrap();

    let anchor = date(2024, 1, 10);
    service
        .add_reminder(
            anchor,
            "water plants".into(),
            time(8, 0),
            Recurrence::Daily,
        )
        .unwrap();

    let occurrence = date(2024, 1, 12);
    let instance = &service.reminders_on(occurrence)[0];
    let rendered = instance.id.render();

    // A UI hands the string back; parsing recovers the same identity.
    let parsed = InstanceId::parse(&rendered);
    assert_eq!(parsed, instance.id);
    service.toggle_reminder(&parsed, occurrence).unwrap();
    assert!(service.reminders_on(occurrence)[0].done);
}

#[test]
fn monthly_day_31_never_appears_in_february() {
    let service = PlannerService::builder().build().unwrap();
    service
        .add_reminder(
            date(2024, 1, 31),
            "pay rent".into(),
            time(10, 0),
            Recurrence::Monthly { day_of_month: 31 },
        )
        .unwrap();

    let mut day = date(2024, 2, 1);
    while day <= date(2024, 2, 29) {
        assert!(service.reminders_on(day).is_empty(), "{day}");
        day = day.succ_opt().unwrap();
    }
    assert_eq!(service.reminders_on(date(2024, 3, 31)).len(), 1);
}

#[test]
fn assistant_calls_are_the_only_ai_writable_surface() {
    let service = PlannerService::builder().build().unwrap();
    let now = date(2024, 4, 1).and_hms_opt(12, 0, 0).unwrap();

    service
        .apply_assistant(
            AssistantCall::AddReminder {
                date: date(2024, 4, 2),
                time: time(15, 0),
                description: "dentist".into(),
            },
            now,
        )
        .unwrap();
    service
        .apply_assistant(
            AssistantCall::AddTimer {
                hours: 0,
                minutes: 15,
                seconds: 0,
                label: Some("pizza".into()),
            },
            now,
        )
        .unwrap();
    service
        .apply_assistant(
            AssistantCall::ControlStopwatch {
                action: StopwatchAction::Start,
            },
            now,
        )
        .unwrap();

    let snapshot = service.snapshot();
    assert_eq!(snapshot.timers.len(), 1);
    assert!(snapshot.stopwatch.running);
    assert_eq!(service.reminders_on(date(2024, 4, 2)).len(), 1);
}

#[test]
fn timers_ring_through_the_sink_and_the_shared_loop_gates_once() {
    let sink = CollectingSink::default();
    let service = PlannerService::builder()
        .with_notification_sink(Box::new(sink.clone()))
        .build()
        .unwrap();

    service.add_timer("tea", 0, 0, 2).unwrap();
    assert!(service.tick_timers().unwrap().is_empty());
    assert_eq!(service.alert_transition(), None);

    let finished = service.tick_timers().unwrap();
    assert_eq!(
        finished,
        vec![Notification::TimerFinished { label: "tea".into() }]
    );
    assert!(matches!(
        service.alert_transition(),
        Some(takt_core::clock::AlertTransition::Start)
    ));

    let id = service.snapshot().timers[0].id.clone();
    service.dismiss_timer(&id);
    assert!(matches!(
        service.alert_transition(),
        Some(takt_core::clock::AlertTransition::Stop)
    ));
    assert_eq!(sink.delivered.lock().len(), 1);
}

#[test]
fn holiday_calendar_merges_remote_and_computed_sets() {
    let service = PlannerService::builder().build().unwrap();
    let remote = vec![Holiday {
        name: "Christmas Day".into(),
        date: date(2024, 12, 25),
    }];
    let calendar = service.ensure_holidays(2024, Some(remote));

    assert_eq!(calendar.source, HolidaySource::Merged);
    assert_eq!(calendar.on(date(2024, 12, 25)).len(), 1);
    assert_eq!(calendar.on(date(2024, 12, 24)).len(), 1);
    assert_eq!(calendar.on(date(2024, 3, 31))[0].name, "Easter Sunday");
    assert_eq!(calendar.on(date(2024, 3, 29))[0].name, "Good Friday");

    // The cache serves repeat queries for the displayed year.
    assert_eq!(service.holidays(2024), Some(calendar));
}
