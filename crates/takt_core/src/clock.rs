use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::keys::weekday_index;

/// When an alarm goes off: on selected weekdays, or once on a single date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AlarmSchedule {
    Repeat { days: BTreeSet<u8> },
    Once { date: NaiveDate },
}

impl AlarmSchedule {
    pub fn validate(&self) -> Result<(), Error> {
        match self {
            AlarmSchedule::Repeat { days } => {
                if days.is_empty() {
                    return Err(Error::EmptyAlarmSchedule);
                }
                if let Some(bad) = days.iter().find(|day| **day > 6) {
                    return Err(Error::InvalidDayOfWeek(*bad));
                }
                Ok(())
            }
            AlarmSchedule::Once { .. } => Ok(()),
        }
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        match self {
            AlarmSchedule::Repeat { days } => days.contains(&weekday_index(date)),
            AlarmSchedule::Once { date: target } => *target == date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alarm {
    pub id: String,
    pub time: NaiveTime,
    pub label: String,
    pub schedule: AlarmSchedule,
    pub enabled: bool,
}

/// Enabled alarms whose schedule covers `date`, ordered by time of day.
pub fn alarms_on(alarms: &[Alarm], date: NaiveDate) -> Vec<Alarm> {
    let mut due: Vec<Alarm> = alarms
        .iter()
        .filter(|alarm| alarm.enabled && alarm.schedule.covers(date))
        .cloned()
        .collect();
    due.sort_by_key(|alarm| alarm.time);
    due
}

/// Target date for a one-time alarm created "now": today if the alarm time
/// is still ahead, otherwise tomorrow.
pub fn one_time_target(time: NaiveTime, now: NaiveDateTime) -> NaiveDate {
    if time > now.time() {
        now.date()
    } else {
        now.date() + Duration::days(1)
    }
}

/// Alarms due at the current minute. Fired one-time alarms are disabled in
/// place; already-ringing alarms are skipped so a 30-second poll cadence
/// cannot fire the same alarm twice within its minute.
pub fn due_alarms(alarms: &mut [Alarm], now: NaiveDateTime, ringing: &RingState) -> Vec<Alarm> {
    let date = now.date();
    let mut fired = Vec::new();
    for alarm in alarms.iter_mut() {
        if !alarm.enabled || ringing.alarms.contains(&alarm.id) {
            continue;
        }
        if alarm.schedule.covers(date) && same_minute(alarm.time, now.time()) {
            if matches!(alarm.schedule, AlarmSchedule::Once { .. }) {
                alarm.enabled = false;
            }
            fired.push(alarm.clone());
        }
    }
    fired
}

fn same_minute(a: NaiveTime, b: NaiveTime) -> bool {
    a.hour() == b.hour() && a.minute() == b.minute()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerStatus {
    Running,
    Paused,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timer {
    pub id: String,
    pub label: String,
    /// Configured duration in seconds, always greater than zero.
    pub initial: u32,
    pub remaining: u32,
    pub status: TimerStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerControl {
    Start,
    Pause,
    Reset,
}

impl Timer {
    pub fn control(&mut self, action: TimerControl) {
        match action {
            TimerControl::Start => self.status = TimerStatus::Running,
            TimerControl::Pause => self.status = TimerStatus::Paused,
            TimerControl::Reset => {
                self.status = TimerStatus::Stopped;
                self.remaining = self.initial;
            }
        }
    }
}

/// Advances every running timer by one second. Returns the timers that
/// reached zero on this tick; each is stopped so it finishes exactly once.
pub fn tick_timers(timers: &mut [Timer]) -> Vec<Timer> {
    let mut finished = Vec::new();
    for timer in timers.iter_mut() {
        if timer.status != TimerStatus::Running {
            continue;
        }
        timer.remaining = timer.remaining.saturating_sub(1);
        if timer.remaining == 0 {
            timer.status = TimerStatus::Stopped;
            finished.push(timer.clone());
        }
    }
    finished
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopwatchAction {
    Start,
    Stop,
    Lap,
    Reset,
}

/// Elapsed-time counter advanced by the external tick. Starting while
/// running and stopping while stopped are no-ops.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stopwatch {
    pub running: bool,
    pub elapsed_ms: u64,
    /// Lap times at the moment the lap was taken, most recent first.
    pub laps: Vec<u64>,
}

impl Stopwatch {
    pub fn control(&mut self, action: StopwatchAction) {
        match action {
            StopwatchAction::Start => self.running = true,
            StopwatchAction::Stop => self.running = false,
            StopwatchAction::Lap => {
                if self.running {
                    self.laps.insert(0, self.elapsed_ms);
                }
            }
            StopwatchAction::Reset => *self = Stopwatch::default(),
        }
    }

    pub fn advance(&mut self, delta_ms: u64) {
        if self.running {
            self.elapsed_ms += delta_ms;
        }
    }
}

/// Which alarms and timers are currently ringing. Runtime-only: ringing is
/// not part of the persisted snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RingState {
    pub alarms: BTreeSet<String>,
    pub timers: BTreeSet<String>,
}

impl RingState {
    pub fn is_ringing(&self) -> bool {
        !self.alarms.is_empty() || !self.timers.is_empty()
    }

    pub fn dismiss_alarm(&mut self, id: &str) {
        self.alarms.remove(id);
    }

    pub fn dismiss_timer(&mut self, id: &str) {
        self.timers.remove(id);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertTransition {
    Start,
    Stop,
}

/// Edge detector for the single shared audible-alert loop. However many
/// alarms and timers ring at once, the loop is started and stopped exactly
/// once per transition.
#[derive(Debug, Default)]
pub struct AlertGate {
    active: bool,
}

impl AlertGate {
    pub fn observe(&mut self, ringing: bool) -> Option<AlertTransition> {
        match (self.active, ringing) {
            (false, true) => {
                self.active = true;
                Some(AlertTransition::Start)
            }
            (true, false) => {
                self.active = false;
                Some(AlertTransition::Stop)
            }
            _ => None,
        }
    }
}
