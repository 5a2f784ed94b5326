use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::clock::{self, AlarmSchedule, StopwatchAction};
use crate::error::Error;
use crate::recurrence::Recurrence;
use crate::state::PlannerState;

/// The assistant's entire mutation surface: exactly these four operations
/// are writable from interpreted natural-language commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "args", rename_all = "camelCase")]
pub enum AssistantCall {
    AddReminder {
        date: NaiveDate,
        time: NaiveTime,
        description: String,
    },
    AddAlarm {
        time: NaiveTime,
        label: Option<String>,
        repeat: bool,
        #[serde(default)]
        days: Vec<u8>,
    },
    AddTimer {
        hours: u32,
        minutes: u32,
        seconds: u32,
        label: Option<String>,
    },
    ControlStopwatch {
        action: StopwatchAction,
    },
}

/// What an interpreted command came back as: structured calls to apply in
/// order, or plain text to show the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssistantReply {
    Calls(Vec<AssistantCall>),
    Text(String),
}

impl PlannerState {
    /// Applies one interpreted call. `now` anchors the target date of
    /// one-time alarms. Validation failures reject the call without touching
    /// the state.
    pub fn apply_assistant(
        &mut self,
        call: AssistantCall,
        now: NaiveDateTime,
    ) -> Result<(), Error> {
        match call {
            AssistantCall::AddReminder {
                date,
                time,
                description,
            } => self
                .add_reminder(date, description, time, Recurrence::None)
                .map(drop),
            AssistantCall::AddAlarm {
                time,
                label,
                repeat,
                days,
            } => {
                let schedule = if repeat {
                    AlarmSchedule::Repeat {
                        days: days.into_iter().collect(),
                    }
                } else {
                    AlarmSchedule::Once {
                        date: clock::one_time_target(time, now),
                    }
                };
                self.add_alarm(time, label.as_deref().unwrap_or(""), schedule)
                    .map(drop)
            }
            AssistantCall::AddTimer {
                hours,
                minutes,
                seconds,
                label,
            } => self
                .add_timer(label.as_deref().unwrap_or(""), hours, minutes, seconds)
                .map(drop),
            AssistantCall::ControlStopwatch { action } => {
                self.stopwatch.control(action);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TimerStatus;
    use crate::materialize;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn noon(y: i32, m: u32, d: u32) -> NaiveDateTime {
        date(y, m, d).and_hms_opt(12, 0, 0).unwrap()
    }

    #[test]
    fn add_reminder_lands_on_the_named_date() {
        let mut state = PlannerState::default();
        state
            .apply_assistant(
                AssistantCall::AddReminder {
                    date: date(2024, 4, 2),
                    time: time(15, 0),
                    description: "dentist".into(),
                },
                noon(2024, 4, 1),
            )
            .unwrap();
        let visible = materialize::reminders_on(&state, date(2024, 4, 2));
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].text, "dentist");
        assert!(!visible[0].recurring);
    }

    #[test]
    fn one_time_alarm_targets_today_or_tomorrow() {
        let mut state = PlannerState::default();
        state
            .apply_assistant(
                AssistantCall::AddAlarm {
                    time: time(7, 0),
                    label: None,
                    repeat: false,
                    days: Vec::new(),
                },
                noon(2024, 4, 1),
            )
            .unwrap();
        assert_eq!(state.alarms[0].label, "New Alarm");
        assert_eq!(
            state.alarms[0].schedule,
            AlarmSchedule::Once {
                date: date(2024, 4, 2)
            }
        );
    }

    #[test]
    fn repeating_alarm_without_days_is_rejected_whole() {
        let mut state = PlannerState::default();
        let result = state.apply_assistant(
            AssistantCall::AddAlarm {
                time: time(7, 0),
                label: Some("gym".into()),
                repeat: true,
                days: Vec::new(),
            },
            noon(2024, 4, 1),
        );
        assert_eq!(result, Err(Error::EmptyAlarmSchedule));
        assert!(state.alarms.is_empty());
    }

    #[test]
    fn timer_call_starts_immediately() {
        let mut state = PlannerState::default();
        state
            .apply_assistant(
                AssistantCall::AddTimer {
                    hours: 0,
                    minutes: 15,
                    seconds: 0,
                    label: Some("pizza".into()),
                },
                noon(2024, 4, 1),
            )
            .unwrap();
        assert_eq!(state.timers[0].status, TimerStatus::Running);
        assert_eq!(state.timers[0].initial, 900);

        let zero = state.apply_assistant(
            AssistantCall::AddTimer {
                hours: 0,
                minutes: 0,
                seconds: 0,
                label: None,
            },
            noon(2024, 4, 1),
        );
        assert_eq!(zero, Err(Error::ZeroDurationTimer));
    }

    #[test]
    fn stopwatch_calls_pass_through() {
        let mut state = PlannerState::default();
        state
            .apply_assistant(
                AssistantCall::ControlStopwatch {
                    action: StopwatchAction::Start,
                },
                noon(2024, 4, 1),
            )
            .unwrap();
        assert!(state.stopwatch.running);
    }

    #[test]
    fn calls_round_trip_through_their_wire_shape() {
        let call = AssistantCall::AddAlarm {
            time: time(6, 45),
            label: Some("run".into()),
            repeat: true,
            days: vec![1, 3, 5],
        };
        let json = serde_json::to_value(&call).unwrap();
        assert_eq!(json["name"], "addAlarm");
        let back: AssistantCall = serde_json::from_value(json).unwrap();
        assert_eq!(back, call);
    }
}
