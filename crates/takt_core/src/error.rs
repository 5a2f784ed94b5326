use thiserror::Error;

/// Validation failures rejected at the point of entry. No partial entity is
/// created when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("weekly recurrence needs at least one weekday selected")]
    EmptyWeeklyRule,
    #[error("weekday index out of range (0-6): {0}")]
    InvalidDayOfWeek(u8),
    #[error("day of month out of range (1-31): {0}")]
    InvalidDayOfMonth(u8),
    #[error("month index out of range (0-11): {0}")]
    InvalidMonth(u8),
    #[error("repeating alarm needs at least one weekday selected")]
    EmptyAlarmSchedule,
    #[error("timer duration must be greater than zero")]
    ZeroDurationTimer,
}
