use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// A desire to notify the user. Delivery (system notification, audible
/// beep) belongs to the embedding platform, not the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    ReminderDue { text: String, time: NaiveTime },
    AlarmFiring { label: String, time: NaiveTime },
    TimerFinished { label: String },
}

/// Platform-specific delivery adapters implement this trait.
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, notification: Notification);
}
