use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Datelike, Local, NaiveDateTime};
use tokio::io::AsyncBufReadExt;
use tracing::{info, warn};

use takt_core::assistant::AssistantReply;
use takt_core::clock::AlertTransition;
use takt_core::notifications::{Notification, NotificationSink};
use takt_core::{PlannerService, PlannerState, SnapshotStore};
use takt_remote::{AssistantClient, HolidayClient};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub snapshot_path: PathBuf,
    pub country: String,
    pub assistant_key: Option<String>,
    pub poll_seconds: u64,
    pub timer_tick_seconds: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from("takt.json"),
            country: "US".to_string(),
            assistant_key: None,
            poll_seconds: 30,
            timer_tick_seconds: 1,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(path) = std::env::var("TAKT_SNAPSHOT") {
            config.snapshot_path = PathBuf::from(path);
        }
        if let Ok(country) = std::env::var("TAKT_COUNTRY") {
            if !country.trim().is_empty() {
                config.country = country.trim().to_string();
            }
        }
        if let Ok(key) = std::env::var("TAKT_ASSISTANT_KEY") {
            if !key.trim().is_empty() {
                config.assistant_key = Some(key.trim().to_string());
            }
        }
        if let Ok(seconds) = std::env::var("TAKT_POLL_SECS") {
            if let Ok(value) = seconds.trim().parse::<u64>() {
                if value > 0 {
                    config.poll_seconds = value;
                }
            }
        }
        if let Ok(seconds) = std::env::var("TAKT_TIMER_TICK_SECS") {
            if let Ok(value) = seconds.trim().parse::<u64>() {
                if value > 0 {
                    config.timer_tick_seconds = value;
                }
            }
        }
        Ok(config)
    }
}

/// The injected load/save pair: one JSON document holding the whole
/// snapshot.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Result<Option<PlannerState>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("reading snapshot {}", self.path.display()))?;
        let state = serde_json::from_str(&raw)
            .with_context(|| format!("parsing snapshot {}", self.path.display()))?;
        Ok(Some(state))
    }

    fn save(&self, state: &PlannerState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let raw = serde_json::to_string_pretty(state)?;
        fs::write(&self.path, raw)
            .with_context(|| format!("writing snapshot {}", self.path.display()))
    }
}

/// Prints notifications to the terminal. Real platforms plug in system
/// notifications instead.
pub struct ConsoleSink;

impl NotificationSink for ConsoleSink {
    fn deliver(&self, notification: Notification) {
        println!("{}", describe(&notification));
    }
}

pub fn describe(notification: &Notification) -> String {
    match notification {
        Notification::ReminderDue { text, time } => {
            format!("Reminder due at {}: {}", time.format("%H:%M"), text)
        }
        Notification::AlarmFiring { label, time } => {
            format!("Alarm {} ({})", label, time.format("%H:%M"))
        }
        Notification::TimerFinished { label } => format!("Timer finished: {}", label),
    }
}

/// Sends one free-text command through the assistant and applies whatever
/// comes back. Failures surface as a single message; a reply that cannot be
/// interpreted applies nothing.
pub async fn dispatch_command(
    service: &PlannerService,
    client: &AssistantClient,
    command: &str,
    now: NaiveDateTime,
) {
    match client.interpret(command, now.date()).await {
        Ok(AssistantReply::Calls(calls)) => {
            for call in calls {
                if let Err(err) = service.apply_assistant(call, now) {
                    warn!(%err, "assistant call rejected");
                    println!("Assistant call rejected: {err}");
                    break;
                }
            }
        }
        Ok(AssistantReply::Text(text)) => println!("Assistant: {text}"),
        Err(err) => {
            warn!(%err, "assistant command failed");
            println!("Assistant request failed: {err}");
        }
    }
}

pub async fn run(config: AppConfig) -> Result<()> {
    let service = Arc::new(
        PlannerService::builder()
            .with_store(Box::new(JsonFileStore::new(&config.snapshot_path)))
            .with_notification_sink(Box::new(ConsoleSink))
            .build()?,
    );
    info!(snapshot = %config.snapshot_path.display(), "planner loaded");

    // Fire-and-forget holiday fetch for the displayed year. A failed fetch
    // downgrades to the computed calendar with a visible warning.
    let holiday_service = service.clone();
    let country = config.country.clone();
    tokio::spawn(async move {
        let year = Local::now().year();
        let client = HolidayClient::new(country);
        match client.fetch(year).await {
            Ok(feed) => {
                holiday_service.ensure_holidays(year, Some(feed));
                info!(year, "holiday feed merged");
            }
            Err(err) => {
                warn!(year, %err, "holiday fetch failed");
                println!("Could not fetch holidays; showing a computed set only.");
                holiday_service.ensure_holidays(year, None);
            }
        }
    });

    let assistant = config
        .assistant_key
        .as_ref()
        .map(|key| AssistantClient::new(key.clone()));

    let mut schedule_tick = tokio::time::interval(Duration::from_secs(config.poll_seconds));
    let mut timer_tick = tokio::time::interval(Duration::from_secs(config.timer_tick_seconds));
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = schedule_tick.tick() => {
                let now = Local::now().naive_local();
                if let Err(err) = service.poll_schedules(now) {
                    warn!(%err, "schedule poll failed");
                }
                react_to_alert(service.alert_transition());
            }
            _ = timer_tick.tick() => {
                if let Err(err) = service.tick_timers() {
                    warn!(%err, "timer tick failed");
                }
                if let Err(err) = service.advance_stopwatch(config.timer_tick_seconds * 1000) {
                    warn!(%err, "stopwatch advance failed");
                }
                react_to_alert(service.alert_transition());
            }
            line = lines.next_line(), if stdin_open => {
                match line {
                    Ok(Some(command)) if !command.trim().is_empty() => {
                        match &assistant {
                            Some(client) => {
                                dispatch_command(
                                    &service,
                                    client,
                                    command.trim(),
                                    Local::now().naive_local(),
                                )
                                .await;
                            }
                            None => println!(
                                "Assistant is not configured; set TAKT_ASSISTANT_KEY."
                            ),
                        }
                    }
                    Ok(Some(_)) => {}
                    Ok(None) => stdin_open = false,
                    Err(err) => {
                        warn!(%err, "stdin closed");
                        stdin_open = false;
                    }
                }
            }
        }
    }
}

fn react_to_alert(transition: Option<AlertTransition>) {
    // Audible playback is the platform's job; the shell only logs the
    // single shared loop starting and stopping.
    match transition {
        Some(AlertTransition::Start) => info!("alert loop engaged"),
        Some(AlertTransition::Stop) => info!("alert loop released"),
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use takt_core::recurrence::Recurrence;
    use tempfile::tempdir;

    #[test]
    fn json_store_round_trips_a_snapshot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("takt.json");
        let store = JsonFileStore::new(&path);
        assert!(store.load().unwrap().is_none());

        let mut state = PlannerState::default();
        state
            .add_reminder(
                NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
                "sync".into(),
                NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                Recurrence::Daily,
            )
            .unwrap();
        store.save(&state).unwrap();
        assert_eq!(store.load().unwrap(), Some(state));
    }

    #[test]
    fn corrupt_snapshots_fail_loudly_instead_of_wiping_data() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("takt.json");
        fs::write(&path, "not json").unwrap();
        let store = JsonFileStore::new(&path);
        assert!(store.load().is_err());
    }

    #[test]
    fn config_defaults_are_sensible() {
        let config = AppConfig::default();
        assert_eq!(config.country, "US");
        assert_eq!(config.poll_seconds, 30);
        assert_eq!(config.timer_tick_seconds, 1);
        assert!(config.assistant_key.is_none());
    }

    #[test]
    fn notifications_render_for_the_terminal() {
        let rendered = describe(&Notification::AlarmFiring {
            label: "wake".into(),
            time: NaiveTime::from_hms_opt(6, 30, 0).unwrap(),
        });
        assert_eq!(rendered, "Alarm wake (06:30)");
    }
}
