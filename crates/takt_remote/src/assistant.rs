use anyhow::{anyhow, bail, Context, Result};
use chrono::{NaiveDate, NaiveTime};
use serde_json::{json, Value};
use tracing::debug;

use takt_core::assistant::{AssistantCall, AssistantReply};
use takt_core::clock::StopwatchAction;
use takt_core::keys;

const DEFAULT_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent";

/// Client for the natural-language command interpreter. The model is a
/// black box that either emits structured function calls naming one of the
/// four assistant operations, or answers in plain text.
pub struct AssistantClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl AssistantClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Interprets one free-text command. Every function call in the
    /// response must map to a known operation, otherwise the whole reply is
    /// rejected: a half-understood command applies no mutation at all.
    pub async fn interpret(&self, command: &str, today: NaiveDate) -> Result<AssistantReply> {
        let body = request_body(command, today);
        debug!(%command, "dispatching assistant command");
        let response = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("assistant request failed")?
            .error_for_status()
            .context("assistant returned an error status")?;
        let payload: Value = response
            .json()
            .await
            .context("assistant response was not JSON")?;
        parse_reply(&payload)
    }
}

fn request_body(command: &str, today: NaiveDate) -> Value {
    let system = format!(
        "You are an assistant inside a calendar app. Interpret the user's \
         command with the available tools to manage reminders, alarms, \
         timers, and the stopwatch. Today's date is {}. A time without a \
         date means today; a weekday name means the next such date. An \
         alarm is one-time unless the user asks for repetition.",
        keys::date_key(today)
    );
    json!({
        "system_instruction": { "parts": [{ "text": system }] },
        "contents": [{ "role": "user", "parts": [{ "text": command }] }],
        "tools": [{ "functionDeclarations": [
            {
                "name": "addReminder",
                "description": "Adds a reminder for a specific date and time.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "date": { "type": "string", "description": "YYYY-MM-DD" },
                        "time": { "type": "string", "description": "HH:MM, 24-hour" },
                        "description": { "type": "string" }
                    },
                    "required": ["date", "time", "description"]
                }
            },
            {
                "name": "addAlarm",
                "description": "Adds a one-time or weekly repeating alarm.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "time": { "type": "string", "description": "HH:MM, 24-hour" },
                        "label": { "type": "string" },
                        "repeat": { "type": "boolean" },
                        "days": {
                            "type": "array",
                            "description": "Weekday indices, 0=Sunday through 6=Saturday. Required when repeat is true.",
                            "items": { "type": "number" }
                        }
                    },
                    "required": ["time", "repeat"]
                }
            },
            {
                "name": "addTimer",
                "description": "Adds and immediately starts a countdown timer.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "hours": { "type": "number" },
                        "minutes": { "type": "number" },
                        "seconds": { "type": "number" },
                        "label": { "type": "string" }
                    },
                    "required": ["hours", "minutes", "seconds"]
                }
            },
            {
                "name": "controlStopwatch",
                "description": "Controls the stopwatch.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "action": { "type": "string", "description": "start, stop, lap, or reset" }
                    },
                    "required": ["action"]
                }
            }
        ] }]
    })
}

/// Maps the response payload to calls or text. Unknown call names,
/// unparseable arguments, or a payload with neither calls nor text all
/// reject the reply as a whole.
fn parse_reply(payload: &Value) -> Result<AssistantReply> {
    let parts = payload
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("assistant response had no content"))?;

    let mut calls = Vec::new();
    let mut text_fragments = Vec::new();
    for part in parts {
        if let Some(call) = part.get("functionCall") {
            let name = call
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| anyhow!("function call without a name"))?;
            let args = call.get("args").cloned().unwrap_or_else(|| json!({}));
            calls.push(parse_call(name, &args)?);
        } else if let Some(text) = part.get("text").and_then(Value::as_str) {
            text_fragments.push(text.to_string());
        }
    }

    if !calls.is_empty() {
        Ok(AssistantReply::Calls(calls))
    } else if !text_fragments.is_empty() {
        Ok(AssistantReply::Text(text_fragments.join("\n")))
    } else {
        bail!("assistant response contained neither calls nor text")
    }
}

fn parse_call(name: &str, args: &Value) -> Result<AssistantCall> {
    match name {
        "addReminder" => Ok(AssistantCall::AddReminder {
            date: date_arg(args, "date")?,
            time: time_arg(args, "time")?,
            description: string_arg(args, "description")?,
        }),
        "addAlarm" => Ok(AssistantCall::AddAlarm {
            time: time_arg(args, "time")?,
            label: optional_string_arg(args, "label"),
            repeat: args
                .get("repeat")
                .and_then(Value::as_bool)
                .context("addAlarm: missing repeat flag")?,
            days: days_arg(args)?,
        }),
        "addTimer" => Ok(AssistantCall::AddTimer {
            hours: number_arg(args, "hours")?,
            minutes: number_arg(args, "minutes")?,
            seconds: number_arg(args, "seconds")?,
            label: optional_string_arg(args, "label"),
        }),
        "controlStopwatch" => {
            let action = match string_arg(args, "action")?.as_str() {
                "start" => StopwatchAction::Start,
                "stop" => StopwatchAction::Stop,
                "lap" => StopwatchAction::Lap,
                "reset" => StopwatchAction::Reset,
                other => bail!("controlStopwatch: unknown action {other:?}"),
            };
            Ok(AssistantCall::ControlStopwatch { action })
        }
        other => bail!("unknown assistant operation {other:?}"),
    }
}

fn string_arg(args: &Value, key: &str) -> Result<String> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .with_context(|| format!("missing string argument {key:?}"))
}

fn optional_string_arg(args: &Value, key: &str) -> Option<String> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn date_arg(args: &Value, key: &str) -> Result<NaiveDate> {
    let raw = string_arg(args, key)?;
    keys::parse_date_key(&raw).with_context(|| format!("{key:?} is not a YYYY-MM-DD date: {raw}"))
}

fn time_arg(args: &Value, key: &str) -> Result<NaiveTime> {
    let raw = string_arg(args, key)?;
    NaiveTime::parse_from_str(&raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
        .with_context(|| format!("{key:?} is not an HH:MM time: {raw}"))
}

fn number_arg(args: &Value, key: &str) -> Result<u32> {
    let value = args
        .get(key)
        .with_context(|| format!("missing numeric argument {key:?}"))?;
    value
        .as_u64()
        .or_else(|| {
            value
                .as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
        })
        .and_then(|n| u32::try_from(n).ok())
        .with_context(|| format!("{key:?} is not a non-negative whole number"))
}

fn days_arg(args: &Value) -> Result<Vec<u8>> {
    let Some(value) = args.get("days") else {
        return Ok(Vec::new());
    };
    let list = value.as_array().context("days must be an array")?;
    list.iter()
        .map(|entry| {
            entry
                .as_u64()
                .and_then(|n| u8::try_from(n).ok())
                .filter(|day| *day <= 6)
                .context("days entries must be weekday indices 0-6")
        })
        .collect()
}
