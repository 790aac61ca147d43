// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle events posted by the workflow engine.
//!
//! On the wire an event is `{"type": "<name>", "value": {...}}`. Names may
//! carry a `TYPE_` prefix in any case. Parsing produces [`RunEvent`], one
//! variant per event type.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::ErrorKind;
use crate::run::OperatorKind;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunEventError {
    #[error("unknown event type {0:?}")]
    UnknownType(String),
    #[error("property '{0}' is missing in event payload")]
    MissingField(&'static str),
    #[error("property '{field}' is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl RunEventError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidSpec
    }
}

/// Raw wire envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub value: Map<String, Value>,
}

/// Phase of an operator (task, hook or sensor) lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorPhase {
    Start,
    Success,
    Fail,
    Retry,
}

/// Fields common to every event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPayload {
    pub scheduled_at: DateTime<Utc>,
    pub attempt: u32,
    pub event_time: DateTime<Utc>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorPayload {
    pub run: RunPayload,
    /// Operator name (`task_id` on the wire)
    pub operator: String,
    pub task_start_timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    JobStart(RunPayload),
    JobSuccess(RunPayload),
    JobFail(RunPayload),
    SlaMiss(RunPayload),
    TaskStart(OperatorPayload),
    TaskSuccess(OperatorPayload),
    TaskFail(OperatorPayload),
    TaskRetry(OperatorPayload),
    HookStart(OperatorPayload),
    HookSuccess(OperatorPayload),
    HookFail(OperatorPayload),
    HookRetry(OperatorPayload),
    SensorStart(OperatorPayload),
    SensorSuccess(OperatorPayload),
    SensorFail(OperatorPayload),
    SensorRetry(OperatorPayload),
}

const SCHEDULED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

impl RunEvent {
    pub fn from_wire(wire: &WireEvent) -> Result<Self, RunEventError> {
        let name = normalize_type(&wire.event_type);
        let value = &wire.value;

        let run = || -> Result<RunPayload, RunEventError> {
            Ok(RunPayload {
                scheduled_at: scheduled_at(value)?,
                attempt: attempt(value)?,
                event_time: epoch_field(value, "event_time")?
                    .ok_or(RunEventError::MissingField("event_time"))?,
                status: value.get("status").and_then(Value::as_str).map(str::to_string),
            })
        };
        let operator = |kind: OperatorKind| -> Result<OperatorPayload, RunEventError> {
            let operator = match value.get("task_id").and_then(Value::as_str) {
                Some(s) if !s.trim().is_empty() => s.trim().to_string(),
                _ => kind.to_string(),
            };
            Ok(OperatorPayload {
                run: run()?,
                operator,
                task_start_timestamp: epoch_field(value, "task_start_timestamp")?,
            })
        };

        use OperatorKind::{Hook, Sensor, Task};
        Ok(match name.as_str() {
            "job_start" => RunEvent::JobStart(run()?),
            "job_success" => RunEvent::JobSuccess(run()?),
            "job_fail" | "failure" => RunEvent::JobFail(run()?),
            "sla_miss" => RunEvent::SlaMiss(run()?),
            "task_start" => RunEvent::TaskStart(operator(Task)?),
            "task_success" => RunEvent::TaskSuccess(operator(Task)?),
            "task_fail" => RunEvent::TaskFail(operator(Task)?),
            "task_retry" => RunEvent::TaskRetry(operator(Task)?),
            "hook_start" => RunEvent::HookStart(operator(Hook)?),
            "hook_success" => RunEvent::HookSuccess(operator(Hook)?),
            "hook_fail" => RunEvent::HookFail(operator(Hook)?),
            "hook_retry" => RunEvent::HookRetry(operator(Hook)?),
            "sensor_start" => RunEvent::SensorStart(operator(Sensor)?),
            "sensor_success" => RunEvent::SensorSuccess(operator(Sensor)?),
            "sensor_fail" => RunEvent::SensorFail(operator(Sensor)?),
            "sensor_retry" => RunEvent::SensorRetry(operator(Sensor)?),
            _ => return Err(RunEventError::UnknownType(wire.event_type.clone())),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            RunEvent::JobStart(_) => "job_start",
            RunEvent::JobSuccess(_) => "job_success",
            RunEvent::JobFail(_) => "job_fail",
            RunEvent::SlaMiss(_) => "sla_miss",
            RunEvent::TaskStart(_) => "task_start",
            RunEvent::TaskSuccess(_) => "task_success",
            RunEvent::TaskFail(_) => "task_fail",
            RunEvent::TaskRetry(_) => "task_retry",
            RunEvent::HookStart(_) => "hook_start",
            RunEvent::HookSuccess(_) => "hook_success",
            RunEvent::HookFail(_) => "hook_fail",
            RunEvent::HookRetry(_) => "hook_retry",
            RunEvent::SensorStart(_) => "sensor_start",
            RunEvent::SensorSuccess(_) => "sensor_success",
            RunEvent::SensorFail(_) => "sensor_fail",
            RunEvent::SensorRetry(_) => "sensor_retry",
        }
    }

    pub fn payload(&self) -> &RunPayload {
        match self {
            RunEvent::JobStart(p) | RunEvent::JobSuccess(p) | RunEvent::JobFail(p) | RunEvent::SlaMiss(p) => p,
            RunEvent::TaskStart(op)
            | RunEvent::TaskSuccess(op)
            | RunEvent::TaskFail(op)
            | RunEvent::TaskRetry(op)
            | RunEvent::HookStart(op)
            | RunEvent::HookSuccess(op)
            | RunEvent::HookFail(op)
            | RunEvent::HookRetry(op)
            | RunEvent::SensorStart(op)
            | RunEvent::SensorSuccess(op)
            | RunEvent::SensorFail(op)
            | RunEvent::SensorRetry(op) => &op.run,
        }
    }

    /// Operator kind, phase and payload for operator events.
    pub fn operator(&self) -> Option<(OperatorKind, OperatorPhase, &OperatorPayload)> {
        use OperatorKind::{Hook, Sensor, Task};
        use OperatorPhase::{Fail, Retry, Start, Success};
        Some(match self {
            RunEvent::TaskStart(p) => (Task, Start, p),
            RunEvent::TaskSuccess(p) => (Task, Success, p),
            RunEvent::TaskFail(p) => (Task, Fail, p),
            RunEvent::TaskRetry(p) => (Task, Retry, p),
            RunEvent::HookStart(p) => (Hook, Start, p),
            RunEvent::HookSuccess(p) => (Hook, Success, p),
            RunEvent::HookFail(p) => (Hook, Fail, p),
            RunEvent::HookRetry(p) => (Hook, Retry, p),
            RunEvent::SensorStart(p) => (Sensor, Start, p),
            RunEvent::SensorSuccess(p) => (Sensor, Success, p),
            RunEvent::SensorFail(p) => (Sensor, Fail, p),
            RunEvent::SensorRetry(p) => (Sensor, Retry, p),
            RunEvent::JobStart(_) | RunEvent::JobSuccess(_) | RunEvent::JobFail(_) | RunEvent::SlaMiss(_) => {
                return None
            }
        })
    }

    /// Encode back into the wire envelope.
    pub fn to_wire(&self) -> WireEvent {
        let payload = self.payload();
        let mut value = Map::new();
        // Whole seconds keep the `...:00Z` form; sub-second instants keep their fraction.
        let scheduled_at = payload.scheduled_at.to_rfc3339_opts(SecondsFormat::AutoSi, true);
        value.insert("scheduled_at".into(), scheduled_at.into());
        value.insert("attempt".into(), payload.attempt.into());
        value.insert("event_time".into(), epoch_value(payload.event_time));
        if let Some(status) = &payload.status {
            value.insert("status".into(), status.clone().into());
        }
        if let Some((_, _, op)) = self.operator() {
            value.insert("task_id".into(), op.operator.clone().into());
            if let Some(ts) = op.task_start_timestamp {
                value.insert("task_start_timestamp".into(), epoch_value(ts));
            }
        }
        WireEvent { event_type: self.name().to_string(), value }
    }
}

fn normalize_type(raw: &str) -> String {
    let lower = raw.trim().to_ascii_lowercase();
    lower.strip_prefix("type_").map(str::to_string).unwrap_or(lower)
}

fn scheduled_at(value: &Map<String, Value>) -> Result<DateTime<Utc>, RunEventError> {
    let raw = value
        .get("scheduled_at")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or(RunEventError::MissingField("scheduled_at"))?;
    chrono::NaiveDateTime::parse_from_str(raw, SCHEDULED_AT_FORMAT)
        .map(|naive| naive.and_utc())
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc)))
        .map_err(|e| RunEventError::InvalidField { field: "scheduled_at", reason: e.to_string() })
}

fn attempt(value: &Map<String, Value>) -> Result<u32, RunEventError> {
    match value.get("attempt") {
        None | Some(Value::Null) => Ok(1),
        Some(v) => v
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| *n >= 1)
            .ok_or_else(|| RunEventError::InvalidField { field: "attempt", reason: format!("expected integer >= 1, got {v}") }),
    }
}

/// Unix seconds (float) or RFC 3339 string. Zero counts as missing.
fn epoch_field(value: &Map<String, Value>, field: &'static str) -> Result<Option<DateTime<Utc>>, RunEventError> {
    let invalid = |reason: String| RunEventError::InvalidField { field, reason };
    match value.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| invalid(e.to_string())),
        Some(v) => {
            let secs = v.as_f64().ok_or_else(|| invalid(format!("expected number, got {v}")))?;
            if secs == 0.0 {
                return Ok(None);
            }
            let millis = (secs * 1000.0).round() as i64;
            Utc.timestamp_millis_opt(millis).single().map(Some).ok_or_else(|| invalid(format!("{secs} out of range")))
        }
    }
}

fn epoch_value(t: DateTime<Utc>) -> Value {
    let millis = t.timestamp_millis();
    if millis % 1000 == 0 {
        Value::from(millis / 1000)
    } else {
        Value::from(millis as f64 / 1000.0)
    }
}

#[cfg(test)]
#[path = "run_event_tests.rs"]
mod tests;
