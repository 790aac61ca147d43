// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run state: one [`JobRun`] per `(job, scheduled_at, attempt)` and one
//! [`OperatorRun`] per task, hook or sensor execution inside that attempt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{JobId, JobRunId, NamespaceId, OperatorRunId, ProjectId};
use crate::window::{Interval, WindowVersion};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobRunStatus {
    Pending,
    Started,
    Success,
    Failed,
    SlaMissed,
}

crate::simple_display! {
    JobRunStatus {
        Pending => "pending",
        Started => "started",
        Success => "success",
        Failed => "failed",
        SlaMissed => "sla_missed",
    }
}

impl JobRunStatus {
    fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Started => 1,
            Self::SlaMissed => 2,
            Self::Success | Self::Failed => 3,
        }
    }

    /// Success and failure are final; an SLA miss can still complete.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }

    /// Status only ever moves forward.
    pub fn can_transition_to(self, next: JobRunStatus) -> bool {
        next.rank() > self.rank()
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "started" | "running" => Some(Self::Started),
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            "sla_missed" => Some(Self::SlaMissed),
            _ => None,
        }
    }
}

/// Data-window bounds frozen when the run started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceData {
    pub window_version: WindowVersion,
    pub dstart: DateTime<Utc>,
    pub dend: DateTime<Utc>,
    /// Bounds under the non-authoritative algorithm, for comparison
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternate: Option<Interval>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRun {
    pub id: JobRunId,
    pub job_id: JobId,
    pub project_id: ProjectId,
    pub namespace_id: NamespaceId,
    pub scheduled_at: DateTime<Utc>,
    pub attempt: u32,
    pub status: JobRunStatus,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
    /// SLA frozen from the job config at start (0 = none)
    #[serde(default)]
    pub sla_definition_seconds: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_data: Option<InstanceData>,
}

impl JobRun {
    /// Whether the run took (or has been running) longer than its SLA.
    pub fn breached_sla(&self, now: DateTime<Utc>) -> bool {
        if self.sla_definition_seconds <= 0 {
            return false;
        }
        let until = self.end_time.unwrap_or(now);
        (until - self.start_time).num_seconds() > self.sla_definition_seconds
    }
}

/// One scheduled instant of a job: its latest run, or the expectation of
/// one when the workflow engine has not reported it yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunListing {
    pub scheduled_at: DateTime<Utc>,
    pub status: JobRunStatus,
    /// 0 for an instant with no run yet
    pub attempt: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
    #[serde(default)]
    pub sla_breached: bool,
}

impl RunListing {
    pub fn expected(scheduled_at: DateTime<Utc>) -> Self {
        Self {
            scheduled_at,
            status: JobRunStatus::Pending,
            attempt: 0,
            start_time: None,
            end_time: None,
            duration_ms: None,
            sla_breached: false,
        }
    }

    pub fn of_run(run: &JobRun, now: DateTime<Utc>) -> Self {
        Self {
            scheduled_at: run.scheduled_at,
            status: run.status,
            attempt: run.attempt,
            start_time: Some(run.start_time),
            end_time: run.end_time,
            duration_ms: run.duration_ms,
            sla_breached: run.status == JobRunStatus::SlaMissed || run.breached_sla(now),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatorKind {
    Task,
    Hook,
    Sensor,
}

crate::simple_display! {
    OperatorKind {
        Task => "task",
        Hook => "hook",
        Sensor => "sensor",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatorStatus {
    Started,
    Success,
    Failed,
    Retry,
}

crate::simple_display! {
    OperatorStatus {
        Started => "started",
        Success => "success",
        Failed => "failed",
        Retry => "retry",
    }
}

impl OperatorStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorRun {
    pub id: OperatorRunId,
    pub kind: OperatorKind,
    /// Operator name as reported by the workflow engine (task id)
    pub name: String,
    pub job_run_id: JobRunId,
    pub job_run_attempt: u32,
    pub status: OperatorStatus,
    /// Operator-level try number, bumped when a retry restarts
    pub attempt: u32,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
