// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job specifications.
//!
//! [`JobSpec`] is exactly what a user authored; [`Job`] wraps it with the
//! server-assigned fields (ids, derived destination, timestamps).

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dependency::{DependencyRef, DependencySpec, HttpDependency};
use crate::error::ErrorKind;
use crate::id::{JobId, NamespaceId, ProjectId};
use crate::schedule::{CronSchedule, ScheduleError};
use crate::span::{parse_duration, SpanError};
use crate::window::{self, WindowError, WindowSpec};

/// Errors from validating a job spec in isolation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("invalid job name {0:?}")]
    InvalidName(String),
    #[error("invalid window: {0}")]
    Window(#[from] WindowError),
    #[error("invalid schedule: {0}")]
    Schedule(#[from] ScheduleError),
    #[error("invalid {field}: {reason}")]
    Invalid { field: String, reason: String },
}

impl SpecError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidSpec
    }

    fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        SpecError::Invalid { field: field.into(), reason: reason.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSpec {
    pub start_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    /// Cron expression or descriptor
    pub interval: String,
}

impl Default for ScheduleSpec {
    fn default() -> Self {
        Self {
            start_date: Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).single().unwrap_or_default(),
            end_date: None,
            interval: "0 0 * * *".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Retry {
    #[serde(default)]
    pub count: u32,
    /// Seconds between attempts
    #[serde(default)]
    pub delay: u64,
    #[serde(default)]
    pub exponential_backoff: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Behavior {
    #[serde(default)]
    pub depends_on_past: bool,
    #[serde(default)]
    pub catch_up: bool,
    #[serde(default)]
    pub retry: Retry,
    /// Maximum run duration before an SLA miss, e.g. `2h`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sla: Option<String>,
}

impl Behavior {
    /// SLA in seconds, 0 when unset.
    pub fn sla_seconds(&self) -> i64 {
        self.sla.as_deref().and_then(|s| parse_duration(s).ok()).map(|d| d.num_seconds()).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub plugin_name: String,
    #[serde(default)]
    pub config: IndexMap<String, String>,
    #[serde(default)]
    pub window: WindowSpec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookType {
    Pre,
    Post,
    Fail,
}

crate::simple_display! {
    HookType {
        Pre => "pre",
        Post => "post",
        Fail => "fail",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hook {
    pub plugin_name: String,
    #[serde(default)]
    pub config: IndexMap<String, String>,
    #[serde(rename = "type")]
    pub hook_type: HookType,
}

/// A user-authored job definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    pub schedule: ScheduleSpec,
    #[serde(default)]
    pub behavior: Behavior,
    pub task: TaskSpec,
    /// Asset path → content, e.g. `query.sql`
    #[serde(default)]
    pub assets: BTreeMap<String, String>,
    #[serde(default)]
    pub hooks: Vec<Hook>,
    /// Upstream key (`job` or `project/job`) → declaration
    #[serde(default)]
    pub dependencies: IndexMap<String, DependencySpec>,
    #[serde(default)]
    pub http_dependencies: Vec<HttpDependency>,
}

crate::builder! {
    pub struct JobSpecBuilder => JobSpec {
        into {
            name: String = "job-a",
            owner: String = "data@example.com",
            description: String = "",
        }
        set {
            version: u32 = 1,
            labels: BTreeMap<String, String> = BTreeMap::new(),
            schedule: ScheduleSpec = ScheduleSpec::default(),
            behavior: Behavior = Behavior::default(),
            task: TaskSpec = TaskSpec {
                plugin_name: "sql".to_string(),
                config: IndexMap::new(),
                window: WindowSpec::new("24h", "0", "d"),
            },
            assets: BTreeMap<String, String> = BTreeMap::new(),
            hooks: Vec<Hook> = Vec::new(),
            dependencies: IndexMap<String, DependencySpec> = IndexMap::new(),
            http_dependencies: Vec<HttpDependency> = Vec::new(),
        }
    }
}

impl JobSpec {
    /// Structural validation. Registry-dependent checks (plugin names,
    /// uniqueness) happen at the API and store layers.
    pub fn validate(&self) -> Result<(), SpecError> {
        if self.name.trim().is_empty() {
            return Err(SpecError::Missing("name"));
        }
        if !is_valid_job_name(&self.name) {
            return Err(SpecError::InvalidName(self.name.clone()));
        }
        if self.version == 0 {
            return Err(SpecError::invalid("version", "must be at least 1"));
        }
        if self.owner.trim().is_empty() {
            return Err(SpecError::Missing("owner"));
        }
        if self.task.plugin_name.trim().is_empty() {
            return Err(SpecError::Missing("task.plugin_name"));
        }

        CronSchedule::parse(&self.schedule.interval)?;
        if let Some(end) = self.schedule.end_date {
            if end < self.schedule.start_date {
                return Err(SpecError::invalid("schedule.end_date", "before start_date"));
            }
        }
        window::validate(&self.task.window)?;

        if let Some(sla) = &self.behavior.sla {
            parse_duration(sla).map_err(|e: SpanError| SpecError::invalid("behavior.sla", e.to_string()))?;
        }

        for hook in &self.hooks {
            if hook.plugin_name.trim().is_empty() {
                return Err(SpecError::Missing("hooks[].plugin_name"));
            }
        }

        for key in self.dependencies.keys() {
            match DependencyRef::parse(key) {
                Some(r) if r.job() == self.name && matches!(r, DependencyRef::Bare(_)) => {
                    return Err(SpecError::invalid("dependencies", "a job cannot depend on itself"));
                }
                Some(_) => {}
                None => return Err(SpecError::invalid("dependencies", format!("malformed key {key:?}"))),
            }
        }

        for http in &self.http_dependencies {
            if http.name.trim().is_empty() {
                return Err(SpecError::Missing("http_dependencies[].name"));
            }
            if !(http.url.starts_with("http://") || http.url.starts_with("https://")) {
                return Err(SpecError::invalid("http_dependencies[].url", format!("{:?} is not http(s)", http.url)));
            }
        }
        Ok(())
    }

    pub fn cron(&self) -> Result<CronSchedule, ScheduleError> {
        CronSchedule::parse(&self.schedule.interval)
    }

    /// Hooks of one type, in declaration order.
    pub fn hooks_of(&self, hook_type: HookType) -> impl Iterator<Item = &Hook> {
        self.hooks.iter().filter(move |h| h.hook_type == hook_type)
    }
}

/// Job names: letters, digits, `_`, `-` and `.`.
pub fn is_valid_job_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 220
        && name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// A stored job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub project_id: ProjectId,
    pub namespace_id: NamespaceId,
    pub spec: JobSpec,
    /// Derived by the task plugin; never user-supplied.
    pub destination_urn: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Whether `t` falls inside the job's active schedule range.
    pub fn is_active_at(&self, t: DateTime<Utc>) -> bool {
        t >= self.spec.schedule.start_date && self.spec.schedule.end_date.map_or(true, |end| t <= end)
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
