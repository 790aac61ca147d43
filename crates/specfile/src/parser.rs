// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job spec file parsing.
//!
//! Files are decoded into [`JobFile`], where every field is optional so that
//! directory defaults can be layered underneath, then converted into a
//! validated [`JobSpec`].

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use serde::Deserialize;
use tb_core::{
    Behavior, DependencySpec, EdgeKind, ErrorKind, Hook, HookType, HttpDependency, JobSpec, Retry, ScheduleSpec,
    SpecError, TaskSpec, WindowSpec,
};
use thiserror::Error;

/// Spec file syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Toml,
    Hcl,
}

/// Errors from reading a spec file.
#[derive(Debug, Error)]
pub enum SpecFileError {
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("HCL parse error: {0}")]
    Hcl(#[from] hcl::Error),
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("invalid {field}: {reason}")]
    Invalid { field: String, reason: String },
    #[error(transparent)]
    Spec(#[from] SpecError),
    #[error("{} is not a .toml or .hcl file", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SpecFileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SpecFileError::Io { .. } => ErrorKind::Internal,
            _ => ErrorKind::InvalidSpec,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SpecFileError::Io { path: path.into(), source }
    }

    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        SpecFileError::Invalid { field: field.to_string(), reason: reason.into() }
    }
}

/// A scalar config value. TOML and HCL both allow bare numbers and booleans,
/// which the engine stores as strings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl ConfigValue {
    fn into_string(self) -> String {
        match self {
            ConfigValue::Text(s) => s,
            ConfigValue::Int(n) => n.to_string(),
            ConfigValue::Float(n) => n.to_string(),
            ConfigValue::Bool(b) => b.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConfigItem {
    pub name: String,
    pub value: ConfigValue,
}

/// Task or hook config, as a table or as an ordered `[{name, value}]` list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ConfigFile {
    Map(IndexMap<String, ConfigValue>),
    List(Vec<ConfigItem>),
}

impl Default for ConfigFile {
    fn default() -> Self {
        ConfigFile::Map(IndexMap::new())
    }
}

impl ConfigFile {
    fn into_map(self) -> IndexMap<String, String> {
        match self {
            ConfigFile::Map(map) => map.into_iter().map(|(k, v)| (k, v.into_string())).collect(),
            ConfigFile::List(items) => items.into_iter().map(|i| (i.name, i.value.into_string())).collect(),
        }
    }
}

/// Seconds, or a duration string such as `5m`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DelayFile {
    Seconds(u64),
    Text(String),
}

impl DelayFile {
    fn seconds(&self) -> Result<u64, SpecFileError> {
        match self {
            DelayFile::Seconds(s) => Ok(*s),
            DelayFile::Text(text) => {
                let duration =
                    tb_core::parse_duration(text).map_err(|e| SpecFileError::invalid("behavior.retry.delay", e.to_string()))?;
                u64::try_from(duration.num_seconds())
                    .map_err(|_| SpecFileError::invalid("behavior.retry.delay", "must not be negative"))
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ScheduleFile {
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub interval: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RetryFile {
    #[serde(default)]
    pub count: Option<u32>,
    #[serde(default)]
    pub delay: Option<DelayFile>,
    #[serde(default)]
    pub exponential_backoff: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BehaviorFile {
    #[serde(default)]
    pub depends_on_past: Option<bool>,
    #[serde(default)]
    pub catch_up: Option<bool>,
    #[serde(default)]
    pub retry: Option<RetryFile>,
    #[serde(default)]
    pub sla: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TaskFile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub config: ConfigFile,
    #[serde(default)]
    pub window: WindowSpec,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HookFile {
    pub name: String,
    #[serde(default)]
    pub config: ConfigFile,
    #[serde(rename = "type", default)]
    pub hook_type: Option<HookType>,
}

/// One `dependencies` entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DependencyFile {
    /// `job` or `project/job`
    Key(String),
    Http { http: HttpDependency },
    Job {
        job: String,
        #[serde(rename = "type", default)]
        kind: Option<EdgeKind>,
    },
}

impl DependencyFile {
    fn same_target(&self, other: &DependencyFile) -> bool {
        match (self, other) {
            (DependencyFile::Http { http: a }, DependencyFile::Http { http: b }) => a.name == b.name,
            (DependencyFile::Http { .. }, _) | (_, DependencyFile::Http { .. }) => false,
            (a, b) => a.job_key() == b.job_key(),
        }
    }

    fn job_key(&self) -> Option<&str> {
        match self {
            DependencyFile::Key(key) => Some(key.trim()),
            DependencyFile::Job { job, .. } => Some(job.trim()),
            DependencyFile::Http { .. } => None,
        }
    }
}

/// A spec file as written. Also used for directory defaults (`this.*`).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct JobFile {
    #[serde(default)]
    pub version: Option<u32>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub schedule: ScheduleFile,
    #[serde(default)]
    pub behavior: BehaviorFile,
    #[serde(default)]
    pub task: TaskFile,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub hooks: Vec<HookFile>,
    #[serde(default)]
    pub dependencies: Vec<DependencyFile>,
    #[serde(default)]
    pub assets: BTreeMap<String, String>,
}

fn inherit<T: Clone>(own: &mut Option<T>, parent: &Option<T>) {
    if own.is_none() {
        own.clone_from(parent);
    }
}

impl JobFile {
    pub fn parse(content: &str, format: Format) -> Result<Self, SpecFileError> {
        Ok(match format {
            Format::Toml => toml::from_str(content)?,
            Format::Hcl => hcl::from_str(content)?,
        })
    }

    /// Fill unset fields from `parent`. Maps and lists gain the parent's
    /// entries the child does not already have; name, task and assets are
    /// never inherited.
    pub fn merge_from(&mut self, parent: &JobFile) {
        inherit(&mut self.version, &parent.version);
        inherit(&mut self.owner, &parent.owner);
        inherit(&mut self.description, &parent.description);
        inherit(&mut self.schedule.start_date, &parent.schedule.start_date);
        inherit(&mut self.schedule.end_date, &parent.schedule.end_date);
        inherit(&mut self.schedule.interval, &parent.schedule.interval);

        let behavior = &mut self.behavior;
        inherit(&mut behavior.depends_on_past, &parent.behavior.depends_on_past);
        inherit(&mut behavior.catch_up, &parent.behavior.catch_up);
        inherit(&mut behavior.sla, &parent.behavior.sla);
        if let Some(parent_retry) = &parent.behavior.retry {
            let retry = behavior.retry.get_or_insert_with(RetryFile::default);
            inherit(&mut retry.count, &parent_retry.count);
            inherit(&mut retry.delay, &parent_retry.delay);
            inherit(&mut retry.exponential_backoff, &parent_retry.exponential_backoff);
        }

        for (key, value) in &parent.labels {
            self.labels.entry(key.clone()).or_insert_with(|| value.clone());
        }
        for hook in &parent.hooks {
            if !self.hooks.iter().any(|h| h.name == hook.name) {
                self.hooks.push(hook.clone());
            }
        }
        for dep in &parent.dependencies {
            if !self.dependencies.iter().any(|d| d.same_target(dep)) {
                self.dependencies.push(dep.clone());
            }
        }
    }

    /// Convert into a validated [`JobSpec`].
    pub fn into_spec(self) -> Result<JobSpec, SpecFileError> {
        let name = required(self.name, "name")?;
        let start_date = parse_date("schedule.start_date", &required(self.schedule.start_date, "schedule.start_date")?)?;
        let end_date = match self.schedule.end_date.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(parse_date("schedule.end_date", raw)?),
        };
        let interval = required(self.schedule.interval, "schedule.interval")?;

        let retry = match self.behavior.retry {
            None => Retry::default(),
            Some(r) => Retry {
                count: r.count.unwrap_or(0),
                delay: r.delay.as_ref().map(DelayFile::seconds).transpose()?.unwrap_or(0),
                exponential_backoff: r.exponential_backoff.unwrap_or(false),
            },
        };

        let hooks = self
            .hooks
            .into_iter()
            .map(|h| Hook {
                plugin_name: h.name,
                config: h.config.into_map(),
                hook_type: h.hook_type.unwrap_or(HookType::Post),
            })
            .collect();

        let mut dependencies = IndexMap::new();
        let mut http_dependencies = Vec::new();
        for dep in self.dependencies {
            match dep {
                DependencyFile::Key(key) => {
                    dependencies.insert(key.trim().to_string(), DependencySpec::default());
                }
                DependencyFile::Job { job, kind } => {
                    dependencies.insert(job.trim().to_string(), DependencySpec { kind });
                }
                DependencyFile::Http { http } => http_dependencies.push(http),
            }
        }

        let spec = JobSpec {
            version: self.version.unwrap_or(1),
            name,
            owner: self.owner.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            labels: self.labels,
            schedule: ScheduleSpec { start_date, end_date, interval },
            behavior: Behavior {
                depends_on_past: self.behavior.depends_on_past.unwrap_or(false),
                catch_up: self.behavior.catch_up.unwrap_or(false),
                retry,
                sla: self.behavior.sla,
            },
            task: TaskSpec {
                plugin_name: required(self.task.name, "task.name")?,
                config: self.task.config.into_map(),
                window: self.task.window,
            },
            assets: self.assets,
            hooks,
            dependencies,
            http_dependencies,
        };
        spec.validate()?;
        Ok(spec)
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, SpecFileError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(SpecFileError::Missing(field)),
    }
}

/// `2022-01-01` (midnight UTC) or a full RFC 3339 timestamp.
pub fn parse_date(field: &str, raw: &str) -> Result<DateTime<Utc>, SpecFileError> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| SpecFileError::invalid(field, format!("{raw:?} is not a date")))
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
