// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Compiled per-project DAG, as pushed to the workflow engine.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::dependency::HttpDependency;
use crate::id::{JobId, ProjectId};
use crate::job::{Behavior, Hook, ScheduleSpec};
use crate::window::WindowSpec;

/// Priority of a root task; each level below loses [`PRIORITY_STEP`].
pub const ROOT_PRIORITY: u32 = 10_000;
pub const PRIORITY_STEP: u32 = 10;
pub const MIN_PRIORITY: u32 = 1;

/// An upstream in another project; the workflow engine waits on it with a sensor.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExternalUpstream {
    pub project: String,
    pub job: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DagTask {
    pub job_id: JobId,
    pub name: String,
    pub namespace: String,
    pub owner: String,
    pub schedule: ScheduleSpec,
    pub behavior: Behavior,
    pub window: WindowSpec,
    pub plugin: String,
    #[serde(default)]
    pub config: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hooks: Vec<Hook>,
    /// Same-project upstream task names, sorted.
    #[serde(default)]
    pub upstreams: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_upstreams: Vec<ExternalUpstream>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub http_sensors: Vec<HttpDependency>,
    /// Same-project downstream task names, sorted.
    #[serde(default)]
    pub downstreams: Vec<String>,
    pub priority: u32,
}

/// Tasks in topological order (ties broken by name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dag {
    pub project_id: ProjectId,
    pub project: String,
    pub tasks: Vec<DagTask>,
}

impl Dag {
    pub fn task(&self, name: &str) -> Option<&DagTask> {
        self.tasks.iter().find(|t| t.name == name)
    }

    pub fn task_names(&self) -> Vec<String> {
        self.tasks.iter().map(|t| t.name.clone()).collect()
    }
}
