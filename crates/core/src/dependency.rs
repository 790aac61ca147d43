// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dependency declarations and resolved edges between jobs.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::{JobId, ProjectId};

/// Whether an edge stays inside one project or crosses projects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Intra,
    Inter,
}

crate::simple_display! {
    EdgeKind {
        Intra => "intra",
        Inter => "inter",
    }
}

/// Where an edge came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeOrigin {
    /// Declared in the job's `dependencies` map.
    Static,
    /// Derived from a source URN matching another job's destination.
    Inferred,
}

crate::simple_display! {
    EdgeOrigin {
        Static => "static",
        Inferred => "inferred",
    }
}

/// Value side of a `dependencies` entry. The key carries the target name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySpec {
    /// Declared edge kind; overrides the kind derived from project membership.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<EdgeKind>,
}

/// Parsed `dependencies` key: `job` or `project/job`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DependencyRef {
    Bare(String),
    Qualified { project: String, job: String },
}

impl DependencyRef {
    pub fn parse(key: &str) -> Option<Self> {
        let key = key.trim();
        match key.split_once('/') {
            None if !key.is_empty() => Some(DependencyRef::Bare(key.to_string())),
            Some((project, job))
                if !project.is_empty() && !job.is_empty() && !job.contains('/') =>
            {
                Some(DependencyRef::Qualified { project: project.to_string(), job: job.to_string() })
            }
            _ => None,
        }
    }

    pub fn job(&self) -> &str {
        match self {
            DependencyRef::Bare(job) => job,
            DependencyRef::Qualified { job, .. } => job,
        }
    }
}

impl fmt::Display for DependencyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyRef::Bare(job) => f.write_str(job),
            DependencyRef::Qualified { project, job } => write!(f, "{project}/{job}"),
        }
    }
}

/// An HTTP endpoint the job waits on before running.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpDependency {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
}

/// A resource URN a job reads from, derived by the task plugin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobSource {
    pub job_id: JobId,
    pub project_id: ProjectId,
    pub resource_urn: String,
}

/// A resolved edge: `job_id` runs after `dependent_job_id`.
///
/// Only the downstream job owns the row; the upstream is referenced by id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobDependency {
    pub job_id: JobId,
    pub dependent_job_id: JobId,
    pub dependent_project_id: ProjectId,
    /// Display name of the upstream job, captured at resolution time.
    pub dependent_job_name: String,
    pub dependent_project_name: String,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
    pub origin: EdgeOrigin,
}

/// Dependencies of a project's jobs that point at nothing known.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnknownDependencies {
    /// Job name to source URNs no job writes.
    pub inferred: BTreeMap<String, Vec<String>>,
    /// Job name to `project/job` keys whose target is absent.
    #[serde(rename = "static")]
    pub declared: BTreeMap<String, Vec<String>>,
}

impl UnknownDependencies {
    pub fn is_empty(&self) -> bool {
        self.inferred.is_empty() && self.declared.is_empty()
    }
}

#[cfg(test)]
#[path = "dependency_tests.rs"]
mod tests;
