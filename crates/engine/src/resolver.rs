// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dependency resolution.
//!
//! A job's upstreams come from two places: the tables its task reads
//! (inferred by matching source URNs against other jobs' destinations) and
//! the `dependencies` keys in its spec. Static edges override inferred ones
//! for the same target, self-edges are dropped, and HTTP dependencies pass
//! through untouched.

use std::collections::BTreeMap;

use tb_core::{
    DependencyRef, EdgeKind, EdgeOrigin, HttpDependency, Job, JobDependency, JobId, ProjectId,
};
use tb_storage::MaterializedState;

use crate::error::EngineError;

/// Resolved upstreams of one job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Edges sorted by upstream project then job name.
    pub edges: Vec<JobDependency>,
    /// `project/job` keys whose target does not exist, sorted.
    pub unresolved: Vec<String>,
    pub http: Vec<HttpDependency>,
}

/// Resolve `job` against `state`, reading `sources` as its source URN set.
///
/// A bare dependency key naming a job missing from the job's own project is
/// fatal; a missing `project/job` is recorded as unresolved.
pub fn resolve(state: &MaterializedState, job: &Job, sources: &[String]) -> Result<Resolution, EngineError> {
    let mut edges: BTreeMap<JobId, JobDependency> = BTreeMap::new();

    for upstream in state.jobs_by_destinations(sources) {
        if upstream.id == job.id {
            continue;
        }
        let kind = if upstream.project_id == job.project_id { EdgeKind::Intra } else { EdgeKind::Inter };
        edges.insert(upstream.id, edge(state, job, upstream, kind, EdgeOrigin::Inferred));
    }

    let mut unresolved = Vec::new();
    for (key, spec) in &job.spec.dependencies {
        let Some(reference) = DependencyRef::parse(key) else {
            return Err(EngineError::invalid("dependencies", format!("malformed key {key:?}")));
        };
        let target = match &reference {
            DependencyRef::Bare(name) => match state.job_by_name(job.project_id, name) {
                Some(target) => target,
                None => {
                    return Err(EngineError::UnknownDependency {
                        job: job.spec.name.clone(),
                        dependency: name.clone(),
                    })
                }
            },
            DependencyRef::Qualified { project, job: name } => {
                match state.project_by_name(project).and_then(|p| state.job_by_name(p.id, name)) {
                    Some(target) => target,
                    None => {
                        unresolved.push(reference.to_string());
                        continue;
                    }
                }
            }
        };
        if target.id == job.id {
            continue;
        }
        let kind = spec.kind.unwrap_or(if target.project_id == job.project_id {
            EdgeKind::Intra
        } else {
            EdgeKind::Inter
        });
        edges.insert(target.id, edge(state, job, target, kind, EdgeOrigin::Static));
    }

    let mut edges: Vec<JobDependency> = edges.into_values().collect();
    edges.sort_by(|a, b| {
        (&a.dependent_project_name, &a.dependent_job_name).cmp(&(&b.dependent_project_name, &b.dependent_job_name))
    });
    unresolved.sort();
    unresolved.dedup();

    Ok(Resolution { edges, unresolved, http: job.spec.http_dependencies.clone() })
}

fn edge(state: &MaterializedState, job: &Job, upstream: &Job, kind: EdgeKind, origin: EdgeOrigin) -> JobDependency {
    JobDependency {
        job_id: job.id,
        dependent_job_id: upstream.id,
        dependent_project_id: upstream.project_id,
        dependent_job_name: upstream.spec.name.clone(),
        dependent_project_name: state.projects.get(&upstream.project_id).map(|p| p.name.clone()).unwrap_or_default(),
        kind,
        origin,
    }
}

/// Source URNs of each job in a project that no known job writes.
pub fn unknown_inferred_dependencies(state: &MaterializedState, project_id: ProjectId) -> BTreeMap<String, Vec<String>> {
    let mut out = BTreeMap::new();
    for job in state.jobs_of(project_id) {
        let missing: Vec<String> = state
            .sources_of(job.id)
            .iter()
            .filter(|urn| state.job_by_destination(urn).is_none())
            .cloned()
            .collect();
        if !missing.is_empty() {
            out.insert(job.spec.name.clone(), missing);
        }
    }
    out
}

/// Static dependency keys of each job in a project whose target is absent.
pub fn unknown_static_dependencies(state: &MaterializedState, project_id: ProjectId) -> BTreeMap<String, Vec<String>> {
    let mut out = BTreeMap::new();
    for job in state.jobs_of(project_id) {
        let mut missing: Vec<String> = job
            .spec
            .dependencies
            .keys()
            .filter_map(|key| DependencyRef::parse(key))
            .filter(|reference| {
                let target = match reference {
                    DependencyRef::Bare(name) => state.job_by_name(project_id, name),
                    DependencyRef::Qualified { project, job } => {
                        state.project_by_name(project).and_then(|p| state.job_by_name(p.id, job))
                    }
                };
                target.is_none()
            })
            .map(|reference| reference.to_string())
            .collect();
        if !missing.is_empty() {
            missing.sort();
            out.insert(job.spec.name.clone(), missing);
        }
    }
    out
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
