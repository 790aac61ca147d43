// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job, source and dependency-edge handlers.

use std::collections::{BTreeMap, BTreeSet};

use tb_core::{Event, Job, JobDependency, JobId, ProjectId};

use super::MaterializedState;

pub(crate) fn apply(state: &mut MaterializedState, event: &Event) {
    match event {
        Event::JobUpserted { job, sources } => {
            let mut sources = sources.clone();
            sources.sort();
            sources.dedup();
            state.job_sources.insert(job.id, sources);
            state.jobs.insert(job.id, (**job).clone());
        }

        Event::JobDeleted { id } => {
            state.jobs.remove(id);
            state.job_sources.remove(id);
            state.job_dependencies.remove(id);
            for edges in state.job_dependencies.values_mut() {
                edges.retain(|e| e.dependent_job_id != *id);
            }
            state.clear_runs(*id, None);
        }

        Event::JobDependenciesReplaced { job_id, dependencies } => {
            if state.jobs.contains_key(job_id) {
                state.job_dependencies.insert(*job_id, dependencies.clone());
            }
        }

        _ => {}
    }
}

impl MaterializedState {
    pub fn job_by_name(&self, project_id: ProjectId, name: &str) -> Option<&Job> {
        self.jobs.values().find(|j| j.project_id == project_id && j.spec.name == name)
    }

    /// The job that writes `urn`, across all projects.
    pub fn job_by_destination(&self, urn: &str) -> Option<&Job> {
        self.jobs.values().find(|j| j.destination_urn == urn)
    }

    /// Writers of any of `urns`, deduplicated and sorted by name.
    pub fn jobs_by_destinations<S: AsRef<str>>(&self, urns: &[S]) -> Vec<&Job> {
        let wanted: BTreeSet<&str> = urns.iter().map(AsRef::as_ref).collect();
        let mut out: Vec<_> = self.jobs.values().filter(|j| wanted.contains(j.destination_urn.as_str())).collect();
        out.sort_by(|a, b| a.spec.name.cmp(&b.spec.name));
        out
    }

    /// Jobs of a project, sorted by name.
    pub fn jobs_of(&self, project_id: ProjectId) -> Vec<&Job> {
        let mut out: Vec<_> = self.jobs.values().filter(|j| j.project_id == project_id).collect();
        out.sort_by(|a, b| a.spec.name.cmp(&b.spec.name));
        out
    }

    /// Jobs of a project keyed by namespace name.
    pub fn jobs_by_namespace(&self, project_id: ProjectId) -> BTreeMap<String, Vec<&Job>> {
        let mut out: BTreeMap<String, Vec<&Job>> = BTreeMap::new();
        for job in self.jobs_of(project_id) {
            let ns = self.namespaces.get(&job.namespace_id).map(|n| n.name.clone()).unwrap_or_default();
            out.entry(ns).or_default().push(job);
        }
        out
    }

    pub fn sources_of(&self, job_id: JobId) -> &[String] {
        self.job_sources.get(&job_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Source URN sets of every job in a project.
    pub fn project_sources(&self, project_id: ProjectId) -> BTreeMap<JobId, Vec<String>> {
        self.jobs_of(project_id).into_iter().map(|j| (j.id, self.sources_of(j.id).to_vec())).collect()
    }

    /// Upstream edges of a job.
    pub fn upstreams_of(&self, job_id: JobId) -> &[JobDependency] {
        self.job_dependencies.get(&job_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Jobs with an edge on `job_id`, in any project, sorted by name.
    pub fn downstreams_of(&self, job_id: JobId) -> Vec<&Job> {
        let ids: BTreeSet<JobId> = self
            .job_dependencies
            .iter()
            .filter(|(_, edges)| edges.iter().any(|e| e.dependent_job_id == job_id))
            .map(|(id, _)| *id)
            .collect();
        let mut out: Vec<_> = ids.iter().filter_map(|id| self.jobs.get(id)).collect();
        out.sort_by(|a, b| a.spec.name.cmp(&b.spec.name));
        out
    }
}
