// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transaction view and write-time invariants.
//!
//! A [`Tx`] reads the state as of the start of the transaction and collects
//! events; nothing it emits is visible (even to itself) until the store
//! commits. The write helpers validate against that view before emitting.

use std::collections::BTreeMap;
use std::ops::Deref;

use chrono::{DateTime, Duration, Utc};
use tb_core::{
    tenant, DeploymentDetails, DeploymentFailure, DeploymentId, DeploymentStatus, Event, Job, JobDependency,
    JobDeployment, JobId, JobSpec, Namespace, NamespaceId, Project, ProjectId, Resource, ResourceId, Secret,
    SecretId, SecretType,
};

use crate::error::StoreError;
use crate::state::MaterializedState;

pub struct Tx<'a> {
    state: &'a MaterializedState,
    events: Vec<Event>,
}

impl Deref for Tx<'_> {
    type Target = MaterializedState;

    fn deref(&self) -> &MaterializedState {
        self.state
    }
}

/// Input for [`Tx::save_resource`]; the URN and id are derived.
#[derive(Debug, Clone)]
pub struct ResourceDraft {
    pub name: String,
    pub datastore: String,
    pub resource_type: String,
    pub version: u32,
    pub spec: serde_json::Value,
    pub assets: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
}

impl<'a> Tx<'a> {
    pub(crate) fn new(state: &'a MaterializedState) -> Self {
        Self { state, events: Vec::new() }
    }

    pub(crate) fn into_events(self) -> Vec<Event> {
        self.events
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Events emitted so far in this transaction.
    pub fn pending(&self) -> &[Event] {
        &self.events
    }

    pub fn project(&self, id: ProjectId) -> Result<&'a Project, StoreError> {
        self.state.projects.get(&id).ok_or_else(|| StoreError::not_found("project", id))
    }

    pub fn project_named(&self, name: &str) -> Result<&'a Project, StoreError> {
        self.state.project_by_name(name).ok_or_else(|| StoreError::not_found("project", name))
    }

    pub fn namespace_named(&self, project_id: ProjectId, name: &str) -> Result<&'a Namespace, StoreError> {
        self.state.namespace_by_name(project_id, name).ok_or_else(|| StoreError::not_found("namespace", name))
    }

    /// Insert a project, or replace the config of an existing one.
    pub fn register_project(
        &mut self,
        name: &str,
        config: BTreeMap<String, String>,
        now: DateTime<Utc>,
    ) -> Result<Project, StoreError> {
        if !tenant::is_valid_name(name) {
            return Err(StoreError::invalid("project name", format!("{name:?} is not a valid name")));
        }
        let project = match self.state.project_by_name(name) {
            Some(existing) => Project { config, updated_at: now, ..existing.clone() },
            None => Project { id: ProjectId::new(), name: name.to_string(), config, created_at: now, updated_at: now },
        };
        self.emit(Event::ProjectRegistered { project: project.clone() });
        Ok(project)
    }

    pub fn register_namespace(
        &mut self,
        project_id: ProjectId,
        name: &str,
        config: BTreeMap<String, String>,
        now: DateTime<Utc>,
    ) -> Result<Namespace, StoreError> {
        self.project(project_id)?;
        if !tenant::is_valid_name(name) {
            return Err(StoreError::invalid("namespace name", format!("{name:?} is not a valid name")));
        }
        let namespace = match self.state.namespace_by_name(project_id, name) {
            Some(existing) => Namespace { config, ..existing.clone() },
            None => Namespace { id: NamespaceId::new(), project_id, name: name.to_string(), config, created_at: now },
        };
        self.emit(Event::NamespaceRegistered { namespace: namespace.clone() });
        Ok(namespace)
    }

    /// Insert or overwrite a secret at one scope.
    pub fn save_secret(
        &mut self,
        project_id: ProjectId,
        namespace_id: Option<NamespaceId>,
        name: &str,
        encrypted_value: &str,
        secret_type: SecretType,
        now: DateTime<Utc>,
    ) -> Result<Secret, StoreError> {
        self.project(project_id)?;
        if name.trim().is_empty() {
            return Err(StoreError::invalid("secret name", "must not be empty"));
        }
        if !tenant::is_valid_ciphertext(encrypted_value) {
            return Err(StoreError::invalid("secret value", "expected base64 ciphertext"));
        }
        let id = self.state.secret_at(project_id, namespace_id, name).map(|s| s.id).unwrap_or_else(SecretId::new);
        let secret = Secret {
            id,
            project_id,
            namespace_id,
            name: name.to_string(),
            encrypted_value: encrypted_value.to_string(),
            secret_type,
            updated_at: now,
        };
        self.emit(Event::SecretSaved { secret: secret.clone() });
        Ok(secret)
    }

    pub fn delete_secret(
        &mut self,
        project_id: ProjectId,
        namespace_id: Option<NamespaceId>,
        name: &str,
    ) -> Result<(), StoreError> {
        let secret = self.state.secret_at(project_id, namespace_id, name).ok_or_else(|| StoreError::not_found("secret", name))?;
        self.emit(Event::SecretDeleted { id: secret.id });
        Ok(())
    }

    /// Insert or update a resource. Names are unique per project, so the
    /// same name in a second namespace is a conflict.
    pub fn save_resource(
        &mut self,
        project_id: ProjectId,
        namespace_id: NamespaceId,
        draft: ResourceDraft,
        now: DateTime<Utc>,
    ) -> Result<Resource, StoreError> {
        self.project(project_id)?;
        if draft.name.trim().is_empty() {
            return Err(StoreError::invalid("resource name", "must not be empty"));
        }
        if draft.datastore.trim().is_empty() {
            return Err(StoreError::invalid("resource datastore", "must not be empty"));
        }
        let id = match self.state.resource_by_name(project_id, &draft.name) {
            Some(existing) if existing.namespace_id != namespace_id => {
                return Err(self.conflict_elsewhere("resource", &draft.name, existing.namespace_id));
            }
            Some(existing) => existing.id,
            None => ResourceId::new(),
        };
        let resource = Resource {
            id,
            project_id,
            namespace_id,
            urn: tb_core::resource_urn(&draft.datastore, &draft.name),
            name: draft.name,
            datastore: draft.datastore,
            resource_type: draft.resource_type,
            version: draft.version,
            spec: draft.spec,
            assets: draft.assets,
            labels: draft.labels,
            updated_at: now,
        };
        self.emit(Event::ResourceSaved { resource: resource.clone() });
        Ok(resource)
    }

    pub fn delete_resource(&mut self, project_id: ProjectId, name: &str) -> Result<(), StoreError> {
        let resource = self.state.resource_by_name(project_id, name).ok_or_else(|| StoreError::not_found("resource", name))?;
        self.emit(Event::ResourceDeleted { id: resource.id });
        Ok(())
    }

    /// Write a job and replace its sources. Existing dependency edges are
    /// left alone; the next deployment recomputes them.
    pub fn upsert_job(
        &mut self,
        project_id: ProjectId,
        namespace_id: NamespaceId,
        spec: JobSpec,
        destination_urn: String,
        sources: Vec<String>,
        now: DateTime<Utc>,
    ) -> Result<Job, StoreError> {
        self.project(project_id)?;
        if spec.task.plugin_name.trim().is_empty() {
            return Err(StoreError::invalid("task.plugin_name", "must not be empty"));
        }
        let job = match self.state.job_by_name(project_id, &spec.name) {
            Some(existing) if existing.namespace_id != namespace_id => {
                return Err(self.conflict_elsewhere("job", &spec.name, existing.namespace_id));
            }
            Some(existing) => Job { spec, destination_urn, updated_at: now, ..existing.clone() },
            None => Job {
                id: JobId::new(),
                project_id,
                namespace_id,
                spec,
                destination_urn,
                created_at: now,
                updated_at: now,
            },
        };
        self.emit(Event::JobUpserted { job: Box::new(job.clone()), sources });
        Ok(job)
    }

    pub fn delete_job(&mut self, project_id: ProjectId, name: &str) -> Result<JobId, StoreError> {
        let job = self.state.job_by_name(project_id, name).ok_or_else(|| StoreError::not_found("job", name))?;
        self.emit(Event::JobDeleted { id: job.id });
        Ok(job.id)
    }

    pub fn replace_dependencies(&mut self, job_id: JobId, dependencies: Vec<JobDependency>) {
        self.emit(Event::JobDependenciesReplaced { job_id, dependencies });
    }

    /// Queue a deployment for a project. Returns the queued row and whether
    /// it was created by this call (an already-queued row is reused).
    pub fn enqueue_deployment(
        &mut self,
        project_id: ProjectId,
        now: DateTime<Utc>,
    ) -> Result<(JobDeployment, bool), StoreError> {
        self.project(project_id)?;
        if let Some(existing) = self.state.queued_deployment(project_id) {
            return Ok((existing.clone(), false));
        }
        let deployment = JobDeployment {
            id: DeploymentId::new(),
            project_id,
            status: DeploymentStatus::InQueue,
            details: DeploymentDetails::default(),
            created_at: now,
            updated_at: now,
        };
        self.emit(Event::DeploymentQueued { deployment: deployment.clone() });
        Ok((deployment, true))
    }

    /// Claim up to `limit` queued deployments, at most one per project.
    pub fn claim_deployments(&mut self, limit: usize, now: DateTime<Utc>) -> Vec<JobDeployment> {
        let ids = self.state.claimable_deployments(limit);
        let mut claimed = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(d) = self.state.deployment(id) {
                self.emit(Event::DeploymentClaimed { id, at: now });
                claimed.push(JobDeployment { status: DeploymentStatus::InProgress, updated_at: now, ..d.clone() });
            }
        }
        claimed
    }

    /// Record the outcome of a claimed deployment: failed iff any job failed.
    pub fn finish_deployment(
        &mut self,
        id: DeploymentId,
        details: DeploymentDetails,
        now: DateTime<Utc>,
    ) -> Result<DeploymentStatus, StoreError> {
        let deployment = self.state.deployment(id).ok_or_else(|| StoreError::not_found("deployment", id))?;
        if deployment.status != DeploymentStatus::InProgress {
            return Err(StoreError::Transition(format!("deployment {id} is {}, not in_progress", deployment.status)));
        }
        let status = if details.failure_count > 0 || !details.failures.is_empty() {
            DeploymentStatus::Failed
        } else {
            DeploymentStatus::Succeeded
        };
        self.emit(Event::DeploymentFinished { id, status, details, at: now });
        Ok(status)
    }

    /// Cancel a deployment that no worker has claimed yet.
    pub fn cancel_deployment(&mut self, id: DeploymentId, now: DateTime<Utc>) -> Result<(), StoreError> {
        let deployment = self.state.deployment(id).ok_or_else(|| StoreError::not_found("deployment", id))?;
        if deployment.status != DeploymentStatus::InQueue {
            return Err(StoreError::Transition(format!(
                "deployment {id} is {}; only queued deployments can be cancelled",
                deployment.status
            )));
        }
        self.emit(Event::DeploymentFinished {
            id,
            status: DeploymentStatus::Cancelled,
            details: deployment.details.clone(),
            at: now,
        });
        Ok(())
    }

    /// Fail in-progress deployments idle for longer than `timeout`.
    pub fn sweep_deployments(&mut self, timeout: Duration, now: DateTime<Utc>) -> Vec<DeploymentId> {
        let stale = self.state.stale_deployments(now - timeout);
        for id in &stale {
            let mut details = self.state.deployment(*id).map(|d| d.details.clone()).unwrap_or_default();
            details.failures.push(DeploymentFailure { job_name: String::new(), message: "timeout".to_string() });
            details.failure_count = details.failures.len();
            self.emit(Event::DeploymentFinished { id: *id, status: DeploymentStatus::Failed, details, at: now });
        }
        stale
    }

    fn conflict_elsewhere(&self, entity: &'static str, name: &str, namespace_id: NamespaceId) -> StoreError {
        let ns = self.state.namespaces.get(&namespace_id).map(|n| n.name.as_str()).unwrap_or("?");
        StoreError::Conflict { entity, name: name.to_string(), detail: format!(" in namespace {ns:?}") }
    }
}

#[cfg(test)]
#[path = "tx_tests.rs"]
mod tests;
