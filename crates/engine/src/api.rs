// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The control plane's operations.
//!
//! Every mutation is a single store transaction, including the deployment
//! it enqueues. Entities are addressed by project and name; deployments and
//! replays by id or unambiguous id prefix.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tb_adapters::{PluginInfo, PluginKind, PluginRegistry, SchedulerAdapter};
use tb_core::{
    Clock, DependencyRef, DeploymentStatus, Event, Job, JobDeployment, JobSpec, Namespace, NamespaceId, Project,
    ProjectId, Replay, ReplayConfig, ReplayStatus, Resource, RunEvent, RunListing, Secret, SecretType,
    UnknownDependencies, WireEvent,
};
use tb_storage::{MaterializedState, ResourceDraft, Store, StoreError};
use tokio::sync::Notify;
use tracing::info;

use crate::config::EngineConfig;
use crate::deploy::DagCache;
use crate::derive::{check_hooks, derive_urns};
use crate::error::EngineError;
use crate::ingest::{IngestReceipt, Ingester};
use crate::replay::{build_replay, ReplayRequest, ReplayRunner};
use crate::resolver;

pub struct ControlPlane<S: SchedulerAdapter, C: Clock> {
    store: Store,
    plugins: PluginRegistry,
    clock: C,
    config: EngineConfig,
    dags: Arc<DagCache<C>>,
    deploy_wake: Arc<Notify>,
    replays: Arc<ReplayRunner<S, C>>,
    ingester: Arc<Ingester>,
}

/// A written job and the deployment that will push it.
#[derive(Debug, Clone)]
pub struct JobWrite {
    pub job: Job,
    pub deployment: JobDeployment,
}

impl<S: SchedulerAdapter, C: Clock> ControlPlane<S, C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Store,
        plugins: PluginRegistry,
        clock: C,
        config: EngineConfig,
        dags: Arc<DagCache<C>>,
        deploy_wake: Arc<Notify>,
        replays: Arc<ReplayRunner<S, C>>,
        ingester: Arc<Ingester>,
    ) -> Self {
        Self { store, plugins, clock, config, dags, deploy_wake, replays, ingester }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn plugins(&self) -> Vec<PluginInfo> {
        self.plugins.list()
    }

    // -- tenants --

    pub fn register_project(&self, name: &str, config: BTreeMap<String, String>) -> Result<Project, EngineError> {
        let now = self.clock.utc_now();
        let project = self.store.transact(|tx| tx.register_project(name, config, now))?;
        // project variables feed every compiled DAG
        self.dags.invalidate(project.id);
        info!(project = %project.name, "project registered");
        Ok(project)
    }

    pub fn register_namespace(
        &self,
        project: &str,
        name: &str,
        config: BTreeMap<String, String>,
    ) -> Result<Namespace, EngineError> {
        let now = self.clock.utc_now();
        let namespace = self.store.transact(|tx| {
            let project_id = tx.project_named(project)?.id;
            tx.register_namespace(project_id, name, config, now)
        })?;
        info!(project, namespace = %namespace.name, "namespace registered");
        Ok(namespace)
    }

    pub fn list_namespaces(&self, project: &str) -> Result<Vec<Namespace>, EngineError> {
        self.store.read(|s| {
            let project = named_project(s, project)?;
            Ok(s.namespaces_of(project.id).into_iter().cloned().collect())
        })
    }

    pub fn save_secret(
        &self,
        project: &str,
        namespace: Option<&str>,
        name: &str,
        encrypted_value: &str,
        secret_type: SecretType,
    ) -> Result<Secret, EngineError> {
        let now = self.clock.utc_now();
        let secret = self.store.transact(|tx| {
            let (project_id, namespace_id) = scope(tx, project, namespace)?;
            Ok::<_, EngineError>(tx.save_secret(project_id, namespace_id, name, encrypted_value, secret_type, now)?)
        })?;
        info!(project, secret = %secret.name, "secret saved");
        Ok(secret)
    }

    /// A secret as a job in `namespace` sees it.
    pub fn get_secret(&self, project: &str, namespace: Option<&str>, name: &str) -> Result<Secret, EngineError> {
        self.store.read(|s| {
            let (project_id, namespace_id) = scope(s, project, namespace)?;
            s.secret(project_id, namespace_id, name).cloned().ok_or_else(|| StoreError::not_found("secret", name).into())
        })
    }

    /// User secrets visible from a scope, shadowing applied.
    pub fn list_secrets(&self, project: &str, namespace: Option<&str>) -> Result<Vec<Secret>, EngineError> {
        self.store.read(|s| {
            let (project_id, namespace_id) = scope(s, project, namespace)?;
            Ok(s.secrets_visible(project_id, namespace_id)
                .into_iter()
                .filter(|secret| secret.secret_type == SecretType::User)
                .cloned()
                .collect())
        })
    }

    pub fn delete_secret(&self, project: &str, namespace: Option<&str>, name: &str) -> Result<(), EngineError> {
        self.store.transact(|tx| {
            let (project_id, namespace_id) = scope(tx, project, namespace)?;
            tx.delete_secret(project_id, namespace_id, name)?;
            Ok(())
        })
    }

    pub fn save_resource(&self, project: &str, namespace: &str, draft: ResourceDraft) -> Result<Resource, EngineError> {
        let now = self.clock.utc_now();
        let resource = self.store.transact(|tx| {
            let project_id = tx.project_named(project)?.id;
            let namespace_id = tx.namespace_named(project_id, namespace)?.id;
            tx.save_resource(project_id, namespace_id, draft, now)
        })?;
        info!(project, resource = %resource.urn, "resource saved");
        Ok(resource)
    }

    pub fn get_resource(&self, project: &str, name: &str) -> Result<Resource, EngineError> {
        self.store.read(|s| {
            let project = named_project(s, project)?;
            s.resource_by_name(project.id, name).cloned().ok_or_else(|| StoreError::not_found("resource", name).into())
        })
    }

    pub fn list_resources(&self, project: &str, namespace: Option<&str>) -> Result<Vec<Resource>, EngineError> {
        self.store.read(|s| {
            let (project_id, namespace_id) = scope(s, project, namespace)?;
            Ok(s.resources_of(project_id, namespace_id).into_iter().cloned().collect())
        })
    }

    pub fn delete_resource(&self, project: &str, name: &str) -> Result<(), EngineError> {
        self.store.transact(|tx| {
            let project_id = tx.project_named(project)?.id;
            tx.delete_resource(project_id, name)?;
            Ok(())
        })
    }

    // -- jobs --

    /// Validate a spec without writing it: structure, plugins, URNs.
    pub async fn validate_job(&self, project: &str, spec: &JobSpec) -> Result<(), EngineError> {
        let project = self.store.read(|s| named_project(s, project).cloned())?;
        self.prepare(&project, spec).await.map(|_| ())
    }

    /// Insert or replace a job and queue a deployment of its project, in
    /// one transaction. Nothing is written when validation fails.
    pub async fn upsert_job(&self, project: &str, namespace: &str, spec: JobSpec) -> Result<JobWrite, EngineError> {
        let project = self.store.read(|s| named_project(s, project).cloned())?;
        let urns = self.prepare(&project, &spec).await?;

        let now = self.clock.utc_now();
        let write = self.store.transact(|tx| {
            let namespace_id = tx.namespace_named(project.id, namespace)?.id;
            check_bare_dependencies(tx, project.id, &spec)?;
            let job = tx.upsert_job(project.id, namespace_id, spec, urns.destination, urns.sources, now)?;
            let (deployment, _) = tx.enqueue_deployment(project.id, now)?;
            Ok::<_, EngineError>(JobWrite { job, deployment })
        })?;

        self.after_write(project.id);
        info!(
            project = %project.name,
            job = %write.job.spec.name,
            destination = %write.job.destination_urn,
            deployment = %write.deployment.id,
            "job saved"
        );
        Ok(write)
    }

    async fn prepare(&self, project: &Project, spec: &JobSpec) -> Result<crate::derive::DerivedUrns, EngineError> {
        spec.validate()?;
        self.plugins.get_kind(&spec.task.plugin_name, PluginKind::Task)?;
        check_hooks(&self.plugins, spec)?;
        derive_urns(&self.plugins, self.config.call_deadline, project, spec).await
    }

    /// Delete a job (cascading to its sources, edges and runs) and queue a
    /// deployment so the workflow engine drops it.
    pub fn delete_job(&self, project: &str, name: &str) -> Result<JobDeployment, EngineError> {
        let now = self.clock.utc_now();
        let (project_id, deployment) = self.store.transact(|tx| {
            let project_id = tx.project_named(project)?.id;
            tx.delete_job(project_id, name)?;
            let (deployment, _) = tx.enqueue_deployment(project_id, now)?;
            Ok::<_, EngineError>((project_id, deployment))
        })?;
        self.after_write(project_id);
        info!(project, job = name, "job deleted");
        Ok(deployment)
    }

    pub fn get_job(&self, project: &str, name: &str) -> Result<Job, EngineError> {
        self.store.read(|s| {
            let project = named_project(s, project)?;
            s.job_by_name(project.id, name).cloned().ok_or_else(|| StoreError::not_found("job", name).into())
        })
    }

    /// Jobs of a project by name, optionally only one namespace.
    pub fn list_jobs(&self, project: &str, namespace: Option<&str>) -> Result<Vec<Job>, EngineError> {
        self.store.read(|s| {
            let (project_id, namespace_id) = scope(s, project, namespace)?;
            Ok(s.jobs_of(project_id)
                .into_iter()
                .filter(|j| namespace_id.is_none_or(|ns| j.namespace_id == ns))
                .cloned()
                .collect())
        })
    }

    // -- deployments --

    /// Queue a deployment of a project; returns the already-queued one if
    /// there is one, and whether this call created it.
    pub fn deploy_project(&self, project: &str) -> Result<(JobDeployment, bool), EngineError> {
        let now = self.clock.utc_now();
        let (deployment, created) = self.store.transact(|tx| {
            let project_id = tx.project_named(project)?.id;
            tx.enqueue_deployment(project_id, now)
        })?;
        if created {
            self.deploy_wake.notify_one();
        }
        Ok((deployment, created))
    }

    pub fn get_deployment(&self, id: &str) -> Result<JobDeployment, EngineError> {
        self.store.read(|s| s.deployment_by_prefix(id).cloned().ok_or_else(|| StoreError::not_found("deployment", id).into()))
    }

    /// Deployments of a project, newest first.
    pub fn list_deployments(
        &self,
        project: &str,
        status: Option<DeploymentStatus>,
    ) -> Result<Vec<JobDeployment>, EngineError> {
        self.store.read(|s| {
            let project = named_project(s, project)?;
            Ok(s.deployments_of(project.id)
                .into_iter()
                .filter(|d| status.is_none_or(|st| d.status == st))
                .cloned()
                .collect())
        })
    }

    pub fn latest_in_progress_deployment(&self, project: &str) -> Result<Option<JobDeployment>, EngineError> {
        Ok(self.list_deployments(project, Some(DeploymentStatus::InProgress))?.into_iter().next())
    }

    pub fn cancel_deployment(&self, id: &str) -> Result<JobDeployment, EngineError> {
        let now = self.clock.utc_now();
        let id = self.store.transact(|tx| {
            let id = tx.deployment_by_prefix(id).map(|d| d.id).ok_or_else(|| StoreError::not_found("deployment", id))?;
            tx.cancel_deployment(id, now)?;
            Ok::<_, EngineError>(id)
        })?;
        info!(deployment = %id, "deployment cancelled");
        self.get_deployment(&id.to_string())
    }

    // -- replays --

    /// Plan and persist a replay; the runner picks it up when its project
    /// has room.
    pub fn submit_replay(
        &self,
        project: &str,
        job: &str,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        config: ReplayConfig,
    ) -> Result<Replay, EngineError> {
        let now = self.clock.utc_now();
        let replay = self.store.transact(|tx| {
            let project_id = tx.project_named(project)?.id;
            let request = ReplayRequest { project_id, job_name: job.to_string(), start_date, end_date, config };
            let plan = build_replay(tx, &request, now)?;
            for (id, claims) in plan.superseded {
                info!(replay = %id, by = %plan.replay.id, runs = claims.len(), "replay runs superseded");
                tx.emit(Event::ReplaySuperseded { id, by: plan.replay.id, claims, at: now });
            }
            tx.emit(Event::ReplayCreated { replay: Box::new(plan.replay.clone()) });
            Ok::<_, EngineError>(plan.replay)
        })?;
        info!(replay = %replay.id, project, job, runs = replay.total_runs(), "replay accepted");
        self.replays.wake();
        Ok(replay)
    }

    /// The replay `submit_replay` would create, without persisting it.
    pub fn plan_replay(
        &self,
        project: &str,
        job: &str,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        config: ReplayConfig,
    ) -> Result<Replay, EngineError> {
        let now = self.clock.utc_now();
        self.store.read(|s| {
            let project = named_project(s, project)?;
            let request = ReplayRequest { project_id: project.id, job_name: job.to_string(), start_date, end_date, config };
            Ok(build_replay(s, &request, now)?.replay)
        })
    }

    pub fn get_replay(&self, id: &str) -> Result<Replay, EngineError> {
        self.store.read(|s| s.replay_by_prefix(id).cloned().ok_or_else(|| StoreError::not_found("replay", id).into()))
    }

    /// Replays of a project, newest first.
    pub fn list_replays(&self, project: &str, status: Option<ReplayStatus>) -> Result<Vec<Replay>, EngineError> {
        self.store.read(|s| {
            let project = named_project(s, project)?;
            Ok(s.replays_of(project.id, status).into_iter().cloned().collect())
        })
    }

    /// Stop a replay that has not finished. A running one stops at its next
    /// step, so the returned state may still be in progress.
    pub fn cancel_replay(&self, id: &str) -> Result<Replay, EngineError> {
        let replay = self.get_replay(id)?;
        if !self.replays.cancel(replay.id)? {
            return Err(EngineError::invalid("replay", format!("replay {} already {}", replay.id, replay.status)));
        }
        self.get_replay(&replay.id.to_string())
    }

    // -- runs --

    /// Apply one workflow-engine event for `project/job`.
    pub async fn ingest_event(&self, project: &str, job: &str, wire: &WireEvent) -> Result<IngestReceipt, EngineError> {
        let event = RunEvent::from_wire(wire)?;
        let job_id = self.store.read(|s| {
            let project = named_project(s, project)?;
            s.job_by_name(project.id, job).map(|j| j.id).ok_or_else(|| EngineError::from(StoreError::not_found("job", job)))
        })?;
        self.ingester.submit(job_id, event).await
    }

    /// Every scheduled instant of a job in `[start, end]` with its latest
    /// run. Instants the workflow engine has not reported are `pending`.
    pub fn get_job_runs(
        &self,
        project: &str,
        job: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RunListing>, EngineError> {
        if end < start {
            return Err(EngineError::invalid("end", "before start"));
        }
        let now = self.clock.utc_now();
        self.store.read(|s| {
            let project = named_project(s, project)?;
            let job = s.job_by_name(project.id, job).ok_or_else(|| StoreError::not_found("job", job))?;
            let cron = job.spec.cron()?;

            let mut listing: BTreeMap<DateTime<Utc>, RunListing> = cron
                .instants_between(start, end)
                .into_iter()
                .filter(|at| job.is_active_at(*at))
                .map(|at| (at, RunListing::expected(at)))
                .collect();
            for run in s.latest_runs_between(job.id, start, end) {
                listing.insert(run.scheduled_at, RunListing::of_run(run, now));
            }
            Ok(listing.into_values().collect())
        })
    }

    /// Drop every run of a job; returns how many job runs were removed.
    pub fn delete_all_runs_by_job(&self, project: &str, job: &str) -> Result<usize, EngineError> {
        let count = self.store.transact(|tx| {
            let project_id = tx.project_named(project)?.id;
            let job = tx.job_by_name(project_id, job).ok_or_else(|| StoreError::not_found("job", job))?;
            let (job_id, count) = (job.id, tx.run_count(job.id));
            if count > 0 {
                tx.emit(Event::RunsCleared { job_id, scheduled_at: None });
            }
            Ok::<_, EngineError>(count)
        })?;
        info!(project, job, count, "runs deleted");
        Ok(count)
    }

    // -- diagnostics --

    pub fn unknown_dependencies(&self, project: &str) -> Result<UnknownDependencies, EngineError> {
        self.store.read(|s| {
            let project = named_project(s, project)?;
            Ok(UnknownDependencies {
                inferred: resolver::unknown_inferred_dependencies(s, project.id),
                declared: resolver::unknown_static_dependencies(s, project.id),
            })
        })
    }

    fn after_write(&self, project_id: ProjectId) {
        self.dags.invalidate(project_id);
        self.deploy_wake.notify_one();
    }
}

fn named_project<'a>(state: &'a MaterializedState, name: &str) -> Result<&'a Project, EngineError> {
    state.project_by_name(name).ok_or_else(|| StoreError::not_found("project", name).into())
}

/// Project id plus an optional namespace id, both by name.
fn scope(
    state: &MaterializedState,
    project: &str,
    namespace: Option<&str>,
) -> Result<(ProjectId, Option<NamespaceId>), EngineError> {
    let project = named_project(state, project)?;
    let namespace_id = match namespace {
        Some(name) => Some(
            state
                .namespace_by_name(project.id, name)
                .ok_or_else(|| StoreError::not_found("namespace", name))?
                .id,
        ),
        None => None,
    };
    Ok((project.id, namespace_id))
}

/// Bare dependency keys must name a job of the same project.
fn check_bare_dependencies(state: &MaterializedState, project_id: ProjectId, spec: &JobSpec) -> Result<(), EngineError> {
    let missing: BTreeSet<&str> = spec
        .dependencies
        .keys()
        .filter_map(|key| match DependencyRef::parse(key) {
            Some(DependencyRef::Bare(name)) if state.job_by_name(project_id, &name).is_none() => {
                Some(key.as_str())
            }
            _ => None,
        })
        .collect();
    match missing.into_iter().next() {
        Some(dependency) => {
            Err(EngineError::UnknownDependency { job: spec.name.clone(), dependency: dependency.to_string() })
        }
        None => Ok(()),
    }
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;
