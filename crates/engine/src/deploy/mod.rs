// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deployment workers.
//!
//! A worker claims one queued deployment, re-derives each job's URNs,
//! resolves and compiles the project, and pushes every task to the workflow
//! engine. Failures are recorded per job; the rest of the project still
//! deploys.

mod sweeper;

use std::collections::BTreeSet;
use std::sync::Arc;

use tb_adapters::{with_deadline, PluginRegistry, SchedulerAdapter};
use tb_core::{
    Clock, Dag, DeploymentDetails, DeploymentFailure, DeploymentId, DeploymentStatus, Job, JobDependency,
    JobDeployment, ProjectId,
};
use tb_storage::{content_hash, MaterializedState, SpecCache, Store, StoreError};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::derive::derive_urns;
use crate::error::EngineError;
use crate::{graph, resolver};

/// Compiled DAGs keyed by project and spec content.
pub type DagCache<C> = SpecCache<Dag, C>;

pub struct Deployer<S: SchedulerAdapter, C: Clock> {
    store: Store,
    plugins: PluginRegistry,
    scheduler: S,
    clock: C,
    config: EngineConfig,
    dags: Arc<DagCache<C>>,
    wake: Arc<Notify>,
}

/// Failures collected while deploying one project.
#[derive(Default)]
struct Outcome {
    failures: Vec<DeploymentFailure>,
    failed_jobs: BTreeSet<String>,
    success_count: usize,
}

impl Outcome {
    fn fail(&mut self, job_name: &str, message: impl Into<String>) {
        if !job_name.is_empty() {
            self.failed_jobs.insert(job_name.to_string());
        }
        self.failures.push(DeploymentFailure { job_name: job_name.to_string(), message: message.into() });
    }

    fn into_details(self) -> DeploymentDetails {
        let failure_count = self.failures.len();
        DeploymentDetails { failures: self.failures, success_count: self.success_count, failure_count }
    }
}

impl<S: SchedulerAdapter, C: Clock> Deployer<S, C> {
    pub fn new(
        store: Store,
        plugins: PluginRegistry,
        scheduler: S,
        clock: C,
        config: EngineConfig,
        dags: Arc<DagCache<C>>,
        wake: Arc<Notify>,
    ) -> Self {
        Self { store, plugins, scheduler, clock, config, dags, wake }
    }

    /// Start `deploy_workers` workers and the sweeper.
    pub fn spawn(self: Arc<Self>, shutdown: CancellationToken) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::with_capacity(self.config.deploy_workers + 1);
        for worker in 0..self.config.deploy_workers.max(1) {
            let this = Arc::clone(&self);
            let shutdown = shutdown.clone();
            handles.push(tokio::spawn(async move { this.work(worker, shutdown).await }));
        }
        let this = Arc::clone(&self);
        handles.push(tokio::spawn(async move { sweeper::run(this, shutdown).await }));
        handles
    }

    async fn work(&self, worker: usize, shutdown: CancellationToken) {
        debug!(worker, "deployment worker started");
        loop {
            while !shutdown.is_cancelled() {
                if self.run_next().await.is_none() {
                    break;
                }
            }
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = self.wake.notified() => {}
                _ = tokio::time::sleep(self.config.deploy_poll_interval) => {}
            }
        }
        debug!(worker, "deployment worker stopped");
    }

    /// Claim and deploy the oldest claimable deployment, if any.
    pub async fn run_next(&self) -> Option<(DeploymentId, DeploymentStatus)> {
        let now = self.clock.utc_now();
        let claimed = match self.store.transact(|tx| Ok::<_, StoreError>(tx.claim_deployments(1, now))) {
            Ok(claimed) => claimed,
            Err(e) => {
                warn!(error = %e, "failed to claim a deployment");
                return None;
            }
        };
        let deployment = claimed.into_iter().next()?;
        let status = self.run(&deployment).await;
        Some((deployment.id, status))
    }

    async fn run(&self, deployment: &JobDeployment) -> DeploymentStatus {
        info!(deployment = %deployment.id, project = %deployment.project_id, "deploying");
        let outcome = match self.deploy(deployment.project_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let mut outcome = Outcome::default();
                outcome.fail("", e.to_string());
                outcome
            }
        };
        let details = outcome.into_details();
        let (succeeded, failed) = (details.success_count, details.failure_count);
        let now = self.clock.utc_now();
        match self.store.transact(|tx| tx.finish_deployment(deployment.id, details, now)) {
            Ok(status) => {
                info!(deployment = %deployment.id, %status, succeeded, failed, "deployment finished");
                status
            }
            Err(e) => {
                // Swept or cancelled while we worked; the stored status stands.
                warn!(deployment = %deployment.id, error = %e, "could not record deployment outcome");
                self.store
                    .read(|s| s.deployment(deployment.id).map(|d| d.status))
                    .unwrap_or(DeploymentStatus::Failed)
            }
        }
    }

    async fn deploy(&self, project_id: ProjectId) -> Result<Outcome, EngineError> {
        let mut outcome = Outcome::default();
        self.refresh_urns(project_id, &mut outcome).await?;
        self.resolve(project_id, &mut outcome)?;

        let dag = match self.compile(project_id) {
            Ok(dag) => dag,
            Err(EngineError::Cycle { cycles }) => {
                let message = EngineError::Cycle { cycles: cycles.clone() }.to_string();
                for name in cycles.iter().flatten() {
                    outcome.fail(name, message.clone());
                }
                return Ok(outcome);
            }
            Err(e) => return Err(e),
        };

        for task in &dag.tasks {
            if outcome.failed_jobs.contains(&task.name) {
                continue;
            }
            let what = format!("deploy of task {}", task.name);
            match with_deadline(self.config.call_deadline, what, self.scheduler.deploy_task(&dag.project, task)).await {
                Ok(()) => outcome.success_count += 1,
                Err(e) => outcome.fail(&task.name, e.to_string()),
            }
        }

        let keep = dag.task_names();
        let removal = self.scheduler.remove_stale(&dag.project, &keep);
        match with_deadline(self.config.call_deadline, "stale task cleanup", removal).await {
            Ok(removed) if !removed.is_empty() => info!(project = %dag.project, ?removed, "removed stale tasks"),
            Ok(_) => {}
            Err(e) => outcome.fail("", e.to_string()),
        }
        Ok(outcome)
    }

    /// Re-derive destination and sources of every job; write back the ones
    /// that changed, unless the job was edited meanwhile.
    async fn refresh_urns(&self, project_id: ProjectId, outcome: &mut Outcome) -> Result<(), EngineError> {
        let (project, jobs) = self.store.read(|s| {
            let project = s.projects.get(&project_id).cloned();
            let jobs: Vec<(Job, Vec<String>)> =
                s.jobs_of(project_id).into_iter().map(|j| (j.clone(), s.sources_of(j.id).to_vec())).collect();
            (project, jobs)
        });
        let project = project.ok_or_else(|| StoreError::not_found("project", project_id))?;

        let mut changed = Vec::new();
        for (job, sources) in jobs {
            match derive_urns(&self.plugins, self.config.call_deadline, &project, &job.spec).await {
                Ok(urns) if urns.destination != job.destination_urn || urns.sources != sources => {
                    changed.push((job, urns));
                }
                Ok(_) => {}
                Err(e) => outcome.fail(&job.spec.name, e.to_string()),
            }
        }
        if changed.is_empty() {
            return Ok(());
        }

        let now = self.clock.utc_now();
        self.store.transact(|tx| {
            for (job, urns) in changed {
                let current = tx.jobs.get(&job.id).map(|j| j.updated_at);
                if current != Some(job.updated_at) {
                    continue;
                }
                debug!(job = %job.spec.name, destination = %urns.destination, "refreshing job URNs");
                tx.upsert_job(project_id, job.namespace_id, job.spec, urns.destination, urns.sources, now)?;
            }
            Ok::<_, EngineError>(())
        })
    }

    /// Recompute every job's edges; store the ones that changed.
    fn resolve(&self, project_id: ProjectId, outcome: &mut Outcome) -> Result<(), EngineError> {
        let failures = self.store.transact(|tx| {
            let state: &MaterializedState = &**tx;
            let mut changes: Vec<(tb_core::JobId, Vec<JobDependency>)> = Vec::new();
            let mut failures = Vec::new();
            for job in state.jobs_of(project_id) {
                match resolver::resolve(state, job, state.sources_of(job.id)) {
                    Ok(resolution) if resolution.edges != state.upstreams_of(job.id) => {
                        changes.push((job.id, resolution.edges));
                    }
                    Ok(_) => {}
                    Err(e) => failures.push((job.spec.name.clone(), e.to_string())),
                }
            }
            for (job_id, edges) in changes {
                tx.replace_dependencies(job_id, edges);
            }
            Ok::<_, EngineError>(failures)
        })?;
        for (job, message) in failures {
            outcome.fail(&job, message);
        }
        Ok(())
    }

    fn compile(&self, project_id: ProjectId) -> Result<Arc<Dag>, EngineError> {
        self.store.read(|state| {
            let key = dag_key(state, project_id);
            if let Some(dag) = self.dags.get(project_id, &key) {
                debug!(project = %project_id, "compiled DAG cache hit");
                return Ok(dag);
            }
            let dag = graph::compile(state, project_id)?;
            Ok(self.dags.insert(project_id, &key, dag))
        })
    }

    pub(crate) fn wake(&self) -> &Notify {
        &self.wake
    }
}

/// Content hash of everything that feeds a project's DAG.
pub(crate) fn dag_key(state: &MaterializedState, project_id: ProjectId) -> String {
    let config = state.projects.get(&project_id).map(|p| &p.config);
    let jobs: Vec<(&Job, &[JobDependency])> =
        state.jobs_of(project_id).into_iter().map(|j| (j, state.upstreams_of(j.id))).collect();
    content_hash(&(config, jobs))
}

#[cfg(test)]
#[path = "../deploy_tests.rs"]
mod tests;
