// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state from WAL replay

mod deployments;
mod helpers;
mod jobs;
mod replays;
mod runs;
mod tenants;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tb_core::{
    DeploymentId, Event, Job, JobDependency, JobDeployment, JobId, JobRun, JobRunId, MigrationRecord,
    Namespace, NamespaceId, OperatorRun, OperatorRunId, Project, ProjectId, Replay, ReplayId, Resource,
    ResourceId, Secret, SecretId,
};

/// Materialized state built from WAL events.
///
/// Entities live in flat maps keyed by id. Only down-pointers are stored
/// (a job names its project and namespace, a run names its job); parent to
/// child traversal goes through the query methods.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterializedState {
    #[serde(default)]
    pub projects: HashMap<ProjectId, Project>,
    #[serde(default)]
    pub namespaces: HashMap<NamespaceId, Namespace>,
    #[serde(default)]
    pub secrets: HashMap<SecretId, Secret>,
    #[serde(default)]
    pub resources: HashMap<ResourceId, Resource>,
    #[serde(default)]
    pub jobs: HashMap<JobId, Job>,
    /// Upstream resource URNs read by each job, as derived by its plugin.
    #[serde(default)]
    pub job_sources: HashMap<JobId, Vec<String>>,
    /// Resolved upstream edges per downstream job.
    #[serde(default)]
    pub job_dependencies: HashMap<JobId, Vec<JobDependency>>,
    #[serde(default)]
    pub deployments: HashMap<DeploymentId, JobDeployment>,
    #[serde(default)]
    pub job_runs: HashMap<JobRunId, JobRun>,
    #[serde(default)]
    pub operator_runs: HashMap<OperatorRunId, OperatorRun>,
    #[serde(default)]
    pub replays: HashMap<ReplayId, Replay>,
    #[serde(default)]
    pub migrations: Vec<MigrationRecord>,
}

impl MaterializedState {
    /// Apply an event to derive state changes.
    ///
    /// # Idempotency Requirement
    ///
    /// **All event handlers MUST be idempotent.** Applying the same event
    /// twice must produce the same state as applying it once: recovery
    /// replays every WAL entry after the snapshot's sequence number, and a
    /// crash between snapshot write and WAL truncation replays entries the
    /// snapshot already contains.
    ///
    /// Guidelines:
    /// - Use assignment instead of mutation
    /// - Guard inserts with existence checks
    /// - Guard status changes with transition checks
    pub fn apply_event(&mut self, event: &Event) {
        match event {
            Event::ProjectRegistered { .. }
            | Event::NamespaceRegistered { .. }
            | Event::SecretSaved { .. }
            | Event::SecretDeleted { .. }
            | Event::ResourceSaved { .. }
            | Event::ResourceDeleted { .. } => tenants::apply(self, event),

            Event::JobUpserted { .. } | Event::JobDeleted { .. } | Event::JobDependenciesReplaced { .. } => {
                jobs::apply(self, event)
            }

            Event::DeploymentQueued { .. } | Event::DeploymentClaimed { .. } | Event::DeploymentFinished { .. } => {
                deployments::apply(self, event)
            }

            Event::JobRunStarted { .. }
            | Event::JobRunUpdated { .. }
            | Event::OperatorStarted { .. }
            | Event::OperatorUpdated { .. }
            | Event::RunsCleared { .. } => runs::apply(self, event),

            Event::ReplayCreated { .. }
            | Event::ReplayStatusChanged { .. }
            | Event::ReplayRunUpdated { .. }
            | Event::ReplaySuperseded { .. } => replays::apply(self, event),

            Event::MigrationRecorded { record } => {
                if !self.migrations.contains(record) {
                    self.migrations.push(record.clone());
                }
            }
            Event::MigrationRemoved { record } => self.migrations.retain(|r| r != record),

            Event::Custom | Event::Shutdown => {}
        }
    }

    pub fn latest_migration(&self) -> Option<&MigrationRecord> {
        self.migrations.iter().max_by_key(|r| r.created_at)
    }
}

#[cfg(test)]
#[path = "../state_tests/mod.rs"]
mod tests;
