// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deployment queue handlers.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tb_core::{DeploymentId, DeploymentStatus, Event, JobDeployment, ProjectId};

use super::{helpers, MaterializedState};

pub(crate) fn apply(state: &mut MaterializedState, event: &Event) {
    match event {
        Event::DeploymentQueued { deployment } => {
            helpers::insert_absent(&mut state.deployments, deployment.id, deployment.clone());
        }

        Event::DeploymentClaimed { id, at } => {
            if let Some(d) = state.deployments.get_mut(id) {
                if d.status == DeploymentStatus::InQueue {
                    d.status = DeploymentStatus::InProgress;
                    d.updated_at = *at;
                }
            }
        }

        Event::DeploymentFinished { id, status, details, at } => {
            if let Some(d) = state.deployments.get_mut(id) {
                if !d.status.is_terminal() {
                    d.status = *status;
                    d.details = details.clone();
                    d.updated_at = *at;
                }
            }
        }

        _ => {}
    }
}

impl MaterializedState {
    pub fn deployment(&self, id: DeploymentId) -> Option<&JobDeployment> {
        self.deployments.get(&id)
    }

    pub fn deployment_by_prefix(&self, prefix: &str) -> Option<&JobDeployment> {
        helpers::find_by_prefix(&self.deployments, prefix)
    }

    /// The queued (not yet claimed) deployment of a project, if any.
    pub fn queued_deployment(&self, project_id: ProjectId) -> Option<&JobDeployment> {
        self.deployments
            .values()
            .filter(|d| d.project_id == project_id && d.status == DeploymentStatus::InQueue)
            .min_by_key(|d| (d.created_at, d.id.to_string()))
    }

    /// Deployments of a project, newest first.
    pub fn deployments_of(&self, project_id: ProjectId) -> Vec<&JobDeployment> {
        let mut out: Vec<_> = self.deployments.values().filter(|d| d.project_id == project_id).collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out
    }

    /// Up to `limit` queued deployments to hand to workers: oldest first, at
    /// most one per project, skipping projects already in progress.
    pub fn claimable_deployments(&self, limit: usize) -> Vec<DeploymentId> {
        let mut busy: HashSet<ProjectId> = self
            .deployments
            .values()
            .filter(|d| d.status == DeploymentStatus::InProgress)
            .map(|d| d.project_id)
            .collect();
        let mut queued: Vec<_> =
            self.deployments.values().filter(|d| d.status == DeploymentStatus::InQueue).collect();
        queued.sort_by_key(|d| (d.created_at, d.id.to_string()));

        let mut out = Vec::new();
        for d in queued {
            if out.len() >= limit {
                break;
            }
            if busy.insert(d.project_id) {
                out.push(d.id);
            }
        }
        out
    }

    /// In-progress deployments not touched since `cutoff`.
    pub fn stale_deployments(&self, cutoff: DateTime<Utc>) -> Vec<DeploymentId> {
        let mut out: Vec<_> = self
            .deployments
            .values()
            .filter(|d| d.status == DeploymentStatus::InProgress && d.updated_at < cutoff)
            .collect();
        out.sort_by_key(|d| d.updated_at);
        out.into_iter().map(|d| d.id).collect()
    }
}
