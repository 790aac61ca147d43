// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event methods: name, log summary, project scoping

use super::Event;
use crate::id::ProjectId;

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Shutdown => "system:shutdown",
            Event::ProjectRegistered { .. } => "project:registered",
            Event::NamespaceRegistered { .. } => "namespace:registered",
            Event::SecretSaved { .. } => "secret:saved",
            Event::SecretDeleted { .. } => "secret:deleted",
            Event::ResourceSaved { .. } => "resource:saved",
            Event::ResourceDeleted { .. } => "resource:deleted",
            Event::JobUpserted { .. } => "job:upserted",
            Event::JobDeleted { .. } => "job:deleted",
            Event::JobDependenciesReplaced { .. } => "job:dependencies",
            Event::DeploymentQueued { .. } => "deployment:queued",
            Event::DeploymentClaimed { .. } => "deployment:claimed",
            Event::DeploymentFinished { .. } => "deployment:finished",
            Event::JobRunStarted { .. } => "run:started",
            Event::JobRunUpdated { .. } => "run:updated",
            Event::OperatorStarted { .. } => "operator:started",
            Event::OperatorUpdated { .. } => "operator:updated",
            Event::RunsCleared { .. } => "runs:cleared",
            Event::ReplayCreated { .. } => "replay:created",
            Event::ReplayStatusChanged { .. } => "replay:status",
            Event::ReplayRunUpdated { .. } => "replay:run",
            Event::ReplaySuperseded { .. } => "replay:superseded",
            Event::MigrationRecorded { .. } => "migration:recorded",
            Event::MigrationRemoved { .. } => "migration:removed",
            Event::Custom => "custom",
        }
    }

    pub fn log_summary(&self) -> String {
        let t = self.name();
        match self {
            Event::Shutdown | Event::Custom => t.to_string(),

            // -- tenancy --
            Event::ProjectRegistered { project } => {
                format!("{t} id={} name={}", project.id.short(8), project.name)
            }
            Event::NamespaceRegistered { namespace } => {
                format!("{t} id={} project={} name={}", namespace.id.short(8), namespace.project_id.short(8), namespace.name)
            }
            Event::SecretSaved { secret } => format!("{t} id={} name={}", secret.id.short(8), secret.name),
            Event::SecretDeleted { id } => format!("{t} id={id}"),
            Event::ResourceSaved { resource } => format!("{t} id={} urn={}", resource.id.short(8), resource.urn),
            Event::ResourceDeleted { id } => format!("{t} id={id}"),

            // -- job --
            Event::JobUpserted { job, sources } => {
                format!("{t} id={} name={} sources={}", job.id.short(8), job.name(), sources.len())
            }
            Event::JobDeleted { id } => format!("{t} id={id}"),
            Event::JobDependenciesReplaced { job_id, dependencies } => {
                format!("{t} job={} edges={}", job_id.short(8), dependencies.len())
            }

            // -- deployment --
            Event::DeploymentQueued { deployment } => {
                format!("{t} id={} project={}", deployment.id.short(8), deployment.project_id.short(8))
            }
            Event::DeploymentClaimed { id, .. } => format!("{t} id={}", id.short(8)),
            Event::DeploymentFinished { id, status, details, .. } => {
                format!("{t} id={} status={status} failures={}", id.short(8), details.failure_count)
            }

            // -- runs --
            Event::JobRunStarted { run } => format!(
                "{t} id={} job={} scheduled_at={} attempt={}",
                run.id.short(8),
                run.job_id.short(8),
                run.scheduled_at.to_rfc3339(),
                run.attempt
            ),
            Event::JobRunUpdated { id, status, .. } => format!("{t} id={} status={status}", id.short(8)),
            Event::OperatorStarted { run } => format!(
                "{t} id={} run={} {}={} attempt={}",
                run.id.short(8),
                run.job_run_id.short(8),
                run.kind,
                run.name,
                run.attempt
            ),
            Event::OperatorUpdated { id, status, .. } => format!("{t} id={} status={status}", id.short(8)),
            Event::RunsCleared { job_id, scheduled_at } => match scheduled_at {
                Some(at) => format!("{t} job={} scheduled_at={}", job_id.short(8), at.to_rfc3339()),
                None => format!("{t} job={} all", job_id.short(8)),
            },

            // -- replay --
            Event::ReplayCreated { replay } => format!(
                "{t} id={} job={} nodes={} runs={}",
                replay.id.short(8),
                replay.job_id.short(8),
                replay.execution_tree.len(),
                replay.total_runs()
            ),
            Event::ReplayStatusChanged { id, status, .. } => format!("{t} id={} status={status}", id.short(8)),
            Event::ReplayRunUpdated { id, node_index, scheduled_at, status, .. } => format!(
                "{t} id={} node={node_index} scheduled_at={} status={status}",
                id.short(8),
                scheduled_at.to_rfc3339()
            ),
            Event::ReplaySuperseded { id, by, claims, .. } => {
                format!("{t} id={} by={} runs={}", id.short(8), by.short(8), claims.len())
            }

            Event::MigrationRecorded { record } | Event::MigrationRemoved { record } => format!(
                "{t} version={} from={} migration={}",
                record.app_version, record.previous_app_version, record.migration_version
            ),
        }
    }

    /// Project the event belongs to, when it carries one directly.
    pub fn project_id(&self) -> Option<ProjectId> {
        match self {
            Event::ProjectRegistered { project } => Some(project.id),
            Event::NamespaceRegistered { namespace } => Some(namespace.project_id),
            Event::SecretSaved { secret } => Some(secret.project_id),
            Event::ResourceSaved { resource } => Some(resource.project_id),
            Event::JobUpserted { job, .. } => Some(job.project_id),
            Event::DeploymentQueued { deployment } => Some(deployment.project_id),
            Event::JobRunStarted { run } => Some(run.project_id),
            Event::ReplayCreated { replay } => Some(replay.project_id),
            _ => None,
        }
    }
}
