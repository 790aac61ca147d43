// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable state-change events.
//!
//! Every mutation of the control plane is expressed as one or more events,
//! appended to the write-ahead log and then applied to the materialized
//! state. Applying an event twice must leave the state unchanged.

mod methods;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dependency::JobDependency;
use crate::deployment::{DeploymentDetails, DeploymentStatus, JobDeployment};
use crate::id::{DeploymentId, JobId, JobRunId, OperatorRunId, ReplayId, ResourceId, SecretId};
use crate::job::Job;
use crate::release::MigrationRecord;
use crate::replay::{Replay, ReplayRunStatus, ReplayStatus};
use crate::resource::Resource;
use crate::run::{JobRun, JobRunStatus, OperatorRun, OperatorStatus};
use crate::tenant::{Namespace, Project, Secret};

/// Events that mutate control-plane state.
///
/// Serializes with `{"type": "event:name", ...fields}` format.
/// Unknown type tags deserialize to `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "system:shutdown")]
    Shutdown,

    /// Insert or update (config only) a project
    #[serde(rename = "project:registered")]
    ProjectRegistered { project: Project },

    #[serde(rename = "namespace:registered")]
    NamespaceRegistered { namespace: Namespace },

    #[serde(rename = "secret:saved")]
    SecretSaved { secret: Secret },

    #[serde(rename = "secret:deleted")]
    SecretDeleted { id: SecretId },

    #[serde(rename = "resource:saved")]
    ResourceSaved { resource: Resource },

    #[serde(rename = "resource:deleted")]
    ResourceDeleted { id: ResourceId },

    /// Writes the job and replaces its source URN set.
    #[serde(rename = "job:upserted")]
    JobUpserted {
        job: Box<Job>,
        #[serde(default)]
        sources: Vec<String>,
    },

    /// Removes the job with its sources, edges and runs.
    #[serde(rename = "job:deleted")]
    JobDeleted { id: JobId },

    /// Resolver output for one job, replacing the previous edge set.
    #[serde(rename = "job:dependencies")]
    JobDependenciesReplaced { job_id: JobId, dependencies: Vec<JobDependency> },

    #[serde(rename = "deployment:queued")]
    DeploymentQueued { deployment: JobDeployment },

    #[serde(rename = "deployment:claimed")]
    DeploymentClaimed { id: DeploymentId, at: DateTime<Utc> },

    /// Terminal transition (succeeded, failed or cancelled).
    #[serde(rename = "deployment:finished")]
    DeploymentFinished {
        id: DeploymentId,
        status: DeploymentStatus,
        #[serde(default)]
        details: DeploymentDetails,
        at: DateTime<Utc>,
    },

    #[serde(rename = "run:started")]
    JobRunStarted { run: JobRun },

    #[serde(rename = "run:updated")]
    JobRunUpdated {
        id: JobRunId,
        status: JobRunStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end_time: Option<DateTime<Utc>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_ms: Option<i64>,
    },

    #[serde(rename = "operator:started")]
    OperatorStarted { run: OperatorRun },

    #[serde(rename = "operator:updated")]
    OperatorUpdated {
        id: OperatorRunId,
        status: OperatorStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end_time: Option<DateTime<Utc>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_ms: Option<i64>,
    },

    /// Drops job runs (and their operator runs) of a job, for one
    /// scheduled instant or all of them.
    #[serde(rename = "runs:cleared")]
    RunsCleared {
        job_id: JobId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        scheduled_at: Option<DateTime<Utc>>,
    },

    #[serde(rename = "replay:created")]
    ReplayCreated { replay: Box<Replay> },

    #[serde(rename = "replay:status")]
    ReplayStatusChanged {
        id: ReplayId,
        status: ReplayStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        at: DateTime<Utc>,
    },

    /// One `(node, instant)` of a replay moved; a failure message is
    /// appended to the replay's failure list.
    #[serde(rename = "replay:run")]
    ReplayRunUpdated {
        id: ReplayId,
        node_index: usize,
        scheduled_at: DateTime<Utc>,
        status: ReplayRunStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        failure: Option<String>,
        at: DateTime<Utc>,
    },

    /// Pending instants of an older replay taken over by a forced one.
    #[serde(rename = "replay:superseded")]
    ReplaySuperseded {
        id: ReplayId,
        by: ReplayId,
        claims: Vec<(JobId, DateTime<Utc>)>,
        at: DateTime<Utc>,
    },

    #[serde(rename = "migration:recorded")]
    MigrationRecorded { record: MigrationRecord },

    /// Undo of the latest migration record by `tbd rollback`.
    #[serde(rename = "migration:removed")]
    MigrationRemoved { record: MigrationRecord },

    /// Catch-all for event types written by a newer binary
    #[serde(other, skip_serializing)]
    Custom,
}
