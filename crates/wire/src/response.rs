// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use tb_core::{
    ErrorKind, Job, JobDeployment, JobRunId, Namespace, Project, Replay, Resource, RunListing, Secret,
    UnknownDependencies,
};

/// Response from daemon to CLI
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    /// Generic success
    Ok,

    /// Health check response
    Pong,

    /// Version handshake response
    Hello { version: String },

    /// Daemon is shutting down
    ShuttingDown,

    Status { status: DaemonStatus },

    /// Error response
    Error { kind: ErrorKind, message: String },

    Project { project: Project },

    Namespace { namespace: Namespace },

    Namespaces { namespaces: Vec<Namespace> },

    Secret { secret: Secret },

    Secrets { secrets: Vec<Secret> },

    Resource { resource: Box<Resource> },

    Resources { resources: Vec<Resource> },

    /// A job was written and a deployment queued
    JobSaved { job: Box<Job>, deployment: JobDeployment },

    Job { job: Box<Job> },

    Jobs { jobs: Vec<Job> },

    Deployment {
        deployment: JobDeployment,
        /// False when an already-queued deployment was returned
        #[serde(default)]
        created: bool,
    },

    Deployments { deployments: Vec<JobDeployment> },

    Replay { replay: Box<Replay> },

    Replays { replays: Vec<Replay> },

    /// An ingested run event
    Ingested { event: String, job_run_id: JobRunId, attempt: u32, duplicate: bool },

    Runs { runs: Vec<RunListing> },

    RunsDeleted { count: usize },

    UnknownDependencies { unknown: UnknownDependencies },
}

impl Response {
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Response::Error { kind, message: message.into() }
    }
}

/// Daemon health summary
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DaemonStatus {
    pub version: String,
    pub uptime_secs: u64,
    pub projects: usize,
    pub jobs: usize,
    pub queued_deployments: usize,
    pub active_replays: usize,
    /// Last durable WAL sequence
    pub wal_seq: u64,
}
