// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tb_core::{JobSpec, ReplayConfig, SecretType, WireEvent};

use super::Query;

/// Request from CLI to daemon
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    /// Health check ping
    Ping,

    /// Version handshake
    Hello { version: String },

    /// Get daemon status
    Status,

    /// Request daemon shutdown
    Shutdown,

    Query { query: Query },

    RegisterProject {
        name: String,
        #[serde(default)]
        config: BTreeMap<String, String>,
    },

    RegisterNamespace {
        project: String,
        name: String,
        #[serde(default)]
        config: BTreeMap<String, String>,
    },

    SaveSecret {
        project: String,
        #[serde(default)]
        namespace: Option<String>,
        name: String,
        /// Base64 ciphertext from the secrets store
        value: String,
        #[serde(default)]
        secret_type: SecretType,
    },

    DeleteSecret {
        project: String,
        #[serde(default)]
        namespace: Option<String>,
        name: String,
    },

    SaveResource { project: String, namespace: String, resource: ResourceInput },

    DeleteResource { project: String, name: String },

    /// Create or replace a job and queue a deployment
    UpsertJob { project: String, namespace: String, spec: Box<JobSpec> },

    /// Check a job spec without writing it
    ValidateJob { project: String, spec: Box<JobSpec> },

    DeleteJob { project: String, name: String },

    DeployProject { project: String },

    CancelDeployment { id: String },

    SubmitReplay {
        project: String,
        job: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        #[serde(default)]
        config: ReplayConfig,
    },

    CancelReplay { id: String },

    /// A workflow-engine event for one job
    IngestEvent { project: String, job: String, event: WireEvent },

    DeleteRuns { project: String, job: String },
}

/// A resource definition as submitted; its URN is derived by the daemon.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResourceInput {
    pub name: String,
    pub datastore: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub spec: serde_json::Value,
    #[serde(default)]
    pub assets: BTreeMap<String, String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
