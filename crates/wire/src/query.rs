// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tb_core::{DeploymentStatus, ReplayConfig, ReplayStatus};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Query {
    ListNamespaces {
        project: String,
    },
    /// A secret as seen from `namespace` (project scope when absent)
    GetSecret {
        project: String,
        #[serde(default)]
        namespace: Option<String>,
        name: String,
    },
    ListSecrets {
        project: String,
        #[serde(default)]
        namespace: Option<String>,
    },
    GetResource {
        project: String,
        name: String,
    },
    ListResources {
        project: String,
        #[serde(default)]
        namespace: Option<String>,
    },
    GetJob {
        project: String,
        name: String,
    },
    ListJobs {
        project: String,
        #[serde(default)]
        namespace: Option<String>,
    },
    /// Deployment by id or unique id prefix
    GetDeployment {
        id: String,
    },
    ListDeployments {
        project: String,
        #[serde(default)]
        status: Option<DeploymentStatus>,
    },
    /// Dry run of a replay; nothing is persisted
    PlanReplay {
        project: String,
        job: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        #[serde(default)]
        config: ReplayConfig,
    },
    GetReplay {
        id: String,
    },
    ListReplays {
        project: String,
        #[serde(default)]
        status: Option<ReplayStatus>,
    },
    GetJobRuns {
        project: String,
        job: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    UnknownDependencies {
        project: String,
    },
}
