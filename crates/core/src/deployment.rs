// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queued deployments of a project's compiled DAG.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{DeploymentId, ProjectId};

/// `in_queue → in_progress → succeeded | failed`, or `in_queue → cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    InQueue,
    InProgress,
    Succeeded,
    Failed,
    Cancelled,
}

crate::simple_display! {
    DeploymentStatus {
        InQueue => "in_queue",
        InProgress => "in_progress",
        Succeeded => "succeeded",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

impl DeploymentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in_queue" => Some(Self::InQueue),
            "in_progress" => Some(Self::InProgress),
            "succeeded" => Some(Self::Succeeded),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentFailure {
    /// Empty for project-level failures (e.g. the scheduler push)
    #[serde(default)]
    pub job_name: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentDetails {
    #[serde(default)]
    pub failures: Vec<DeploymentFailure>,
    #[serde(default)]
    pub success_count: usize,
    #[serde(default)]
    pub failure_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDeployment {
    pub id: DeploymentId,
    pub project_id: ProjectId,
    pub status: DeploymentStatus,
    #[serde(default)]
    pub details: DeploymentDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
