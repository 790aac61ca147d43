// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Replays: re-execution of a job (and optionally its dependents) over a
//! historical date range.
//!
//! The execution tree is stored flat. Each node names its tree parent by
//! index and lists every in-tree upstream, so a job reached through several
//! parents appears once.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{JobId, ProjectId, ReplayId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayStatus {
    Accepted,
    InProgress,
    Succeeded,
    /// Also the end state of a cancelled replay, with message `cancelled`
    Failed,
}

crate::simple_display! {
    ReplayStatus {
        Accepted => "accepted",
        InProgress => "in_progress",
        Succeeded => "succeeded",
        Failed => "failed",
    }
}

impl ReplayStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "accepted" => Some(Self::Accepted),
            "in_progress" => Some(Self::InProgress),
            "succeeded" => Some(Self::Succeeded),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayConfig {
    #[serde(default)]
    pub ignore_downstream: bool,
    /// Take over overlapping instants of older, still-running replays
    #[serde(default)]
    pub force: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayRunStatus {
    Pending,
    /// Cleared and re-triggered; waiting for the workflow engine
    Issued,
    Succeeded,
    Failed,
    /// Taken over by a newer forced replay
    Superseded,
    Cancelled,
}

crate::simple_display! {
    ReplayRunStatus {
        Pending => "pending",
        Issued => "issued",
        Succeeded => "succeeded",
        Failed => "failed",
        Superseded => "superseded",
        Cancelled => "cancelled",
    }
}

impl ReplayRunStatus {
    pub fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::Issued)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayRun {
    pub scheduled_at: DateTime<Utc>,
    pub status: ReplayRunStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionNode {
    pub node_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub upstream_indices: Vec<usize>,
    pub job_id: JobId,
    pub job_name: String,
    pub project_id: ProjectId,
    pub runs: Vec<ReplayRun>,
}

impl ExecutionNode {
    pub fn run(&self, at: DateTime<Utc>) -> Option<&ReplayRun> {
        self.runs.iter().find(|r| r.scheduled_at == at)
    }

    pub fn run_mut(&mut self, at: DateTime<Utc>) -> Option<&mut ReplayRun> {
        self.runs.iter_mut().find(|r| r.scheduled_at == at)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayFailure {
    pub job_name: String,
    pub scheduled_at: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replay {
    pub id: ReplayId,
    pub job_id: JobId,
    pub project_id: ProjectId,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: ReplayStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub config: ReplayConfig,
    pub execution_tree: Vec<ExecutionNode>,
    #[serde(default)]
    pub failures: Vec<ReplayFailure>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Replay {
    /// `(job, instant)` pairs this replay still intends to execute.
    pub fn open_claims(&self) -> BTreeSet<(JobId, DateTime<Utc>)> {
        self.execution_tree
            .iter()
            .flat_map(|node| {
                node.runs.iter().filter(|r| r.status.is_open()).map(move |r| (node.job_id, r.scheduled_at))
            })
            .collect()
    }

    /// Every distinct instant in the tree, in time order.
    pub fn instants(&self) -> Vec<DateTime<Utc>> {
        let set: BTreeSet<_> =
            self.execution_tree.iter().flat_map(|n| n.runs.iter().map(|r| r.scheduled_at)).collect();
        set.into_iter().collect()
    }

    pub fn total_runs(&self) -> usize {
        self.execution_tree.iter().map(|n| n.runs.len()).sum()
    }

    pub fn count_runs(&self, status: ReplayRunStatus) -> usize {
        self.execution_tree.iter().flat_map(|n| n.runs.iter()).filter(|r| r.status == status).count()
    }
}

#[cfg(test)]
#[path = "replay_tests.rs"]
mod tests;
