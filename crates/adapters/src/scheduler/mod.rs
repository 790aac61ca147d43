// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow engine adapter.
//!
//! The control plane pushes compiled DAGs and issues replay runs; run
//! progress comes back through the event ingester, not through this trait.

mod file;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tb_core::DagTask;
use thiserror::Error;

pub use file::FileScheduler;

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeScheduler, SchedulerCall};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("workflow engine rejected {what}: {message}")]
    Rejected { what: String, message: String },
}

#[async_trait]
pub trait SchedulerAdapter: Clone + Send + Sync + 'static {
    /// Upsert one task of a project's DAG.
    async fn deploy_task(&self, project: &str, task: &DagTask) -> Result<(), SchedulerError>;

    /// Remove tasks of `project` whose job is not in `keep`; returns the
    /// removed task names.
    async fn remove_stale(&self, project: &str, keep: &[String]) -> Result<Vec<String>, SchedulerError>;

    /// Drop the workflow engine's run history for one instant.
    async fn clear(&self, project: &str, job: &str, scheduled_at: DateTime<Utc>) -> Result<(), SchedulerError>;

    /// Ask the workflow engine to run one instant now.
    async fn trigger(&self, project: &str, job: &str, scheduled_at: DateTime<Utc>) -> Result<(), SchedulerError>;
}
