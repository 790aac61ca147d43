// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tb_core::DagTask;
use tokio::sync::mpsc;

use super::{SchedulerAdapter, SchedulerError};

/// Recorded scheduler call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerCall {
    DeployTask { project: String, task: String },
    RemoveStale { project: String, keep: Vec<String> },
    Clear { project: String, job: String, scheduled_at: DateTime<Utc> },
    Trigger { project: String, job: String, scheduled_at: DateTime<Utc> },
}

#[derive(Default)]
struct FakeSchedulerState {
    calls: Vec<SchedulerCall>,
    /// Deployed tasks per project.
    tasks: BTreeMap<String, BTreeMap<String, DagTask>>,
    failing: HashSet<String>,
    delay: Option<Duration>,
    subscribers: Vec<mpsc::UnboundedSender<SchedulerCall>>,
}

/// In-memory workflow engine for tests
#[derive(Clone, Default)]
pub struct FakeScheduler {
    inner: Arc<Mutex<FakeSchedulerState>>,
}

impl FakeScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<SchedulerCall> {
        self.inner.lock().calls.clone()
    }

    /// Names of the tasks currently deployed for a project.
    pub fn deployed(&self, project: &str) -> Vec<String> {
        self.inner.lock().tasks.get(project).map(|t| t.keys().cloned().collect()).unwrap_or_default()
    }

    pub fn deployed_task(&self, project: &str, task: &str) -> Option<DagTask> {
        self.inner.lock().tasks.get(project).and_then(|t| t.get(task)).cloned()
    }

    /// Make every call naming `job` fail.
    pub fn fail_job(&self, job: &str) {
        self.inner.lock().failing.insert(job.to_string());
    }

    /// Sleep this long inside every call.
    pub fn set_delay(&self, delay: Duration) {
        self.inner.lock().delay = Some(delay);
    }

    /// Receive every call as it is made.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<SchedulerCall> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.lock().subscribers.push(tx);
        rx
    }

    async fn record(&self, call: SchedulerCall, job: Option<&str>) -> Result<(), SchedulerError> {
        let delay = self.inner.lock().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut inner = self.inner.lock();
        inner.subscribers.retain(|s| s.send(call.clone()).is_ok());
        inner.calls.push(call);
        match job {
            Some(job) if inner.failing.contains(job) => {
                Err(SchedulerError::Rejected { what: job.to_string(), message: "injected failure".into() })
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl SchedulerAdapter for FakeScheduler {
    async fn deploy_task(&self, project: &str, task: &DagTask) -> Result<(), SchedulerError> {
        let call = SchedulerCall::DeployTask { project: project.to_string(), task: task.name.clone() };
        self.record(call, Some(&task.name)).await?;
        self.inner.lock().tasks.entry(project.to_string()).or_default().insert(task.name.clone(), task.clone());
        Ok(())
    }

    async fn remove_stale(&self, project: &str, keep: &[String]) -> Result<Vec<String>, SchedulerError> {
        self.record(SchedulerCall::RemoveStale { project: project.to_string(), keep: keep.to_vec() }, None).await?;
        let mut inner = self.inner.lock();
        let Some(tasks) = inner.tasks.get_mut(project) else { return Ok(Vec::new()) };
        let stale: Vec<String> = tasks.keys().filter(|k| !keep.contains(k)).cloned().collect();
        for name in &stale {
            tasks.remove(name);
        }
        Ok(stale)
    }

    async fn clear(&self, project: &str, job: &str, scheduled_at: DateTime<Utc>) -> Result<(), SchedulerError> {
        let call = SchedulerCall::Clear { project: project.to_string(), job: job.to_string(), scheduled_at };
        self.record(call, Some(job)).await
    }

    async fn trigger(&self, project: &str, job: &str, scheduled_at: DateTime<Utc>) -> Result<(), SchedulerError> {
        let call = SchedulerCall::Trigger { project: project.to_string(), job: job.to_string(), scheduled_at };
        self.record(call, Some(job)).await
    }
}
