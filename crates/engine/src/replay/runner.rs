// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Replay execution.
//!
//! Accepted replays are promoted while their project has fewer than
//! `replay_concurrency` in progress. Each in-progress replay runs in its own
//! task: instant by instant, nodes in execution order, every run cleared,
//! triggered and awaited until the ingester reports a terminal status.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tb_adapters::{with_deadline, SchedulerAdapter};
use tb_core::{
    Clock, Event, ExecutionNode, JobId, JobRunStatus, ProjectId, ReplayId, ReplayRunStatus, ReplayStatus,
};
use tb_storage::{MaterializedState, Store, StoreError};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::planner::execution_order;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::ingest::RunOutcome;

/// Message recorded on runs and replays stopped by a user.
pub const CANCELLED: &str = "cancelled";

pub struct ReplayRunner<S: SchedulerAdapter, C: Clock> {
    store: Store,
    scheduler: S,
    clock: C,
    config: EngineConfig,
    outcomes: broadcast::Sender<RunOutcome>,
    running: Mutex<HashMap<ReplayId, CancellationToken>>,
    wake: Notify,
}

/// Why a replay stopped before finishing.
enum Halt {
    Cancelled,
    Shutdown,
    Failed(EngineError),
}

impl From<EngineError> for Halt {
    fn from(e: EngineError) -> Self {
        Halt::Failed(e)
    }
}

impl<S: SchedulerAdapter, C: Clock> ReplayRunner<S, C> {
    pub fn new(
        store: Store,
        scheduler: S,
        clock: C,
        config: EngineConfig,
        outcomes: broadcast::Sender<RunOutcome>,
    ) -> Self {
        Self { store, scheduler, clock, config, outcomes, running: Mutex::new(HashMap::new()), wake: Notify::new() }
    }

    /// Run the promotion loop until shutdown.
    pub fn spawn(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                if let Err(e) = self.promote() {
                    warn!(error = %e, "replay promotion failed");
                }
                self.start_in_progress(&shutdown);
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = self.wake.notified() => {}
                    _ = tokio::time::sleep(self.config.replay_poll_interval) => {}
                }
            }
        })
    }

    /// Look for work now instead of at the next poll.
    pub fn wake(&self) {
        self.wake.notify_one();
    }

    /// Move accepted replays to in progress while their project has room.
    pub fn promote(&self) -> Result<Vec<ReplayId>, EngineError> {
        let limit = self.config.replay_concurrency.max(1);
        let now = self.clock.utc_now();
        self.store.transact(|tx| {
            let state: &MaterializedState = &**tx;
            let mut promoted = Vec::new();
            for project_id in state.projects_with_accepted_replays() {
                let slots = limit.saturating_sub(state.in_progress_replays(project_id));
                promoted.extend(
                    state
                        .active_replays(project_id)
                        .into_iter()
                        .filter(|r| r.status == ReplayStatus::Accepted)
                        .take(slots)
                        .map(|r| r.id),
                );
            }
            for id in &promoted {
                info!(replay = %id, "replay in progress");
                tx.emit(Event::ReplayStatusChanged { id: *id, status: ReplayStatus::InProgress, message: None, at: now });
            }
            Ok(promoted)
        })
    }

    /// Spawn an executor for every in-progress replay without one.
    fn start_in_progress(self: &Arc<Self>, shutdown: &CancellationToken) {
        let ids: Vec<ReplayId> = self.store.read(|s| {
            let mut ids: Vec<_> = s
                .replays
                .values()
                .filter(|r| r.status == ReplayStatus::InProgress)
                .map(|r| (r.created_at, r.id))
                .collect();
            ids.sort();
            ids.into_iter().map(|(_, id)| id).collect()
        });
        for id in ids {
            let cancel = {
                let mut running = self.running.lock();
                if running.contains_key(&id) {
                    continue;
                }
                let token = CancellationToken::new();
                running.insert(id, token.clone());
                token
            };
            let this = Arc::clone(self);
            let shutdown = shutdown.clone();
            tokio::spawn(async move { this.execute(id, cancel, shutdown).await });
        }
    }

    /// Stop a replay. Open runs end cancelled and the replay fails with
    /// message `cancelled` before this returns; a running executor is then
    /// told to stop. Returns false if it had already finished.
    pub fn cancel(&self, id: ReplayId) -> Result<bool, EngineError> {
        let cancelled = self.mark_cancelled(id)?;
        if let Some(token) = self.running.lock().get(&id) {
            token.cancel();
        }
        Ok(cancelled)
    }

    pub fn is_running(&self, id: ReplayId) -> bool {
        self.running.lock().contains_key(&id)
    }

    async fn execute(self: Arc<Self>, id: ReplayId, cancel: CancellationToken, shutdown: CancellationToken) {
        debug!(replay = %id, "replay executor started");
        let result = self.drive(id, &cancel, &shutdown).await;
        let outcome = match result {
            Ok(()) => self.finish(id, None).map(|_| ()),
            Err(Halt::Cancelled) => self.mark_cancelled(id).map(|_| ()),
            Err(Halt::Shutdown) => {
                debug!(replay = %id, "replay interrupted by shutdown");
                Ok(())
            }
            Err(Halt::Failed(e)) => {
                warn!(replay = %id, error = %e, "replay failed");
                self.finish(id, Some(e.to_string())).map(|_| ())
            }
        };
        if let Err(e) = outcome {
            warn!(replay = %id, error = %e, "could not record replay outcome");
        }
        self.running.lock().remove(&id);
    }

    async fn drive(&self, id: ReplayId, cancel: &CancellationToken, shutdown: &CancellationToken) -> Result<(), Halt> {
        let replay = self
            .store
            .read(|s| s.replay(id).cloned())
            .ok_or_else(|| EngineError::from(StoreError::not_found("replay", id)))?;
        let projects: HashMap<ProjectId, String> =
            self.store.read(|s| s.projects.values().map(|p| (p.id, p.name.clone())).collect());
        let order = execution_order(&replay.execution_tree);

        for at in replay.instants() {
            for &index in &order {
                if cancel.is_cancelled() {
                    return Err(Halt::Cancelled);
                }
                if shutdown.is_cancelled() {
                    return Err(Halt::Shutdown);
                }
                let Some((node, status, upstream_failed)) = self.store.read(|s| current(s, id, index, at)) else {
                    continue;
                };
                if !status.is_open() {
                    continue;
                }
                if upstream_failed {
                    self.record(id, index, at, ReplayRunStatus::Failed, Some("upstream failed".into()))?;
                    continue;
                }
                let project = projects.get(&node.project_id).map(String::as_str).unwrap_or_default();
                let Some((status, failure)) = self.run_one(id, &node, project, at, cancel, shutdown).await? else {
                    debug!(replay = %id, job = %node.job_name, %at, "run closed before issue; skipped");
                    continue;
                };
                self.record(id, index, at, status, failure)?;
            }
        }
        Ok(())
    }

    /// Clear, trigger and await one `(job, instant)`.
    ///
    /// The run is claimed in the same transaction that clears earlier runs.
    /// `None` means it was closed meanwhile (superseded by a forced replay,
    /// or cancelled) and nothing was cleared or triggered.
    async fn run_one(
        &self,
        id: ReplayId,
        node: &ExecutionNode,
        project: &str,
        at: DateTime<Utc>,
        cancel: &CancellationToken,
        shutdown: &CancellationToken,
    ) -> Result<Option<(ReplayRunStatus, Option<String>)>, Halt> {
        let now = self.clock.utc_now();
        let claimed = self.store.transact(|tx| {
            let open = tx
                .replay(id)
                .filter(|r| !r.status.is_terminal())
                .and_then(|r| r.execution_tree.iter().find(|n| n.node_index == node.node_index))
                .and_then(|n| n.run(at))
                .is_some_and(|r| r.status.is_open());
            if !open {
                return Ok::<_, EngineError>(false);
            }
            tx.emit(Event::RunsCleared { job_id: node.job_id, scheduled_at: Some(at) });
            tx.emit(Event::ReplayRunUpdated {
                id,
                node_index: node.node_index,
                scheduled_at: at,
                status: ReplayRunStatus::Issued,
                failure: None,
                at: now,
            });
            Ok(true)
        })?;
        if !claimed {
            return Ok(None);
        }

        let limit = self.config.call_deadline;
        let clear = self.scheduler.clear(project, &node.job_name, at);
        if let Err(e) = with_deadline(limit, format!("clear of {}", node.job_name), clear).await {
            return Ok(Some((ReplayRunStatus::Failed, Some(e.to_string()))));
        }
        let mut outcomes = self.outcomes.subscribe();
        let trigger = self.scheduler.trigger(project, &node.job_name, at);
        if let Err(e) = with_deadline(limit, format!("trigger of {}", node.job_name), trigger).await {
            return Ok(Some((ReplayRunStatus::Failed, Some(e.to_string()))));
        }
        debug!(replay = %id, job = %node.job_name, %at, "run issued");

        let timeout = self.config.replay_run_timeout;
        let wait = tokio::time::timeout(timeout, self.await_outcome(&mut outcomes, node.job_id, at));
        tokio::select! {
            _ = cancel.cancelled() => Err(Halt::Cancelled),
            _ = shutdown.cancelled() => Err(Halt::Shutdown),
            result = wait => Ok(Some(match result {
                Ok(JobRunStatus::Success) => (ReplayRunStatus::Succeeded, None),
                Ok(status) => (ReplayRunStatus::Failed, Some(format!("run finished {status}"))),
                Err(_) => (ReplayRunStatus::Failed, Some(format!("no terminal status within {timeout:?}"))),
            })),
        }
    }

    async fn await_outcome(
        &self,
        outcomes: &mut broadcast::Receiver<RunOutcome>,
        job_id: JobId,
        at: DateTime<Utc>,
    ) -> JobRunStatus {
        loop {
            let stored = self.store.read(|s| s.latest_run(job_id, at).map(|r| r.status).filter(|s| s.is_terminal()));
            if let Some(status) = stored {
                return status;
            }
            match outcomes.recv().await {
                Ok(outcome) if outcome.job_id == job_id && outcome.scheduled_at == at => return outcome.status,
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => return std::future::pending().await,
            }
        }
    }

    fn record(
        &self,
        id: ReplayId,
        node_index: usize,
        scheduled_at: DateTime<Utc>,
        status: ReplayRunStatus,
        failure: Option<String>,
    ) -> Result<(), EngineError> {
        let at = self.clock.utc_now();
        self.store.transact(|tx| {
            tx.emit(Event::ReplayRunUpdated { id, node_index, scheduled_at, status, failure, at });
            Ok(())
        })
    }

    /// Close a replay that ran to the end, or one that hit `error`.
    fn finish(&self, id: ReplayId, error: Option<String>) -> Result<ReplayStatus, EngineError> {
        let now = self.clock.utc_now();
        self.store.transact(|tx| {
            let replay = tx.replay(id).ok_or_else(|| StoreError::not_found("replay", id))?;
            if replay.status.is_terminal() {
                return Ok(replay.status);
            }
            let (status, message) = match error {
                Some(message) => (ReplayStatus::Failed, Some(message)),
                None if !replay.failures.is_empty() => (
                    ReplayStatus::Failed,
                    Some(format!("{} of {} runs failed", replay.failures.len(), replay.total_runs())),
                ),
                None => (ReplayStatus::Succeeded, None),
            };
            info!(replay = %id, %status, "replay finished");
            tx.emit(Event::ReplayStatusChanged { id, status, message, at: now });
            Ok(status)
        })
    }

    fn mark_cancelled(&self, id: ReplayId) -> Result<bool, EngineError> {
        let now = self.clock.utc_now();
        self.store.transact(|tx| {
            let replay = tx.replay(id).ok_or_else(|| StoreError::not_found("replay", id))?;
            if replay.status.is_terminal() {
                return Ok(false);
            }
            let mut events: Vec<Event> = replay
                .execution_tree
                .iter()
                .flat_map(|node| {
                    node.runs.iter().filter(|r| r.status.is_open()).map(move |r| Event::ReplayRunUpdated {
                        id,
                        node_index: node.node_index,
                        scheduled_at: r.scheduled_at,
                        status: ReplayRunStatus::Cancelled,
                        failure: Some(CANCELLED.to_string()),
                        at: now,
                    })
                })
                .collect();
            events.push(Event::ReplayStatusChanged {
                id,
                status: ReplayStatus::Failed,
                message: Some(CANCELLED.to_string()),
                at: now,
            });
            for event in events {
                tx.emit(event);
            }
            info!(replay = %id, "replay cancelled");
            Ok(true)
        })
    }
}

/// A node, the status of its run at `at`, and whether an upstream's run at
/// `at` failed.
fn current(
    state: &MaterializedState,
    id: ReplayId,
    index: usize,
    at: DateTime<Utc>,
) -> Option<(ExecutionNode, ReplayRunStatus, bool)> {
    let replay = state.replay(id)?;
    let node = replay.execution_tree.get(index)?;
    let status = node.run(at)?.status;
    let upstream_failed = node
        .upstream_indices
        .iter()
        .filter_map(|u| replay.execution_tree.get(*u))
        .filter_map(|u| u.run(at))
        .any(|r| matches!(r.status, ReplayRunStatus::Failed | ReplayRunStatus::Cancelled));
    Some((node.clone(), status, upstream_failed))
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
