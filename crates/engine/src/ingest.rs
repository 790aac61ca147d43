// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run event ingestion.
//!
//! Events for one `(job, scheduled_at, attempt)` always land on the same
//! partition worker, so they apply in arrival order; partitions run in
//! parallel. Each event is one store transaction.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use tb_core::{
    window, Event, InstanceData, Job, JobId, JobRun, JobRunId, JobRunStatus, OperatorPhase, OperatorRun, OperatorRunId,
    OperatorStatus, RunEvent, WindowVersion,
};
use tb_storage::{Store, StoreError, Tx};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::EngineError;

/// What an accepted event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReceipt {
    pub event: &'static str,
    pub job_run_id: JobRunId,
    pub attempt: u32,
    /// Already applied; nothing was written.
    pub duplicate: bool,
}

/// A job run reaching success or failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub job_id: JobId,
    pub scheduled_at: DateTime<Utc>,
    pub attempt: u32,
    pub status: JobRunStatus,
}

struct Envelope {
    job_id: JobId,
    event: RunEvent,
    reply: oneshot::Sender<Result<IngestReceipt, EngineError>>,
}

pub struct Ingester {
    partitions: Vec<mpsc::Sender<Envelope>>,
    outcomes: broadcast::Sender<RunOutcome>,
}

impl Ingester {
    /// Start `ingest_partitions` workers applying events to `store`.
    pub fn spawn(store: Store, config: &EngineConfig, shutdown: CancellationToken) -> (Self, Vec<JoinHandle<()>>) {
        let (outcomes, _) = broadcast::channel(config.ingest_queue_depth.max(16) * 4);
        let mut partitions = Vec::new();
        let mut handles = Vec::new();
        for partition in 0..config.ingest_partitions.max(1) {
            let (tx, rx) = mpsc::channel(config.ingest_queue_depth.max(1));
            partitions.push(tx);
            let worker = Partition {
                index: partition,
                store: store.clone(),
                version: config.window_version,
                outcomes: outcomes.clone(),
            };
            handles.push(tokio::spawn(worker.run(rx, shutdown.clone())));
        }
        (Self { partitions, outcomes }, handles)
    }

    /// Apply one event for `job_id` and wait for its result.
    pub async fn submit(&self, job_id: JobId, event: RunEvent) -> Result<IngestReceipt, EngineError> {
        let payload = event.payload();
        let index = partition_of(job_id, payload.scheduled_at, payload.attempt, self.partitions.len());
        let Some(partition) = self.partitions.get(index) else {
            return Err(EngineError::internal("ingest_partition", format!("no partition {index}")));
        };
        let (reply, result) = oneshot::channel();
        partition
            .send(Envelope { job_id, event, reply })
            .await
            .map_err(|_| EngineError::internal("ingest_closed", "ingester is shut down"))?;
        result.await.map_err(|_| EngineError::internal("ingest_closed", "ingest worker dropped the event"))?
    }

    /// Run outcomes, as they are committed.
    pub fn subscribe(&self) -> broadcast::Receiver<RunOutcome> {
        self.outcomes.subscribe()
    }

    pub fn outcomes(&self) -> broadcast::Sender<RunOutcome> {
        self.outcomes.clone()
    }
}

/// Stable partition for a run key.
pub fn partition_of(job_id: JobId, scheduled_at: DateTime<Utc>, attempt: u32, partitions: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    (job_id, scheduled_at, attempt).hash(&mut hasher);
    (hasher.finish() % partitions.max(1) as u64) as usize
}

struct Partition {
    index: usize,
    store: Store,
    version: WindowVersion,
    outcomes: broadcast::Sender<RunOutcome>,
}

impl Partition {
    async fn run(self, mut rx: mpsc::Receiver<Envelope>, shutdown: CancellationToken) {
        loop {
            let envelope = tokio::select! {
                _ = shutdown.cancelled() => break,
                envelope = rx.recv() => match envelope {
                    Some(envelope) => envelope,
                    None => break,
                },
            };
            let result = self.apply(envelope.job_id, &envelope.event);
            match &result {
                Ok(receipt) => debug!(partition = self.index, event = receipt.event, duplicate = receipt.duplicate, "ingested"),
                Err(e) => warn!(
                    partition = self.index,
                    job = %envelope.job_id,
                    event = envelope.event.name(),
                    error = %e,
                    "event rejected"
                ),
            }
            // The caller may have gone away; the event is applied regardless.
            let _ = envelope.reply.send(result);
        }
    }

    fn apply(&self, job_id: JobId, event: &RunEvent) -> Result<IngestReceipt, EngineError> {
        let version = self.version;
        let receipt = self.store.transact(|tx| {
            let job = tx.jobs.get(&job_id).cloned().ok_or_else(|| StoreError::not_found("job", job_id))?;
            apply_run_event(tx, &job, event, version)
        })?;

        let status = match event {
            RunEvent::JobSuccess(_) => Some(JobRunStatus::Success),
            RunEvent::JobFail(_) => Some(JobRunStatus::Failed),
            _ => None,
        };
        if let (Some(status), false) = (status, receipt.duplicate) {
            let payload = event.payload();
            // No receivers is fine.
            let _ = self.outcomes.send(RunOutcome {
                job_id,
                scheduled_at: payload.scheduled_at,
                attempt: payload.attempt,
                status,
            });
        }
        Ok(receipt)
    }
}

/// Validate `event` against the run state of `job` and emit its writes.
pub fn apply_run_event(
    tx: &mut Tx<'_>,
    job: &Job,
    event: &RunEvent,
    version: WindowVersion,
) -> Result<IngestReceipt, EngineError> {
    let payload = event.payload();
    let key = format!("{} at {} attempt {}", job.spec.name, payload.scheduled_at.to_rfc3339(), payload.attempt);
    let receipt = |job_run_id, duplicate| IngestReceipt { event: event.name(), job_run_id, attempt: payload.attempt, duplicate };

    if let Some((kind, phase, op)) = event.operator() {
        let Some(run) = tx.run_by_key(job.id, payload.scheduled_at, payload.attempt) else {
            return Err(match phase {
                OperatorPhase::Start => EngineError::OutOfOrder(format!("{} before job_start of {key}", event.name())),
                _ => EngineError::NoSuchRun(key),
            });
        };
        let existing = tx.operator_run(run.id, run.attempt, kind, Some(&op.operator));
        let run_id = run.id;

        if phase == OperatorPhase::Start {
            let attempt = match existing {
                Some(o) if matches!(o.status, OperatorStatus::Retry | OperatorStatus::Failed) => o.attempt + 1,
                Some(_) => return Ok(receipt(run_id, true)),
                None => 1,
            };
            let operator = OperatorRun {
                id: OperatorRunId::new(),
                kind,
                name: op.operator.clone(),
                job_run_id: run_id,
                job_run_attempt: payload.attempt,
                status: OperatorStatus::Started,
                attempt,
                start_time: op.task_start_timestamp.unwrap_or(payload.event_time),
                end_time: None,
                duration_ms: None,
            };
            tx.emit(Event::OperatorStarted { run: operator });
            return Ok(receipt(run_id, false));
        }

        let existing = existing.ok_or_else(|| EngineError::NoSuchRun(format!("{kind} {} of {key}", op.operator)))?;
        let status = match phase {
            OperatorPhase::Success => OperatorStatus::Success,
            OperatorPhase::Fail => OperatorStatus::Failed,
            _ => OperatorStatus::Retry,
        };
        if existing.status.is_terminal() || existing.status == status {
            return Ok(receipt(run_id, true));
        }
        if payload.event_time < existing.start_time {
            let name = event.name();
            return Err(EngineError::OutOfOrder(format!("{name} of {kind} {} in {key} precedes its start", op.operator)));
        }
        let terminal = status.is_terminal();
        let id = existing.id;
        let duration_ms = terminal.then(|| (payload.event_time - existing.start_time).num_milliseconds());
        tx.emit(Event::OperatorUpdated {
            id,
            status,
            end_time: terminal.then_some(payload.event_time),
            duration_ms,
        });
        return Ok(receipt(run_id, false));
    }

    match event {
        RunEvent::JobStart(_) => {
            if let Some(existing) = tx.run_by_key(job.id, payload.scheduled_at, payload.attempt) {
                return Ok(receipt(existing.id, true));
            }
            if payload.attempt > 1 && tx.run_by_key(job.id, payload.scheduled_at, payload.attempt - 1).is_none() {
                return Err(EngineError::OutOfOrder(format!(
                    "job_start of {key} before attempt {}",
                    payload.attempt - 1
                )));
            }
            let dates = window::compute(&job.spec.task.window, version, payload.scheduled_at)?;
            let other = match version {
                WindowVersion::V1 => WindowVersion::V2,
                WindowVersion::V2 => WindowVersion::V1,
            };
            let run = JobRun {
                id: JobRunId::new(),
                job_id: job.id,
                project_id: job.project_id,
                namespace_id: job.namespace_id,
                scheduled_at: payload.scheduled_at,
                attempt: payload.attempt,
                status: JobRunStatus::Started,
                start_time: payload.event_time,
                end_time: None,
                duration_ms: None,
                sla_definition_seconds: job.spec.behavior.sla_seconds(),
                instance_data: Some(InstanceData {
                    window_version: version,
                    dstart: dates.start,
                    dend: dates.end,
                    alternate: window::compute(&job.spec.task.window, other, payload.scheduled_at).ok(),
                }),
            };
            let id = run.id;
            tx.emit(Event::JobRunStarted { run });
            Ok(receipt(id, false))
        }
        _ => {
            let status = match event {
                RunEvent::JobSuccess(_) => JobRunStatus::Success,
                RunEvent::JobFail(_) => JobRunStatus::Failed,
                _ => JobRunStatus::SlaMissed,
            };
            let run = tx
                .run_by_key(job.id, payload.scheduled_at, payload.attempt)
                .ok_or_else(|| EngineError::NoSuchRun(key.clone()))?;
            if payload.event_time < run.start_time {
                return Err(EngineError::OutOfOrder(format!("{} of {key} precedes its start", event.name())));
            }
            if !run.status.can_transition_to(status) {
                return Ok(receipt(run.id, true));
            }
            let id = run.id;
            let duration_ms = (payload.event_time - run.start_time).num_milliseconds();
            tx.emit(Event::JobRunUpdated {
                id,
                status,
                end_time: status.is_terminal().then_some(payload.event_time),
                duration_ms: Some(duration_ms),
            });
            Ok(receipt(id, false))
        }
    }
}

#[cfg(test)]
#[path = "ingest_tests.rs"]
mod tests;
