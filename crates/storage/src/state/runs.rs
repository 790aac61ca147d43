// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job run and operator run handlers.

use chrono::{DateTime, Utc};
use tb_core::{Event, JobId, JobRun, JobRunId, OperatorKind, OperatorRun};

use super::{helpers, MaterializedState};

pub(crate) fn apply(state: &mut MaterializedState, event: &Event) {
    match event {
        Event::JobRunStarted { run } => {
            let exists = state.run_by_key(run.job_id, run.scheduled_at, run.attempt).is_some();
            if !exists {
                helpers::insert_absent(&mut state.job_runs, run.id, run.clone());
            }
        }

        Event::JobRunUpdated { id, status, end_time, duration_ms } => {
            if let Some(run) = state.job_runs.get_mut(id) {
                if run.status.can_transition_to(*status) {
                    run.status = *status;
                    if end_time.is_some() {
                        run.end_time = *end_time;
                    }
                    if duration_ms.is_some() {
                        run.duration_ms = *duration_ms;
                    }
                }
            }
        }

        Event::OperatorStarted { run } => {
            if state.job_runs.contains_key(&run.job_run_id) {
                helpers::insert_absent(&mut state.operator_runs, run.id, run.clone());
            }
        }

        Event::OperatorUpdated { id, status, end_time, duration_ms } => {
            if let Some(op) = state.operator_runs.get_mut(id) {
                if !op.status.is_terminal() && op.status != *status {
                    op.status = *status;
                    if end_time.is_some() {
                        op.end_time = *end_time;
                    }
                    if duration_ms.is_some() {
                        op.duration_ms = *duration_ms;
                    }
                }
            }
        }

        Event::RunsCleared { job_id, scheduled_at } => {
            state.clear_runs(*job_id, *scheduled_at);
        }

        _ => {}
    }
}

impl MaterializedState {
    pub fn run_by_key(&self, job_id: JobId, scheduled_at: DateTime<Utc>, attempt: u32) -> Option<&JobRun> {
        self.job_runs
            .values()
            .find(|r| r.job_id == job_id && r.scheduled_at == scheduled_at && r.attempt == attempt)
    }

    /// Highest attempt for `(job, scheduled_at)`.
    pub fn latest_run(&self, job_id: JobId, scheduled_at: DateTime<Utc>) -> Option<&JobRun> {
        self.job_runs
            .values()
            .filter(|r| r.job_id == job_id && r.scheduled_at == scheduled_at)
            .max_by_key(|r| r.attempt)
    }

    /// Latest attempt per scheduled instant in `[start, end]`, ordered by instant.
    pub fn latest_runs_between(&self, job_id: JobId, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<&JobRun> {
        let mut latest: std::collections::BTreeMap<DateTime<Utc>, &JobRun> = Default::default();
        for run in self.job_runs.values() {
            if run.job_id != job_id || run.scheduled_at < start || run.scheduled_at > end {
                continue;
            }
            let slot = latest.entry(run.scheduled_at).or_insert(run);
            if run.attempt > slot.attempt {
                *slot = run;
            }
        }
        latest.into_values().collect()
    }

    /// The operator of `kind` (and `name`, when given) for one job run
    /// attempt, at its highest operator attempt.
    pub fn operator_run(
        &self,
        job_run_id: JobRunId,
        job_run_attempt: u32,
        kind: OperatorKind,
        name: Option<&str>,
    ) -> Option<&OperatorRun> {
        self.operator_runs
            .values()
            .filter(|o| o.job_run_id == job_run_id && o.job_run_attempt == job_run_attempt && o.kind == kind)
            .filter(|o| name.is_none_or(|n| o.name == n))
            .max_by_key(|o| (o.attempt, o.start_time))
    }

    /// Operators of a job run, in start order.
    pub fn operators_of(&self, job_run_id: JobRunId) -> Vec<&OperatorRun> {
        let mut out: Vec<_> = self.operator_runs.values().filter(|o| o.job_run_id == job_run_id).collect();
        out.sort_by_key(|o| (o.start_time, o.attempt));
        out
    }

    pub fn run_count(&self, job_id: JobId) -> usize {
        self.job_runs.values().filter(|r| r.job_id == job_id).count()
    }

    /// Drop runs of a job (one instant or all) together with their operators.
    pub(crate) fn clear_runs(&mut self, job_id: JobId, scheduled_at: Option<DateTime<Utc>>) {
        let doomed: Vec<JobRunId> = self
            .job_runs
            .values()
            .filter(|r| r.job_id == job_id && scheduled_at.is_none_or(|at| r.scheduled_at == at))
            .map(|r| r.id)
            .collect();
        for id in &doomed {
            self.job_runs.remove(id);
        }
        self.operator_runs.retain(|_, o| !doomed.contains(&o.job_run_id));
    }
}
