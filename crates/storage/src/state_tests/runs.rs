// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tb_core::{OperatorKind, OperatorStatus};

fn operator(run: &JobRun, kind: OperatorKind, name: &str, attempt: u32) -> OperatorRun {
    OperatorRun {
        id: OperatorRunId::new(),
        kind,
        name: name.to_string(),
        job_run_id: run.id,
        job_run_attempt: run.attempt,
        status: OperatorStatus::Started,
        attempt,
        start_time: run.start_time,
        end_time: None,
        duration_ms: None,
    }
}

#[test]
fn duplicate_start_keeps_first_run() {
    let (mut state, _, ids) = seeded(&["a"]);
    let first = job_run(&state, ids[0], hours(1), 1);
    let dup = job_run(&state, ids[0], hours(1), 1);
    state.apply_event(&Event::JobRunStarted { run: first.clone() });
    state.apply_event(&Event::JobRunStarted { run: dup });
    assert_eq!(state.run_count(ids[0]), 1);
    assert_eq!(state.latest_run(ids[0], hours(1)).unwrap().id, first.id);
}

#[test]
fn latest_run_is_highest_attempt() {
    let (mut state, _, ids) = seeded(&["a"]);
    for attempt in [1, 2, 3] {
        let run = job_run(&state, ids[0], hours(1), attempt);
        state.apply_event(&Event::JobRunStarted { run });
    }
    assert_eq!(state.latest_run(ids[0], hours(1)).unwrap().attempt, 3);
    assert!(state.latest_run(ids[0], hours(2)).is_none());
    assert!(state.run_by_key(ids[0], hours(1), 2).is_some());
}

#[yare::parameterized(
    started_to_success = { JobRunStatus::Started, JobRunStatus::Success, JobRunStatus::Success },
    success_stays      = { JobRunStatus::Success, JobRunStatus::Started, JobRunStatus::Success },
    failed_stays       = { JobRunStatus::Failed, JobRunStatus::Success, JobRunStatus::Failed },
    sla_then_failed    = { JobRunStatus::SlaMissed, JobRunStatus::Failed, JobRunStatus::Failed },
    success_no_sla     = { JobRunStatus::Success, JobRunStatus::SlaMissed, JobRunStatus::Success },
)]
fn run_status_moves_forward_only(initial: JobRunStatus, next: JobRunStatus, expected: JobRunStatus) {
    let (mut state, _, ids) = seeded(&["a"]);
    let mut run = job_run(&state, ids[0], hours(1), 1);
    run.status = initial;
    let id = run.id;
    state.apply_event(&Event::JobRunStarted { run });
    state.apply_event(&Event::JobRunUpdated { id, status: next, end_time: Some(hours(2)), duration_ms: Some(10) });
    assert_eq!(state.job_runs[&id].status, expected);
}

#[test]
fn operator_requires_job_run() {
    let (mut state, _, ids) = seeded(&["a"]);
    let run = job_run(&state, ids[0], hours(1), 1);
    let op = operator(&run, OperatorKind::Task, "task", 1);
    state.apply_event(&Event::OperatorStarted { run: op });
    assert!(state.operator_runs.is_empty());
}

#[test]
fn operator_lookup_by_kind_and_attempt() {
    let (mut state, _, ids) = seeded(&["a"]);
    let run = job_run(&state, ids[0], hours(1), 1);
    state.apply_event(&Event::JobRunStarted { run: run.clone() });

    let task1 = operator(&run, OperatorKind::Task, "task", 1);
    state.apply_event(&Event::OperatorStarted { run: task1.clone() });
    state.apply_event(&Event::OperatorUpdated { id: task1.id, status: OperatorStatus::Retry, end_time: None, duration_ms: None });
    let task2 = operator(&run, OperatorKind::Task, "task", 2);
    state.apply_event(&Event::OperatorStarted { run: task2.clone() });
    let hook = operator(&run, OperatorKind::Hook, "notify", 1);
    state.apply_event(&Event::OperatorStarted { run: hook.clone() });

    assert_eq!(state.operator_run(run.id, 1, OperatorKind::Task, None).unwrap().id, task2.id);
    assert_eq!(state.operator_run(run.id, 1, OperatorKind::Hook, Some("notify")).unwrap().id, hook.id);
    assert!(state.operator_run(run.id, 1, OperatorKind::Hook, Some("other")).is_none());
    assert!(state.operator_run(run.id, 2, OperatorKind::Task, None).is_none());
    assert!(state.operator_run(run.id, 1, OperatorKind::Sensor, None).is_none());
    assert_eq!(state.operators_of(run.id).len(), 3);
}

#[test]
fn terminal_operator_does_not_move() {
    let (mut state, _, ids) = seeded(&["a"]);
    let run = job_run(&state, ids[0], hours(1), 1);
    state.apply_event(&Event::JobRunStarted { run: run.clone() });
    let op = operator(&run, OperatorKind::Sensor, "sensor", 1);
    state.apply_event(&Event::OperatorStarted { run: op.clone() });
    state.apply_event(&Event::OperatorUpdated { id: op.id, status: OperatorStatus::Success, end_time: Some(hours(2)), duration_ms: Some(3_600_000) });
    state.apply_event(&Event::OperatorUpdated { id: op.id, status: OperatorStatus::Failed, end_time: Some(hours(3)), duration_ms: None });
    let stored = &state.operator_runs[&op.id];
    assert_eq!(stored.status, OperatorStatus::Success);
    assert_eq!(stored.duration_ms, Some(3_600_000));
}

#[test]
fn clear_runs_for_one_instant_or_all() {
    let (mut state, _, ids) = seeded(&["a", "b"]);
    for at in [hours(1), hours(2)] {
        let run = job_run(&state, ids[0], at, 1);
        state.apply_event(&Event::JobRunStarted { run: run.clone() });
        state.apply_event(&Event::OperatorStarted { run: operator(&run, OperatorKind::Task, "task", 1) });
    }
    let other = job_run(&state, ids[1], hours(1), 1);
    state.apply_event(&Event::JobRunStarted { run: other });

    state.apply_event(&Event::RunsCleared { job_id: ids[0], scheduled_at: Some(hours(1)) });
    assert_eq!(state.run_count(ids[0]), 1);
    assert_eq!(state.operator_runs.len(), 1);

    state.apply_event(&Event::RunsCleared { job_id: ids[0], scheduled_at: None });
    assert_eq!(state.run_count(ids[0]), 0);
    assert!(state.operator_runs.is_empty());
    assert_eq!(state.run_count(ids[1]), 1);
}

#[test]
fn latest_runs_between_is_closed_and_ordered() {
    let (mut state, _, ids) = seeded(&["a"]);
    for (at, attempt) in [(3, 1), (1, 1), (1, 2), (5, 1)] {
        let run = job_run(&state, ids[0], hours(at), attempt);
        state.apply_event(&Event::JobRunStarted { run });
    }
    let runs = state.latest_runs_between(ids[0], hours(1), hours(3));
    let got: Vec<_> = runs.iter().map(|r| (r.scheduled_at, r.attempt)).collect();
    assert_eq!(got, vec![(hours(1), 2), (hours(3), 1)]);
}
