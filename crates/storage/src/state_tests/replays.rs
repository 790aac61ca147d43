// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tb_core::{ExecutionNode, ReplayConfig, ReplayRun, ReplayRunStatus, ReplayStatus};

fn replay(project_id: ProjectId, job_id: JobId, instants: &[DateTime<Utc>], created_at: DateTime<Utc>) -> Replay {
    Replay {
        id: ReplayId::new(),
        job_id,
        project_id,
        start_date: instants[0],
        end_date: instants[instants.len() - 1],
        status: ReplayStatus::Accepted,
        message: None,
        config: ReplayConfig::default(),
        execution_tree: vec![ExecutionNode {
            node_index: 0,
            parent_index: None,
            upstream_indices: vec![],
            job_id,
            job_name: "a".into(),
            project_id,
            runs: instants.iter().map(|t| ReplayRun { scheduled_at: *t, status: ReplayRunStatus::Pending }).collect(),
        }],
        failures: vec![],
        created_at,
        updated_at: created_at,
    }
}

fn run_update(id: ReplayId, at: DateTime<Utc>, status: ReplayRunStatus, failure: Option<&str>) -> Event {
    Event::ReplayRunUpdated { id, node_index: 0, scheduled_at: at, status, failure: failure.map(String::from), at }
}

#[test]
fn status_changes_stop_at_terminal() {
    let (mut state, pid, ids) = seeded(&["a"]);
    let r = replay(pid, ids[0], &[hours(1)], epoch());
    let id = r.id;
    state.apply_event(&Event::ReplayCreated { replay: Box::new(r) });
    state.apply_event(&Event::ReplayStatusChanged { id, status: ReplayStatus::InProgress, message: None, at: hours(1) });
    assert_eq!(state.in_progress_replays(pid), 1);
    state.apply_event(&Event::ReplayStatusChanged {
        id,
        status: ReplayStatus::Failed,
        message: Some("cancelled".into()),
        at: hours(2),
    });
    state.apply_event(&Event::ReplayStatusChanged { id, status: ReplayStatus::Succeeded, message: None, at: hours(3) });
    let stored = state.replay(id).unwrap();
    assert_eq!(stored.status, ReplayStatus::Failed);
    assert_eq!(stored.message.as_deref(), Some("cancelled"));
    assert_eq!(stored.updated_at, hours(2));
}

#[test]
fn run_failure_is_recorded_once() {
    let (mut state, pid, ids) = seeded(&["a"]);
    let r = replay(pid, ids[0], &[hours(1), hours(2)], epoch());
    let id = r.id;
    state.apply_event(&Event::ReplayCreated { replay: Box::new(r) });
    state.apply_event(&run_update(id, hours(1), ReplayRunStatus::Issued, None));
    let failed = run_update(id, hours(1), ReplayRunStatus::Failed, Some("boom"));
    state.apply_event(&failed);
    state.apply_event(&failed);
    state.apply_event(&run_update(id, hours(1), ReplayRunStatus::Succeeded, None));

    let stored = state.replay(id).unwrap();
    assert_eq!(stored.failures.len(), 1);
    assert_eq!(stored.failures[0].job_name, "a");
    assert_eq!(stored.failures[0].message, "boom");
    assert_eq!(stored.count_runs(ReplayRunStatus::Failed), 1);
    assert_eq!(stored.count_runs(ReplayRunStatus::Pending), 1);
}

#[test]
fn supersede_touches_only_pending_claims() {
    let (mut state, pid, ids) = seeded(&["a"]);
    let old = replay(pid, ids[0], &[hours(1), hours(2), hours(3)], epoch());
    let newer = ReplayId::new();
    let id = old.id;
    state.apply_event(&Event::ReplayCreated { replay: Box::new(old) });
    state.apply_event(&run_update(id, hours(1), ReplayRunStatus::Issued, None));
    state.apply_event(&Event::ReplaySuperseded {
        id,
        by: newer,
        claims: vec![(ids[0], hours(1)), (ids[0], hours(2))],
        at: hours(4),
    });

    let stored = state.replay(id).unwrap();
    let statuses: Vec<_> = stored.execution_tree[0].runs.iter().map(|r| r.status).collect();
    assert_eq!(statuses, vec![ReplayRunStatus::Issued, ReplayRunStatus::Superseded, ReplayRunStatus::Pending]);
    assert_eq!(stored.open_claims().len(), 2);
}

#[test]
fn listing_and_filters() {
    let (mut state, pid, ids) = seeded(&["a"]);
    let older = replay(pid, ids[0], &[hours(1)], epoch());
    let newer = replay(pid, ids[0], &[hours(2)], hours(1));
    let (older_id, newer_id) = (older.id, newer.id);
    state.apply_event(&Event::ReplayCreated { replay: Box::new(older) });
    state.apply_event(&Event::ReplayCreated { replay: Box::new(newer) });
    state.apply_event(&Event::ReplayStatusChanged { id: older_id, status: ReplayStatus::Failed, message: None, at: hours(2) });

    let all: Vec<_> = state.replays_of(pid, None).iter().map(|r| r.id).collect();
    assert_eq!(all, vec![newer_id, older_id]);
    assert_eq!(state.replays_of(pid, Some(ReplayStatus::Failed)).len(), 1);
    assert_eq!(state.active_replays(pid).len(), 1);
    assert_eq!(state.projects_with_accepted_replays(), vec![pid]);
    assert_eq!(state.replay_by_prefix(&newer_id.short(12)).map(|r| r.id), Some(newer_id));
}
