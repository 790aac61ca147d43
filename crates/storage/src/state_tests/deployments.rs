// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tb_core::{DeploymentDetails, DeploymentStatus};

fn queued(state: &mut MaterializedState, project_id: ProjectId, at: DateTime<Utc>) -> DeploymentId {
    let deployment = JobDeployment {
        id: DeploymentId::new(),
        project_id,
        status: DeploymentStatus::InQueue,
        details: DeploymentDetails::default(),
        created_at: at,
        updated_at: at,
    };
    let id = deployment.id;
    state.apply_event(&Event::DeploymentQueued { deployment });
    id
}

#[test]
fn claim_moves_queued_to_in_progress_once() {
    let mut state = MaterializedState::default();
    let pid = ProjectId::new();
    let id = queued(&mut state, pid, epoch());
    assert_eq!(state.queued_deployment(pid).map(|d| d.id), Some(id));

    state.apply_event(&Event::DeploymentClaimed { id, at: hours(1) });
    state.apply_event(&Event::DeploymentClaimed { id, at: hours(2) });
    let d = state.deployment(id).unwrap();
    assert_eq!(d.status, DeploymentStatus::InProgress);
    assert_eq!(d.updated_at, hours(1));
    assert!(state.queued_deployment(pid).is_none());
}

#[test]
fn finished_is_terminal() {
    let mut state = MaterializedState::default();
    let id = queued(&mut state, ProjectId::new(), epoch());
    state.apply_event(&Event::DeploymentClaimed { id, at: epoch() });
    state.apply_event(&Event::DeploymentFinished {
        id,
        status: DeploymentStatus::Succeeded,
        details: DeploymentDetails { success_count: 3, ..Default::default() },
        at: hours(1),
    });
    state.apply_event(&Event::DeploymentFinished {
        id,
        status: DeploymentStatus::Failed,
        details: DeploymentDetails::default(),
        at: hours(2),
    });
    let d = state.deployment(id).unwrap();
    assert_eq!(d.status, DeploymentStatus::Succeeded);
    assert_eq!(d.details.success_count, 3);
}

#[test]
fn claimable_is_one_per_free_project_oldest_first() {
    let mut state = MaterializedState::default();
    let (p1, p2, p3) = (ProjectId::new(), ProjectId::new(), ProjectId::new());
    let busy = queued(&mut state, p3, epoch());
    state.apply_event(&Event::DeploymentClaimed { id: busy, at: epoch() });

    let p2_first = queued(&mut state, p2, hours(1));
    let p1_first = queued(&mut state, p1, hours(2));
    let _p1_second = queued(&mut state, p1, hours(3));
    let _p3_waiting = queued(&mut state, p3, hours(4));

    assert_eq!(state.claimable_deployments(10), vec![p2_first, p1_first]);
    assert_eq!(state.claimable_deployments(1), vec![p2_first]);
    assert!(state.claimable_deployments(0).is_empty());
}

#[test]
fn stale_in_progress_deployments() {
    let mut state = MaterializedState::default();
    let old = queued(&mut state, ProjectId::new(), epoch());
    let fresh = queued(&mut state, ProjectId::new(), epoch());
    let _waiting = queued(&mut state, ProjectId::new(), epoch());
    state.apply_event(&Event::DeploymentClaimed { id: old, at: epoch() });
    state.apply_event(&Event::DeploymentClaimed { id: fresh, at: hours(5) });
    assert_eq!(state.stale_deployments(hours(2)), vec![old]);
}

#[test]
fn lookup_by_prefix() {
    let mut state = MaterializedState::default();
    let id = queued(&mut state, ProjectId::new(), epoch());
    assert_eq!(state.deployment_by_prefix(&id.short(8)).map(|d| d.id), Some(id));
    assert_eq!(state.deployment_by_prefix(&id.to_string()).map(|d| d.id), Some(id));
    assert!(state.deployment_by_prefix("").is_none());
}
