// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Applying an event twice leaves the same state as applying it once.

use super::*;
use proptest::prelude::*;
use tb_core::test_support::strategies::{arb_job_run_status, arb_job_spec};
use tb_core::{DeploymentDetails, DeploymentStatus, ReplayConfig, ReplayStatus};

fn replayed_twice(events: &[Event]) -> (MaterializedState, MaterializedState) {
    let mut once = MaterializedState::default();
    let mut twice = MaterializedState::default();
    for event in events {
        once.apply_event(event);
        twice.apply_event(event);
        twice.apply_event(event);
    }
    (once, twice)
}

proptest! {
    #[test]
    fn job_and_run_events(spec in arb_job_spec(), statuses in proptest::collection::vec(arb_job_run_status(), 1..6)) {
        let (mut seed, pid, _) = seeded(&[]);
        let nsid = seed.namespace_by_name(pid, "ns").map(|n| n.id).unwrap_or_default();
        let job = job_fixture(pid, nsid, spec);
        seed.apply_event(&Event::JobUpserted { job: Box::new(job.clone()), sources: vec![] });
        let mut run = job_run(&seed, job.id, hours(1), 1);
        run.status = JobRunStatus::Pending;

        let mut events = vec![
            Event::ProjectRegistered { project: seed.projects[&pid].clone() },
            Event::JobUpserted { job: Box::new(job.clone()), sources: vec!["bigquery://x".into()] },
            Event::JobRunStarted { run: run.clone() },
        ];
        for status in statuses {
            events.push(Event::JobRunUpdated { id: run.id, status, end_time: Some(hours(2)), duration_ms: Some(1) });
        }
        events.push(Event::RunsCleared { job_id: job.id, scheduled_at: Some(hours(9)) });

        let (once, twice) = replayed_twice(&events);
        prop_assert_eq!(once, twice);
    }
}

#[test]
fn deployment_and_replay_events() {
    let (_, pid, _) = seeded(&[]);
    let deployment = JobDeployment {
        id: DeploymentId::new(),
        project_id: pid,
        status: DeploymentStatus::InQueue,
        details: DeploymentDetails::default(),
        created_at: epoch(),
        updated_at: epoch(),
    };
    let replay = Replay {
        id: ReplayId::new(),
        job_id: JobId::new(),
        project_id: pid,
        start_date: epoch(),
        end_date: epoch(),
        status: ReplayStatus::Accepted,
        message: None,
        config: ReplayConfig::default(),
        execution_tree: vec![],
        failures: vec![],
        created_at: epoch(),
        updated_at: epoch(),
    };
    let events = vec![
        Event::DeploymentQueued { deployment: deployment.clone() },
        Event::DeploymentClaimed { id: deployment.id, at: hours(1) },
        Event::DeploymentFinished {
            id: deployment.id,
            status: DeploymentStatus::Failed,
            details: DeploymentDetails::default(),
            at: hours(2),
        },
        Event::ReplayCreated { replay: Box::new(replay.clone()) },
        Event::ReplayStatusChanged { id: replay.id, status: ReplayStatus::InProgress, message: None, at: hours(3) },
    ];
    let (once, twice) = replayed_twice(&events);
    assert_eq!(once, twice);
}
