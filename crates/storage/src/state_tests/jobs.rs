// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tb_core::{EdgeKind, EdgeOrigin, JobDependency};

fn edge(state: &MaterializedState, from: JobId, to: JobId) -> JobDependency {
    let upstream = &state.jobs[&to];
    JobDependency {
        job_id: from,
        dependent_job_id: to,
        dependent_project_id: upstream.project_id,
        dependent_job_name: upstream.spec.name.clone(),
        dependent_project_name: "p".into(),
        kind: EdgeKind::Intra,
        origin: EdgeOrigin::Static,
    }
}

#[test]
fn upsert_replaces_sources() {
    let (mut state, pid, ids) = seeded(&["a"]);
    let mut job = state.jobs[&ids[0]].clone();
    let sources = vec!["bq://z".to_string(), "bq://y".to_string(), "bq://z".to_string()];
    state.apply_event(&Event::JobUpserted { job: Box::new(job.clone()), sources });
    assert_eq!(state.sources_of(ids[0]), ["bq://y", "bq://z"]);

    job.spec.description = "changed".into();
    state.apply_event(&Event::JobUpserted { job: Box::new(job), sources: vec!["bq://x".into()] });
    assert_eq!(state.sources_of(ids[0]), ["bq://x"]);
    assert_eq!(state.jobs[&ids[0]].spec.description, "changed");
    assert_eq!(state.project_sources(pid)[&ids[0]], vec!["bq://x".to_string()]);
}

#[test]
fn lookups_by_name_and_destination() {
    let (state, pid, ids) = seeded(&["b", "a", "c"]);
    assert_eq!(state.job_by_name(pid, "a").unwrap().id, ids[1]);
    assert!(state.job_by_name(ProjectId::new(), "a").is_none());

    let urn = state.jobs[&ids[2]].destination_urn.clone();
    assert_eq!(state.job_by_destination(&urn).unwrap().id, ids[2]);
    assert!(state.job_by_destination("bigquery://nowhere").is_none());

    let writers = state.jobs_by_destinations(&[urn.as_str(), "bigquery://a", "bigquery://missing"]);
    let names: Vec<_> = writers.iter().map(|j| j.name()).collect();
    assert_eq!(names, vec!["a", "c"]);

    let listed: Vec<_> = state.jobs_of(pid).iter().map(|j| j.name().to_string()).collect();
    assert_eq!(listed, vec!["a", "b", "c"]);
    assert_eq!(state.jobs_by_namespace(pid)["ns"].len(), 3);
}

#[test]
fn dependencies_are_replaced_per_job() {
    let (mut state, _, ids) = seeded(&["a", "b", "c"]);
    let (a, b, c) = (ids[0], ids[1], ids[2]);
    state.apply_event(&Event::JobDependenciesReplaced { job_id: c, dependencies: vec![edge(&state, c, a)] });
    state.apply_event(&Event::JobDependenciesReplaced { job_id: c, dependencies: vec![edge(&state, c, b)] });
    assert_eq!(state.upstreams_of(c).len(), 1);
    assert_eq!(state.upstreams_of(c)[0].dependent_job_id, b);
    assert!(state.downstreams_of(a).is_empty());
    assert_eq!(state.downstreams_of(b)[0].id, c);
}

#[test]
fn dependencies_for_unknown_job_are_dropped() {
    let (mut state, _, ids) = seeded(&["a"]);
    let ghost = JobId::new();
    state.apply_event(&Event::JobDependenciesReplaced { job_id: ghost, dependencies: vec![edge(&state, ghost, ids[0])] });
    assert!(state.job_dependencies.is_empty());
}

#[test]
fn delete_cascades() {
    let (mut state, pid, ids) = seeded(&["a", "b"]);
    let (a, b) = (ids[0], ids[1]);
    state.apply_event(&Event::JobDependenciesReplaced { job_id: b, dependencies: vec![edge(&state, b, a)] });
    state.apply_event(&Event::JobDependenciesReplaced { job_id: a, dependencies: vec![] });
    let run = job_run(&state, a, hours(1), 1);
    state.apply_event(&Event::JobRunStarted { run });

    state.apply_event(&Event::JobDeleted { id: a });
    assert!(state.job_by_name(pid, "a").is_none());
    assert!(state.sources_of(a).is_empty());
    assert!(state.upstreams_of(b).is_empty());
    assert_eq!(state.run_count(a), 0);

    let again = job_fixture(pid, state.jobs[&b].namespace_id, JobSpec::builder().name("a").build());
    state.apply_event(&Event::JobUpserted { job: Box::new(again), sources: vec![] });
    assert!(state.job_by_name(pid, "a").is_some());
}
