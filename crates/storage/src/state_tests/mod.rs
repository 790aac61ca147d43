// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

mod deployments;
mod idempotency;
mod jobs;
mod replays;
mod runs;

use super::*;
use chrono::{DateTime, Duration, Utc};
pub(super) use tb_core::test_support::{epoch, job_fixture, namespace_fixture, project_fixture};
use tb_core::{JobRunStatus, JobSpec, SecretType};

pub(super) fn hours(n: i64) -> DateTime<Utc> {
    epoch() + Duration::hours(n)
}

/// A state with one project `p`, namespace `ns` and the named jobs.
pub(super) fn seeded(names: &[&str]) -> (MaterializedState, ProjectId, Vec<JobId>) {
    let mut state = MaterializedState::default();
    let project = project_fixture("p");
    let ns = namespace_fixture(project.id, "ns");
    let (pid, nsid) = (project.id, ns.id);
    state.apply_event(&Event::ProjectRegistered { project });
    state.apply_event(&Event::NamespaceRegistered { namespace: ns });
    let ids = names
        .iter()
        .map(|name| {
            let job = job_fixture(pid, nsid, JobSpec::builder().name(*name).build());
            let id = job.id;
            state.apply_event(&Event::JobUpserted { job: Box::new(job), sources: vec![] });
            id
        })
        .collect();
    (state, pid, ids)
}

pub(super) fn job_run(state: &MaterializedState, job_id: JobId, scheduled_at: DateTime<Utc>, attempt: u32) -> JobRun {
    let job = &state.jobs[&job_id];
    JobRun {
        id: JobRunId::new(),
        job_id,
        project_id: job.project_id,
        namespace_id: job.namespace_id,
        scheduled_at,
        attempt,
        status: JobRunStatus::Started,
        start_time: scheduled_at,
        end_time: None,
        duration_ms: None,
        sla_definition_seconds: 0,
        instance_data: None,
    }
}

fn secret(project_id: ProjectId, namespace_id: Option<NamespaceId>, name: &str, value: &str) -> Secret {
    Secret {
        id: SecretId::new(),
        project_id,
        namespace_id,
        name: name.to_string(),
        encrypted_value: value.to_string(),
        secret_type: SecretType::User,
        updated_at: epoch(),
    }
}

#[test]
fn project_and_namespace_lookup() {
    let (state, pid, _) = seeded(&[]);
    assert_eq!(state.project_by_name("p").unwrap().id, pid);
    assert!(state.project_by_name("q").is_none());
    assert_eq!(state.namespace_by_name(pid, "ns").unwrap().name, "ns");
    assert!(state.namespace_by_name(ProjectId::new(), "ns").is_none());
    assert_eq!(state.namespaces_of(pid).len(), 1);
}

#[test]
fn project_re_registration_replaces_config() {
    let mut state = MaterializedState::default();
    let mut project = project_fixture("p");
    state.apply_event(&Event::ProjectRegistered { project: project.clone() });
    project.config.insert("region".into(), "eu".into());
    state.apply_event(&Event::ProjectRegistered { project: project.clone() });
    assert_eq!(state.projects.len(), 1);
    assert_eq!(state.projects[&project.id].config["region"], "eu");
}

#[test]
fn namespace_secret_shadows_project_secret() {
    let (mut state, pid, _) = seeded(&[]);
    let ns = state.namespace_by_name(pid, "ns").unwrap().id;
    state.apply_event(&Event::SecretSaved { secret: secret(pid, None, "token", "cHJvamVjdA==") });
    state.apply_event(&Event::SecretSaved { secret: secret(pid, None, "other", "b3RoZXI=") });
    state.apply_event(&Event::SecretSaved { secret: secret(pid, Some(ns), "token", "bnM=") });

    assert_eq!(state.secret(pid, Some(ns), "token").unwrap().encrypted_value, "bnM=");
    assert_eq!(state.secret(pid, None, "token").unwrap().encrypted_value, "cHJvamVjdA==");
    assert_eq!(state.secret(pid, Some(ns), "other").unwrap().encrypted_value, "b3RoZXI=");

    let visible: Vec<_> = state.secrets_visible(pid, Some(ns)).iter().map(|s| s.encrypted_value.clone()).collect();
    assert_eq!(visible, vec!["b3RoZXI=", "bnM="]);
    assert_eq!(state.secrets_visible(pid, None).len(), 2);
}

#[test]
fn secret_delete_removes_only_that_scope() {
    let (mut state, pid, _) = seeded(&[]);
    let ns = state.namespace_by_name(pid, "ns").unwrap().id;
    let shadow = secret(pid, Some(ns), "token", "bnM=");
    state.apply_event(&Event::SecretSaved { secret: secret(pid, None, "token", "cHJvamVjdA==") });
    state.apply_event(&Event::SecretSaved { secret: shadow.clone() });
    state.apply_event(&Event::SecretDeleted { id: shadow.id });
    assert_eq!(state.secret(pid, Some(ns), "token").unwrap().encrypted_value, "cHJvamVjdA==");
}

#[test]
fn migrations_track_latest_record() {
    let mut state = MaterializedState::default();
    assert!(state.latest_migration().is_none());
    let first = MigrationRecord {
        app_version: "0.1.0".into(),
        migration_version: 1,
        previous_app_version: String::new(),
        created_at: epoch(),
    };
    let second = MigrationRecord {
        app_version: "0.2.0".into(),
        previous_app_version: "0.1.0".into(),
        created_at: hours(1),
        ..first.clone()
    };
    state.apply_event(&Event::MigrationRecorded { record: first.clone() });
    state.apply_event(&Event::MigrationRecorded { record: second.clone() });
    state.apply_event(&Event::MigrationRecorded { record: second.clone() });
    assert_eq!(state.migrations.len(), 2);
    assert_eq!(state.latest_migration(), Some(&second));

    state.apply_event(&Event::MigrationRemoved { record: second });
    assert_eq!(state.latest_migration(), Some(&first));
}

#[test]
fn unknown_events_are_ignored() {
    let (mut state, _, _) = seeded(&["a"]);
    let before = state.clone();
    state.apply_event(&Event::Custom);
    state.apply_event(&Event::Shutdown);
    assert_eq!(state, before);
}
