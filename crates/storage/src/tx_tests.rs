// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tb_core::test_support::epoch;

/// Apply the events a closure emits, as the store would on commit.
fn commit<T>(state: &mut MaterializedState, f: impl FnOnce(&mut Tx<'_>) -> Result<T, StoreError>) -> Result<T, StoreError> {
    let (out, events) = {
        let mut tx = Tx::new(state);
        let out = f(&mut tx)?;
        (out, tx.into_events())
    };
    for event in &events {
        state.apply_event(event);
    }
    Ok(out)
}

fn base() -> (MaterializedState, ProjectId, NamespaceId) {
    let mut state = MaterializedState::default();
    let project = commit(&mut state, |tx| tx.register_project("sales", BTreeMap::new(), epoch())).unwrap();
    let ns = commit(&mut state, |tx| tx.register_namespace(project.id, "core", BTreeMap::new(), epoch())).unwrap();
    (state, project.id, ns.id)
}

fn spec(name: &str) -> JobSpec {
    JobSpec::builder().name(name).build()
}

#[test]
fn reads_do_not_see_pending_writes() {
    let state = MaterializedState::default();
    let mut tx = Tx::new(&state);
    tx.register_project("sales", BTreeMap::new(), epoch()).unwrap();
    assert_eq!(tx.pending().len(), 1);
    assert!(tx.project_by_name("sales").is_none());
}

#[test]
fn re_registering_project_keeps_identity() {
    let (mut state, pid, _) = base();
    let config = BTreeMap::from([("region".to_string(), "eu".to_string())]);
    let again = commit(&mut state, |tx| tx.register_project("sales", config, epoch())).unwrap();
    assert_eq!(again.id, pid);
    assert_eq!(state.projects.len(), 1);
    assert_eq!(state.projects[&pid].config["region"], "eu");
}

#[yare::parameterized(
    upper = { "sales-EU" },
    space = { "my project" },
    empty = { "" },
)]
fn invalid_project_names(name: &str) {
    let mut state = MaterializedState::default();
    let err = commit(&mut state, |tx| tx.register_project(name, BTreeMap::new(), epoch())).unwrap_err();
    assert_eq!(err.kind(), tb_core::ErrorKind::InvalidSpec);
}

#[test]
fn namespace_requires_project() {
    let mut state = MaterializedState::default();
    let err = commit(&mut state, |tx| tx.register_namespace(ProjectId::new(), "core", BTreeMap::new(), epoch()))
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { entity: "project", .. }));
}

#[test]
fn job_name_is_unique_across_namespaces() {
    let (mut state, pid, core) = base();
    let other = commit(&mut state, |tx| tx.register_namespace(pid, "other", BTreeMap::new(), epoch())).unwrap();
    let job = commit(&mut state, |tx| tx.upsert_job(pid, core, spec("a"), "bq://a".into(), vec![], epoch())).unwrap();

    let err = commit(&mut state, |tx| tx.upsert_job(pid, other.id, spec("a"), "bq://a".into(), vec![], epoch()))
        .unwrap_err();
    assert_eq!(err.kind(), tb_core::ErrorKind::NameConflict);
    assert_eq!(err.to_string(), r#"job "a" already exists in namespace "core""#);

    let mut changed = spec("a");
    changed.description = "v2".into();
    let updated =
        commit(&mut state, |tx| tx.upsert_job(pid, core, changed, "bq://a".into(), vec!["bq://src".into()], epoch()))
            .unwrap();
    assert_eq!(updated.id, job.id);
    assert_eq!(state.jobs.len(), 1);
    assert_eq!(state.sources_of(job.id), ["bq://src"]);
}

#[test]
fn job_requires_plugin() {
    let (mut state, pid, core) = base();
    let mut bad = spec("a");
    bad.task.plugin_name = " ".into();
    let err = commit(&mut state, |tx| tx.upsert_job(pid, core, bad, "bq://a".into(), vec![], epoch())).unwrap_err();
    assert_eq!(err.kind(), tb_core::ErrorKind::InvalidSpec);
    assert!(state.jobs.is_empty());
}

#[test]
fn delete_then_recreate_job() {
    let (mut state, pid, core) = base();
    let first = commit(&mut state, |tx| tx.upsert_job(pid, core, spec("a"), "bq://a".into(), vec![], epoch())).unwrap();
    commit(&mut state, |tx| tx.delete_job(pid, "a")).unwrap();
    assert!(matches!(commit(&mut state, |tx| tx.delete_job(pid, "a")), Err(StoreError::NotFound { .. })));
    let second = commit(&mut state, |tx| tx.upsert_job(pid, core, spec("a"), "bq://a".into(), vec![], epoch())).unwrap();
    assert_ne!(first.id, second.id);
}

#[test]
fn resource_name_is_unique_per_project() {
    let (mut state, pid, core) = base();
    let other = commit(&mut state, |tx| tx.register_namespace(pid, "other", BTreeMap::new(), epoch())).unwrap();
    let draft = ResourceDraft {
        name: "mart.orders".into(),
        datastore: "bigquery".into(),
        resource_type: "table".into(),
        version: 1,
        spec: serde_json::json!({"schema": []}),
        assets: BTreeMap::new(),
        labels: BTreeMap::new(),
    };
    let saved = commit(&mut state, |tx| tx.save_resource(pid, core, draft.clone(), epoch())).unwrap();
    assert_eq!(saved.urn, "bigquery://mart.orders");

    let again = commit(&mut state, |tx| tx.save_resource(pid, core, ResourceDraft { version: 2, ..draft.clone() }, epoch()))
        .unwrap();
    assert_eq!(again.id, saved.id);
    assert_eq!(state.resources[&saved.id].version, 2);

    let err = commit(&mut state, |tx| tx.save_resource(pid, other.id, draft, epoch())).unwrap_err();
    assert_eq!(err.kind(), tb_core::ErrorKind::NameConflict);

    commit(&mut state, |tx| tx.delete_resource(pid, "mart.orders")).unwrap();
    assert!(state.resources.is_empty());
}

#[test]
fn secrets_validate_and_overwrite_in_place() {
    let (mut state, pid, core) = base();
    let err = commit(&mut state, |tx| tx.save_secret(pid, None, "token", "not base64!", SecretType::User, epoch()))
        .unwrap_err();
    assert_eq!(err.kind(), tb_core::ErrorKind::InvalidSpec);

    let first = commit(&mut state, |tx| tx.save_secret(pid, None, "token", "YQ==", SecretType::User, epoch())).unwrap();
    let second = commit(&mut state, |tx| tx.save_secret(pid, None, "token", "Yg==", SecretType::User, epoch())).unwrap();
    assert_eq!(first.id, second.id);
    let scoped =
        commit(&mut state, |tx| tx.save_secret(pid, Some(core), "token", "Yw==", SecretType::System, epoch())).unwrap();
    assert_ne!(scoped.id, first.id);
    assert_eq!(state.secrets.len(), 2);

    commit(&mut state, |tx| tx.delete_secret(pid, Some(core), "token")).unwrap();
    assert_eq!(state.secret(pid, Some(core), "token").unwrap().encrypted_value, "Yg==");
}

#[test]
fn enqueue_reuses_queued_deployment() {
    let (mut state, pid, _) = base();
    let (first, created) = commit(&mut state, |tx| tx.enqueue_deployment(pid, epoch())).unwrap();
    assert!(created);
    let (second, created) = commit(&mut state, |tx| tx.enqueue_deployment(pid, epoch())).unwrap();
    assert!(!created);
    assert_eq!(first.id, second.id);
}

#[test]
fn deployment_lifecycle() {
    let (mut state, pid, _) = base();
    let (queued, _) = commit(&mut state, |tx| tx.enqueue_deployment(pid, epoch())).unwrap();
    let claimed = commit(&mut state, |tx| Ok(tx.claim_deployments(4, epoch()))).unwrap();
    assert_eq!(claimed.len(), 1);
    assert_eq!(claimed[0].status, DeploymentStatus::InProgress);

    let (next, created) = commit(&mut state, |tx| tx.enqueue_deployment(pid, epoch())).unwrap();
    assert!(created);
    assert!(commit(&mut state, |tx| Ok(tx.claim_deployments(4, epoch()))).unwrap().is_empty());

    let details = DeploymentDetails {
        failures: vec![DeploymentFailure { job_name: "a".into(), message: "boom".into() }],
        success_count: 2,
        failure_count: 1,
    };
    let status = commit(&mut state, |tx| tx.finish_deployment(queued.id, details, epoch())).unwrap();
    assert_eq!(status, DeploymentStatus::Failed);
    assert!(commit(&mut state, |tx| tx.finish_deployment(queued.id, DeploymentDetails::default(), epoch())).is_err());

    commit(&mut state, |tx| tx.cancel_deployment(next.id, epoch())).unwrap();
    assert_eq!(state.deployments[&next.id].status, DeploymentStatus::Cancelled);
    let err = commit(&mut state, |tx| tx.cancel_deployment(queued.id, epoch())).unwrap_err();
    assert!(matches!(err, StoreError::Transition(_)));
}

#[test]
fn sweep_fails_stale_deployments() {
    let (mut state, pid, _) = base();
    commit(&mut state, |tx| tx.enqueue_deployment(pid, epoch())).unwrap();
    let claimed = commit(&mut state, |tx| Ok(tx.claim_deployments(1, epoch()))).unwrap();

    let later = epoch() + Duration::minutes(5);
    assert!(commit(&mut state, |tx| Ok(tx.sweep_deployments(Duration::minutes(10), later))).unwrap().is_empty());
    let swept = commit(&mut state, |tx| Ok(tx.sweep_deployments(Duration::minutes(1), later))).unwrap();
    assert_eq!(swept, vec![claimed[0].id]);

    let d = &state.deployments[&claimed[0].id];
    assert_eq!(d.status, DeploymentStatus::Failed);
    assert_eq!(d.details.failures[0].message, "timeout");
}
