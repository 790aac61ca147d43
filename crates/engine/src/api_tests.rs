// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde_json::json;
use tb_adapters::FakeScheduler;
use tb_core::{ErrorKind, FakeClock, Hook, HookType, JobRunStatus, ReplayRunStatus};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use yare::parameterized;

use super::*;
use crate::test_helpers::{sql_spec, table, temp_store, utc};

struct Harness {
    _dir: TempDir,
    api: ControlPlane<FakeScheduler, FakeClock>,
    store: Store,
    clock: FakeClock,
    wake: Arc<Notify>,
    _shutdown: tokio_util::sync::DropGuard,
}

fn harness() -> Harness {
    let (dir, store) = temp_store();
    let config = EngineConfig::default();
    let clock = FakeClock::new();
    let shutdown = CancellationToken::new();
    let (ingester, _) = Ingester::spawn(store.clone(), &config, shutdown.clone());
    let runner = Arc::new(ReplayRunner::new(
        store.clone(),
        FakeScheduler::new(),
        clock.clone(),
        config.clone(),
        ingester.outcomes(),
    ));
    let wake = Arc::new(Notify::new());
    let api = ControlPlane::new(
        store.clone(),
        PluginRegistry::with_builtins(),
        clock.clone(),
        config.clone(),
        Arc::new(DagCache::new(config.spec_cache_ttl, clock.clone())),
        Arc::clone(&wake),
        runner,
        Arc::new(ingester),
    );
    Harness { _dir: dir, api, store, clock, wake, _shutdown: shutdown.drop_guard() }
}

/// Harness with project `p` and namespace `main`.
fn project() -> Harness {
    let h = harness();
    h.api.register_project("p", BTreeMap::new()).unwrap();
    h.api.register_namespace("p", "main", BTreeMap::new()).unwrap();
    h
}

impl Harness {
    fn deployments(&self) -> Vec<JobDeployment> {
        self.api.list_deployments("p", None).unwrap()
    }
}

#[tokio::test]
async fn upsert_writes_the_job_and_queues_one_deployment() {
    let h = project();
    let a = h.api.upsert_job("p", "main", sql_spec("p", "a", &[])).await.unwrap();
    assert_eq!(a.job.destination_urn, table("p", "a"));
    assert_eq!(a.deployment.status, DeploymentStatus::InQueue);

    let b = h.api.upsert_job("p", "main", sql_spec("p", "b", &["a"])).await.unwrap();
    assert_eq!(b.deployment.id, a.deployment.id);
    assert_eq!(h.deployments().len(), 1);
    assert_eq!(h.store.read(|s| s.sources_of(b.job.id).to_vec()), [table("p", "a")]);

    let names: Vec<String> = h.api.list_jobs("p", None).unwrap().into_iter().map(|j| j.spec.name).collect();
    assert_eq!(names, ["a", "b"]);
}

#[tokio::test]
async fn upsert_wakes_the_deployment_workers() {
    let h = project();
    let notified = h.wake.notified();
    h.api.upsert_job("p", "main", sql_spec("p", "a", &[])).await.unwrap();
    tokio::time::timeout(std::time::Duration::from_secs(1), notified).await.unwrap();
}

fn bad_window() -> JobSpec {
    let mut spec = sql_spec("p", "a", &[]);
    spec.task.window.size = "forever".into();
    spec
}

fn unknown_plugin() -> JobSpec {
    let mut spec = sql_spec("p", "a", &[]);
    spec.task.plugin_name = "spark".into();
    spec
}

fn hook_as_task() -> JobSpec {
    let mut spec = sql_spec("p", "a", &[]);
    spec.task.plugin_name = "notify".into();
    spec
}

fn task_as_hook() -> JobSpec {
    let mut spec = sql_spec("p", "a", &[]);
    spec.hooks.push(Hook { plugin_name: "sql".into(), config: Default::default(), hook_type: HookType::Post });
    spec
}

fn missing_table() -> JobSpec {
    let mut spec = sql_spec("p", "a", &[]);
    spec.task.config.shift_remove("TABLE");
    spec
}

fn missing_bare_dependency() -> JobSpec {
    let mut spec = sql_spec("p", "a", &[]);
    spec.dependencies.insert("ghost".into(), Default::default());
    spec
}

#[parameterized(
    window = { bad_window(), ErrorKind::InvalidSpec },
    plugin = { unknown_plugin(), ErrorKind::InvalidSpec },
    hook_plugin_as_task = { hook_as_task(), ErrorKind::InvalidSpec },
    task_plugin_as_hook = { task_as_hook(), ErrorKind::InvalidSpec },
    plugin_config = { missing_table(), ErrorKind::InvalidSpec },
    bare_dependency = { missing_bare_dependency(), ErrorKind::UnknownDependency },
)]
#[test_macro(tokio::test)]
async fn rejected_specs_write_nothing(spec: JobSpec, kind: ErrorKind) {
    let h = project();
    let err = h.api.upsert_job("p", "main", spec).await.unwrap_err();
    assert_eq!(err.kind(), kind, "{err}");
    assert!(h.api.list_jobs("p", None).unwrap().is_empty());
    assert!(h.deployments().is_empty());
}

#[tokio::test]
async fn missing_qualified_dependency_is_accepted_and_reported() {
    let h = project();
    let mut spec = sql_spec("p", "a", &[]);
    spec.dependencies.insert("extproj/unknownjob".into(), Default::default());
    spec.assets.insert("query.sql".into(), "select * from raw.ds.events".into());
    h.api.upsert_job("p", "main", spec).await.unwrap();

    let unknown = h.api.unknown_dependencies("p").unwrap();
    assert_eq!(unknown.declared["a"], ["extproj/unknownjob"]);
    assert_eq!(unknown.inferred["a"], ["bigquery://raw:ds.events"]);
}

#[tokio::test]
async fn validate_checks_without_writing() {
    let h = project();
    h.api.validate_job("p", &sql_spec("p", "a", &[])).await.unwrap();
    assert!(h.api.validate_job("p", &unknown_plugin()).await.is_err());
    assert!(h.api.list_jobs("p", None).unwrap().is_empty());
    assert!(h.deployments().is_empty());
}

#[tokio::test]
async fn job_names_are_unique_across_namespaces() {
    let h = project();
    h.api.register_namespace("p", "other", BTreeMap::new()).unwrap();
    h.api.upsert_job("p", "main", sql_spec("p", "a", &[])).await.unwrap();

    let err = h.api.upsert_job("p", "other", sql_spec("p", "a", &[])).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NameConflict);
    assert!(h.api.list_jobs("p", Some("other")).unwrap().is_empty());
}

#[tokio::test]
async fn delete_then_recreate() {
    let h = project();
    h.api.upsert_job("p", "main", sql_spec("p", "a", &[])).await.unwrap();
    h.api.cancel_deployment(&h.deployments()[0].id.to_string()).unwrap();

    let deployment = h.api.delete_job("p", "a").unwrap();
    assert_eq!(deployment.status, DeploymentStatus::InQueue);
    assert_eq!(h.api.get_job("p", "a").unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(h.api.delete_job("p", "a").unwrap_err().kind(), ErrorKind::NotFound);

    h.api.upsert_job("p", "main", sql_spec("p", "a", &[])).await.unwrap();
    assert_eq!(h.api.get_job("p", "a").unwrap().destination_urn, table("p", "a"));
}

#[tokio::test]
async fn deploy_project_reuses_the_queued_deployment() {
    let h = project();
    let (first, created) = h.api.deploy_project("p").unwrap();
    assert!(created);
    let (second, created) = h.api.deploy_project("p").unwrap();
    assert!(!created);
    assert_eq!(first.id, second.id);

    let prefix = &first.id.to_string()[..8];
    assert_eq!(h.api.get_deployment(prefix).unwrap().id, first.id);
    assert!(h.api.latest_in_progress_deployment("p").unwrap().is_none());

    let cancelled = h.api.cancel_deployment(prefix).unwrap();
    assert_eq!(cancelled.status, DeploymentStatus::Cancelled);
    assert_eq!(h.api.cancel_deployment(prefix).unwrap_err().kind(), ErrorKind::InvalidSpec);
    assert_eq!(h.api.list_deployments("p", Some(DeploymentStatus::InQueue)).unwrap().len(), 0);

    let (third, created) = h.api.deploy_project("p").unwrap();
    assert!(created);
    assert_ne!(third.id, first.id);
    assert_eq!(h.api.deploy_project("ghost").unwrap_err().kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn namespace_secrets_shadow_project_secrets() {
    let h = project();
    h.api.save_secret("p", None, "TOKEN", "cHJvamVjdA==", SecretType::User).unwrap();
    h.api.save_secret("p", Some("main"), "TOKEN", "bmFtZXNwYWNl", SecretType::User).unwrap();
    h.api.save_secret("p", None, "INTERNAL", "c3lzdGVt", SecretType::System).unwrap();

    assert_eq!(h.api.get_secret("p", Some("main"), "TOKEN").unwrap().encrypted_value, "bmFtZXNwYWNl");
    assert_eq!(h.api.get_secret("p", None, "TOKEN").unwrap().encrypted_value, "cHJvamVjdA==");

    let visible = h.api.list_secrets("p", Some("main")).unwrap();
    assert_eq!(visible.len(), 1);
    assert!(visible[0].namespace_id.is_some());

    h.api.delete_secret("p", Some("main"), "TOKEN").unwrap();
    assert_eq!(h.api.get_secret("p", Some("main"), "TOKEN").unwrap().encrypted_value, "cHJvamVjdA==");
}

#[parameterized(
    not_base64 = { "TOKEN", "not base64!" },
    empty_value = { "TOKEN", "" },
    empty_name = { " ", "c2VjcmV0" },
)]
#[test_macro(tokio::test)]
async fn malformed_secrets_are_rejected(name: &str, value: &str) {
    let h = project();
    let err = h.api.save_secret("p", None, name, value, SecretType::User).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidSpec);
}

fn orders() -> ResourceDraft {
    ResourceDraft {
        name: "mart.orders".into(),
        datastore: "bigquery".into(),
        resource_type: "table".into(),
        version: 1,
        spec: json!({"partition": "day"}),
        assets: BTreeMap::new(),
        labels: BTreeMap::from([("team".to_string(), "data".to_string())]),
    }
}

#[tokio::test]
async fn resources_round_trip_by_name() {
    let h = project();
    h.api.register_namespace("p", "other", BTreeMap::new()).unwrap();
    let saved = h.api.save_resource("p", "main", orders()).unwrap();
    assert_eq!(saved.urn, tb_core::resource_urn("bigquery", "mart.orders"));
    assert_eq!(h.api.get_resource("p", "mart.orders").unwrap(), saved);
    assert_eq!(h.api.list_resources("p", Some("main")).unwrap().len(), 1);
    assert!(h.api.list_resources("p", Some("other")).unwrap().is_empty());

    let err = h.api.save_resource("p", "other", orders()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NameConflict);

    h.api.delete_resource("p", "mart.orders").unwrap();
    assert_eq!(h.api.get_resource("p", "mart.orders").unwrap_err().kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn replay_plan_submit_conflict_and_cancel() {
    let h = project();
    h.api.upsert_job("p", "main", sql_spec("p", "a", &[])).await.unwrap();
    let (start, end) = (utc(2021, 1, 15, 0), utc(2021, 1, 20, 0));

    let planned = h.api.plan_replay("p", "a", start, end, ReplayConfig::default()).unwrap();
    assert_eq!(planned.total_runs(), 6);
    assert!(h.api.list_replays("p", None).unwrap().is_empty());

    let first = h.api.submit_replay("p", "a", start, end, ReplayConfig::default()).unwrap();
    assert_eq!(first.status, ReplayStatus::Accepted);
    assert_eq!(h.api.get_replay(&first.id.to_string()[..8]).unwrap().id, first.id);

    let err = h.api.submit_replay("p", "a", utc(2021, 1, 18, 0), end, ReplayConfig::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ReplayConflict);

    h.clock.advance(std::time::Duration::from_secs(60));
    let force = ReplayConfig { force: true, ..ReplayConfig::default() };
    let second = h.api.submit_replay("p", "a", utc(2021, 1, 18, 0), end, force).unwrap();
    let first = h.api.get_replay(&first.id.to_string()).unwrap();
    assert_eq!(first.count_runs(ReplayRunStatus::Superseded), 3);
    assert_eq!(first.count_runs(ReplayRunStatus::Pending), 3);

    let accepted = h.api.list_replays("p", Some(ReplayStatus::Accepted)).unwrap();
    assert_eq!(accepted.iter().map(|r| r.id).collect::<Vec<_>>(), [second.id, first.id]);

    let cancelled = h.api.cancel_replay(&second.id.to_string()).unwrap();
    assert_eq!(cancelled.status, ReplayStatus::Failed);
    assert_eq!(cancelled.message.as_deref(), Some("cancelled"));
    assert_eq!(h.api.cancel_replay(&second.id.to_string()).unwrap_err().kind(), ErrorKind::InvalidSpec);
}

fn wire(event_type: &str, scheduled_at: &str, event_time: i64) -> WireEvent {
    serde_json::from_value(json!({
        "type": event_type,
        "value": {"scheduled_at": scheduled_at, "attempt": 1, "event_time": event_time},
    }))
    .unwrap()
}

#[tokio::test]
async fn ingested_runs_merge_with_expected_instants() {
    let h = project();
    let mut spec = sql_spec("p", "a", &[]);
    spec.behavior.sla = Some("1h".into());
    h.api.upsert_job("p", "main", spec).await.unwrap();

    let second = utc(2021, 1, 2, 0).timestamp();
    let third = utc(2021, 1, 3, 0).timestamp();
    h.api.ingest_event("p", "a", &wire("job_start", "2021-01-02T00:00:00Z", second)).await.unwrap();
    h.api.ingest_event("p", "a", &wire("TYPE_JOB_SUCCESS", "2021-01-02T00:00:00Z", second + 600)).await.unwrap();
    h.api.ingest_event("p", "a", &wire("job_start", "2021-01-03T00:00:00Z", third)).await.unwrap();

    let runs = h.api.get_job_runs("p", "a", utc(2021, 1, 1, 0), utc(2021, 1, 3, 0)).unwrap();
    let summary: Vec<(u32, JobRunStatus, bool)> = runs.iter().map(|r| (r.attempt, r.status, r.sla_breached)).collect();
    assert_eq!(
        summary,
        [(0, JobRunStatus::Pending, false), (1, JobRunStatus::Success, false), (1, JobRunStatus::Started, true)]
    );
    assert_eq!(runs[1].duration_ms, Some(600_000));

    assert_eq!(h.api.delete_all_runs_by_job("p", "a").unwrap(), 2);
    assert_eq!(h.api.delete_all_runs_by_job("p", "a").unwrap(), 0);
    let runs = h.api.get_job_runs("p", "a", utc(2021, 1, 1, 0), utc(2021, 1, 3, 0)).unwrap();
    assert!(runs.iter().all(|r| r.status == JobRunStatus::Pending));
}

#[tokio::test]
async fn ingest_errors_surface_to_the_caller() {
    let h = project();
    h.api.upsert_job("p", "main", sql_spec("p", "a", &[])).await.unwrap();

    let t = utc(2021, 1, 2, 0).timestamp();
    let err = h.api.ingest_event("p", "ghost", &wire("job_start", "2021-01-02T00:00:00Z", t)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = h.api.ingest_event("p", "a", &wire("job_exploded", "2021-01-02T00:00:00Z", t)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidSpec);
    let err = h.api.ingest_event("p", "a", &wire("job_success", "2021-01-02T00:00:00Z", t)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoSuchRun);
    let err = h.api.get_job_runs("p", "a", utc(2021, 1, 3, 0), utc(2021, 1, 1, 0)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidSpec);
}
