// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tb_core::test_support::{epoch, job_fixture};
use tb_core::{JobSpec, NamespaceId, ProjectId};
use tempfile::tempdir;

fn task(name: &str) -> DagTask {
    let job = job_fixture(ProjectId::new(), NamespaceId::new(), JobSpec::builder().name(name).build());
    DagTask {
        job_id: job.id,
        name: name.to_string(),
        namespace: "core".into(),
        owner: job.spec.owner.clone(),
        schedule: job.spec.schedule.clone(),
        behavior: job.spec.behavior.clone(),
        window: job.spec.task.window.clone(),
        plugin: job.spec.task.plugin_name.clone(),
        config: job.spec.task.config.clone(),
        hooks: vec![],
        upstreams: vec![],
        external_upstreams: vec![],
        http_sensors: vec![],
        downstreams: vec![],
        priority: 10_000,
    }
}

#[tokio::test]
async fn deploy_writes_one_file_per_task() {
    let dir = tempdir().unwrap();
    let scheduler = FileScheduler::new(dir.path());
    scheduler.deploy_task("sales", &task("a")).await.unwrap();
    scheduler.deploy_task("sales", &task("b")).await.unwrap();

    let written = std::fs::read_to_string(dir.path().join("sales").join("a.json")).unwrap();
    let parsed: DagTask = serde_json::from_str(&written).unwrap();
    assert_eq!(parsed.name, "a");
    assert!(!dir.path().join("sales").join("a.tmp").exists());
}

#[tokio::test]
async fn remove_stale_keeps_listed_tasks() {
    let dir = tempdir().unwrap();
    let scheduler = FileScheduler::new(dir.path());
    for name in ["a", "b", "c"] {
        scheduler.deploy_task("sales", &task(name)).await.unwrap();
    }
    let removed = scheduler.remove_stale("sales", &["b".to_string()]).await.unwrap();
    assert_eq!(removed, vec!["a", "c"]);
    assert!(dir.path().join("sales").join("b.json").exists());
    assert!(scheduler.remove_stale("unknown", &[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn clear_and_trigger_append_requests() {
    let dir = tempdir().unwrap();
    let scheduler = FileScheduler::new(dir.path());
    scheduler.clear("sales", "a", epoch()).await.unwrap();
    scheduler.trigger("sales", "a", epoch()).await.unwrap();

    let log = std::fs::read_to_string(dir.path().join("sales").join(RUN_LOG)).unwrap();
    let actions: Vec<String> = log
        .lines()
        .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap()["action"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(actions, vec!["clear", "trigger"]);
}
