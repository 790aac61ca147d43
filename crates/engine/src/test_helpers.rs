// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for the engine crate.

use chrono::{DateTime, TimeZone, Utc};
use indexmap::IndexMap;
use tb_core::test_support::{job_fixture, namespace_fixture, project_fixture};
use tb_core::{
    DependencySpec, EdgeKind, Event, JobId, JobSpec, NamespaceId, ProjectId, ScheduleSpec,
};
use tb_storage::{MaterializedState, Store};
use tempfile::TempDir;

use crate::resolver;

pub(crate) fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

/// Destination URN the fixtures give job `name` of project `project`.
pub(crate) fn table(project: &str, name: &str) -> String {
    format!("bigquery://{project}:ds.{name}")
}

/// A daily job spec depending on `deps` (bare or `project/job` keys).
pub(crate) fn spec(name: &str, deps: &[&str]) -> JobSpec {
    let dependencies: IndexMap<String, DependencySpec> =
        deps.iter().map(|d| (d.to_string(), DependencySpec::default())).collect();
    JobSpec::builder()
        .name(name)
        .schedule(ScheduleSpec { start_date: utc(2021, 1, 1, 0), end_date: None, interval: "0 0 * * *".into() })
        .dependencies(dependencies)
        .build()
}

pub(crate) fn typed(kind: EdgeKind) -> DependencySpec {
    DependencySpec { kind: Some(kind) }
}

/// State built directly from events, without a WAL.
#[derive(Default)]
pub(crate) struct Fixture {
    pub state: MaterializedState,
    namespaces: Vec<(ProjectId, NamespaceId)>,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a project with one namespace, `main`.
    pub(crate) fn project(&mut self, name: &str) -> ProjectId {
        let project = project_fixture(name);
        let namespace = namespace_fixture(project.id, "main");
        let ids = (project.id, namespace.id);
        self.state.apply_event(&Event::ProjectRegistered { project });
        self.state.apply_event(&Event::NamespaceRegistered { namespace });
        self.namespaces.push(ids);
        ids.0
    }

    /// Store a job writing [`table`] and reading `sources`.
    pub(crate) fn job(&mut self, project_id: ProjectId, spec: JobSpec, sources: &[String]) -> JobId {
        let namespace_id = self
            .namespaces
            .iter()
            .find(|(p, _)| *p == project_id)
            .map(|(_, ns)| *ns)
            .unwrap();
        let project = self.state.projects[&project_id].name.clone();
        let mut job = job_fixture(project_id, namespace_id, spec);
        job.destination_urn = table(&project, &job.spec.name);
        let id = job.id;
        self.state.apply_event(&Event::JobUpserted { job: Box::new(job), sources: sources.to_vec() });
        id
    }

    /// Run the resolver over every job and store the edges.
    pub(crate) fn resolve_all(&mut self) {
        let jobs: Vec<_> = self.state.jobs.values().cloned().collect();
        for job in jobs {
            let sources = self.state.sources_of(job.id).to_vec();
            let resolution = resolver::resolve(&self.state, &job, &sources).unwrap();
            self.state.apply_event(&Event::JobDependenciesReplaced { job_id: job.id, dependencies: resolution.edges });
        }
    }

    pub(crate) fn id(&self, project_id: ProjectId, name: &str) -> JobId {
        self.state.job_by_name(project_id, name).unwrap().id
    }
}

/// A store in a fresh temporary directory.
pub(crate) fn temp_store() -> (TempDir, Store) {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(&dir.path().join("wal/events.wal"), &dir.path().join("snapshot.json.zst")).unwrap();
    (dir, store)
}

/// A `sql` task spec of project `project` writing its own table and
/// reading the named tables of the same project.
pub(crate) fn sql_spec(project: &str, name: &str, reads: &[&str]) -> JobSpec {
    let mut spec = spec(name, &[]);
    for (key, value) in [("PROJECT", project), ("DATASET", "ds"), ("TABLE", name)] {
        spec.task.config.insert(key.to_string(), value.to_string());
    }
    let query = if reads.is_empty() {
        "select 1".to_string()
    } else {
        reads.iter().map(|r| format!("select * from {project}.ds.{r}")).collect::<Vec<_>>().join(" union all ")
    };
    spec.assets.insert("query.sql".into(), query);
    spec
}

/// Register a project and its `main` namespace in `store`.
pub(crate) fn register(store: &Store, name: &str) -> (ProjectId, NamespaceId) {
    let now = utc(2024, 1, 1, 0);
    let project = store
        .transact(|tx| tx.register_project(name, Default::default(), now))
        .unwrap();
    let namespace = store
        .transact(|tx| tx.register_namespace(project.id, "main", Default::default(), now))
        .unwrap();
    (project.id, namespace.id)
}

/// Write a job straight to `store`, destination per [`table`].
pub(crate) fn put_job(store: &Store, ids: (ProjectId, NamespaceId), spec: JobSpec, sources: &[String]) -> JobId {
    let now = utc(2024, 1, 1, 0);
    store
        .transact(|tx| {
            let project = tx.project(ids.0)?.name.clone();
            let destination = table(&project, &spec.name);
            tx.upsert_job(ids.0, ids.1, spec, destination, sources.to_vec(), now)
        })
        .unwrap()
        .id
}
