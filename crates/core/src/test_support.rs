// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};

use crate::id::{JobId, NamespaceId, ProjectId};
use crate::job::{Job, JobSpec};
use crate::resource::resource_urn;
use crate::tenant::{Namespace, Project};
use crate::Event;

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for specs and run state.
pub mod strategies {
    use crate::dependency::{DependencySpec, EdgeKind, HttpDependency};
    use crate::job::{Behavior, Hook, HookType, JobSpec, Retry, ScheduleSpec, TaskSpec};
    use crate::run::JobRunStatus;
    use crate::window::WindowSpec;
    use chrono::{Duration, TimeZone, Utc};
    use indexmap::IndexMap;
    use proptest::prelude::*;

    pub fn arb_window_spec() -> impl Strategy<Value = WindowSpec> {
        let size = prop_oneof![Just("1h"), Just("24h"), Just("48h"), Just("168h"), Just("1M"), Just("1M24h")];
        let offset = prop_oneof![Just(""), Just("0"), Just("1h"), Just("-24h"), Just("-1M")];
        let truncate = prop_oneof![Just(""), Just("h"), Just("d"), Just("w"), Just("M")];
        (size, offset, truncate).prop_map(|(s, o, t)| WindowSpec::new(s, o, t))
    }

    pub fn arb_cron() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("0 0 * * *"),
            Just("0 2 * * *"),
            Just("*/15 * * * *"),
            Just("0 3 * * 1"),
            Just("0 0 1 * *"),
            Just("@daily"),
            Just("@hourly"),
        ]
        .prop_map(str::to_string)
    }

    pub fn arb_job_run_status() -> impl Strategy<Value = JobRunStatus> {
        prop_oneof![
            Just(JobRunStatus::Pending),
            Just(JobRunStatus::Started),
            Just(JobRunStatus::Success),
            Just(JobRunStatus::Failed),
            Just(JobRunStatus::SlaMissed),
        ]
    }

    fn arb_hook() -> impl Strategy<Value = Hook> {
        let hook_type = prop_oneof![Just(HookType::Pre), Just(HookType::Post), Just(HookType::Fail)];
        ("[a-z]{2,8}", hook_type).prop_map(|(plugin_name, hook_type)| Hook {
            plugin_name,
            config: IndexMap::new(),
            hook_type,
        })
    }

    fn arb_dependency_key() -> impl Strategy<Value = String> {
        prop_oneof!["up-[a-z]{1,6}", "proj-[a-z]{1,4}/up-[a-z]{1,6}"]
    }

    fn arb_dependency_spec() -> impl Strategy<Value = DependencySpec> {
        prop_oneof![Just(None), Just(Some(EdgeKind::Intra)), Just(Some(EdgeKind::Inter))]
            .prop_map(|kind| DependencySpec { kind })
    }

    /// Structurally valid job specs.
    pub fn arb_job_spec() -> impl Strategy<Value = JobSpec> {
        let identity = ("[a-z][a-z0-9_]{0,12}", "[a-z]{1,8}", 1u32..3);
        let schedule = (0i64..1000, proptest::option::of(1i64..400), arb_cron());
        let behavior = (any::<bool>(), any::<bool>(), 0u32..5, 0u64..600, any::<bool>(), prop_oneof![
            Just(None),
            Just(Some("2h".to_string())),
            Just(Some("90m".to_string()))
        ]);
        let task = (
            "[a-z]{2,8}",
            proptest::collection::vec(("[A-Z_]{1,8}", "[a-z0-9 ]{0,10}"), 0..4),
            arb_window_spec(),
        );
        let extras = (
            proptest::collection::btree_map("[a-z]{1,6}", "[a-z0-9]{0,6}", 0..3),
            proptest::collection::btree_map("[a-z]{1,6}\\.sql", "select [0-9]{1,3}", 0..2),
            proptest::collection::vec(arb_hook(), 0..3),
            proptest::collection::vec((arb_dependency_key(), arb_dependency_spec()), 0..4),
            proptest::option::of("[a-z]{1,6}"),
        );
        (identity, schedule, behavior, task, extras).prop_map(
            |((name, owner, version), schedule, behavior, task, extras)| {
                let (start_days, end_days, interval) = schedule;
                let start = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).single().unwrap_or_default() + Duration::days(start_days);
                let (depends_on_past, catch_up, count, delay, exponential_backoff, sla) = behavior;
                let (plugin_name, config, window) = task;
                let (labels, assets, hooks, deps, http) = extras;
                JobSpec {
                    version,
                    name,
                    owner: format!("{owner}@example.com"),
                    description: String::new(),
                    labels,
                    schedule: ScheduleSpec {
                        start_date: start,
                        end_date: end_days.map(|d| start + Duration::days(d)),
                        interval,
                    },
                    behavior: Behavior {
                        depends_on_past,
                        catch_up,
                        retry: Retry { count, delay, exponential_backoff },
                        sla,
                    },
                    task: TaskSpec { plugin_name, config: config.into_iter().collect(), window },
                    assets,
                    hooks,
                    dependencies: deps.into_iter().collect(),
                    http_dependencies: http
                        .into_iter()
                        .map(|name| HttpDependency {
                            url: format!("https://status.example.com/{name}"),
                            name,
                            ..Default::default()
                        })
                        .collect(),
                }
            },
        )
    }
}

// ── Fixtures ────────────────────────────────────────────────────────────────

/// Fixed instant used by fixtures.
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap_or_default()
}

pub fn project_fixture(name: &str) -> Project {
    Project { id: ProjectId::new(), name: name.to_string(), config: BTreeMap::new(), created_at: epoch(), updated_at: epoch() }
}

pub fn namespace_fixture(project_id: ProjectId, name: &str) -> Namespace {
    Namespace { id: NamespaceId::new(), project_id, name: name.to_string(), config: BTreeMap::new(), created_at: epoch() }
}

/// A stored job whose destination is `bigquery://<name>`.
pub fn job_fixture(project_id: ProjectId, namespace_id: NamespaceId, spec: JobSpec) -> Job {
    Job {
        id: JobId::new(),
        project_id,
        namespace_id,
        destination_urn: resource_urn("bigquery", &spec.name),
        spec,
        created_at: epoch(),
        updated_at: epoch(),
    }
}

// ── Event factory functions ─────────────────────────────────────────────────

pub fn project_registered_event(name: &str) -> Event {
    Event::ProjectRegistered { project: project_fixture(name) }
}

/// Upsert of a job named `name` reading from one external table.
pub fn job_upserted_event(project_id: ProjectId, name: &str) -> Event {
    let job = job_fixture(project_id, NamespaceId::new(), JobSpec::builder().name(name).build());
    Event::JobUpserted { job: Box::new(job), sources: vec![resource_urn("bigquery", "raw.events")] }
}
