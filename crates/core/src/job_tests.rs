// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::strategies::*;
use proptest::prelude::*;

fn valid() -> JobSpec {
    JobSpec::builder().build()
}

#[test]
fn builder_default_is_valid() {
    valid().validate().unwrap();
}

#[test]
fn missing_plugin_is_rejected() {
    let mut spec = valid();
    spec.task.plugin_name = "  ".into();
    assert_eq!(spec.validate(), Err(SpecError::Missing("task.plugin_name")));
    assert_eq!(SpecError::Missing("x").kind(), ErrorKind::InvalidSpec);
}

#[test]
fn bad_window_is_rejected() {
    let mut spec = valid();
    spec.task.window = WindowSpec::new("24h", "", "q");
    assert!(matches!(spec.validate(), Err(SpecError::Window(WindowError::TruncateTo(_)))));
}

#[test]
fn bad_cron_is_rejected() {
    let mut spec = valid();
    spec.schedule.interval = "every minute".into();
    assert!(matches!(spec.validate(), Err(SpecError::Schedule(_))));
}

#[test]
fn end_before_start_is_rejected() {
    let mut spec = valid();
    spec.schedule.end_date = Some(spec.schedule.start_date - chrono::Duration::days(1));
    assert!(matches!(spec.validate(), Err(SpecError::Invalid { .. })));
}

#[yare::parameterized(
    self_reference = { "job-a" },
    malformed      = { "a/b/c" },
    empty          = { "" },
)]
fn bad_dependency_keys(key: &str) {
    let mut spec = valid();
    spec.dependencies.insert(key.to_string(), DependencySpec::default());
    assert!(spec.validate().is_err());
}

#[test]
fn qualified_self_name_in_other_project_is_allowed() {
    let mut spec = valid();
    spec.dependencies.insert("other/job-a".into(), DependencySpec::default());
    spec.validate().unwrap();
}

#[test]
fn http_dependency_needs_http_url() {
    let mut spec = valid();
    spec.http_dependencies.push(HttpDependency { name: "ready".into(), url: "ftp://x".into(), ..Default::default() });
    assert!(spec.validate().is_err());
    spec.http_dependencies[0].url = "https://status.example.com/ready".into();
    spec.validate().unwrap();
}

#[test]
fn sla_must_be_fixed_duration() {
    let mut spec = valid();
    spec.behavior.sla = Some("1M".into());
    assert!(spec.validate().is_err());
    spec.behavior.sla = Some("90m".into());
    spec.validate().unwrap();
    assert_eq!(spec.behavior.sla_seconds(), 5400);
}

#[test]
fn hooks_of_filters_by_type_in_order() {
    let hook = |name: &str, t| Hook { plugin_name: name.into(), config: IndexMap::new(), hook_type: t };
    let spec = JobSpec::builder()
        .hooks(vec![hook("a", HookType::Pre), hook("b", HookType::Post), hook("c", HookType::Pre)])
        .build();
    let pre: Vec<_> = spec.hooks_of(HookType::Pre).map(|h| h.plugin_name.as_str()).collect();
    assert_eq!(pre, ["a", "c"]);
}

#[test]
fn job_active_range() {
    let mut spec = valid();
    let start = spec.schedule.start_date;
    spec.schedule.end_date = Some(start + chrono::Duration::days(10));
    let job = Job {
        id: JobId::new(),
        project_id: ProjectId::new(),
        namespace_id: NamespaceId::new(),
        spec,
        destination_urn: "bigquery://p:d.t".into(),
        created_at: start,
        updated_at: start,
    };
    assert!(!job.is_active_at(start - chrono::Duration::seconds(1)));
    assert!(job.is_active_at(start));
    assert!(job.is_active_at(start + chrono::Duration::days(10)));
    assert!(!job.is_active_at(start + chrono::Duration::days(11)));
}

proptest! {
    #[test]
    fn spec_json_roundtrip(spec in arb_job_spec()) {
        let json = serde_json::to_string(&spec).unwrap();
        let back: JobSpec = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, spec);
    }

    #[test]
    fn generated_specs_validate(spec in arb_job_spec()) {
        prop_assert!(spec.validate().is_ok());
    }
}
