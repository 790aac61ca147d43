// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;
use yare::parameterized;

const FULL_TOML: &str = r#"
version = 1
name = "daily_rollup"
owner = "data@example.com"
description = "rolls up events"
labels = { team = "growth" }
hooks = [{ name = "transporter", config = { KAFKA_TOPIC = "rollup" } }]
dependencies = [
    "raw_events",
    "upstream/daily",
    { job = "ads", type = "inter" },
    { http = { name = "vendor", url = "https://vendor.example.com/ready", params = { day = "today" } } },
]

[schedule]
start_date = "2022-03-01"
end_date = "2022-12-31"
interval = "0 2 * * *"

[behavior]
catch_up = true

[behavior.retry]
count = 2
delay = "5m"
exponential_backoff = true

[task]
name = "bq2bq"

[task.config]
PROJECT = "lake"
DATASET = "playground"
TABLE = "rollup"
BATCH = 500

[task.window]
size = "24h"
offset = "0"
truncate_to = "d"

[assets]
"query.sql" = "select * from `lake.raw.events`"
"#;

const FULL_HCL: &str = r#"
version     = 1
name        = "daily_rollup"
owner       = "data@example.com"
description = "rolls up events"

labels = { team = "growth" }

schedule {
  start_date = "2022-03-01"
  end_date   = "2022-12-31"
  interval   = "0 2 * * *"
}

behavior {
  catch_up = true
  retry {
    count               = 2
    delay               = "5m"
    exponential_backoff = true
  }
}

task {
  name = "bq2bq"
  config = {
    PROJECT = "lake"
    DATASET = "playground"
    TABLE   = "rollup"
    BATCH   = 500
  }
  window {
    size        = "24h"
    offset      = "0"
    truncate_to = "d"
  }
}

hooks = [{ name = "transporter", config = { KAFKA_TOPIC = "rollup" } }]

dependencies = [
  "raw_events",
  "upstream/daily",
  { job = "ads", type = "inter" },
  { http = { name = "vendor", url = "https://vendor.example.com/ready", params = { day = "today" } } },
]

assets = {
  "query.sql" = "select * from `lake.raw.events`"
}
"#;

#[parameterized(
    toml = { FULL_TOML, Format::Toml },
    hcl  = { FULL_HCL,  Format::Hcl },
)]
fn full_spec_maps_every_field(content: &str, format: Format) {
    let spec = crate::parse_job_spec_with_format(content, format).unwrap();

    assert_eq!(spec.version, 1);
    assert_eq!(spec.name, "daily_rollup");
    assert_eq!(spec.owner, "data@example.com");
    assert_eq!(spec.description, "rolls up events");
    assert_eq!(spec.labels["team"], "growth");

    assert_eq!(spec.schedule.start_date, Utc.with_ymd_and_hms(2022, 3, 1, 0, 0, 0).unwrap());
    assert_eq!(spec.schedule.end_date, Some(Utc.with_ymd_and_hms(2022, 12, 31, 0, 0, 0).unwrap()));
    assert_eq!(spec.schedule.interval, "0 2 * * *");

    assert!(spec.behavior.catch_up);
    assert!(!spec.behavior.depends_on_past);
    assert_eq!(spec.behavior.retry, Retry { count: 2, delay: 300, exponential_backoff: true });

    assert_eq!(spec.task.plugin_name, "bq2bq");
    let keys: Vec<&str> = spec.task.config.keys().map(String::as_str).collect();
    assert_eq!(keys, ["PROJECT", "DATASET", "TABLE", "BATCH"]);
    assert_eq!(spec.task.config["BATCH"], "500");
    assert_eq!(spec.task.window, WindowSpec::new("24h", "0", "d"));

    assert_eq!(spec.hooks.len(), 1);
    assert_eq!(spec.hooks[0].plugin_name, "transporter");
    assert_eq!(spec.hooks[0].hook_type, HookType::Post);
    assert_eq!(spec.hooks[0].config["KAFKA_TOPIC"], "rollup");

    let deps: Vec<(&str, Option<EdgeKind>)> =
        spec.dependencies.iter().map(|(k, v)| (k.as_str(), v.kind)).collect();
    assert_eq!(deps, [("raw_events", None), ("upstream/daily", None), ("ads", Some(EdgeKind::Inter))]);
    assert_eq!(spec.http_dependencies.len(), 1);
    assert_eq!(spec.http_dependencies[0].name, "vendor");
    assert_eq!(spec.http_dependencies[0].params["day"], "today");

    assert_eq!(spec.assets["query.sql"], "select * from `lake.raw.events`");
}

const MINIMAL_TOML: &str = r#"
name = "tiny"
owner = "o@example.com"
[schedule]
start_date = "2023-01-01T06:00:00Z"
interval = "@daily"
[task]
name = "sql"
[task.window]
size = "1h"
"#;

const MINIMAL_HCL: &str = r#"
name  = "tiny"
owner = "o@example.com"
schedule {
  start_date = "2023-01-01T06:00:00Z"
  interval   = "@daily"
}
task {
  name = "sql"
  window {
    size = "1h"
  }
}
"#;

#[parameterized(
    toml = { MINIMAL_TOML, Format::Toml },
    hcl  = { MINIMAL_HCL,  Format::Hcl },
)]
fn minimal_spec_uses_defaults(content: &str, format: Format) {
    let spec = crate::parse_job_spec_with_format(content, format).unwrap();
    assert_eq!(spec.version, 1);
    assert_eq!(spec.schedule.start_date, Utc.with_ymd_and_hms(2023, 1, 1, 6, 0, 0).unwrap());
    assert_eq!(spec.schedule.end_date, None);
    assert_eq!(spec.behavior, Behavior::default());
    assert!(spec.task.config.is_empty());
    assert!(spec.dependencies.is_empty());
    assert!(spec.hooks.is_empty());
}

#[test]
fn config_list_form_keeps_declared_order() {
    let content = r#"
name = "ordered"
owner = "o@example.com"
[schedule]
start_date = "2023-01-01"
interval = "0 * * * *"
[task]
name = "sql"
config = [
    { name = "Z_LAST", value = "1" },
    { name = "A_FIRST", value = true },
]
[task.window]
size = "1h"
"#;
    let spec = crate::parse_job_spec(content).unwrap();
    let entries: Vec<(&str, &str)> = spec.task.config.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
    assert_eq!(entries, [("Z_LAST", "1"), ("A_FIRST", "true")]);
}

#[test]
fn hook_type_can_be_declared() {
    let content = r#"
name = "hooked"
owner = "o@example.com"
hooks = [{ name = "predator", type = "pre" }, { name = "alert", type = "fail" }]
[schedule]
start_date = "2023-01-01"
interval = "0 * * * *"
[task]
name = "sql"
[task.window]
size = "1h"
"#;
    let spec = crate::parse_job_spec(content).unwrap();
    let types: Vec<HookType> = spec.hooks.iter().map(|h| h.hook_type).collect();
    assert_eq!(types, [HookType::Pre, HookType::Fail]);
}

#[parameterized(
    no_name = { "name", r#"owner = "o"
[schedule]
start_date = "2023-01-01"
interval = "@daily"
[task]
name = "sql"
[task.window]
size = "1h""# },
    no_start = { "schedule.start_date", r#"name = "a"
owner = "o"
[schedule]
interval = "@daily"
[task]
name = "sql"
[task.window]
size = "1h""# },
    no_interval = { "schedule.interval", r#"name = "a"
owner = "o"
[schedule]
start_date = "2023-01-01"
[task]
name = "sql"
[task.window]
size = "1h""# },
    no_task = { "task.name", r#"name = "a"
owner = "o"
[schedule]
start_date = "2023-01-01"
interval = "@daily""# },
)]
fn missing_required_fields(field: &str, content: &str) {
    let err = crate::parse_job_spec(content).unwrap_err();
    assert!(matches!(err, SpecFileError::Missing(f) if f == field), "{err}");
    assert_eq!(err.kind(), ErrorKind::InvalidSpec);
}

#[parameterized(
    bad_date = { r#"start_date = "first of march""#, "schedule.start_date" },
    bad_cron = { r#"start_date = "2023-01-01"
interval = "every day""#, "schedule" },
)]
fn invalid_schedule(schedule: &str, expected: &str) {
    let interval = if schedule.contains("interval") { "" } else { "\ninterval = \"@daily\"" };
    let content = format!(
        "name = \"a\"\nowner = \"o\"\n[schedule]\n{schedule}{interval}\n[task]\nname = \"sql\"\n[task.window]\nsize = \"1h\"\n"
    );
    let err = crate::parse_job_spec(&content).unwrap_err();
    assert!(err.to_string().contains(expected), "{err}");
    assert_eq!(err.kind(), ErrorKind::InvalidSpec);
}

#[test]
fn structural_validation_runs_after_parsing() {
    let content = r#"
name = "loop"
owner = "o@example.com"
dependencies = ["loop"]
[schedule]
start_date = "2023-01-01"
interval = "@daily"
[task]
name = "sql"
[task.window]
size = "1h"
"#;
    let err = crate::parse_job_spec(content).unwrap_err();
    assert!(matches!(err, SpecFileError::Spec(_)), "{err:?}");
    assert!(err.to_string().contains("cannot depend on itself"), "{err}");
}

#[parameterized(
    toml = { "name = [", Format::Toml },
    hcl  = { "name = ", Format::Hcl },
)]
fn syntax_errors_are_reported(content: &str, format: Format) {
    let err = JobFile::parse(content, format).unwrap_err();
    match format {
        Format::Toml => assert!(matches!(err, SpecFileError::Toml(_)), "{err:?}"),
        Format::Hcl => assert!(matches!(err, SpecFileError::Hcl(_)), "{err:?}"),
    }
}

#[test]
fn merge_fills_only_unset_fields() {
    let parent = JobFile::parse(
        r#"
owner = "team@example.com"
labels = { team = "growth", tier = "gold" }
dependencies = ["shared_source", "raw_events"]
hooks = [{ name = "transporter" }]
[schedule]
start_date = "2022-01-01"
interval = "0 0 * * *"
[behavior]
depends_on_past = true
[behavior.retry]
count = 3
delay = 60
"#,
        Format::Toml,
    )
    .unwrap();
    let mut child = JobFile::parse(
        r#"
name = "child"
labels = { tier = "silver" }
dependencies = [{ job = "raw_events", type = "intra" }]
[schedule]
interval = "0 5 * * *"
[behavior.retry]
count = 1
[task]
name = "sql"
[task.window]
size = "1h"
"#,
        Format::Toml,
    )
    .unwrap();

    child.merge_from(&parent);
    let spec = child.into_spec().unwrap();

    assert_eq!(spec.owner, "team@example.com");
    assert_eq!(spec.schedule.interval, "0 5 * * *");
    assert_eq!(spec.schedule.start_date, Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap());
    assert!(spec.behavior.depends_on_past);
    assert_eq!(spec.behavior.retry.count, 1);
    assert_eq!(spec.behavior.retry.delay, 60);
    assert_eq!(spec.labels["tier"], "silver");
    assert_eq!(spec.labels["team"], "growth");
    let deps: Vec<(&str, Option<EdgeKind>)> =
        spec.dependencies.iter().map(|(k, v)| (k.as_str(), v.kind)).collect();
    assert_eq!(deps, [("raw_events", Some(EdgeKind::Intra)), ("shared_source", None)]);
    assert_eq!(spec.hooks.len(), 1);
}
