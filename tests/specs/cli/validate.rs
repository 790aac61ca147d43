// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tb job validate --local` checks a spec file without a daemon.

use crate::prelude::*;
use similar_asserts::assert_eq;

#[test]
fn valid_spec_passes() {
    let temp = Project::empty();
    temp.file("jobs/orders/job.toml", &sql_job("orders", "orders", &[]));

    temp.tb().args(&["job", "validate", "jobs/orders", "--local"]).passes().stdout_has("Job 'orders' is valid");
}

#[test]
fn missing_task_exits_with_validation_code() {
    let temp = Project::empty();
    temp.file(
        "job.toml",
        r#"
name = "orders"
[schedule]
start_date = "2023-01-01"
interval = "@daily"
"#,
    );

    temp.tb().args(&["job", "validate", "job.toml", "--local"]).exits(2).stderr_has("task");
}

#[test]
fn bad_schedule_exits_with_validation_code() {
    let temp = Project::empty();
    let spec = sql_job("orders", "orders", &[]).replace("0 0 * * *", "every day");
    temp.file("job.toml", &spec);

    temp.tb().args(&["job", "validate", "job.toml", "--local"]).exits(2);
}

#[test]
fn unsupported_extension_exits_with_validation_code() {
    let temp = Project::empty();
    temp.file("job.yaml", "name: orders");

    temp.tb().args(&["job", "validate", "job.yaml", "--local"]).exits(2);
}

#[test]
fn json_output_reports_the_job_name() {
    let temp = Project::empty();
    temp.file("job.toml", &sql_job("orders", "orders", &[]));

    let json = temp.tb().args(&["job", "validate", "job.toml", "--local", "-o", "json"]).passes().json();
    assert_eq!(json["valid"], true);
    assert_eq!(json["name"], "orders");
}
