// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow-engine events recorded through `tb event send`

use crate::prelude::*;

fn deployed() -> Project {
    let temp = Project::registered();
    temp.file("orders/job.toml", &sql_job("orders", "orders", &[]));
    temp.tb().args(&["job", "create", "orders", "-p", "acme", "-n", "analytics"]).passes();
    temp.tb().args(&["job", "deploy", "-p", "acme", "--wait"]).passes();
    temp
}

const START: &str = r#"{"scheduled_at": "2023-01-02T00:00:00Z", "attempt": 1, "event_time": 1672617600}"#;
const SUCCESS: &str = r#"{"scheduled_at": "2023-01-02T00:00:00Z", "attempt": 1, "event_time": 1672621200}"#;

#[test]
fn job_start_then_success_shows_in_runs() {
    let temp = deployed();

    temp.tb()
        .args(&["event", "send", "job_start", "-p", "acme", "-j", "orders", "--value", START])
        .passes()
        .stdout_has("job_start recorded");
    temp.tb().args(&["event", "send", "TYPE_JOB_SUCCESS", "-p", "acme", "-j", "orders", "--value", SUCCESS]).passes();

    temp.tb()
        .args(&["job", "runs", "orders", "-p", "acme", "--start", "2023-01-02", "--end", "2023-01-02"])
        .passes()
        .stdout_has("2023-01-02 00:00")
        .stdout_has("success");
}

#[test]
fn unknown_event_type_is_a_validation_error() {
    let temp = deployed();
    temp.tb().args(&["event", "send", "job_teleport", "-p", "acme", "-j", "orders", "--value", START]).exits(2);
}

#[test]
fn event_for_unknown_job_is_not_found() {
    let temp = deployed();
    temp.tb().args(&["event", "send", "job_start", "-p", "acme", "-j", "ghost", "--value", START]).exits(4);
}
