// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job upload and project deployment specs

use crate::prelude::*;
use similar_asserts::assert_eq;

#[test]
fn create_then_list_shows_destination() {
    let temp = Project::registered();
    temp.file("orders/job.toml", &sql_job("orders", "orders", &[]));

    temp.tb().args(&["job", "create", "orders", "-p", "acme", "-n", "analytics"]).passes().stdout_has("saved");
    temp.tb()
        .args(&["job", "list", "-p", "acme"])
        .passes()
        .stdout_has("orders")
        .stdout_has("bigquery://acme:mart.orders");
}

#[test]
fn deploy_directory_and_wait_for_success() {
    let temp = Project::registered();
    temp.file("jobs/orders/job.toml", &sql_job("orders", "orders", &[]));
    temp.file("jobs/orders_daily/job.toml", &sql_job("orders-daily", "orders_daily", &["orders"]));

    let json = temp
        .tb()
        .args(&["job", "deploy", "-p", "acme", "--dir", "jobs", "-n", "analytics", "--wait", "-o", "json"])
        .passes()
        .json();
    assert_eq!(json["status"], "succeeded");

    let jobs = temp.tb().args(&["job", "list", "-p", "acme", "-o", "json"]).passes().json();
    assert_eq!(jobs.as_array().map(Vec::len), Some(2));
}

#[test]
fn deployment_status_and_list() {
    let temp = Project::registered();
    temp.file("orders/job.toml", &sql_job("orders", "orders", &[]));
    temp.tb().args(&["job", "create", "orders", "-p", "acme", "-n", "analytics"]).passes();

    let deployment = temp.tb().args(&["job", "deploy", "-p", "acme", "--wait", "-o", "json"]).passes().json();
    let id = deployment["id"].as_str().unwrap().to_string();

    temp.tb().args(&["deployment", "status", &id]).passes().stdout_has("succeeded");
    temp.tb().args(&["deployment", "list", "-p", "acme"]).passes().stdout_has(&id[..8]);
}

#[test]
fn unknown_dependency_is_rejected() {
    let temp = Project::registered();
    temp.file("orders/job.toml", &sql_job("orders-daily", "orders_daily", &["missing"]));

    temp.tb().args(&["job", "create", "orders", "-p", "acme", "-n", "analytics"]).exits(2).stderr_has("missing");
}

#[test]
fn delete_unknown_job_is_not_found() {
    let temp = Project::registered();
    temp.tb().args(&["job", "delete", "ghost", "-p", "acme"]).exits(4);
}

#[test]
fn delete_removes_the_job() {
    let temp = Project::registered();
    temp.file("orders/job.toml", &sql_job("orders", "orders", &[]));
    temp.tb().args(&["job", "create", "orders", "-p", "acme", "-n", "analytics"]).passes();

    temp.tb().args(&["job", "delete", "orders", "-p", "acme"]).passes().stdout_has("deleted");
    temp.tb().args(&["job", "list", "-p", "acme"]).passes().stdout_has("No jobs found");
}

#[test]
fn remote_validate_checks_the_plugin() {
    let temp = Project::registered();
    let spec = sql_job("orders", "orders", &[]).replace("name = \"sql\"", "name = \"spark\"");
    temp.file("job.toml", &spec);

    temp.tb().args(&["job", "validate", "job.toml", "--local"]).passes();
    temp.tb().args(&["job", "validate", "job.toml", "-p", "acme"]).exits(2).stderr_has("spark");
}
