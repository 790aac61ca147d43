// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Replay planning, submission and cancellation specs

use crate::prelude::*;
use similar_asserts::assert_eq;

/// `orders` feeding `orders-daily`, deployed.
fn chain() -> Project {
    let temp = Project::registered();
    temp.file("jobs/orders/job.toml", &sql_job("orders", "orders", &[]));
    temp.file("jobs/orders_daily/job.toml", &sql_job("orders-daily", "orders_daily", &["orders"]));
    temp.tb().args(&["job", "deploy", "-p", "acme", "--dir", "jobs", "-n", "analytics", "--wait"]).passes();
    temp
}

const RANGE: [&str; 4] = ["--start", "2023-01-01", "--end", "2023-01-03"];

fn replay_args<'a>(verb: &'a str, extra: &[&'a str]) -> Vec<&'a str> {
    let mut args = vec!["replay", verb, "orders", "-p", "acme"];
    args.extend(RANGE);
    args.extend(extra);
    args
}

#[test]
fn plan_includes_downstream_jobs() {
    let temp = chain();
    temp.tb().args(&replay_args("plan", &[])).passes().stdout_has("orders  3 ").stdout_has("\n  orders-daily  3 ");

    let tree = temp.tb().args(&replay_args("plan", &["--ignore-downstream", "-o", "json"])).passes().json();
    assert_eq!(tree.as_array().map(Vec::len), Some(1));
    assert_eq!(tree[0]["runs"].as_array().map(Vec::len), Some(3));
}

#[test]
fn overlapping_replay_conflicts_unless_forced() {
    let temp = chain();
    let first = temp.tb().args(&replay_args("create", &["-o", "json"])).passes().json();
    let id = first["id"].as_str().unwrap().to_string();

    temp.tb().args(&replay_args("create", &[])).exits(3);
    temp.tb().args(&replay_args("create", &["--force"])).passes();

    temp.tb().args(&["replay", "list", "-p", "acme"]).passes().stdout_has(&id[..8]);
}

#[test]
fn cancel_ends_the_replay_as_failed() {
    let temp = chain();
    let replay = temp.tb().args(&replay_args("create", &["-o", "json"])).passes().json();
    let id = replay["id"].as_str().unwrap().to_string();

    temp.tb().args(&["replay", "cancel", &id]).passes();
    temp.tb().args(&["replay", "status", &id]).passes().stdout_has("failed").stdout_has("cancelled");
}

#[test]
fn replay_of_unknown_job_is_not_found() {
    let temp = chain();
    temp.tb()
        .args(&["replay", "plan", "ghost", "-p", "acme", "--start", "2023-01-01", "--end", "2023-01-02"])
        .exits(4);
}
