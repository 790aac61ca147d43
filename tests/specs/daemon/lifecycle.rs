// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle specs

use crate::prelude::*;
use similar_asserts::assert_eq;

#[test]
fn daemon_status_reports_not_running() {
    let temp = Project::empty();
    temp.tb().args(&["daemon", "status"]).passes().stdout_has("Daemon not running");
}

#[test]
fn daemon_status_json_when_not_running() {
    let temp = Project::empty();
    let json = temp.tb().args(&["daemon", "status", "-o", "json"]).passes().json();
    assert_eq!(json["status"], "not_running");
}

#[test]
fn commands_fail_when_daemon_not_running() {
    let temp = Project::empty();
    temp.tb().args(&["job", "list", "-p", "acme"]).exits(1).stderr_has("daemon not running");
}

#[test]
fn daemon_start_status_stop() {
    let temp = Project::empty();

    temp.tb().args(&["daemon", "start"]).passes().stdout_has("Daemon started");
    temp.tb().args(&["daemon", "start"]).passes().stdout_has("already running");
    temp.tb()
        .args(&["daemon", "status"])
        .passes()
        .stdout_has("Status: running")
        .stdout_has(env!("CARGO_PKG_VERSION"));

    temp.tb().args(&["daemon", "stop"]).passes().stdout_has("Daemon stopped");
    assert!(!temp.state_path().join("daemon.sock").exists());
    temp.tb().args(&["daemon", "stop"]).passes().stdout_has("Daemon not running");
}

#[test]
fn state_survives_a_restart() {
    let temp = Project::registered();
    temp.file("orders/job.toml", &sql_job("orders", "orders", &[]));
    temp.tb().args(&["job", "create", "orders", "-p", "acme", "-n", "analytics"]).passes();

    temp.tb().args(&["daemon", "stop"]).passes();
    temp.tb().args(&["daemon", "start"]).passes();

    temp.tb().args(&["job", "list", "-p", "acme"]).passes().stdout_has("orders");
}

#[test]
fn daemon_writes_its_log() {
    let temp = Project::empty();
    temp.tb().args(&["daemon", "start"]).passes();

    let logged = wait_for(SPEC_WAIT_MAX_MS, || !temp.daemon_log().is_empty());
    assert!(logged, "daemon log should not be empty");
    temp.tb().args(&["daemon", "logs", "-n", "5"]).passes();
}
