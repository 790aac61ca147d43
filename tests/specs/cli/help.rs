// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI help output specs

use crate::prelude::*;

#[test]
fn tb_no_args_shows_usage_and_exits_zero() {
    cli().passes().stdout_has("Usage:");
}

#[test]
fn tb_version_shows_package_version() {
    cli().args(&["--version"]).passes().stdout_has(env!("CARGO_PKG_VERSION"));
}

#[test]
fn tb_job_help_shows_subcommands() {
    cli()
        .args(&["job", "--help"])
        .passes()
        .stdout_has("create")
        .stdout_has("delete")
        .stdout_has("deploy")
        .stdout_has("validate");
}

#[test]
fn tb_replay_help_shows_subcommands() {
    cli()
        .args(&["replay", "--help"])
        .passes()
        .stdout_has("create")
        .stdout_has("plan")
        .stdout_has("cancel");
}

#[test]
fn unknown_subcommand_is_a_usage_error() {
    cli().args(&["frobnicate"]).exits(2).stderr_has("frobnicate");
}
