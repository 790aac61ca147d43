// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod daemon;
pub mod deployment;
pub mod event;
pub mod job;
pub mod namespace;
pub mod project;
pub mod replay;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

/// `KEY=VALUE` argument.
pub fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got {raw:?}")),
    }
}

/// `2023-01-01` or an RFC 3339 timestamp.
pub fn parse_time(raw: &str) -> Result<DateTime<Utc>, String> {
    tb_specfile::parse_date("time", raw).map_err(|e| e.to_string())
}

pub fn config_map(pairs: Vec<(String, String)>) -> BTreeMap<String, String> {
    pairs.into_iter().collect()
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
