// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use tb_engine::EngineConfig;
use tracing::warn;

use crate::lifecycle::LifecycleError;

/// Protocol and state version (from Cargo.toml)
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Resolve state directory: TB_STATE_DIR > XDG_STATE_HOME/tributary > ~/.local/state/tributary
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("TB_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("tributary"));
    }
    let home = dirs::home_dir().ok_or(LifecycleError::NoStateDir)?;
    Ok(home.join(".local/state/tributary"))
}

/// Where compiled DAGs are written (default `<state_dir>/dags`)
pub fn asset_dir(state_dir: &Path) -> PathBuf {
    std::env::var("TB_ASSET_DIR").map(PathBuf::from).unwrap_or_else(|_| state_dir.join("dags"))
}

/// Default IPC timeout
pub fn ipc_timeout() -> Duration {
    millis("TB_IPC_TIMEOUT_MS").unwrap_or(Duration::from_secs(5))
}

/// Engine settings, each overridable through its `TB_*` variable.
pub fn engine_config() -> EngineConfig {
    let defaults = EngineConfig::default();
    EngineConfig {
        deploy_workers: parsed::<usize>("TB_DEPLOY_WORKERS").filter(|n| *n > 0).unwrap_or(defaults.deploy_workers),
        deploy_timeout: millis("TB_DEPLOY_TIMEOUT_MS").unwrap_or(defaults.deploy_timeout),
        replay_concurrency: parsed::<usize>("TB_REPLAY_CONCURRENCY")
            .filter(|n| *n > 0)
            .unwrap_or(defaults.replay_concurrency),
        ingest_partitions: parsed::<usize>("TB_INGEST_PARTITIONS")
            .filter(|n| *n > 0)
            .unwrap_or(defaults.ingest_partitions),
        call_deadline: millis("TB_CALL_DEADLINE_MS").unwrap_or(defaults.call_deadline),
        window_version: parsed("TB_WINDOW_VERSION").unwrap_or(defaults.window_version),
        ..defaults
    }
}

fn millis(name: &str) -> Option<Duration> {
    parsed::<u64>(name).map(Duration::from_millis)
}

/// A set variable that fails to parse is ignored with a warning.
fn parsed<T: FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(name, value = %raw, "ignoring unparseable environment variable");
            None
        }
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
