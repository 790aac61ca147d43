// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup and initialization logic.

use std::fs::File;
use std::io::Write;
use std::time::Instant;

use chrono::Utc;
use fs2::FileExt;
use tb_adapters::{FileScheduler, PluginRegistry};
use tb_core::{MigrationRecord, SystemClock, APP_VERSION};
use tb_engine::{Engine, EngineDeps};
use tb_storage::Store;
use tokio::net::UnixListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::env::PROTOCOL_VERSION;

use super::{Config, DaemonState, LifecycleError, StartupResult};

/// Start the daemon
pub async fn startup(config: &Config) -> Result<StartupResult, LifecycleError> {
    match startup_inner(config).await {
        Ok(result) => Ok(result),
        Err(e) => {
            // Lock failure: the files belong to the running daemon.
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

/// Inner startup logic - cleanup_on_failure called if this fails
async fn startup_inner(config: &Config) -> Result<StartupResult, LifecycleError> {
    // 1. Acquire lock file FIRST - prevents races
    let lock_file = acquire_lock(config)?;

    // 2. Create directories
    if let Some(parent) = config.wal_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::create_dir_all(&config.asset_dir)?;
    std::fs::write(&config.version_path, PROTOCOL_VERSION)?;

    // 3. Recover state and record this binary's version
    let store = Store::open(&config.wal_path, &config.snapshot_path)?;
    if let Some(record) = store.record_version(APP_VERSION, Utc::now())? {
        info!(version = %record.app_version, from = %record.previous_app_version, "recorded state version");
    }
    let (projects, jobs) = store.read(|s| (s.projects.len(), s.jobs.len()));
    info!(projects, jobs, "Recovered state");

    // 4. Start the engine
    let shutdown = CancellationToken::new();
    let deps = EngineDeps {
        store: store.clone(),
        plugins: PluginRegistry::with_builtins(),
        scheduler: FileScheduler::new(config.asset_dir.clone()),
        clock: SystemClock,
    };
    let engine = Engine::start(deps, config.engine.clone(), shutdown.child_token());

    // 5. Remove stale socket and bind (LAST - only after all validation passes)
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    info!("Daemon started");

    Ok(StartupResult {
        daemon: DaemonState {
            config: config.clone(),
            lock_file,
            store,
            engine,
            shutdown,
            start_time: Instant::now(),
        },
        listener,
    })
}

/// Undo the latest version record so an older binary may open the state.
/// Refused while a daemon holds the lock.
pub fn rollback(config: &Config) -> Result<MigrationRecord, LifecycleError> {
    let _lock = acquire_lock(config)?;
    let store = Store::open(&config.wal_path, &config.snapshot_path)?;
    let record = store.rollback_version(APP_VERSION)?;
    store.checkpoint(Utc::now())?;
    info!(version = %record.app_version, "rolled back state version");
    std::fs::remove_file(&config.lock_path)?;
    Ok(record)
}

fn acquire_lock(config: &Config) -> Result<File, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;

    // Use OpenOptions to avoid truncating the file before we hold the lock,
    // which would wipe the running daemon's PID.
    let mut lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;

    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    Ok(lock_file)
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    for path in [&config.socket_path, &config.version_path, &config.lock_path] {
        if path.exists() {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(test)]
#[path = "startup_tests.rs"]
mod tests;
