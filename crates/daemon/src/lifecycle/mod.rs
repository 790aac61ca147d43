// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, rollback.

mod startup;
pub use startup::{rollback, startup};

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tb_adapters::FileScheduler;
use tb_core::SystemClock;
use tb_engine::{ControlPlane, Engine, EngineConfig};
use tb_storage::{Store, StoreError};
use thiserror::Error;
use tokio::net::UnixListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::listener::{ListenCtx, Listener};

/// Engine with the daemon's concrete adapters
pub type DaemonEngine = Engine<FileScheduler, SystemClock>;

/// Control plane served to clients
pub type DaemonApi = ControlPlane<FileScheduler, SystemClock>;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/tributary)
    pub state_dir: PathBuf,
    /// Path to Unix socket
    pub socket_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to version file
    pub version_path: PathBuf,
    /// Directory for daemon log files
    pub log_dir: PathBuf,
    /// Path to WAL file
    pub wal_path: PathBuf,
    /// Path to snapshot file
    pub snapshot_path: PathBuf,
    /// Compiled DAG output directory
    pub asset_dir: PathBuf,
    pub engine: EngineConfig,
}

impl Config {
    /// Load configuration from the environment.
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = crate::env::state_dir()?;
        let mut config = Self::at(state_dir);
        config.asset_dir = crate::env::asset_dir(&config.state_dir);
        config.engine = crate::env::engine_config();
        Ok(config)
    }

    /// Fixed layout under `state_dir` with default engine settings.
    pub fn at(state_dir: PathBuf) -> Self {
        Self {
            socket_path: state_dir.join("daemon.sock"),
            lock_path: state_dir.join("daemon.pid"),
            version_path: state_dir.join("daemon.version"),
            log_dir: state_dir.join("logs"),
            wal_path: state_dir.join("wal").join("events.wal"),
            snapshot_path: state_dir.join("snapshot.json.zst"),
            asset_dir: state_dir.join("dags"),
            engine: EngineConfig::default(),
            state_dir,
        }
    }
}

/// Daemon state during operation.
///
/// The listener is returned separately from startup to be spawned as a task.
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub store: Store,
    engine: DaemonEngine,
    /// Cancelled to stop the listener and the engine's background tasks
    pub shutdown: CancellationToken,
    pub start_time: Instant,
}

/// Result of daemon startup - includes both the daemon state and the listener.
pub struct StartupResult {
    pub daemon: DaemonState,
    /// The Unix socket listener to spawn as a task
    pub listener: UnixListener,
}

impl DaemonState {
    pub fn api(&self) -> Arc<DaemonApi> {
        self.engine.api()
    }

    /// Shutdown the daemon gracefully.
    ///
    /// Background tasks stop first so the final snapshot sees every write.
    /// Replays still in progress resume on the next start.
    pub async fn shutdown(self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");
        self.shutdown.cancel();
        self.engine.stop().await;

        match self.store.checkpoint(Utc::now()) {
            Ok(checkpoint) => {
                info!(seq = checkpoint.seq, size_bytes = checkpoint.size_bytes, "saved final shutdown snapshot")
            }
            Err(e) => warn!("Failed to save shutdown snapshot: {}", e),
        }

        for path in [&self.config.socket_path, &self.config.lock_path, &self.config.version_path] {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(path) {
                    warn!("Failed to remove {}: {}", path.display(), e);
                }
            }
        }

        info!("Daemon shutdown complete");
        Ok(())
    }
}

/// Run the daemon until a `Shutdown` request or SIGINT/SIGTERM.
///
/// `ready` runs once the socket accepts connections.
pub async fn serve(config: &Config, ready: impl FnOnce()) -> Result<(), LifecycleError> {
    let StartupResult { daemon, listener } = startup(config).await?;
    let ctx = Arc::new(ListenCtx {
        api: daemon.api(),
        start_time: daemon.start_time,
        shutdown: daemon.shutdown.clone(),
    });
    let listener = tokio::spawn(Listener::new(listener, ctx).run());
    ready();

    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    tokio::select! {
        _ = daemon.shutdown.cancelled() => info!("shutdown requested"),
        _ = tokio::signal::ctrl_c() => info!("received SIGINT"),
        _ = terminate.recv() => info!("received SIGTERM"),
    }

    daemon.shutdown.cancel();
    if let Err(e) = listener.await {
        warn!("listener task ended abnormally: {}", e);
    }
    daemon.shutdown().await
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Config rooted at `dir` with fast engine polling.
#[cfg(test)]
pub(crate) fn test_config(dir: &std::path::Path) -> Config {
    let mut config = Config::at(dir.to_path_buf());
    config.engine.deploy_poll_interval = std::time::Duration::from_millis(10);
    config.engine.replay_poll_interval = std::time::Duration::from_millis(10);
    config
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
