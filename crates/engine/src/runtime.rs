// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wires the control plane to its background tasks.

use std::sync::Arc;

use tb_adapters::{PluginRegistry, SchedulerAdapter};
use tb_core::Clock;
use tb_storage::Store;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api::ControlPlane;
use crate::config::EngineConfig;
use crate::deploy::{DagCache, Deployer};
use crate::ingest::Ingester;
use crate::replay::ReplayRunner;

/// External collaborators of an engine.
pub struct EngineDeps<S, C> {
    pub store: Store,
    pub plugins: PluginRegistry,
    pub scheduler: S,
    pub clock: C,
}

/// A running engine: the control plane plus deployment workers, the
/// sweeper, ingest partitions and the replay runner.
pub struct Engine<S: SchedulerAdapter, C: Clock> {
    api: Arc<ControlPlane<S, C>>,
    shutdown: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl<S: SchedulerAdapter, C: Clock> Engine<S, C> {
    /// Start every background task; they stop when `shutdown` fires or on
    /// [`Engine::stop`].
    pub fn start(deps: EngineDeps<S, C>, config: EngineConfig, shutdown: CancellationToken) -> Self {
        let EngineDeps { store, plugins, scheduler, clock } = deps;
        let dags = Arc::new(DagCache::new(config.spec_cache_ttl, clock.clone()));
        let deploy_wake = Arc::new(Notify::new());

        let (ingester, mut handles) = Ingester::spawn(store.clone(), &config, shutdown.clone());
        let replays = Arc::new(ReplayRunner::new(
            store.clone(),
            scheduler.clone(),
            clock.clone(),
            config.clone(),
            ingester.outcomes(),
        ));
        let deployer = Arc::new(Deployer::new(
            store.clone(),
            plugins.clone(),
            scheduler,
            clock.clone(),
            config.clone(),
            Arc::clone(&dags),
            Arc::clone(&deploy_wake),
        ));

        handles.extend(deployer.spawn(shutdown.clone()));
        handles.push(Arc::clone(&replays).spawn(shutdown.clone()));
        info!(
            deploy_workers = config.deploy_workers,
            ingest_partitions = config.ingest_partitions,
            replay_concurrency = config.replay_concurrency,
            "engine started"
        );

        let api = Arc::new(ControlPlane::new(
            store,
            plugins,
            clock,
            config,
            dags,
            deploy_wake,
            replays,
            Arc::new(ingester),
        ));
        Self { api, shutdown, handles }
    }

    pub fn api(&self) -> Arc<ControlPlane<S, C>> {
        Arc::clone(&self.api)
    }

    /// Cancel the background tasks and wait for them.
    pub async fn stop(self) {
        self.shutdown.cancel();
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "engine task ended abnormally");
            }
        }
        info!("engine stopped");
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
