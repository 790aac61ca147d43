// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fails deployments a crashed or stuck worker left in progress.

use std::sync::Arc;

use tb_adapters::SchedulerAdapter;
use tb_core::{Clock, DeploymentId};
use tb_storage::StoreError;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::Deployer;
use crate::config::chrono_duration;

pub(super) async fn run<S: SchedulerAdapter, C: Clock>(deployer: Arc<Deployer<S, C>>, shutdown: CancellationToken) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(deployer.config.sweep_interval) => {}
        }
        match sweep(&deployer) {
            Ok(swept) if !swept.is_empty() => deployer.wake().notify_waiters(),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "deployment sweep failed"),
        }
    }
}

/// Fail every in-progress deployment idle past the deploy timeout.
pub(crate) fn sweep<S: SchedulerAdapter, C: Clock>(deployer: &Deployer<S, C>) -> Result<Vec<DeploymentId>, StoreError> {
    let timeout = chrono_duration(deployer.config.deploy_timeout);
    let now = deployer.clock.utc_now();
    let swept = deployer.store.transact(|tx| Ok::<_, StoreError>(tx.sweep_deployments(timeout, now)))?;
    for id in &swept {
        warn!(deployment = %id, "deployment timed out");
    }
    Ok(swept)
}
