// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine tuning knobs.

use std::time::Duration;

use tb_core::WindowVersion;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Deployment worker tasks.
    pub deploy_workers: usize,
    /// How often an idle worker looks for queued deployments.
    pub deploy_poll_interval: Duration,
    /// In-progress deployments idle for longer are failed with `timeout`.
    pub deploy_timeout: Duration,
    pub sweep_interval: Duration,
    /// Replays per project allowed in progress at once.
    pub replay_concurrency: usize,
    /// How long an issued replay run may take to reach a terminal status.
    pub replay_run_timeout: Duration,
    pub replay_poll_interval: Duration,
    pub ingest_partitions: usize,
    /// Buffered events per ingest partition.
    pub ingest_queue_depth: usize,
    /// Deadline for every plugin and workflow-engine call.
    pub call_deadline: Duration,
    pub window_version: WindowVersion,
    pub spec_cache_ttl: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            deploy_workers: 4,
            deploy_poll_interval: Duration::from_secs(1),
            deploy_timeout: Duration::from_secs(30 * 60),
            sweep_interval: Duration::from_secs(30),
            replay_concurrency: 2,
            replay_run_timeout: Duration::from_secs(60 * 60),
            replay_poll_interval: Duration::from_secs(5),
            ingest_partitions: 8,
            ingest_queue_depth: 256,
            call_deadline: Duration::from_secs(30),
            window_version: WindowVersion::V2,
            spec_cache_ttl: Duration::from_secs(5 * 60),
        }
    }
}

/// `std` duration as a `chrono` one, saturating.
pub(crate) fn chrono_duration(d: Duration) -> chrono::TimeDelta {
    chrono::TimeDelta::from_std(d).unwrap_or(chrono::TimeDelta::MAX)
}
