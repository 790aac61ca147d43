// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tb-engine: dependency resolution, DAG compilation, deployment, run
//! ingestion and replays

pub mod api;
pub mod config;
pub mod deploy;
pub mod derive;
pub mod error;
pub mod graph;
pub mod ingest;
pub mod replay;
pub mod resolver;
pub mod runtime;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use api::{ControlPlane, JobWrite};
pub use config::EngineConfig;
pub use deploy::{DagCache, Deployer};
pub use derive::{check_hooks, derive_urns, DerivedUrns};
pub use error::EngineError;
pub use graph::{compile, Graph};
pub use ingest::{apply_run_event, IngestReceipt, Ingester, RunOutcome};
pub use replay::{build_replay, execution_order, plan_tree, ReplayPlan, ReplayRequest, ReplayRunner, MAX_REPLAY_RUNS};
pub use resolver::{resolve, Resolution};
pub use runtime::{Engine, EngineDeps};
