// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Replays: planning the execution tree and driving it through the
//! workflow engine.

mod planner;
mod runner;

pub use planner::{build_replay, execution_order, plan_tree, ReplayPlan, ReplayRequest, MAX_REPLAY_RUNS};
pub use runner::ReplayRunner;
