// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Adapters for external collaborators: task plugins and the workflow engine

pub mod deadline;
pub mod plugin;
pub mod scheduler;

pub use deadline::{with_deadline, CallError};
pub use plugin::{
    render_config, HookPlugin, Plugin, PluginError, PluginInfo, PluginKind, PluginRegistry, PluginRequest,
    SqlPlugin,
};
pub use scheduler::{FileScheduler, SchedulerAdapter, SchedulerError};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use scheduler::{FakeScheduler, SchedulerCall};
