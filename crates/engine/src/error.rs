// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use tb_adapters::{CallError, PluginError};
use tb_core::{ErrorKind, RunEventError, ScheduleError, SpecError, WindowError};
use tb_storage::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid job spec: {0}")]
    Spec(#[from] SpecError),
    #[error("invalid window: {0}")]
    Window(#[from] WindowError),
    #[error("invalid schedule: {0}")]
    Schedule(#[from] ScheduleError),
    #[error(transparent)]
    Plugin(#[from] PluginError),
    #[error(transparent)]
    Call(#[from] CallError),
    #[error("invalid event: {0}")]
    RunEvent(#[from] RunEventError),
    #[error("job {job:?} depends on unknown job {dependency:?}")]
    UnknownDependency { job: String, dependency: String },
    #[error("cyclic graph: {}", describe_cycles(.cycles))]
    Cycle { cycles: Vec<Vec<String>> },
    #[error("no such run: {0}")]
    NoSuchRun(String),
    #[error("out of order event: {0}")]
    OutOfOrder(String),
    #[error("replay conflict: {0}")]
    ReplayConflict(String),
    #[error("invalid {field}: {reason}")]
    Invalid { field: String, reason: String },
    #[error("internal error [{code}]: {message}")]
    Internal { code: &'static str, message: String },
}

impl EngineError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid { field: field.into(), reason: reason.into() }
    }

    pub fn internal(code: &'static str, message: impl Into<String>) -> Self {
        Self::Internal { code, message: message.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Store(e) => e.kind(),
            EngineError::Spec(_)
            | EngineError::Window(_)
            | EngineError::Schedule(_)
            | EngineError::Plugin(_)
            | EngineError::RunEvent(_)
            | EngineError::Invalid { .. } => ErrorKind::InvalidSpec,
            EngineError::Call(CallError::Deadline { .. }) => ErrorKind::DeadlineExceeded,
            EngineError::Call(CallError::Plugin(_)) => ErrorKind::InvalidSpec,
            EngineError::Call(CallError::Scheduler(_)) => ErrorKind::Internal,
            EngineError::UnknownDependency { .. } => ErrorKind::UnknownDependency,
            EngineError::Cycle { .. } => ErrorKind::CyclicGraph,
            EngineError::NoSuchRun(_) => ErrorKind::NoSuchRun,
            EngineError::OutOfOrder(_) => ErrorKind::OutOfOrderEvent,
            EngineError::ReplayConflict(_) => ErrorKind::ReplayConflict,
            EngineError::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Stable identifier reported with internal errors.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Internal { code, .. } => code,
            EngineError::Store(StoreError::Snapshot(_)) => "store_snapshot",
            EngineError::Store(StoreError::Migration(_)) => "store_migration",
            EngineError::Call(CallError::Scheduler(_)) => "scheduler_call",
            _ => "",
        }
    }
}

fn describe_cycles(cycles: &[Vec<String>]) -> String {
    cycles
        .iter()
        .map(|cycle| {
            let mut path = cycle.clone();
            if let Some(first) = cycle.first() {
                path.push(first.clone());
            }
            path.join(" -> ")
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
