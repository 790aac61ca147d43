// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy shared by every layer.
//!
//! Each crate defines its own `thiserror` enum; all of them map onto an
//! [`ErrorKind`] so the API and CLI can report a stable category.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidSpec,
    NameConflict,
    UnknownDependency,
    CyclicGraph,
    NoSuchRun,
    OutOfOrderEvent,
    ReplayConflict,
    DeadlineExceeded,
    TransientStore,
    NotFound,
    Internal,
}

crate::simple_display! {
    ErrorKind {
        InvalidSpec => "invalid_spec",
        NameConflict => "name_conflict",
        UnknownDependency => "unknown_dependency",
        CyclicGraph => "cyclic_graph",
        NoSuchRun => "no_such_run",
        OutOfOrderEvent => "out_of_order_event",
        ReplayConflict => "replay_conflict",
        DeadlineExceeded => "deadline_exceeded",
        TransientStore => "transient_store",
        NotFound => "not_found",
        Internal => "internal",
    }
}

impl ErrorKind {
    /// Process exit code used by the CLI.
    ///
    /// 2 validation, 3 conflict, 4 not found, 1 everything else.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::InvalidSpec
            | ErrorKind::UnknownDependency
            | ErrorKind::CyclicGraph
            | ErrorKind::OutOfOrderEvent => 2,
            ErrorKind::NameConflict | ErrorKind::ReplayConflict => 3,
            ErrorKind::NotFound | ErrorKind::NoSuchRun => 4,
            ErrorKind::DeadlineExceeded | ErrorKind::TransientStore | ErrorKind::Internal => 1,
        }
    }

    /// Whether a retry of the same request may succeed.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::DeadlineExceeded | ErrorKind::TransientStore)
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
