// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deadlines for calls into external collaborators.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::plugin::PluginError;
use crate::scheduler::SchedulerError;

#[derive(Debug, Error)]
pub enum CallError {
    #[error("{what} exceeded its {}ms deadline", limit.as_millis())]
    Deadline { what: String, limit: Duration },
    #[error(transparent)]
    Plugin(#[from] PluginError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

impl CallError {
    pub fn is_deadline(&self) -> bool {
        matches!(self, CallError::Deadline { .. })
    }
}

/// Run `call`, failing with [`CallError::Deadline`] once `limit` elapses.
/// The call is dropped (cancelled) at the deadline.
pub async fn with_deadline<T, E, F>(limit: Duration, what: impl Into<String>, call: F) -> Result<T, CallError>
where
    F: Future<Output = Result<T, E>>,
    CallError: From<E>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(CallError::from),
        Err(_) => Err(CallError::Deadline { what: what.into(), limit }),
    }
}

#[cfg(test)]
#[path = "deadline_tests.rs"]
mod tests;
