// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schema migrations for snapshots, and the application-version ledger.
//!
//! Snapshot JSON is upgraded step by step through registered
//! [`Migration`]s before deserialization. Separately, every binary version
//! that opens the state leaves a [`MigrationRecord`]; rollback only runs on
//! the binary that wrote the latest record.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tb_core::MigrationRecord;
use thiserror::Error;

use crate::state::MaterializedState;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("snapshot version {0} is newer than supported version {1}")]
    TooNew(u32, u32),
    #[error("no migration path from version {0} to {1}")]
    NoPath(u32, u32),
    #[error("snapshot has no version field")]
    MissingVersion,
    #[error("version [{incoming}] should be higher or equal than existing [{existing}]")]
    Downgrade { incoming: String, existing: String },
    #[error("expecting version [{expected}] but got [{got}]")]
    VersionMismatch { expected: String, got: String },
    #[error("no migration has been recorded")]
    NothingRecorded,
}

/// One schema step.
pub trait Migration: Send + Sync {
    fn source_version(&self) -> u32;
    fn target_version(&self) -> u32;
    fn migrate(&self, snapshot: &mut Value) -> Result<(), MigrationError>;
}

pub struct MigrationRegistry {
    pub(crate) migrations: Vec<Box<dyn Migration>>,
}

impl Default for MigrationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self { migrations: Vec::new() }
    }

    /// Upgrade a raw snapshot document to `target`.
    pub fn migrate_to(&self, mut snapshot: Value, target: u32) -> Result<Value, MigrationError> {
        let mut version = snapshot
            .get("v")
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .ok_or(MigrationError::MissingVersion)?;
        if version > target {
            return Err(MigrationError::TooNew(version, target));
        }
        while version < target {
            let step = self
                .migrations
                .iter()
                .find(|m| m.source_version() == version)
                .ok_or(MigrationError::NoPath(version, target))?;
            step.migrate(&mut snapshot)?;
            version = step.target_version();
            if let Some(obj) = snapshot.as_object_mut() {
                obj.insert("v".into(), version.into());
            }
        }
        Ok(snapshot)
    }
}

/// Record for `incoming` opening the state, or `None` when the latest record
/// already names it.
pub fn plan_up(
    state: &MaterializedState,
    incoming: &str,
    migration_version: u32,
    now: DateTime<Utc>,
) -> Result<Option<MigrationRecord>, MigrationError> {
    let previous = state.latest_migration().map(|r| r.app_version.clone()).unwrap_or_default();
    if !previous.is_empty() {
        match compare_versions(incoming, &previous) {
            Ordering::Less => {
                return Err(MigrationError::Downgrade { incoming: incoming.to_string(), existing: previous })
            }
            Ordering::Equal => return Ok(None),
            Ordering::Greater => {}
        }
    }
    Ok(Some(MigrationRecord {
        app_version: incoming.to_string(),
        migration_version,
        previous_app_version: previous,
        created_at: now,
    }))
}

/// Record to remove when rolling back as `incoming`.
pub fn plan_rollback(state: &MaterializedState, incoming: &str) -> Result<MigrationRecord, MigrationError> {
    let latest = state.latest_migration().ok_or(MigrationError::NothingRecorded)?;
    if latest.app_version != incoming {
        return Err(MigrationError::VersionMismatch {
            expected: latest.app_version.clone(),
            got: incoming.to_string(),
        });
    }
    Ok(latest.clone())
}

/// Dotted numeric comparison; non-numeric parts compare as strings.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parts = |s: &str| -> Vec<String> {
        s.trim_start_matches('v').split(['.', '-', '+']).map(str::to_string).collect()
    };
    let (a, b) = (parts(a), parts(b));
    for (x, y) in a.iter().zip(b.iter()) {
        let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
            (Ok(x), Ok(y)) => x.cmp(&y),
            _ => x.cmp(y),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

#[cfg(test)]
#[path = "migration_tests.rs"]
mod tests;
