// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Point-in-time copy of the control plane state.
//!
//! A snapshot is the zstd-compressed JSON of [`MaterializedState`] tagged
//! with the last WAL sequence it covers; startup loads it and replays only
//! the WAL tail.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::migration::{MigrationError, MigrationRegistry};
use crate::state::MaterializedState;

/// Current snapshot schema version
pub const CURRENT_SNAPSHOT_VERSION: u32 = 1;

const ZSTD_LEVEL: i32 = 3;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot encoding: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot migration: {0}")]
    Migration(#[from] MigrationError),
}

/// A snapshot of the materialized state at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "v")]
    pub version: u32,
    /// Last WAL entry folded into `state`
    pub seq: u64,
    pub state: MaterializedState,
    pub created_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(seq: u64, state: MaterializedState, created_at: DateTime<Utc>) -> Self {
        Self { version: CURRENT_SNAPSHOT_VERSION, seq, state, created_at }
    }

    /// Write atomically (temp file + rename). Returns the compressed size.
    pub fn save(&self, path: &Path) -> Result<u64, SnapshotError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec(self)?;
        let compressed = zstd::stream::encode_all(json.as_slice(), ZSTD_LEVEL)?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, &compressed)?;
        fs::rename(&tmp, path)?;
        Ok(compressed.len() as u64)
    }
}

/// Load and migrate the snapshot at `path`, if one exists.
pub fn load_snapshot(path: &Path) -> Result<Option<Snapshot>, SnapshotError> {
    if !path.exists() {
        return Ok(None);
    }
    let compressed = fs::read(path)?;
    let json = zstd::stream::decode_all(compressed.as_slice())?;
    let value: serde_json::Value = serde_json::from_slice(&json)?;
    let value = MigrationRegistry::new().migrate_to(value, CURRENT_SNAPSHOT_VERSION)?;
    Ok(Some(serde_json::from_value(value)?))
}

/// Backups kept beside a damaged state file: `.bak`, `.bak.2`, `.bak.3`.
const BACKUP_GENERATIONS: u32 = 3;

fn backup_path(path: &Path, generation: u32) -> PathBuf {
    match generation {
        1 => path.with_extension("bak"),
        n => path.with_extension(format!("bak.{n}")),
    }
}

/// Shift existing backups of `path` one generation older, dropping the
/// oldest, and return the freed `.bak` path.
pub(crate) fn rotate_bak_path(path: &Path) -> PathBuf {
    let _ = fs::remove_file(backup_path(path, BACKUP_GENERATIONS));
    for generation in (1..BACKUP_GENERATIONS).rev() {
        let from = backup_path(path, generation);
        if from.exists() {
            let _ = fs::rename(&from, backup_path(path, generation + 1));
        }
    }
    backup_path(path, 1)
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
