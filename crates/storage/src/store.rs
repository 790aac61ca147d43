// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable, linearizable access to the materialized state.
//!
//! Every write goes through [`Store::transact`]: the closure runs against
//! the locked state, its events are appended to the WAL and fsynced, and
//! only then applied. The state lock is the single linearization point.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tb_core::{Event, MigrationRecord};
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::migration::{plan_rollback, plan_up};
use crate::snapshot::{load_snapshot, Snapshot};
use crate::state::MaterializedState;
use crate::tx::Tx;
use crate::wal::Wal;

/// Schema version recorded with each application version.
pub const MIGRATION_VERSION: u32 = 1;

#[derive(Clone)]
pub struct Store {
    state: Arc<Mutex<MaterializedState>>,
    wal: Arc<Mutex<Wal>>,
    snapshot_path: PathBuf,
}

/// Result of a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    pub seq: u64,
    pub size_bytes: u64,
}

impl Store {
    /// Load the snapshot (if any) and replay the WAL after it.
    pub fn open(wal_path: &Path, snapshot_path: &Path) -> Result<Self, StoreError> {
        let (mut state, snapshot_seq) = match load_snapshot(snapshot_path)? {
            Some(snapshot) => {
                info!(seq = snapshot.seq, "loaded snapshot");
                (snapshot.state, snapshot.seq)
            }
            None => (MaterializedState::default(), 0),
        };

        let mut wal = Wal::open(wal_path, snapshot_seq)?;
        let mut replayed = 0usize;
        while let Some(entry) = wal.next_unprocessed()? {
            state.apply_event(&entry.event);
            wal.mark_processed(entry.seq);
            replayed += 1;
        }
        if wal.processed_seq() < wal.write_seq() {
            warn!(
                processed = wal.processed_seq(),
                written = wal.write_seq(),
                "WAL replay stopped early at a corrupt entry"
            );
        }
        info!(replayed, seq = wal.processed_seq(), "store recovered");

        Ok(Self {
            state: Arc::new(Mutex::new(state)),
            wal: Arc::new(Mutex::new(wal)),
            snapshot_path: snapshot_path.to_path_buf(),
        })
    }

    /// Run `f` as one transaction.
    ///
    /// If `f` fails nothing is written. If the WAL append fails the events
    /// are discarded and a transient error is returned; state is unchanged.
    pub fn transact<T, E>(&self, f: impl FnOnce(&mut Tx<'_>) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let mut state = self.state.lock();
        let mut tx = Tx::new(&state);
        let out = f(&mut tx)?;
        let events = tx.into_events();
        if events.is_empty() {
            return Ok(out);
        }

        let mut wal = self.wal.lock();
        let last = match append_all(&mut wal, &events) {
            Ok(seq) => seq,
            Err(e) => {
                wal.discard_buffered();
                return Err(E::from(e));
            }
        };
        for event in &events {
            debug!(event = %event.log_summary(), "apply");
            state.apply_event(event);
        }
        wal.mark_processed(last);
        Ok(out)
    }

    /// Read-only access under the state lock.
    pub fn read<T>(&self, f: impl FnOnce(&MaterializedState) -> T) -> T {
        f(&self.state.lock())
    }

    /// Write a snapshot at the current sequence and drop the WAL entries it
    /// covers.
    pub fn checkpoint(&self, now: DateTime<Utc>) -> Result<Checkpoint, StoreError> {
        let (seq, state) = {
            let state = self.state.lock();
            let seq = self.wal.lock().processed_seq();
            (seq, state.clone())
        };
        let size_bytes = Snapshot::new(seq, state, now).save(&self.snapshot_path)?;
        self.wal.lock().truncate_before(seq + 1)?;
        info!(seq, size_bytes, "checkpoint complete");
        Ok(Checkpoint { seq, size_bytes })
    }

    /// Record that `app_version` opened the state. A no-op when it already
    /// did; an older version than the latest record is refused.
    pub fn record_version(&self, app_version: &str, now: DateTime<Utc>) -> Result<Option<MigrationRecord>, StoreError> {
        self.transact(|tx| {
            let record = plan_up(tx, app_version, MIGRATION_VERSION, now)?;
            if let Some(record) = &record {
                tx.emit(Event::MigrationRecorded { record: record.clone() });
            }
            Ok(record)
        })
    }

    /// Remove the latest version record; only the binary that wrote it may.
    pub fn rollback_version(&self, app_version: &str) -> Result<MigrationRecord, StoreError> {
        self.transact(|tx| {
            let record = plan_rollback(tx, app_version)?;
            tx.emit(Event::MigrationRemoved { record: record.clone() });
            Ok(record)
        })
    }

    pub fn processed_seq(&self) -> u64 {
        self.wal.lock().processed_seq()
    }
}

fn append_all(wal: &mut Wal, events: &[Event]) -> Result<u64, StoreError> {
    let mut last = wal.write_seq();
    for event in events {
        last = wal.append(event)?;
    }
    wal.flush()?;
    Ok(last)
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
