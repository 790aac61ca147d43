// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tb-storage: event-sourced spec and run store

mod cache;
mod error;
mod migration;
mod snapshot;
mod state;
mod store;
mod tx;
mod wal;

pub use cache::{content_hash, SpecCache};
pub use error::StoreError;
pub use migration::{compare_versions, MigrationError};
pub use snapshot::{load_snapshot, Snapshot, SnapshotError, CURRENT_SNAPSHOT_VERSION};
pub use state::MaterializedState;
pub use store::{Checkpoint, Store, MIGRATION_VERSION};
pub use tx::{ResourceDraft, Tx};
pub use wal::{Wal, WalEntry, WalError};
