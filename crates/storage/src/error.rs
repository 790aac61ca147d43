// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use tb_core::ErrorKind;
use thiserror::Error;

use crate::migration::MigrationError;
use crate::snapshot::SnapshotError;
use crate::wal::WalError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid {field}: {reason}")]
    Invalid { field: String, reason: String },
    #[error("{entity} {name:?} already exists{detail}")]
    Conflict { entity: &'static str, name: String, detail: String },
    #[error("{entity} {key:?} not found")]
    NotFound { entity: &'static str, key: String },
    #[error("{0}")]
    Transition(String),
    #[error("WAL error: {0}")]
    Wal(#[from] WalError),
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("migration error: {0}")]
    Migration(#[from] MigrationError),
}

impl StoreError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid { field: field.into(), reason: reason.into() }
    }

    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound { entity, key: key.to_string() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Invalid { .. } | StoreError::Transition(_) => ErrorKind::InvalidSpec,
            StoreError::Conflict { .. } => ErrorKind::NameConflict,
            StoreError::NotFound { .. } => ErrorKind::NotFound,
            StoreError::Wal(_) => ErrorKind::TransientStore,
            StoreError::Snapshot(_) | StoreError::Migration(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
