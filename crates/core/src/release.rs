// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Application version bookkeeping for state migrations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Version of the running binary.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// One applied state migration.
///
/// A record is appended whenever the daemon opens state written by a
/// different binary version or upgrades the snapshot schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    pub app_version: String,
    pub migration_version: u32,
    #[serde(default)]
    pub previous_app_version: String,
    pub created_at: DateTime<Utc>,
}
