// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time-bounded cache of values derived from a project's specs.
//!
//! Entries are keyed by `(project, content hash)`, so a changed spec set
//! misses naturally; writers also invalidate the project eagerly.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tb_core::{Clock, ProjectId};

pub struct SpecCache<V, C: Clock> {
    ttl: Duration,
    clock: C,
    entries: RwLock<HashMap<(ProjectId, String), (Instant, Arc<V>)>>,
}

impl<V, C: Clock> SpecCache<V, C> {
    pub fn new(ttl: Duration, clock: C) -> Self {
        Self { ttl, clock, entries: RwLock::new(HashMap::new()) }
    }

    pub fn get(&self, project_id: ProjectId, hash: &str) -> Option<Arc<V>> {
        let entries = self.entries.read();
        let (inserted, value) = entries.get(&(project_id, hash.to_string()))?;
        if self.clock.now().duration_since(*inserted) >= self.ttl {
            return None;
        }
        Some(Arc::clone(value))
    }

    pub fn insert(&self, project_id: ProjectId, hash: &str, value: V) -> Arc<V> {
        let value = Arc::new(value);
        let now = self.clock.now();
        let mut entries = self.entries.write();
        entries.retain(|_, (inserted, _)| now.duration_since(*inserted) < self.ttl);
        entries.insert((project_id, hash.to_string()), (now, Arc::clone(&value)));
        value
    }

    /// Drop every entry of one project.
    pub fn invalidate(&self, project_id: ProjectId) {
        self.entries.write().retain(|(p, _), _| *p != project_id);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Hex SHA-256 of the JSON encoding of `value`.
pub fn content_hash<T: Serialize + ?Sized>(value: &T) -> String {
    let bytes = serde_json::to_vec(value).unwrap_or_default();
    let digest = Sha256::digest(&bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
