// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Datastore resources (tables, views, buckets) managed alongside jobs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{NamespaceId, ProjectId, ResourceId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub project_id: ProjectId,
    pub namespace_id: NamespaceId,
    /// Unique within the project
    pub name: String,
    /// Datastore kind, e.g. `bigquery`
    pub datastore: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub version: u32,
    /// Datastore-specific definition
    #[serde(default)]
    pub spec: serde_json::Value,
    #[serde(default)]
    pub assets: BTreeMap<String, String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    pub urn: String,
    pub updated_at: DateTime<Utc>,
}

/// Canonical URN for a resource: `<datastore>://<name>`.
pub fn resource_urn(datastore: &str, name: &str) -> String {
    format!("{datastore}://{name}")
}
