// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tenancy: projects, namespaces and their secrets.

use std::collections::BTreeMap;

use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{NamespaceId, ProjectId, SecretId};

/// A tenant. Names are globally unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub config: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A grouping of jobs inside a project. Names are unique per project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    pub id: NamespaceId,
    pub project_id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub config: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretType {
    #[default]
    User,
    /// Managed by the platform; hidden from user listings.
    System,
}

crate::simple_display! {
    SecretType {
        User => "user",
        System => "system",
    }
}

/// An encrypted secret. The value is opaque base64 ciphertext produced by
/// the external secrets store; it is never decrypted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
    pub id: SecretId,
    pub project_id: ProjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_id: Option<NamespaceId>,
    pub name: String,
    pub encrypted_value: String,
    #[serde(rename = "type", default)]
    pub secret_type: SecretType,
    pub updated_at: DateTime<Utc>,
}

/// Whether `value` is well-formed standard base64.
pub fn is_valid_ciphertext(value: &str) -> bool {
    !value.is_empty() && base64::engine::general_purpose::STANDARD.decode(value).is_ok()
}

/// Project and namespace names: lowercase alphanumerics, `-`, `_` and `.`,
/// starting with a lowercase letter or digit.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c.is_ascii_digit() => {}
        _ => return false,
    }
    name.len() <= 128
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_' || c == '.')
}

#[cfg(test)]
#[path = "tenant_tests.rs"]
mod tests;
