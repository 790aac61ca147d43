// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Warehouse SQL transformation: `PROJECT`, `DATASET`, `TABLE` name the
//! destination and the `query.sql` asset names the sources.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use super::{Plugin, PluginError, PluginInfo, PluginKind, PluginRequest};

pub const QUERY_ASSET: &str = "query.sql";

static COMMENTS: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?s)--[^\n]*|/\*.*?\*/").ok());

static TABLE_REFS: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:from|join)\s+`?([A-Za-z0-9_-]+)[.:]([A-Za-z0-9_]+)\.([A-Za-z0-9_]+)`?").ok()
});

pub struct SqlPlugin {
    name: String,
    datastore: String,
}

impl SqlPlugin {
    pub fn new(name: impl Into<String>, datastore: impl Into<String>) -> Self {
        Self { name: name.into(), datastore: datastore.into() }
    }

    fn urn(&self, project: &str, dataset: &str, table: &str) -> String {
        format!("{}://{project}:{dataset}.{table}", self.datastore)
    }

    fn required<'a>(&self, request: &'a PluginRequest, key: &str) -> Result<&'a str, PluginError> {
        request
            .config
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| PluginError::MissingConfig { plugin: self.name.clone(), key: key.to_string() })
    }
}

#[async_trait]
impl Plugin for SqlPlugin {
    fn info(&self) -> PluginInfo {
        PluginInfo {
            name: self.name.clone(),
            kind: PluginKind::Task,
            description: format!("SQL transformation writing a {} table", self.datastore),
        }
    }

    async fn destination(&self, request: &PluginRequest) -> Result<String, PluginError> {
        let project = self.required(request, "PROJECT")?;
        let dataset = self.required(request, "DATASET")?;
        let table = self.required(request, "TABLE")?;
        Ok(self.urn(project, dataset, table))
    }

    async fn sources(&self, request: &PluginRequest) -> Result<Vec<String>, PluginError> {
        let Some(query) = request.assets.get(QUERY_ASSET) else {
            return Ok(Vec::new());
        };
        let (Some(comments), Some(refs)) = (COMMENTS.as_ref(), TABLE_REFS.as_ref()) else {
            return Err(PluginError::Failed { plugin: self.name.clone(), message: "invalid table pattern".into() });
        };
        let destination = self.destination(request).await.ok();
        let query = comments.replace_all(query, " ");
        let urns: BTreeSet<String> = refs
            .captures_iter(&query)
            .map(|c| self.urn(&c[1], &c[2], &c[3]))
            .filter(|urn| Some(urn) != destination.as_ref())
            .collect();
        Ok(urns.into_iter().collect())
    }
}
