// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task and hook plugins.
//!
//! A task plugin derives a job's destination URN and the source URNs it
//! reads. The registry is built once at startup and never mutated, so
//! lookups take no lock.

mod sql;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use regex::Regex;
use thiserror::Error;

pub use sql::SqlPlugin;

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("plugin {0:?} is not registered")]
    NotFound(String),
    #[error("plugin {0:?} is already registered")]
    Duplicate(String),
    #[error("plugin {plugin:?} is a {actual} plugin, not a {expected} plugin")]
    WrongKind { plugin: String, expected: PluginKind, actual: PluginKind },
    #[error("plugin {plugin:?}: missing config {key:?}")]
    MissingConfig { plugin: String, key: String },
    #[error("plugin {plugin:?}: {message}")]
    Failed { plugin: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginKind {
    Task,
    Hook,
}

tb_core::simple_display! {
    PluginKind {
        Task => "task",
        Hook => "hook",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginInfo {
    pub name: String,
    pub kind: PluginKind,
    pub description: String,
}

/// Inputs a plugin sees: the task config (after templating) and assets.
#[derive(Debug, Clone, Default)]
pub struct PluginRequest {
    pub config: IndexMap<String, String>,
    pub assets: BTreeMap<String, String>,
}

#[async_trait]
pub trait Plugin: Send + Sync + 'static {
    fn info(&self) -> PluginInfo;

    /// Resource URN the task writes.
    async fn destination(&self, request: &PluginRequest) -> Result<String, PluginError>;

    /// Resource URNs the task reads, sorted and deduplicated.
    async fn sources(&self, request: &PluginRequest) -> Result<Vec<String>, PluginError>;
}

/// A hook plugin: validated by name, never asked for URNs.
pub struct HookPlugin {
    name: String,
    description: String,
}

impl HookPlugin {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self { name: name.into(), description: description.into() }
    }
}

#[async_trait]
impl Plugin for HookPlugin {
    fn info(&self) -> PluginInfo {
        PluginInfo { name: self.name.clone(), kind: PluginKind::Hook, description: self.description.clone() }
    }

    async fn destination(&self, _: &PluginRequest) -> Result<String, PluginError> {
        Err(PluginError::WrongKind { plugin: self.name.clone(), expected: PluginKind::Task, actual: PluginKind::Hook })
    }

    async fn sources(&self, _: &PluginRequest) -> Result<Vec<String>, PluginError> {
        Ok(Vec::new())
    }
}

#[derive(Clone, Default)]
pub struct PluginRegistry {
    plugins: Arc<HashMap<String, Arc<dyn Plugin>>>,
}

impl PluginRegistry {
    pub fn builder() -> PluginRegistryBuilder {
        PluginRegistryBuilder::default()
    }

    /// The built-in `sql` task plugin plus `notify` and `audit` hooks.
    pub fn with_builtins() -> Self {
        let mut builder = Self::builder();
        builder.insert(Arc::new(SqlPlugin::new("sql", "bigquery")));
        builder.insert(Arc::new(HookPlugin::new("notify", "Send run notifications")));
        builder.insert(Arc::new(HookPlugin::new("audit", "Record data-quality audits")));
        builder.build()
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Plugin>, PluginError> {
        self.plugins.get(name).cloned().ok_or_else(|| PluginError::NotFound(name.to_string()))
    }

    /// Look up a plugin and check its kind.
    pub fn get_kind(&self, name: &str, kind: PluginKind) -> Result<Arc<dyn Plugin>, PluginError> {
        let plugin = self.get(name)?;
        let actual = plugin.info().kind;
        if actual != kind {
            return Err(PluginError::WrongKind { plugin: name.to_string(), expected: kind, actual });
        }
        Ok(plugin)
    }

    /// Registered plugins, sorted by name.
    pub fn list(&self) -> Vec<PluginInfo> {
        let mut out: Vec<_> = self.plugins.values().map(|p| p.info()).collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }
}

#[derive(Default)]
pub struct PluginRegistryBuilder {
    plugins: HashMap<String, Arc<dyn Plugin>>,
}

impl PluginRegistryBuilder {
    /// Add a plugin, replacing any earlier one with the same name.
    pub fn insert(&mut self, plugin: Arc<dyn Plugin>) -> &mut Self {
        self.plugins.insert(plugin.info().name, plugin);
        self
    }

    /// Add a plugin, refusing duplicates.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) -> Result<&mut Self, PluginError> {
        let name = plugin.info().name;
        if self.plugins.contains_key(&name) {
            return Err(PluginError::Duplicate(name));
        }
        self.plugins.insert(name, plugin);
        Ok(self)
    }

    pub fn build(&mut self) -> PluginRegistry {
        PluginRegistry { plugins: Arc::new(std::mem::take(&mut self.plugins)) }
    }
}

/// Expand `{{.proj.KEY}}` and `{{.secret.NAME}}` references in config
/// values. Unknown references are left as written.
pub fn render_config(
    config: &IndexMap<String, String>,
    project_config: &BTreeMap<String, String>,
    secrets: &BTreeMap<String, String>,
) -> IndexMap<String, String> {
    let Ok(pattern) = Regex::new(r"\{\{\s*\.(proj|secret)\.([A-Za-z0-9_]+)\s*\}\}") else {
        return config.clone();
    };
    config
        .iter()
        .map(|(k, v)| {
            let rendered = pattern.replace_all(v, |caps: &regex::Captures<'_>| {
                let source = if &caps[1] == "proj" { project_config } else { secrets };
                source.get(&caps[2]).cloned().unwrap_or_else(|| caps[0].to_string())
            });
            (k.clone(), rendered.into_owned())
        })
        .collect()
}

#[cfg(test)]
#[path = "../plugin_tests.rs"]
mod tests;
