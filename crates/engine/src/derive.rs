// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Destination and source URNs of a job, as its task plugin reports them.

use std::collections::BTreeMap;
use std::time::Duration;

use tb_adapters::{render_config, with_deadline, PluginKind, PluginRegistry, PluginRequest};
use tb_core::{JobSpec, Project};

use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedUrns {
    pub destination: String,
    /// Sorted and deduplicated.
    pub sources: Vec<String>,
}

/// Ask the job's task plugin for its URNs, each call bounded by `limit`.
pub async fn derive_urns(
    plugins: &PluginRegistry,
    limit: Duration,
    project: &Project,
    spec: &JobSpec,
) -> Result<DerivedUrns, EngineError> {
    let plugin = plugins.get_kind(&spec.task.plugin_name, PluginKind::Task)?;
    let request = PluginRequest {
        config: render_config(&spec.task.config, &project.config, &BTreeMap::new()),
        assets: spec.assets.clone(),
    };
    let what = format!("plugin {} for job {}", spec.task.plugin_name, spec.name);
    let destination = with_deadline(limit, what.clone(), plugin.destination(&request)).await?;
    let mut sources = with_deadline(limit, what, plugin.sources(&request)).await?;
    sources.sort();
    sources.dedup();
    Ok(DerivedUrns { destination, sources })
}

/// Every hook must name a registered hook plugin.
pub fn check_hooks(plugins: &PluginRegistry, spec: &JobSpec) -> Result<(), EngineError> {
    for hook in &spec.hooks {
        plugins.get_kind(&hook.plugin_name, PluginKind::Hook)?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "derive_tests.rs"]
mod tests;
