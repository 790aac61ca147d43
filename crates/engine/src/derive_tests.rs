// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use super::*;
use async_trait::async_trait;
use tb_adapters::{Plugin, PluginError, PluginInfo};
use tb_core::test_support::project_fixture;
use tb_core::{ErrorKind, Hook, HookType};

fn sql_spec(name: &str, query: &str) -> JobSpec {
    let mut spec = JobSpec::builder().name(name).build();
    for (k, v) in [("PROJECT", "{{.proj.GCP_PROJECT}}"), ("DATASET", "mart"), ("TABLE", name)] {
        spec.task.config.insert(k.into(), v.into());
    }
    spec.assets.insert("query.sql".into(), query.into());
    spec
}

fn project() -> Project {
    let mut project = project_fixture("sales");
    project.config.insert("GCP_PROJECT".into(), "acme".into());
    project
}

#[tokio::test]
async fn derives_destination_and_sources_from_rendered_config() {
    let plugins = PluginRegistry::with_builtins();
    let spec = sql_spec("orders", "select * from `raw:shop.orders` o join raw.shop.users u on o.u = u.id");
    let urns = derive_urns(&plugins, Duration::from_secs(1), &project(), &spec).await.unwrap();
    assert_eq!(urns.destination, "bigquery://acme:mart.orders");
    assert_eq!(urns.sources, vec!["bigquery://raw:shop.orders".to_string(), "bigquery://raw:shop.users".to_string()]);
}

#[tokio::test]
async fn unknown_plugin_is_invalid() {
    let mut spec = sql_spec("orders", "select 1");
    spec.task.plugin_name = "spark".into();
    let err = derive_urns(&PluginRegistry::with_builtins(), Duration::from_secs(1), &project(), &spec).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidSpec);
}

#[tokio::test]
async fn hook_plugin_cannot_be_the_task() {
    let mut spec = sql_spec("orders", "select 1");
    spec.task.plugin_name = "notify".into();
    let err = derive_urns(&PluginRegistry::with_builtins(), Duration::from_secs(1), &project(), &spec).await.unwrap_err();
    assert!(matches!(err, EngineError::Plugin(PluginError::WrongKind { .. })), "{err:?}");
}

struct SlowPlugin;

#[async_trait]
impl Plugin for SlowPlugin {
    fn info(&self) -> PluginInfo {
        PluginInfo { name: "slow".into(), kind: PluginKind::Task, description: String::new() }
    }

    async fn destination(&self, _: &PluginRequest) -> Result<String, PluginError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok("bigquery://x:y.z".into())
    }

    async fn sources(&self, _: &PluginRequest) -> Result<Vec<String>, PluginError> {
        Ok(Vec::new())
    }
}

#[tokio::test(start_paused = true)]
async fn slow_plugin_hits_the_deadline() {
    let plugins = PluginRegistry::builder().insert(Arc::new(SlowPlugin)).build();
    let mut spec = sql_spec("orders", "select 1");
    spec.task.plugin_name = "slow".into();
    let err = derive_urns(&plugins, Duration::from_millis(100), &project(), &spec).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DeadlineExceeded);
}

#[test]
fn hooks_must_be_registered_hook_plugins() {
    let plugins = PluginRegistry::with_builtins();
    let mut spec = sql_spec("orders", "select 1");
    spec.hooks.push(Hook { plugin_name: "notify".into(), config: Default::default(), hook_type: HookType::Post });
    assert!(check_hooks(&plugins, &spec).is_ok());

    spec.hooks.push(Hook { plugin_name: "sql".into(), config: Default::default(), hook_type: HookType::Pre });
    assert!(check_hooks(&plugins, &spec).is_err());

    spec.hooks.pop();
    spec.hooks.push(Hook { plugin_name: "pager".into(), config: Default::default(), hook_type: HookType::Fail });
    assert_eq!(check_hooks(&plugins, &spec).unwrap_err().kind(), ErrorKind::InvalidSpec);
}
