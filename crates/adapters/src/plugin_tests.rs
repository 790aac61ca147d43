// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn request(config: &[(&str, &str)], query: Option<&str>) -> PluginRequest {
    PluginRequest {
        config: config.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        assets: query.map(|q| BTreeMap::from([(sql::QUERY_ASSET.to_string(), q.to_string())])).unwrap_or_default(),
    }
}

const DEST: &[(&str, &str)] = &[("PROJECT", "acme"), ("DATASET", "mart"), ("TABLE", "orders")];

#[tokio::test]
async fn sql_destination_from_config() {
    let plugin = SqlPlugin::new("sql", "bigquery");
    assert_eq!(plugin.destination(&request(DEST, None)).await.unwrap(), "bigquery://acme:mart.orders");

    let err = plugin.destination(&request(&[("PROJECT", "acme"), ("DATASET", "mart")], None)).await.unwrap_err();
    assert!(matches!(err, PluginError::MissingConfig { key, .. } if key == "TABLE"));
}

#[yare::parameterized(
    from_and_join = {
        "SELECT * FROM `acme.raw.orders` o JOIN acme.raw.customers c ON o.id = c.id",
        &["bigquery://acme:raw.customers", "bigquery://acme:raw.orders"]
    },
    legacy_colon = { "select 1 from [acme:raw.orders]", &[] },
    colon_ref    = { "select 1 from acme:raw.orders", &["bigquery://acme:raw.orders"] },
    comments     = { "-- from acme.raw.old\nselect 1 /* join acme.raw.gone */ from acme.raw.live", &["bigquery://acme:raw.live"] },
    self_ref     = { "select * from acme.mart.orders union all select * from acme.raw.new", &["bigquery://acme:raw.new"] },
    dedup        = { "from acme.raw.a join acme.raw.a", &["bigquery://acme:raw.a"] },
    no_tables    = { "select 1", &[] },
)]
fn sql_sources(query: &str, expected: &[&str]) {
    let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let plugin = SqlPlugin::new("sql", "bigquery");
    let got = runtime.block_on(plugin.sources(&request(DEST, Some(query)))).unwrap();
    assert_eq!(got, expected);
}

#[tokio::test]
async fn sql_without_query_has_no_sources() {
    let plugin = SqlPlugin::new("sql", "bigquery");
    assert!(plugin.sources(&request(DEST, None)).await.unwrap().is_empty());
}

#[test]
fn registry_lookup_and_kinds() {
    let registry = PluginRegistry::with_builtins();
    assert!(registry.get("sql").is_ok());
    assert!(matches!(registry.get("spark"), Err(PluginError::NotFound(_))));
    assert!(registry.get_kind("sql", PluginKind::Task).is_ok());
    assert!(registry.get_kind("notify", PluginKind::Hook).is_ok());
    let err = registry.get_kind("notify", PluginKind::Task).err().unwrap();
    assert_eq!(err.to_string(), r#"plugin "notify" is a hook plugin, not a task plugin"#);

    let names: Vec<_> = registry.list().into_iter().map(|p| p.name).collect();
    assert_eq!(names, vec!["audit", "notify", "sql"]);
}

#[test]
fn builder_refuses_duplicates() {
    let mut builder = PluginRegistry::builder();
    builder.register(Arc::new(SqlPlugin::new("sql", "bigquery"))).unwrap();
    assert!(matches!(
        builder.register(Arc::new(HookPlugin::new("sql", "shadow"))),
        Err(PluginError::Duplicate(_))
    ));
    assert_eq!(builder.build().list().len(), 1);
}

#[tokio::test]
async fn hook_plugins_have_no_destination() {
    let hook = HookPlugin::new("notify", "");
    assert!(hook.destination(&PluginRequest::default()).await.is_err());
    assert!(hook.sources(&PluginRequest::default()).await.unwrap().is_empty());
}

#[test]
fn render_config_expands_known_references() {
    let config: IndexMap<String, String> = [
        ("PROJECT".to_string(), "{{.proj.STORAGE_PROJECT}}".to_string()),
        ("TOKEN".to_string(), "{{ .secret.api_key }}".to_string()),
        ("OTHER".to_string(), "{{.proj.MISSING}}-x".to_string()),
    ]
    .into_iter()
    .collect();
    let project = BTreeMap::from([("STORAGE_PROJECT".to_string(), "acme".to_string())]);
    let secrets = BTreeMap::from([("api_key".to_string(), "s3cr3t".to_string())]);
    let rendered = render_config(&config, &project, &secrets);
    assert_eq!(rendered["PROJECT"], "acme");
    assert_eq!(rendered["TOKEN"], "s3cr3t");
    assert_eq!(rendered["OTHER"], "{{.proj.MISSING}}-x");
}
