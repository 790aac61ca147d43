// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serial_test::serial;
use tb_core::WindowVersion;

use super::*;

const VARS: &[&str] = &[
    "TB_DEPLOY_WORKERS",
    "TB_DEPLOY_TIMEOUT_MS",
    "TB_REPLAY_CONCURRENCY",
    "TB_INGEST_PARTITIONS",
    "TB_CALL_DEADLINE_MS",
    "TB_WINDOW_VERSION",
    "TB_IPC_TIMEOUT_MS",
];

fn clear() {
    for var in VARS {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn defaults_without_overrides() {
    clear();
    assert_eq!(engine_config(), EngineConfig::default());
    assert_eq!(ipc_timeout(), Duration::from_secs(5));
}

#[test]
#[serial]
fn overrides_are_applied() {
    clear();
    std::env::set_var("TB_DEPLOY_WORKERS", "7");
    std::env::set_var("TB_DEPLOY_TIMEOUT_MS", "1500");
    std::env::set_var("TB_REPLAY_CONCURRENCY", "1");
    std::env::set_var("TB_INGEST_PARTITIONS", "3");
    std::env::set_var("TB_CALL_DEADLINE_MS", "250");
    std::env::set_var("TB_WINDOW_VERSION", "v1");
    std::env::set_var("TB_IPC_TIMEOUT_MS", "100");

    let config = engine_config();
    assert_eq!(config.deploy_workers, 7);
    assert_eq!(config.deploy_timeout, Duration::from_millis(1500));
    assert_eq!(config.replay_concurrency, 1);
    assert_eq!(config.ingest_partitions, 3);
    assert_eq!(config.call_deadline, Duration::from_millis(250));
    assert_eq!(config.window_version, WindowVersion::V1);
    assert_eq!(ipc_timeout(), Duration::from_millis(100));
    clear();
}

#[test]
#[serial]
fn bad_values_fall_back() {
    clear();
    std::env::set_var("TB_DEPLOY_WORKERS", "0");
    std::env::set_var("TB_REPLAY_CONCURRENCY", "many");
    std::env::set_var("TB_WINDOW_VERSION", "v3");

    let config = engine_config();
    let defaults = EngineConfig::default();
    assert_eq!(config.deploy_workers, defaults.deploy_workers);
    assert_eq!(config.replay_concurrency, defaults.replay_concurrency);
    assert_eq!(config.window_version, defaults.window_version);
    clear();
}

#[test]
#[serial]
fn state_dir_prefers_explicit_variable() {
    std::env::set_var("TB_STATE_DIR", "/tmp/tb-state");
    assert_eq!(state_dir().unwrap(), PathBuf::from("/tmp/tb-state"));
    std::env::remove_var("TB_STATE_DIR");
}

#[test]
#[serial]
fn asset_dir_defaults_under_state() {
    std::env::remove_var("TB_ASSET_DIR");
    assert_eq!(asset_dir(Path::new("/s")), PathBuf::from("/s/dags"));
    std::env::set_var("TB_ASSET_DIR", "/dags");
    assert_eq!(asset_dir(Path::new("/s")), PathBuf::from("/dags"));
    std::env::remove_var("TB_ASSET_DIR");
}
