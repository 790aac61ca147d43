// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

#[test]
#[serial]
fn state_dir_prefers_explicit_variable() {
    std::env::set_var("TB_STATE_DIR", "/tmp/tb-explicit");
    std::env::set_var("XDG_STATE_HOME", "/tmp/xdg");
    assert_eq!(state_dir().unwrap(), PathBuf::from("/tmp/tb-explicit"));

    std::env::remove_var("TB_STATE_DIR");
    assert_eq!(state_dir().unwrap(), PathBuf::from("/tmp/xdg/tributary"));
    std::env::remove_var("XDG_STATE_HOME");
}

#[test]
#[serial]
fn timeouts_fall_back_on_bad_values() {
    std::env::set_var("TB_IPC_TIMEOUT_MS", "250");
    assert_eq!(ipc_timeout(), Duration::from_millis(250));
    std::env::set_var("TB_IPC_TIMEOUT_MS", "soon");
    assert_eq!(ipc_timeout(), Duration::from_secs(5));
    std::env::remove_var("TB_IPC_TIMEOUT_MS");
    assert_eq!(start_timeout(), Duration::from_secs(10));
}

#[test]
#[serial]
fn daemon_binary_ignores_empty() {
    std::env::set_var("TB_DAEMON_BINARY", "");
    assert_eq!(daemon_binary(), None);
    std::env::set_var("TB_DAEMON_BINARY", "/opt/tb/tbd");
    assert_eq!(daemon_binary(), Some(PathBuf::from("/opt/tb/tbd")));
    std::env::remove_var("TB_DAEMON_BINARY");
}
