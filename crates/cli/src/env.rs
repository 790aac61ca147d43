// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the CLI.

use std::path::PathBuf;
use std::time::Duration;

use crate::client::ClientError;

pub const SOCKET_FILE: &str = "daemon.sock";
pub const LOG_FILE: &str = "logs/daemon.log";

/// Resolve state directory: TB_STATE_DIR > XDG_STATE_HOME/tributary > ~/.local/state/tributary
pub fn state_dir() -> Result<PathBuf, ClientError> {
    if let Ok(dir) = std::env::var("TB_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("tributary"));
    }
    let home = dirs::home_dir().ok_or(ClientError::NoStateDir)?;
    Ok(home.join(".local/state/tributary"))
}

/// Per-request timeout (TB_IPC_TIMEOUT_MS, default 5s)
pub fn ipc_timeout() -> Duration {
    millis("TB_IPC_TIMEOUT_MS").unwrap_or(Duration::from_secs(5))
}

/// How long `tb daemon start` waits for the socket to answer
/// (TB_DAEMON_START_TIMEOUT_MS, default 10s)
pub fn start_timeout() -> Duration {
    millis("TB_DAEMON_START_TIMEOUT_MS").unwrap_or(Duration::from_secs(10))
}

/// Explicit daemon binary (TB_DAEMON_BINARY)
pub fn daemon_binary() -> Option<PathBuf> {
    std::env::var("TB_DAEMON_BINARY").ok().filter(|s| !s.is_empty()).map(PathBuf::from)
}

fn millis(name: &str) -> Option<Duration> {
    std::env::var(name).ok().and_then(|v| v.parse::<u64>().ok()).map(Duration::from_millis)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
