// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tb daemon` - daemon management commands

use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};

use crate::client::DaemonClient;
use crate::env;
use crate::output::{format_or_json, format_uptime, OutputFormat};

#[derive(Args)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub command: DaemonCommand,
}

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Start the daemon in the background
    Start,
    /// Stop the daemon after it flushes state
    Stop,
    /// Check daemon status
    Status,
    /// View daemon logs
    Logs {
        /// Number of recent lines to show
        #[arg(short = 'n', long, default_value = "200")]
        limit: usize,
    },
}

pub async fn handle(command: DaemonCommand, format: OutputFormat) -> Result<()> {
    match command {
        DaemonCommand::Start => start(format).await,
        DaemonCommand::Stop => stop(format).await,
        DaemonCommand::Status => status(format).await,
        DaemonCommand::Logs { limit } => logs(limit, format),
    }
}

async fn start(format: OutputFormat) -> Result<()> {
    if let Ok(client) = DaemonClient::connect() {
        if let Ok(status) = client.status().await {
            let obj = serde_json::json!({ "status": "running", "uptime_secs": status.uptime_secs });
            return format_or_json(format, &obj, || {
                println!("Daemon already running (uptime: {})", format_uptime(status.uptime_secs))
            });
        }
    }
    DaemonClient::connect_or_start().await?;
    let obj = serde_json::json!({ "status": "started" });
    format_or_json(format, &obj, || println!("Daemon started"))
}

async fn stop(format: OutputFormat) -> Result<()> {
    let client = match DaemonClient::connect() {
        Ok(client) => client,
        Err(e) if e.is_not_running() => return print_not_running(format),
        Err(e) => return Err(e.into()),
    };
    match client.shutdown().await {
        Ok(()) => {}
        Err(e) if e.is_not_running() => return print_not_running(format),
        Err(e) => return Err(e.into()),
    }
    wait_for_exit(client.socket_path(), env::start_timeout()).await?;
    let obj = serde_json::json!({ "status": "stopped" });
    format_or_json(format, &obj, || println!("Daemon stopped"))
}

/// The daemon removes its socket as the last step of shutdown.
async fn wait_for_exit(socket: &Path, limit: Duration) -> Result<()> {
    let deadline = Instant::now() + limit;
    while socket.exists() {
        if Instant::now() >= deadline {
            return Err(anyhow!("daemon did not exit within {limit:?}"));
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    Ok(())
}

async fn status(format: OutputFormat) -> Result<()> {
    let client = match DaemonClient::connect() {
        Ok(client) => client,
        Err(_) => return print_not_running(format),
    };
    let status = match client.status().await {
        Ok(status) => status,
        Err(e) if e.is_not_running() => return print_not_running(format),
        Err(e) => return Err(e.into()),
    };

    let mut obj = serde_json::to_value(&status)?;
    if let Some(map) = obj.as_object_mut() {
        map.insert("status".into(), "running".into());
        map.insert("uptime".into(), format_uptime(status.uptime_secs).into());
    }
    format_or_json(format, &obj, || {
        println!("Status: running");
        println!("Version: {}", status.version);
        println!("Uptime: {}", format_uptime(status.uptime_secs));
        println!("Projects: {}", status.projects);
        println!("Jobs: {}", status.jobs);
        println!("Deployments queued: {}", status.queued_deployments);
        println!("Replays active: {}", status.active_replays);
        println!("WAL sequence: {}", status.wal_seq);
    })
}

fn logs(limit: usize, format: OutputFormat) -> Result<()> {
    let log_path = env::state_dir()?.join(env::LOG_FILE);
    if !log_path.exists() {
        let obj = serde_json::json!({ "log_path": log_path, "lines": Vec::<String>::new() });
        return format_or_json(format, &obj, || println!("No log file found at {}", log_path.display()));
    }
    let lines = read_last_lines(&log_path, limit)?;
    let obj = serde_json::json!({ "log_path": log_path, "lines": lines });
    format_or_json(format, &obj, || {
        for line in &lines {
            println!("{line}");
        }
    })
}

fn print_not_running(format: OutputFormat) -> Result<()> {
    let obj = serde_json::json!({ "status": "not_running" });
    format_or_json(format, &obj, || println!("Daemon not running"))
}

pub(crate) fn read_last_lines(path: &Path, n: usize) -> Result<Vec<String>> {
    let file = std::fs::File::open(path)?;
    let lines: Vec<String> = BufReader::new(file).lines().collect::<std::io::Result<_>>()?;
    let start = lines.len().saturating_sub(n);
    Ok(lines[start..].to_vec())
}

#[cfg(test)]
#[path = "daemon_tests.rs"]
mod tests;
