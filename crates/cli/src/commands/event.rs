// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tb event` - send scheduler lifecycle events

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use serde_json::{Map, Value};
use tb_core::WireEvent;
use tb_wire::Response;

use crate::client::DaemonClient;
use crate::color;
use crate::exit_error::ExitError;
use crate::output::{format_or_json, OutputFormat};

#[derive(Args)]
pub struct EventArgs {
    #[command(subcommand)]
    pub command: EventCommand,
}

#[derive(Subcommand)]
pub enum EventCommand {
    /// Send one event, e.g. `tb event send job_start -p lake -j rollup --value '{...}'`
    Send {
        /// Event type such as job_start or TYPE_TASK_SUCCESS; omit with --file
        #[arg(required_unless_present = "file")]
        event_type: Option<String>,
        #[arg(short, long)]
        project: String,
        #[arg(short, long)]
        job: String,
        /// Payload object as JSON
        #[arg(long, conflicts_with = "file")]
        value: Option<String>,
        /// Read a `{"type": ..., "value": {...}}` envelope from a file
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

pub async fn handle(command: EventCommand, format: OutputFormat) -> Result<()> {
    match command {
        EventCommand::Send { event_type, project, job, value, file } => {
            let event = build_event(event_type, value, file)?;
            let client = DaemonClient::connect()?;
            let receipt = client.ingest_event(&project, &job, event).await?;
            let Response::Ingested { event, job_run_id, attempt, duplicate } = &receipt else {
                return Err(anyhow!("unexpected response: {receipt:?}"));
            };
            format_or_json(format, &receipt, || {
                let note = if *duplicate { " (duplicate)" } else { "" };
                println!("{} recorded for run {} attempt {}{}", event, color::muted(&job_run_id.short(8)), attempt, note);
            })
        }
    }
}

pub(crate) fn build_event(
    event_type: Option<String>,
    value: Option<String>,
    file: Option<PathBuf>,
) -> Result<WireEvent, ExitError> {
    if let Some(path) = file {
        let raw = std::fs::read_to_string(&path).map_err(|e| ExitError::new(1, format!("{}: {e}", path.display())))?;
        let mut event: WireEvent =
            serde_json::from_str(&raw).map_err(|e| ExitError::new(2, format!("invalid event envelope: {e}")))?;
        if let Some(event_type) = event_type {
            event.event_type = event_type;
        }
        return Ok(event);
    }
    let event_type = event_type.ok_or_else(|| ExitError::new(2, "event type is required"))?;
    let value: Map<String, Value> = match value {
        None => Map::new(),
        Some(raw) => match serde_json::from_str(&raw) {
            Ok(Value::Object(map)) => map,
            Ok(_) => return Err(ExitError::new(2, "--value must be a JSON object")),
            Err(e) => return Err(ExitError::new(2, format!("invalid --value: {e}"))),
        },
    };
    Ok(WireEvent { event_type, value })
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
