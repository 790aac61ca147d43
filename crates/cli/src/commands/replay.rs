// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tb replay` - backfill a job and its dependents over a time range

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use tb_core::{ExecutionNode, Replay, ReplayConfig, ReplayRunStatus, ReplayStatus};

use super::parse_time;
use crate::client::DaemonClient;
use crate::color;
use crate::output::{format_or_json, format_time, handle_list, OutputFormat, Table};

#[derive(Args)]
pub struct ReplayArgs {
    #[command(subcommand)]
    pub command: ReplayCommand,
}

#[derive(Args, Clone)]
pub struct ReplayTarget {
    /// Root job of the replay
    pub job: String,
    #[arg(short, long)]
    pub project: String,
    /// First schedule instant (inclusive)
    #[arg(long, value_parser = parse_time)]
    pub start: DateTime<Utc>,
    /// Last schedule instant (inclusive)
    #[arg(long, value_parser = parse_time)]
    pub end: DateTime<Utc>,
    /// Replay only the root job
    #[arg(long)]
    pub ignore_downstream: bool,
    /// Take over instants claimed by older running replays
    #[arg(long)]
    pub force: bool,
    #[arg(long, default_value = "")]
    pub description: String,
}

impl ReplayTarget {
    fn config(&self) -> ReplayConfig {
        ReplayConfig {
            ignore_downstream: self.ignore_downstream,
            force: self.force,
            description: self.description.clone(),
        }
    }
}

#[derive(Subcommand)]
pub enum ReplayCommand {
    /// Submit a replay
    Create(ReplayTarget),
    /// Show the execution tree a replay would run, without submitting it
    Plan(ReplayTarget),
    /// List a project's replays
    List {
        #[arg(short, long)]
        project: String,
        /// accepted, in_progress, succeeded or failed
        #[arg(long, value_parser = parse_status)]
        status: Option<ReplayStatus>,
    },
    /// Show one replay with its execution tree
    Status { id: String },
    /// Cancel a replay; pending runs are abandoned
    Cancel { id: String },
}

fn parse_status(raw: &str) -> Result<ReplayStatus, String> {
    ReplayStatus::parse(raw).ok_or_else(|| format!("unknown replay status {raw:?}"))
}

pub async fn handle(command: ReplayCommand, format: OutputFormat) -> Result<()> {
    let client = DaemonClient::connect()?;
    match command {
        ReplayCommand::Create(target) => {
            let replay =
                client.submit_replay(&target.project, &target.job, target.start, target.end, target.config()).await?;
            format_or_json(format, &replay, || {
                println!("Replay {} {}", replay.id, color::status(&replay.status.to_string()));
                print_tree(&replay.execution_tree, &mut std::io::stdout());
            })
        }
        ReplayCommand::Plan(target) => {
            let replay =
                client.plan_replay(&target.project, &target.job, target.start, target.end, target.config()).await?;
            format_or_json(format, &replay.execution_tree, || print_tree(&replay.execution_tree, &mut std::io::stdout()))
        }
        ReplayCommand::List { project, status } => {
            let replays = client.list_replays(&project, status).await?;
            handle_list(format, &replays, "No replays found", |items, out| {
                let mut table = Table::new(vec!["ID", "JOB", "STATUS", "START", "END", "RUNS"]);
                for replay in items {
                    table.row(vec![
                        replay.id.short(8),
                        root_name(replay),
                        color::status(&replay.status.to_string()),
                        format_time(replay.start_date),
                        format_time(replay.end_date),
                        run_count(&replay.execution_tree).to_string(),
                    ]);
                }
                table.render(out);
            })
        }
        ReplayCommand::Status { id } => {
            let replay = client.get_replay(&id).await?;
            format_or_json(format, &replay, || print_replay(&replay, &mut std::io::stdout()))
        }
        ReplayCommand::Cancel { id } => {
            let replay = client.cancel_replay(&id).await?;
            format_or_json(format, &replay, || {
                println!("Replay {} {}", color::muted(&replay.id.short(8)), color::status(&replay.status.to_string()));
            })
        }
    }
}

fn root_name(replay: &Replay) -> String {
    replay.execution_tree.first().map(|n| n.job_name.clone()).unwrap_or_default()
}

fn run_count(tree: &[ExecutionNode]) -> usize {
    tree.iter().map(|n| n.runs.len()).sum()
}

pub(crate) fn print_replay(replay: &Replay, out: &mut dyn Write) {
    let _ = writeln!(out, "Replay:  {}", replay.id);
    let _ = writeln!(out, "Status:  {}", color::status(&replay.status.to_string()));
    let _ = writeln!(out, "Range:   {} .. {}", format_time(replay.start_date), format_time(replay.end_date));
    if let Some(message) = &replay.message {
        let _ = writeln!(out, "Message: {message}");
    }
    print_tree(&replay.execution_tree, out);
    if !replay.failures.is_empty() {
        let _ = writeln!(out, "Failures:");
        for failure in &replay.failures {
            let _ = writeln!(
                out,
                "  {} @ {}: {}",
                color::header(&failure.job_name),
                format_time(failure.scheduled_at),
                failure.message
            );
        }
    }
}

/// One line per node, indented under its parent, with per-status run counts.
pub(crate) fn print_tree(tree: &[ExecutionNode], out: &mut dyn Write) {
    for node in tree {
        let depth = depth(tree, node);
        let mut counts: Vec<(ReplayRunStatus, usize)> = Vec::new();
        for run in &node.runs {
            match counts.iter_mut().find(|(s, _)| *s == run.status) {
                Some((_, n)) => *n += 1,
                None => counts.push((run.status, 1)),
            }
        }
        let summary = counts.iter().map(|(s, n)| format!("{n} {s}")).collect::<Vec<_>>().join(", ");
        let _ = writeln!(out, "{}{}  {}", "  ".repeat(depth), node.job_name, color::muted(&summary));
    }
}

fn depth(tree: &[ExecutionNode], node: &ExecutionNode) -> usize {
    let mut depth = 0;
    let mut parent = node.parent_index;
    while let Some(index) = parent {
        depth += 1;
        parent = tree.iter().find(|n| n.node_index == index).and_then(|n| n.parent_index);
        if depth > tree.len() {
            break;
        }
    }
    depth
}

#[cfg(test)]
#[path = "replay_tests.rs"]
mod tests;
