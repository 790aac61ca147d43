// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tb deployment` - deployment queue inspection

use anyhow::Result;
use clap::{Args, Subcommand};
use tb_core::DeploymentStatus;

use super::job::print_deployment;
use crate::client::DaemonClient;
use crate::color;
use crate::output::{format_or_json, format_time, handle_list, OutputFormat, Table};

#[derive(Args)]
pub struct DeploymentArgs {
    #[command(subcommand)]
    pub command: DeploymentCommand,
}

#[derive(Subcommand)]
pub enum DeploymentCommand {
    /// Show one deployment (ID or unique prefix)
    Status { id: String },
    /// List a project's deployments, newest first
    List {
        #[arg(short, long)]
        project: String,
        /// in_queue, in_progress, succeeded, failed or cancelled
        #[arg(long, value_parser = parse_status)]
        status: Option<DeploymentStatus>,
    },
    /// Cancel a queued deployment
    Cancel { id: String },
}

fn parse_status(raw: &str) -> Result<DeploymentStatus, String> {
    DeploymentStatus::parse(raw).ok_or_else(|| format!("unknown deployment status {raw:?}"))
}

pub async fn handle(command: DeploymentCommand, format: OutputFormat) -> Result<()> {
    let client = DaemonClient::connect()?;
    match command {
        DeploymentCommand::Status { id } => {
            let deployment = client.get_deployment(&id).await?;
            format_or_json(format, &deployment, || print_deployment(&deployment, &mut std::io::stdout()))
        }
        DeploymentCommand::List { project, status } => {
            let deployments = client.list_deployments(&project, status).await?;
            handle_list(format, &deployments, "No deployments found", |items, out| {
                let mut table = Table::new(vec!["ID", "STATUS", "CREATED", "OK", "FAILED"]);
                for d in items {
                    table.row(vec![
                        d.id.short(8),
                        color::status(&d.status.to_string()),
                        format_time(d.created_at),
                        d.details.success_count.to_string(),
                        d.details.failure_count.to_string(),
                    ]);
                }
                table.render(out);
            })
        }
        DeploymentCommand::Cancel { id } => {
            let deployment = client.cancel_deployment(&id).await?;
            format_or_json(format, &deployment, || {
                println!("Deployment {} {}", color::muted(&deployment.id.short(8)), color::status(&deployment.status.to_string()));
            })
        }
    }
}
