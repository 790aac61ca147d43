// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tb project` - project registration

use anyhow::Result;
use clap::{Args, Subcommand};

use super::{config_map, parse_key_val};
use crate::client::DaemonClient;
use crate::color;
use crate::output::{format_or_json, OutputFormat};

#[derive(Args)]
pub struct ProjectArgs {
    #[command(subcommand)]
    pub command: ProjectCommand,
}

#[derive(Subcommand)]
pub enum ProjectCommand {
    /// Register a project, or replace the config of an existing one
    Register {
        /// Project name
        name: String,
        /// Project variable, available to task config as `{{.proj.KEY}}`
        #[arg(short, long = "config", value_name = "KEY=VALUE", value_parser = parse_key_val)]
        config: Vec<(String, String)>,
    },
}

pub async fn handle(command: ProjectCommand, format: OutputFormat) -> Result<()> {
    match command {
        ProjectCommand::Register { name, config } => {
            let client = DaemonClient::connect()?;
            let project = client.register_project(&name, config_map(config)).await?;
            format_or_json(format, &project, || {
                println!("Project '{}' registered ({})", color::header(&project.name), color::muted(&project.id.short(8)));
            })
        }
    }
}
