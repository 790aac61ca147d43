// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tb namespace` - namespace registration

use anyhow::Result;
use clap::{Args, Subcommand};

use super::{config_map, parse_key_val};
use crate::client::DaemonClient;
use crate::color;
use crate::output::{format_or_json, OutputFormat};

#[derive(Args)]
pub struct NamespaceArgs {
    #[command(subcommand)]
    pub command: NamespaceCommand,
}

#[derive(Subcommand)]
pub enum NamespaceCommand {
    /// Register a namespace inside a project
    Register {
        /// Namespace name
        name: String,
        #[arg(short, long)]
        project: String,
        #[arg(short, long = "config", value_name = "KEY=VALUE", value_parser = parse_key_val)]
        config: Vec<(String, String)>,
    },
}

pub async fn handle(command: NamespaceCommand, format: OutputFormat) -> Result<()> {
    match command {
        NamespaceCommand::Register { name, project, config } => {
            let client = DaemonClient::connect()?;
            let namespace = client.register_namespace(&project, &name, config_map(config)).await?;
            format_or_json(format, &namespace, || {
                println!("Namespace '{}' registered in {}", color::header(&namespace.name), project);
            })
        }
    }
}
