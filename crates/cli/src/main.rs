// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! `tb`: command line client for the Tributary control plane.

mod client;
mod color;
mod commands;
mod env;
mod exit_error;
mod output;

use std::process::ExitCode;

use clap::{CommandFactory, Parser, Subcommand};

use client::ClientError;
use commands::{daemon, deployment, event, job, namespace, project, replay};
use exit_error::ExitError;
use output::OutputFormat;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("TB_BUILD_REVISION"), ")");

#[derive(Parser)]
#[command(name = "tb", version = VERSION, about = "Tributary: data pipeline control plane", styles = color::styles())]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, default_value_t = OutputFormat::Text, global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Project registration
    Project(project::ProjectArgs),
    /// Namespace registration
    Namespace(namespace::NamespaceArgs),
    /// Job specs and project deployment
    Job(job::JobArgs),
    /// Deployment progress
    Deployment(deployment::DeploymentArgs),
    /// Backfills over a time range
    Replay(replay::ReplayArgs),
    /// Execution events from the workflow engine
    Event(event::EventArgs),
    /// Daemon management
    Daemon(daemon::DaemonArgs),
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let format = cli.output;
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };
    match command {
        Commands::Project(args) => project::handle(args.command, format).await,
        Commands::Namespace(args) => namespace::handle(args.command, format).await,
        Commands::Job(args) => job::handle(args.command, format).await,
        Commands::Deployment(args) => deployment::handle(args.command, format).await,
        Commands::Replay(args) => replay::handle(args.command, format).await,
        Commands::Event(args) => event::handle(args.command, format).await,
        Commands::Daemon(args) => daemon::handle(args.command, format).await,
    }
}

/// Map a command failure to its process exit code.
fn exit_error(error: anyhow::Error) -> ExitError {
    let error = match error.downcast::<ExitError>() {
        Ok(e) => return e,
        Err(error) => error,
    };
    let error = match error.downcast::<ClientError>() {
        Ok(e) => return e.into(),
        Err(error) => error,
    };
    let error = match error.downcast::<tb_specfile::SpecFileError>() {
        Ok(e) => return e.into(),
        Err(error) => error,
    };
    match error.downcast::<tb_specfile::FindError>() {
        Ok(e) => e.into(),
        Err(error) => ExitError::new(1, format!("{error:#}")),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let error = exit_error(error);
            eprintln!("error: {}", error.message);
            ExitCode::from(u8::try_from(error.code).unwrap_or(1))
        }
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
