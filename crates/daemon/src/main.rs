// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tbd`: the Tributary control plane daemon.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tb_daemon::{logging, rollback, serve, Config};

#[derive(Parser)]
#[command(name = "tbd", version, about = "Tributary control plane daemon")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the control plane (default)
    Run,
    /// Drop the latest state version record so an older release can start
    Rollback,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("tbd: {e}");
            return ExitCode::FAILURE;
        }
    };
    let _guard = match logging::init(&config.log_dir) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("tbd: failed to open log directory: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command.unwrap_or(Command::Run) {
        Command::Run => tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(Into::into)
            .and_then(|runtime| runtime.block_on(serve(&config, || println!("READY")))),
        Command::Rollback => rollback(&config).map(|record| {
            println!("rolled back version {} (migration {})", record.app_version, record.migration_version)
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("tbd: {e}");
            ExitCode::FAILURE
        }
    }
}
