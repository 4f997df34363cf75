// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `pd`: demo binary for the distributed pip build runtime (§10's
//! supplemented ambient surface). Installs the process-wide `tracing`
//! subscriber the library crates deliberately don't, runs the requested
//! subcommand, and maps a failure to a non-zero exit code.

mod cli;
mod demo;

use std::process::ExitCode;

use clap::Parser;

use crate::cli::{Cli, Command, Role};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Demo { worker_config, orchestrator_config } => demo::run(worker_config, orchestrator_config).await,
        Command::ConfigShow { role, config } => show_config(role, config),
    };

    if let Err(error) = result {
        eprintln!("error: {error:#}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn show_config(role: Role, config: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let json = match role {
        Role::Worker => serde_json::to_string_pretty(&pd_worker::WorkerConfig::load(config.as_deref())?)?,
        Role::Orchestrator => {
            serde_json::to_string_pretty(&pd_orchestrator::OrchestratorConfig::load(config.as_deref())?)?
        }
    };
    println!("{json}");
    Ok(())
}
