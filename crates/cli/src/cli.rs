// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Argument parsing for the `pd` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "pd", version, about = "Distributed pip build runtime demo")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a worker and an orchestrator-side driver wired together over the
    /// in-memory transport, attach, execute a couple of pip steps, and exit.
    Demo {
        #[arg(long)]
        worker_config: Option<PathBuf>,

        #[arg(long)]
        orchestrator_config: Option<PathBuf>,
    },

    /// Load and print the effective configuration for one role.
    ConfigShow {
        #[arg(long, value_enum)]
        role: Role,

        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Role {
    Worker,
    Orchestrator,
}
