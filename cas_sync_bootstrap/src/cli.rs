// /////////////////////////////////////////////////////////////////////////////
// Cas Sync
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Command-Line Interface
//!
//! Bootstrap-layer CLI handling: parse with `clap`, validate numeric
//! ranges and non-empty target lists, then hand the caller a
//! [`ValidatedCli`] it never needs to re-check.
//!
//! ```text
//! ┌───────────────────┐     ┌────────────────────┐     ┌──────────────────┐
//! │  Cli::parse()     │ ──▶ │  validate(cli)      │ ──▶ │  ValidatedCli    │
//! └───────────────────┘     └────────────────────┘     └──────────────────┘
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use thiserror::Error;

#[derive(Parser)]
#[command(name = "cas-sync")]
#[command(about = "Content-addressed cache and remote synchronization engine")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose (debug-level) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download objects into the local cache without checking them out
    Fetch(SyncArgs),
    /// Download objects and check them out to the working tree
    Pull(PullArgs),
    /// Upload objects to a remote
    Push(SyncArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct SyncArgs {
    /// Named targets to synchronize
    pub targets: Vec<String>,

    /// Number of parallel transfer workers
    #[arg(long)]
    pub jobs: Option<usize>,

    /// Remote name or scheme://path to synchronize against
    #[arg(long)]
    pub remote: Option<String>,

    /// Resolve targets across all branches (forwarded to the external stage graph; this crate's single-snapshot resolution ignores it)
    #[arg(long)]
    pub all_branches: bool,

    /// Resolve targets across all tags
    #[arg(long)]
    pub all_tags: bool,

    /// Resolve targets across all commits
    #[arg(long)]
    pub all_commits: bool,

    /// Include targets' dependencies
    #[arg(long)]
    pub with_deps: bool,

    /// Recurse into directory targets
    #[arg(long)]
    pub recursive: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct PullArgs {
    #[command(flatten)]
    pub sync: SyncArgs,

    /// Overwrite local working-tree changes without prompting
    #[arg(long)]
    pub force: bool,
}

#[derive(Error, Debug, Clone)]
pub enum ParseError {
    #[error("invalid value for --{arg}: {reason}")]
    InvalidValue { arg: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct ValidatedCli {
    pub command: ValidatedCommand,
    pub verbose: bool,
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub enum ValidatedCommand {
    Fetch(ValidatedSync),
    Pull(ValidatedSync, bool),
    Push(ValidatedSync),
}

#[derive(Debug, Clone)]
pub struct ValidatedSync {
    pub targets: Vec<String>,
    pub jobs: Option<usize>,
    pub remote: Option<String>,
    pub all_branches: bool,
    pub all_tags: bool,
    pub all_commits: bool,
    pub with_deps: bool,
    pub recursive: bool,
}

fn validate_sync(args: SyncArgs) -> Result<ValidatedSync, ParseError> {
    if let Some(jobs) = args.jobs {
        if jobs == 0 {
            return Err(ParseError::InvalidValue {
                arg: "jobs".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
    }

    Ok(ValidatedSync {
        targets: args.targets,
        jobs: args.jobs,
        remote: args.remote,
        all_branches: args.all_branches,
        all_tags: args.all_tags,
        all_commits: args.all_commits,
        with_deps: args.with_deps,
        recursive: args.recursive,
    })
}

/// Parse `std::env::args()` with `clap`, then validate.
pub fn parse_and_validate() -> Result<ValidatedCli, ParseError> {
    validate(Cli::parse())
}

fn validate(cli: Cli) -> Result<ValidatedCli, ParseError> {
    let command = match cli.command {
        Commands::Fetch(args) => ValidatedCommand::Fetch(validate_sync(args)?),
        Commands::Push(args) => ValidatedCommand::Push(validate_sync(args)?),
        Commands::Pull(args) => {
            let force = args.force;
            ValidatedCommand::Pull(validate_sync(args.sync)?, force)
        }
    };

    Ok(ValidatedCli {
        command,
        verbose: cli.verbose,
        config: cli.config,
    })
}
