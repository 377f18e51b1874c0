// /////////////////////////////////////////////////////////////////////////////
// Cas Sync
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bootstrap Module
//!
//! Sits outside the domain/infrastructure split and owns everything a
//! process needs before and after the engine itself runs:
//!
//! - `cli` - argument parsing and validation (`clap`)
//! - `exit_code` - BSD sysexits-style process exit codes
//! - `logger` - a minimal logging trait for bootstrap-phase messages
//! - `shutdown` - Ctrl-C/SIGTERM-driven cancellation with a grace period
//!
//! Enterprise layers (`cas_sync_domain`, `cas_sync`) never depend back on
//! this crate.

pub mod cli;
pub mod exit_code;
pub mod logger;
pub mod shutdown;

pub use cli::{parse_and_validate, ValidatedCli, ValidatedCommand, ValidatedSync};
pub use exit_code::ExitCode;

use cas_sync_domain::CacheError;

/// Parse and validate `std::env::args()`. The entry point a binary's
/// `main` calls before doing anything else; clap handles `--help` and
/// `--version` itself and exits the process.
pub fn bootstrap_cli() -> Result<ValidatedCli, cli::ParseError> {
    cli::parse_and_validate()
}

/// Map an engine result to a process exit code, logging the error first.
pub fn result_to_exit_code(result: Result<(), CacheError>, logger: &dyn logger::BootstrapLogger) -> ExitCode {
    match result {
        Ok(()) => ExitCode::Success,
        Err(err) => {
            let code = ExitCode::from_error(&err);
            logger.error(&format!("{err} (exit {code})"));
            code
        }
    }
}
