// /////////////////////////////////////////////////////////////////////////////
// Cas Sync
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Progress Reporter
//!
//! A small injected capability that lets the transfer engine and status
//! reconciler emit per-object progress lines and the missing-cache warning
//! through one mutex-guarded sink, so they never interleave with each
//! other or with the global `tracing` subscriber's own line buffering.

use std::sync::Mutex;

use tracing::info;

/// A sink for human-readable progress lines.
pub trait ProgressReporter: Send + Sync {
    fn write(&self, message: &str);
}

/// Default reporter: funnels every line through the `tracing` subscriber
/// at `info` level.
pub struct TracingProgressReporter;

impl ProgressReporter for TracingProgressReporter {
    fn write(&self, message: &str) {
        info!(target: "progress", "{message}");
    }
}

/// Discards every line. Useful when a caller wants silence, e.g. scripted
/// invocations that parse the exit code only.
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn write(&self, _message: &str) {}
}

/// Captures lines in memory instead of emitting them; used by tests that
/// assert on what the engine reported.
#[derive(Default)]
pub struct CapturingProgressReporter {
    lines: Mutex<Vec<String>>,
}

impl CapturingProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("progress reporter mutex poisoned").clone()
    }
}

impl ProgressReporter for CapturingProgressReporter {
    fn write(&self, message: &str) {
        self.lines.lock().expect("progress reporter mutex poisoned").push(message.to_string());
    }
}

/// Initializes the global `tracing` subscriber once, honoring `RUST_LOG`
/// if set and otherwise falling back to `level`.
pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
