// /////////////////////////////////////////////////////////////////////////////
// Cas Sync
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Cas Sync
//!
//! Infrastructure layer for a content-addressed local cache and its
//! remote synchronization engine. Built on [`cas_sync_domain`]'s pure
//! checksum, manifest, path-layout, and status-reconciliation logic, this
//! crate adds everything that talks to the outside world: filesystem
//! materialization, a SQLite-backed state index, a remote-cache
//! capability (with a bundled local-scheme reference implementation), and
//! the bounded-parallel transfer engine that drives push/pull/fetch.
//!
//! Materialization and the state index rely on inode identity and POSIX
//! permission bits, so this crate targets Unix-like platforms only.

pub mod infrastructure;

pub use cas_sync_domain as domain;

pub use infrastructure::config::AppConfig;
pub use infrastructure::local_cache::{LocalCache, LocalCacheConfig};
pub use infrastructure::local_remote::LocalRemote;
pub use infrastructure::logging::{CapturingProgressReporter, NoOpProgressReporter, ProgressReporter, TracingProgressReporter};
pub use infrastructure::registry::RemoteRegistry;
pub use infrastructure::remote::RemoteCache;
pub use infrastructure::state_index::StateIndex;
pub use infrastructure::transfer::TransferEngine;
