// /////////////////////////////////////////////////////////////////////////////
// Cas Sync
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Remote Cache Capability
//!
//! The abstract interface a concrete backend (S3, GCS, SSH, HTTP, or the
//! bundled local-scheme reference implementation) must provide. This crate
//! depends only on these signatures; real transport drivers live outside
//! this crate and register themselves by scheme string (see
//! [`crate::infrastructure::registry`]).
//!
//! ## Architecture Note
//!
//! Unlike the domain's checksum and reconciliation services, this trait is
//! **async**: every method does network or disk I/O.

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use cas_sync_domain::{CacheError, Checksum};

/// A capability for querying presence of, and transferring, cache objects
/// on a remote store.
#[async_trait]
pub trait RemoteCache: Send + Sync {
    /// Bulk presence query: returns the subset of `checksums` that exist
    /// remotely. May be backed by object listing or per-object probes.
    async fn exists(&self, checksums: &HashSet<Checksum>) -> Result<HashSet<Checksum>, CacheError>;

    /// Upload the object at `src_path` under `checksum`'s remote location.
    /// Must be atomic: a reader never observes a partially-written object.
    async fn upload(&self, src_path: &Path, checksum: &Checksum) -> Result<(), CacheError>;

    /// Download `checksum`'s remote object to `dst_path`. Must be atomic.
    async fn download(&self, checksum: &Checksum, dst_path: &Path) -> Result<(), CacheError>;

    /// Recommended worker concurrency for this backend.
    fn jobs(&self) -> usize;
}
