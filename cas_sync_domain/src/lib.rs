// /////////////////////////////////////////////////////////////////////////////
// Cas Sync
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Cas Sync Domain
//!
//! Pure business logic for a content-addressed cache and its remote
//! synchronization engine: checksums, directory manifests, cache path
//! layout, link strategy policy, and the status reconciliation table.
//!
//! ## Architecture
//!
//! Domain services in this crate are **synchronous**. Computing a checksum
//! or reconciling a status table is CPU-bound business logic, not I/O; the
//! infrastructure layer (the `cas-sync` crate) wraps these with async
//! adapters where it talks to the filesystem, a database, or the network.
//!
//! ## Modules
//!
//! - [`checksum`] - content digest value object and hashing services
//! - [`manifest`] - directory manifest data model and canonical serialization
//! - [`path_layout`] - checksum to cache-path mapping
//! - [`link_strategy`] - the four materialization strategies as ordered policy
//! - [`status`] - the named/local/remote status reconciliation table
//! - [`named_cache`] - the caller-supplied universe of checksums under reconciliation
//! - [`error`] - the domain error hierarchy

pub mod checksum;
pub mod error;
pub mod link_strategy;
pub mod manifest;
pub mod named_cache;
pub mod path_layout;
pub mod status;

pub use checksum::{Checksum, ChecksumService, Md5ChecksumService};
pub use error::CacheError;
pub use link_strategy::LinkStrategy;
pub use manifest::{Manifest, ManifestEntry};
pub use named_cache::NamedCache;
pub use path_layout::PathLayout;
pub use status::{reconcile, Status};
