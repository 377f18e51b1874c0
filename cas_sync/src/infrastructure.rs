// /////////////////////////////////////////////////////////////////////////////
// Cas Sync
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Infrastructure layer: everything that touches the filesystem, a
//! database, the network, or process configuration. Domain traits here
//! (`ChecksumService`, the reconciler) stay synchronous; infrastructure
//! ports (`RemoteCache`, the state index) are async because they're I/O.

pub mod config;
pub mod local_cache;
pub mod local_remote;
pub mod lock;
pub mod logging;
pub mod materializer;
pub mod registry;
pub mod remote;
pub mod schema;
pub mod state_index;
pub mod transfer;
