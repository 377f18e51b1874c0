// /////////////////////////////////////////////////////////////////////////////
// Cas Sync
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Status Reconciler
//!
//! A pure function of `(named cache, local presence, remote presence)`
//! that classifies every named checksum into exactly one of four statuses.
//! No I/O happens here; callers pass in sets already probed from the local
//! and remote caches.

use std::collections::HashSet;

use crate::checksum::Checksum;
use crate::named_cache::NamedCache;

/// Per-object synchronization status, determined solely by presence on the
/// local and remote side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Named, present locally, absent remotely: an upload candidate.
    New,
    /// Named, absent locally, present remotely: a download candidate.
    Deleted,
    /// Named, absent on both sides: unrecoverable.
    Missing,
    /// Named, present on both sides.
    Ok,
}

impl Status {
    /// The fixed `(in_local, in_remote) -> status` table.
    pub fn from_presence(in_local: bool, in_remote: bool) -> Status {
        match (in_local, in_remote) {
            (false, false) => Status::Missing,
            (true, false) => Status::New,
            (false, true) => Status::Deleted,
            (true, true) => Status::Ok,
        }
    }
}

/// One reconciled record: a checksum's status plus its display names.
#[derive(Debug, Clone)]
pub struct StatusRecord {
    pub checksum: Checksum,
    pub names: Vec<String>,
    pub status: Status,
}

/// Classify every checksum in `named` against `local` and `remote`
/// presence sets.
pub fn reconcile(named: &NamedCache, local: &HashSet<Checksum>, remote: &HashSet<Checksum>) -> Vec<StatusRecord> {
    named
        .checksums()
        .map(|checksum| {
            let in_local = local.contains(checksum);
            let in_remote = remote.contains(checksum);
            let names = named
                .names_for(checksum)
                .map(|set| set.iter().cloned().collect())
                .unwrap_or_default();
            StatusRecord {
                checksum: checksum.clone(),
                names,
                status: Status::from_presence(in_local, in_remote),
            }
        })
        .collect()
}

/// The optimization from the reference local-cache implementation: when the
/// caller is building a download plan and local presence already covers
/// every named checksum, skip the remote probe entirely and assume remote
/// presence equals local presence.
pub fn local_covers_named(named: &NamedCache, local: &HashSet<Checksum>) -> bool {
    named.checksums().all(|c| local.contains(c))
}
