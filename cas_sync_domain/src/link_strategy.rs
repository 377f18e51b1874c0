// /////////////////////////////////////////////////////////////////////////////
// Cas Sync
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Link Strategy
//!
//! The four ways a cached object can be materialized at a working-tree
//! path. Kept as explicit ordered data rather than a class hierarchy: a
//! configured `Vec<LinkStrategy>` is policy, tried in order until one
//! succeeds.

use serde::{Deserialize, Serialize};

/// A materialization strategy for placing a cache object at a target path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStrategy {
    /// Copy-on-write clone, when the filesystem supports it.
    Reflink,
    /// Share the source inode.
    Hardlink,
    /// Path indirection.
    Symlink,
    /// Independent byte-for-byte copy.
    Copy,
}

impl LinkStrategy {
    pub const DEFAULT_ORDER: [LinkStrategy; 2] = [LinkStrategy::Reflink, LinkStrategy::Copy];

    /// The fixed strategy order used to rebuild an unpacked directory,
    /// regardless of the cache's configured link-type policy: hardlink
    /// first (cheap, shares the protected source file's mode), symlink as
    /// fallback.
    pub const UNPACKED_DIR_ORDER: [LinkStrategy; 2] = [LinkStrategy::Hardlink, LinkStrategy::Symlink];

    pub fn as_str(&self) -> &'static str {
        match self {
            LinkStrategy::Reflink => "reflink",
            LinkStrategy::Hardlink => "hardlink",
            LinkStrategy::Symlink => "symlink",
            LinkStrategy::Copy => "copy",
        }
    }

    /// Whether the destination ends up with its own independent inode,
    /// meaning its permission bits must be set explicitly after placement
    /// rather than inherited from the source.
    pub fn has_independent_inode(&self) -> bool {
        matches!(self, LinkStrategy::Reflink | LinkStrategy::Copy)
    }
}

impl std::fmt::Display for LinkStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LinkStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reflink" => Ok(LinkStrategy::Reflink),
            "hardlink" => Ok(LinkStrategy::Hardlink),
            "symlink" => Ok(LinkStrategy::Symlink),
            "copy" => Ok(LinkStrategy::Copy),
            other => Err(format!("unknown cache.type '{other}', expected one of: reflink, hardlink, symlink, copy")),
        }
    }
}

/// File and directory mode pairs selected by the `cache.shared` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeMap {
    pub file_mode: u32,
    pub dir_mode: u32,
}

impl ModeMap {
    /// Default (unshared) cache: owner read/write, group/other read-only.
    pub const DEFAULT: ModeMap = ModeMap {
        file_mode: 0o644,
        dir_mode: 0o755,
    };

    /// Shared-group cache: group gets write access too.
    pub const GROUP_SHARED: ModeMap = ModeMap {
        file_mode: 0o664,
        dir_mode: 0o775,
    };

    /// Mode every cache-interior object is protected with.
    pub const CACHE_MODE: u32 = 0o444;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn round_trips_through_str() {
        for s in ["reflink", "hardlink", "symlink", "copy"] {
            let strategy = LinkStrategy::from_str(s).unwrap();
            assert_eq!(strategy.as_str(), s);
        }
    }

    #[test]
    fn unknown_strategy_is_an_error() {
        assert!(LinkStrategy::from_str("bogus").is_err());
    }

    #[test]
    fn reflink_and_copy_need_explicit_chmod() {
        assert!(LinkStrategy::Reflink.has_independent_inode());
        assert!(LinkStrategy::Copy.has_independent_inode());
        assert!(!LinkStrategy::Hardlink.has_independent_inode());
        assert!(!LinkStrategy::Symlink.has_independent_inode());
    }
}
