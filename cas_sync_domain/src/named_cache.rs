// /////////////////////////////////////////////////////////////////////////////
// Cas Sync
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Named Cache
//!
//! The caller-supplied universe of checksums under reconciliation, each
//! with a set of human-readable display names (a checksum can be reachable
//! under more than one name, e.g. hard-linked from two tracked files).

use std::collections::{HashMap, HashSet};

use crate::checksum::Checksum;

#[derive(Debug, Clone, Default)]
pub struct NamedCache {
    names: HashMap<Checksum, HashSet<String>>,
}

impl NamedCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, checksum: Checksum, name: impl Into<String>) {
        self.names.entry(checksum).or_default().insert(name.into());
    }

    pub fn contains(&self, checksum: &Checksum) -> bool {
        self.names.contains_key(checksum)
    }

    pub fn names_for(&self, checksum: &Checksum) -> Option<&HashSet<String>> {
        self.names.get(checksum)
    }

    pub fn checksums(&self) -> impl Iterator<Item = &Checksum> {
        self.names.keys()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Merge another checksum's children into this universe without
    /// clobbering existing names; used when a directory checksum expands
    /// into its manifest's file checksums before reconciliation.
    pub fn extend_with(&mut self, checksum: Checksum, names: impl IntoIterator<Item = String>) {
        let entry = self.names.entry(checksum).or_default();
        entry.extend(names);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_checksum_can_have_multiple_names() {
        let mut cache = NamedCache::new();
        let c = Checksum::new("abc");
        cache.insert(c.clone(), "foo.bin");
        cache.insert(c.clone(), "bar.bin");
        assert_eq!(cache.names_for(&c).unwrap().len(), 2);
        assert!(cache.contains(&c));
    }

    #[test]
    fn unseen_checksum_is_not_contained() {
        let cache = NamedCache::new();
        assert!(!cache.contains(&Checksum::new("missing")));
    }
}
