// /////////////////////////////////////////////////////////////////////////////
// Cas Sync
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Directory Manifest
//!
//! A directory manifest is a stable-ordered list of `(relpath, checksum)`
//! entries describing a tree's regular files. Its canonical serialization
//! is itself hashed to produce the directory's own `.dir` checksum, so byte
//! stability across platforms and walk orders is the entire point of this
//! module.

use serde::{Deserialize, Serialize};

use crate::checksum::Checksum;

/// One file entry within a directory manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Forward-slash-separated path relative to the directory root.
    pub relpath: String,
    /// Content checksum of the file at `relpath`.
    pub md5: Checksum,
}

impl PartialOrd for ManifestEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ManifestEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.relpath.cmp(&other.relpath)
    }
}

/// A directory manifest: entries are always kept sorted by `relpath` so two
/// manifests describing the same tree serialize to identical bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a manifest from unordered entries, sorting them by `relpath`.
    pub fn from_entries(mut entries: Vec<ManifestEntry>) -> Self {
        entries.sort();
        Self { entries }
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Canonical UTF-8 serialization: a JSON array of `{"md5": ..., "relpath": ...}`
    /// objects in sorted order, with a trailing newline. This exact byte
    /// sequence is what gets hashed to produce the manifest's `.dir`
    /// checksum, so field order and whitespace are fixed, not incidental.
    pub fn to_canonical_bytes(&self) -> Vec<u8> {
        #[derive(Serialize)]
        struct CanonicalEntry<'a> {
            md5: &'a str,
            relpath: &'a str,
        }

        let canonical: Vec<CanonicalEntry> = self
            .entries
            .iter()
            .map(|e| CanonicalEntry {
                md5: e.md5.as_str(),
                relpath: &e.relpath,
            })
            .collect();

        let mut bytes = serde_json::to_vec(&canonical).expect("manifest entries always serialize");
        bytes.push(b'\n');
        bytes
    }

    pub fn from_canonical_bytes(bytes: &[u8]) -> Result<Self, crate::error::CacheError> {
        #[derive(Deserialize)]
        struct CanonicalEntry {
            md5: String,
            relpath: String,
        }

        let raw: Vec<CanonicalEntry> = serde_json::from_slice(bytes)?;
        let entries = raw
            .into_iter()
            .map(|e| ManifestEntry {
                relpath: e.relpath,
                md5: Checksum::new(e.md5),
            })
            .collect();
        Ok(Self::from_entries(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(relpath: &str, checksum: &str) -> ManifestEntry {
        ManifestEntry {
            relpath: relpath.to_string(),
            md5: Checksum::new(checksum),
        }
    }

    #[test]
    fn serialization_is_invariant_under_insertion_order() {
        let a = Manifest::from_entries(vec![entry("a/x", "1111111111111111111111111111aaaa"), entry("b", "2222222222222222222222222222bbbb")]);
        let b = Manifest::from_entries(vec![entry("b", "2222222222222222222222222222bbbb"), entry("a/x", "1111111111111111111111111111aaaa")]);
        assert_eq!(a.to_canonical_bytes(), b.to_canonical_bytes());
    }

    #[test]
    fn round_trips_through_canonical_bytes() {
        let original = Manifest::from_entries(vec![entry("x", "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa")]);
        let bytes = original.to_canonical_bytes();
        let parsed = Manifest::from_canonical_bytes(&bytes).unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn entries_are_sorted_lexicographically() {
        let m = Manifest::from_entries(vec![entry("z", "ff"), entry("a", "aa")]);
        assert_eq!(m.entries()[0].relpath, "a");
        assert_eq!(m.entries()[1].relpath, "z");
    }

    proptest::proptest! {
        /// However the entries are shuffled going in, a manifest describing
        /// the same set of `(relpath, checksum)` pairs must serialize to
        /// identical canonical bytes: this is what makes a directory's
        /// `.dir` checksum stable across platforms and walk orders.
        #[test]
        fn canonical_bytes_are_invariant_under_insertion_order(
            mut pairs in proptest::collection::vec(("[a-z/]{1,12}", "[0-9a-f]{32}"), 1..8),
            seed in 0u64..1000,
        ) {
            pairs.dedup_by(|a, b| a.0 == b.0);
            let entries: Vec<ManifestEntry> = pairs.iter().map(|(p, c)| entry(p, c)).collect();
            let baseline = Manifest::from_entries(entries.clone()).to_canonical_bytes();

            let mut shuffled = entries;
            let len = shuffled.len();
            if len > 1 {
                for i in 0..len {
                    let j = ((seed as usize).wrapping_add(i).wrapping_mul(2654435761)) % len;
                    shuffled.swap(i, j);
                }
            }
            let shuffled_bytes = Manifest::from_entries(shuffled).to_canonical_bytes();
            prop_assert_eq!(baseline, shuffled_bytes);
        }

        /// Round-tripping through canonical bytes never loses or reorders
        /// entries, for any set of well-formed `(relpath, checksum)` pairs.
        #[test]
        fn round_trip_through_canonical_bytes_preserves_entries(
            mut pairs in proptest::collection::vec(("[a-z/]{1,12}", "[0-9a-f]{32}"), 0..8),
        ) {
            pairs.dedup_by(|a, b| a.0 == b.0);
            let original = Manifest::from_entries(pairs.iter().map(|(p, c)| entry(p, c)).collect());
            let bytes = original.to_canonical_bytes();
            let parsed = Manifest::from_canonical_bytes(&bytes).unwrap();
            prop_assert_eq!(original, parsed);
        }
    }
}
