// /////////////////////////////////////////////////////////////////////////////
// Cas Sync
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Checksum
//!
//! Content-addressing digest value object and the domain service that
//! streams a reader through the digest function.
//!
//! ## Architecture Note
//!
//! This trait is **synchronous** following DDD principles: the domain layer
//! defines *what* hashing operation exists, not *how* it is scheduled.
//! Hashing is CPU-bound and doesn't benefit from async I/O; the
//! infrastructure layer wraps `ChecksumService` in `spawn_blocking` or a
//! rayon pool when it needs to run off the async executor.
//!
//! ## Algorithm
//!
//! The digest is the widely-deployed 128-bit "md5" family hash, chosen for
//! compatibility with the fixed-format cache layout rather than for
//! cryptographic strength: nothing in this crate treats the digest as a
//! security boundary.

use std::io::{self, Read};

use md5::{Digest, Md5};

use crate::error::CacheError;

/// Suffix appended to a content checksum to mark it as a directory manifest
/// checksum rather than a file-content checksum.
pub const DIR_SUFFIX: &str = ".dir";

/// A 128-bit content digest, rendered as 32 lowercase hex characters, with
/// an optional `.dir` suffix marking a directory manifest checksum.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct Checksum(String);

impl Checksum {
    /// Wrap an already-hex-encoded digest string (with optional `.dir`
    /// suffix). Does not itself compute anything.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_directory(&self) -> bool {
        self.0.ends_with(DIR_SUFFIX)
    }

    /// The bare hex digest, with any `.dir` suffix stripped.
    pub fn content_hex(&self) -> &str {
        self.0.strip_suffix(DIR_SUFFIX).unwrap_or(&self.0)
    }

    /// Two-character shard prefix used by the cache path layout.
    pub fn shard_prefix(&self) -> &str {
        &self.content_hex()[0..2]
    }

    /// Remaining characters after the shard prefix, including a `.dir`
    /// suffix if present. The shard prefix is always the first two hex
    /// digits, so this is the raw string's `[2..]`, not the suffix-stripped
    /// content hex's.
    pub fn shard_remainder(&self) -> &str {
        &self.0[2..]
    }

    /// Reinterpret a file-content checksum as a directory manifest checksum.
    pub fn into_directory(self) -> Self {
        if self.is_directory() {
            self
        } else {
            Self(format!("{}{}", self.0, DIR_SUFFIX))
        }
    }
}

impl std::fmt::Display for Checksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Domain service interface for computing content checksums.
///
/// Implementations must be thread-safe (`Send + Sync`) and deterministic:
/// identical byte streams always yield identical checksums.
pub trait ChecksumService: Send + Sync {
    /// Stream `reader` to completion and return its content checksum.
    fn hash_reader(&self, reader: &mut dyn Read) -> Result<Checksum, CacheError>;

    /// Hash a byte slice already resident in memory.
    fn hash_bytes(&self, data: &[u8]) -> Checksum {
        let mut cursor = io::Cursor::new(data);
        self.hash_reader(&mut cursor).expect("hashing an in-memory cursor cannot fail")
    }
}

/// `ChecksumService` implementation using the md5 digest family.
///
/// Streams input in fixed-size blocks so memory use stays constant
/// regardless of input size.
#[derive(Debug, Clone, Copy, Default)]
pub struct Md5ChecksumService {
    block_size: usize,
}

const DEFAULT_BLOCK_SIZE: usize = 64 * 1024;

impl Md5ChecksumService {
    pub fn new() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }

    pub fn with_block_size(block_size: usize) -> Self {
        Self { block_size }
    }
}

impl ChecksumService for Md5ChecksumService {
    fn hash_reader(&self, reader: &mut dyn Read) -> Result<Checksum, CacheError> {
        let mut hasher = Md5::new();
        let mut buf = vec![0u8; self.block_size.max(1)];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        let digest = hasher.finalize();
        Ok(Checksum::new(hex::encode(digest)))
    }
}
