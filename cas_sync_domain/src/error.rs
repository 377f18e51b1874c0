// /////////////////////////////////////////////////////////////////////////////
// Cas Sync
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Cache Error
//!
//! The error hierarchy shared across the domain and infrastructure layers.
//! Variants are grouped by the failure kinds a caller needs to distinguish:
//! transient per-object transfer failures, link-strategy exhaustion,
//! corruption, permission handling, and configuration/argument errors.

use thiserror::Error;

/// Errors raised anywhere in the cache and sync engine.
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// Every configured link strategy failed to materialize an object.
    #[error("no link strategy succeeded for {path}: {reason}")]
    LinkStrategyExhausted { path: String, reason: String },

    /// A cached object's content no longer matches its path's checksum.
    #[error("cache object {checksum} is corrupt: {reason}")]
    Corruption { checksum: String, reason: String },

    /// `protect`/`unprotect` was rejected by the OS for a reason other than
    /// the tolerated EROFS / already-correct-mode cases.
    #[error("permission error on {path}: {reason}")]
    Permission { path: String, reason: String },

    /// A hardlink materialization did not share inode identity with its
    /// source, or some other internal invariant did not hold.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Invalid configuration or CLI argument, fatal before the engine starts.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// `n` uploads failed in a single batch.
    #[error("{0} upload(s) failed")]
    UploadError(usize),

    /// `n` downloads failed in a single batch.
    #[error("{0} download(s) failed")]
    DownloadError(usize),

    /// A dependency graph external to this crate (the stage executor) was
    /// found to contain a cycle. This crate never raises it itself; the
    /// variant exists so an embedding executor's error round-trips through
    /// this type.
    #[error("cyclic dependency graph: {0}")]
    CyclicGraph(String),

    /// A named checksum has no representative on the local or remote cache.
    #[error("object missing from cache: {0}")]
    ObjectMissing(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CacheError {
    pub fn link_strategy_exhausted(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::LinkStrategyExhausted {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn corruption(checksum: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Corruption {
            checksum: checksum.into(),
            reason: reason.into(),
        }
    }

    pub fn permission(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Permission {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Coarse category, useful for metrics and exit-code mapping.
    pub fn category(&self) -> &'static str {
        match self {
            Self::LinkStrategyExhausted { .. } => "link_strategy",
            Self::Corruption { .. } => "corruption",
            Self::Permission { .. } => "permission",
            Self::InvariantViolation(_) => "invariant",
            Self::Configuration(_) => "configuration",
            Self::UploadError(_) => "upload",
            Self::DownloadError(_) => "download",
            Self::CyclicGraph(_) => "cyclic_graph",
            Self::ObjectMissing(_) => "object_missing",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::Database(_) => "database",
            Self::Internal(_) => "internal",
        }
    }

    /// Whether retrying the same operation might succeed without
    /// intervention (transient transport or resource-exhaustion failures),
    /// as opposed to requiring a configuration or data fix.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::UploadError(_) | Self::DownloadError(_) | Self::Io(_) | Self::LinkStrategyExhausted { .. }
        )
    }
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
