// /////////////////////////////////////////////////////////////////////////////
// Cas Sync
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Local-Scheme Remote
//!
//! A [`RemoteCache`] backed by a second content-addressed root on the
//! local (or a mounted) filesystem, laid out exactly like the local cache's
//! own root. Presence is a `stat` per checksum rather than a bulk listing:
//! deliberately the simplest correct implementation, so it doubles as the
//! reference other backends are tested against.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use cas_sync_domain::link_strategy::ModeMap;
use cas_sync_domain::{CacheError, Checksum, PathLayout};

use crate::infrastructure::materializer;
use crate::infrastructure::remote::RemoteCache;

pub struct LocalRemote {
    layout: PathLayout,
}

impl LocalRemote {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            layout: PathLayout::new(root),
        }
    }

    pub fn root(&self) -> &Path {
        self.layout.root()
    }
}

#[async_trait]
impl RemoteCache for LocalRemote {
    async fn exists(&self, checksums: &HashSet<Checksum>) -> Result<HashSet<Checksum>, CacheError> {
        let mut present = HashSet::new();
        for checksum in checksums {
            let path = self.layout.object_path(checksum);
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                present.insert(checksum.clone());
            }
        }
        Ok(present)
    }

    async fn upload(&self, src_path: &Path, checksum: &Checksum) -> Result<(), CacheError> {
        let dst = self.layout.object_path(checksum);
        if let Some(parent) = dst.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let src = src_path.to_path_buf();
        let dst_for_blocking = dst.clone();
        tokio::task::spawn_blocking(move || materializer::copy(&src, &dst_for_blocking, ModeMap::CACHE_MODE))
            .await
            .map_err(|e| CacheError::internal(e.to_string()))??;
        Ok(())
    }

    async fn download(&self, checksum: &Checksum, dst_path: &Path) -> Result<(), CacheError> {
        let src = self.layout.object_path(checksum);
        if let Some(parent) = dst_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let dst = dst_path.to_path_buf();
        tokio::task::spawn_blocking(move || materializer::copy(&src, &dst, ModeMap::CACHE_MODE))
            .await
            .map_err(|e| CacheError::internal(e.to_string()))??;
        Ok(())
    }

    fn jobs(&self) -> usize {
        std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
    }
}
