// /////////////////////////////////////////////////////////////////////////////
// Cas Sync
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Local Cache
//!
//! Owns the checksum engine, path layout, materializer, and state index,
//! and exposes the operations the status reconciler and transfer engine
//! need: `exists`, `get_checksum`, `changed`, `save`, `checkout`,
//! `changed_cache`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cas_sync_domain::checksum::ChecksumService;
use cas_sync_domain::link_strategy::ModeMap;
use cas_sync_domain::{CacheError, Checksum, LinkStrategy, Manifest, ManifestEntry, PathLayout};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::infrastructure::materializer;
use crate::infrastructure::state_index::StateIndex;

/// Configuration governing how the local cache materializes and verifies
/// objects; mirrors the `cache.*` configuration keys.
#[derive(Debug, Clone)]
pub struct LocalCacheConfig {
    pub link_order: Vec<LinkStrategy>,
    pub mode_map: ModeMap,
    pub protected: bool,
    /// Whether `changed_cache` recomputes the full hash (`true`) or trusts
    /// a stat-only presence check (`false`, the default).
    pub verify: bool,
}

impl Default for LocalCacheConfig {
    fn default() -> Self {
        Self {
            link_order: LinkStrategy::DEFAULT_ORDER.to_vec(),
            mode_map: ModeMap::DEFAULT,
            protected: true,
            verify: false,
        }
    }
}

pub struct LocalCache {
    layout: PathLayout,
    checksum_service: Arc<dyn ChecksumService>,
    state_index: StateIndex,
    config: LocalCacheConfig,
}

impl LocalCache {
    pub fn new(layout: PathLayout, checksum_service: Arc<dyn ChecksumService>, state_index: StateIndex, config: LocalCacheConfig) -> Self {
        Self {
            layout,
            checksum_service,
            state_index,
            config,
        }
    }

    pub fn layout(&self) -> &PathLayout {
        &self.layout
    }

    /// True iff the cache object for `checksum` is present. Does not
    /// verify content.
    pub async fn exists(&self, checksum: &Checksum) -> bool {
        tokio::fs::try_exists(self.layout.object_path(checksum)).await.unwrap_or(false)
    }

    /// Bulk presence query over `checksums`.
    pub async fn exists_all(&self, checksums: &HashSet<Checksum>) -> HashSet<Checksum> {
        let mut present = HashSet::new();
        for checksum in checksums {
            if self.exists(checksum).await {
                present.insert(checksum.clone());
            }
        }
        present
    }

    /// Stat the cache object for `checksum` and, if `config.verify` is set,
    /// recompute and compare its hash. Returns `true` if the object is
    /// absent or (when verifying) corrupt.
    pub async fn changed_cache(&self, checksum: &Checksum) -> Result<bool, CacheError> {
        let path = self.layout.object_path(checksum);
        if !tokio::fs::try_exists(&path).await? {
            return Ok(true);
        }
        if !self.config.verify {
            return Ok(false);
        }
        let recomputed = self.hash_file(&path).await?;
        if &recomputed != checksum {
            warn!(checksum = %checksum, "cache object corrupt, recomputed {}", recomputed);
            return Ok(true);
        }
        Ok(false)
    }

    /// Compute or look up the checksum of a working-tree path, consulting
    /// the state index first and saving on a miss.
    pub async fn get_checksum(&self, path: &Path) -> Result<Checksum, CacheError> {
        if let Some(checksum) = self.state_index.get(path).await.map_err(|e| CacheError::Database(e.to_string()))? {
            return Ok(checksum);
        }

        let meta = tokio::fs::metadata(path).await?;
        let checksum = if meta.is_dir() {
            self.hash_directory(path).await?.0
        } else {
            self.hash_file(path).await?
        };

        self.state_index
            .save(path, &checksum)
            .await
            .map_err(|e| CacheError::Database(e.to_string()))?;
        Ok(checksum)
    }

    /// True iff `path` is missing, or its current checksum differs from
    /// `checksum`.
    pub async fn changed(&self, path: &Path, checksum: &Checksum) -> Result<bool, CacheError> {
        if !tokio::fs::try_exists(path).await? {
            return Ok(true);
        }
        Ok(&self.get_checksum(path).await? != checksum)
    }

    /// Move `path` (file or directory) into the cache, protecting each
    /// landed file, and return its checksum.
    pub async fn save(&self, path: &Path) -> Result<Checksum, CacheError> {
        let meta = tokio::fs::metadata(path).await?;
        let checksum = if meta.is_dir() {
            self.save_directory(path).await?
        } else {
            self.save_file(path).await?
        };
        self.state_index
            .save(path, &checksum)
            .await
            .map_err(|e| CacheError::Database(e.to_string()))?;
        Ok(checksum)
    }

    async fn save_file(&self, path: &Path) -> Result<Checksum, CacheError> {
        let checksum = self.hash_file(path).await?;
        let cache_path = self.layout.object_path(&checksum);
        if !tokio::fs::try_exists(&cache_path).await? {
            if let Some(parent) = cache_path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let src = path.to_path_buf();
            let dst = cache_path.clone();
            let mode = self.config.mode_map.file_mode;
            tokio::task::spawn_blocking(move || materializer::copy(&src, &dst, mode))
                .await
                .map_err(|e| CacheError::internal(e.to_string()))??;
            if self.config.protected {
                materializer::protect(&cache_path)?;
            }
        }
        Ok(checksum)
    }

    async fn save_directory(&self, dir: &Path) -> Result<Checksum, CacheError> {
        let (checksum, manifest) = self.hash_directory(dir).await?;
        for entry in manifest.entries() {
            let entry_path = dir.join(&entry.relpath);
            self.save_file(&entry_path).await?;
        }

        let manifest_path = self.layout.object_path(&checksum);
        if !tokio::fs::try_exists(&manifest_path).await? {
            if let Some(parent) = manifest_path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&manifest_path, manifest.to_canonical_bytes()).await?;
            if self.config.protected {
                materializer::protect(&manifest_path)?;
            }
        }
        Ok(checksum)
    }

    /// Materialize `checksum` at `dest` using the configured link order.
    /// For a directory checksum, first ensures the unpacked tree is
    /// current, then links each of its entries into `dest`.
    pub async fn checkout(&self, dest: &Path, checksum: &Checksum) -> Result<(), CacheError> {
        if checksum.is_directory() {
            self.checkout_directory(dest, checksum).await
        } else {
            self.checkout_file(dest, checksum).await
        }
    }

    async fn checkout_file(&self, dest: &Path, checksum: &Checksum) -> Result<(), CacheError> {
        let src = self.layout.object_path(checksum);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let order = self.config.link_order.clone();
        let mode_map = self.config.mode_map;
        let dest_owned = dest.to_path_buf();
        let strategy = tokio::task::spawn_blocking(move || materializer::link(&src, &dest_owned, &order, mode_map))
            .await
            .map_err(|e| CacheError::internal(e.to_string()))??;
        debug!(dest = %dest.display(), strategy = %strategy, "checked out file");
        Ok(())
    }

    async fn checkout_directory(&self, dest: &Path, checksum: &Checksum) -> Result<(), CacheError> {
        self.ensure_unpacked_dir(checksum).await?;
        let unpacked = self.layout.unpacked_path(checksum);
        let manifest = self.read_manifest(checksum).await?;

        tokio::fs::create_dir_all(dest).await?;
        for entry in manifest.entries() {
            let src = unpacked.join(&entry.relpath);
            let dst = dest.join(&entry.relpath);
            if let Some(parent) = dst.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let order = self.config.link_order.clone();
            let mode_map = self.config.mode_map;
            tokio::task::spawn_blocking(move || materializer::link(&src, &dst, &order, mode_map))
                .await
                .map_err(|e| CacheError::internal(e.to_string()))??;
        }
        Ok(())
    }

    /// Rebuild the `.unpacked` sibling of a directory manifest iff the
    /// state index reports its current content doesn't match, or it's
    /// absent. The rebuild always uses `[hardlink, symlink]` regardless of
    /// the configured cache.type, because the unpacked tree is an internal
    /// lookup structure, not a user-facing checkout.
    async fn ensure_unpacked_dir(&self, checksum: &Checksum) -> Result<(), CacheError> {
        let unpacked = self.layout.unpacked_path(checksum);
        let needs_rebuild = match self.state_index.get(&unpacked).await.map_err(|e| CacheError::Database(e.to_string()))? {
            Some(recorded) if &recorded == checksum && tokio::fs::try_exists(&unpacked).await? => false,
            _ => true,
        };

        if !needs_rebuild {
            return Ok(());
        }

        if tokio::fs::try_exists(&unpacked).await? {
            tokio::fs::remove_dir_all(&unpacked).await?;
        }
        tokio::fs::create_dir_all(&unpacked).await?;

        let manifest = self.read_manifest(checksum).await?;
        for entry in manifest.entries() {
            let src = self.layout.object_path(&entry.md5);
            let dst = unpacked.join(&entry.relpath);
            if let Some(parent) = dst.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let order = LinkStrategy::UNPACKED_DIR_ORDER.to_vec();
            let mode_map = self.config.mode_map;
            tokio::task::spawn_blocking(move || materializer::link(&src, &dst, &order, mode_map))
                .await
                .map_err(|e| CacheError::internal(e.to_string()))??;
        }

        self.state_index
            .save(&unpacked, checksum)
            .await
            .map_err(|e| CacheError::Database(e.to_string()))?;
        Ok(())
    }

    async fn read_manifest(&self, checksum: &Checksum) -> Result<Manifest, CacheError> {
        let path = self.layout.object_path(checksum);
        let bytes = tokio::fs::read(&path).await?;
        Manifest::from_canonical_bytes(&bytes)
    }

    /// Hash a single file off the async executor (CPU-bound work).
    async fn hash_file(&self, path: &Path) -> Result<Checksum, CacheError> {
        let path = path.to_path_buf();
        let service = Arc::clone(&self.checksum_service);
        tokio::task::spawn_blocking(move || {
            let mut file = std::fs::File::open(&path)?;
            service.hash_reader(&mut file)
        })
        .await
        .map_err(|e| CacheError::internal(e.to_string()))?
    }

    /// Walk `root`, hash every regular file in parallel via rayon, and
    /// produce the sorted manifest plus its `.dir` checksum.
    async fn hash_directory(&self, root: &Path) -> Result<(Checksum, Manifest), CacheError> {
        let root = root.to_path_buf();
        let service = Arc::clone(&self.checksum_service);
        tokio::task::spawn_blocking(move || -> Result<(Checksum, Manifest), CacheError> {
            let relpaths = walk_relative_files(&root)?;
            let entries: Result<Vec<ManifestEntry>, CacheError> = relpaths
                .par_iter()
                .map(|relpath| {
                    let full = root.join(relpath);
                    let mut file = std::fs::File::open(&full)?;
                    let md5 = service.hash_reader(&mut file)?;
                    Ok(ManifestEntry {
                        relpath: relpath.clone(),
                        md5,
                    })
                })
                .collect();
            let manifest = Manifest::from_entries(entries?);
            let mut cursor = std::io::Cursor::new(manifest.to_canonical_bytes());
            let checksum = service.hash_reader(&mut cursor)?.into_directory();
            Ok((checksum, manifest))
        })
        .await
        .map_err(|e| CacheError::internal(e.to_string()))?
    }
}

/// Depth-first walk of `root` collecting forward-slash-separated relative
/// paths of every regular file.
fn walk_relative_files(root: &Path) -> Result<Vec<String>, CacheError> {
    let mut out = Vec::new();
    let mut stack = vec![PathBuf::new()];
    while let Some(rel) = stack.pop() {
        let abs = root.join(&rel);
        for entry in std::fs::read_dir(&abs)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            let entry_rel = rel.join(entry.file_name());
            if file_type.is_symlink() {
                continue;
            } else if file_type.is_dir() {
                stack.push(entry_rel);
            } else {
                out.push(entry_rel.to_string_lossy().replace('\\', "/"));
            }
        }
    }
    Ok(out)
}
