// /////////////////////////////////////////////////////////////////////////////
// Cas Sync
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # State Index
//!
//! A persistent map from `(absolute_path, inode_identity, mtime, size)` to
//! the checksum last observed there, backed by SQLite. Lets the local cache
//! skip rehashing a file whose filesystem metadata hasn't changed since the
//! last observation.
//!
//! Cross-process writers coordinate through an advisory lock on the cache
//! root (see [`crate::infrastructure::lock`]); within one process, SQLite's
//! own connection-pool serialization is sufficient.

use std::os::unix::fs::MetadataExt;
use std::path::Path;

use cas_sync_domain::Checksum;
use sqlx::SqlitePool;
use tracing::debug;

use crate::infrastructure::schema;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileIdentity {
    inode: i64,
    mtime_nanos: i64,
    size: i64,
}

impl FileIdentity {
    fn from_metadata(meta: &std::fs::Metadata) -> Self {
        Self {
            inode: meta.ino() as i64,
            mtime_nanos: meta.mtime() * 1_000_000_000 + meta.mtime_nsec(),
            size: meta.size() as i64,
        }
    }
}

/// SQLite-backed implementation of the persistent state index.
pub struct StateIndex {
    pool: SqlitePool,
}

impl StateIndex {
    /// Open (creating and migrating if necessary) the state index database
    /// at `database_url`, e.g. `sqlite:///cache/root/.state/index.db`.
    pub async fn open(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = schema::initialize_database(database_url).await?;
        Ok(Self { pool })
    }

    /// Return the stored checksum for `path` iff its current
    /// `(inode, mtime, size)` still match what was last recorded.
    pub async fn get(&self, path: &Path) -> Result<Option<Checksum>, sqlx::Error> {
        let meta = match tokio::fs::metadata(path).await {
            Ok(meta) => meta,
            Err(_) => return Ok(None),
        };
        let identity = FileIdentity::from_metadata(&meta);
        let path_str = path.to_string_lossy().to_string();

        let row: Option<(i64, i64, i64, String)> = sqlx::query_as(
            "SELECT inode, mtime_nanos, size, checksum FROM state_index WHERE absolute_path = ?",
        )
        .bind(&path_str)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((inode, mtime_nanos, size, checksum))
                if inode == identity.inode && mtime_nanos == identity.mtime_nanos && size == identity.size =>
            {
                Ok(Some(Checksum::new(checksum)))
            }
            Some(_) => {
                debug!(path = %path_str, "state index entry stale, metadata changed");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Record the current metadata of `path` as corresponding to `checksum`.
    pub async fn save(&self, path: &Path, checksum: &Checksum) -> Result<(), sqlx::Error> {
        let meta = tokio::fs::metadata(path).await?;
        let identity = FileIdentity::from_metadata(&meta);
        let path_str = path.to_string_lossy().to_string();

        sqlx::query(
            "INSERT INTO state_index (absolute_path, inode, mtime_nanos, size, checksum) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(absolute_path) DO UPDATE SET \
                inode = excluded.inode, mtime_nanos = excluded.mtime_nanos, \
                size = excluded.size, checksum = excluded.checksum",
        )
        .bind(&path_str)
        .bind(identity.inode)
        .bind(identity.mtime_nanos)
        .bind(identity.size)
        .bind(checksum.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Drop any recorded entry for `path`, forcing the next `get` to miss.
    pub async fn invalidate(&self, path: &Path) -> Result<(), sqlx::Error> {
        let path_str = path.to_string_lossy().to_string();
        sqlx::query("DELETE FROM state_index WHERE absolute_path = ?")
            .bind(&path_str)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
