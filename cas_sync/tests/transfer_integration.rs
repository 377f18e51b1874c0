// /////////////////////////////////////////////////////////////////////////////
// Cas Sync
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Transfer Engine Integration Tests
//!
//! Exercises the transfer engine and its exit-code mapping against real
//! infrastructure services (a real SQLite-backed state index, a real
//! filesystem cache root) rather than the crate's own unit-test doubles.
//!
//! ## Coverage
//!
//! - Parallel push failure aggregation (a remote that fails a subset of
//!   uploads) and the resulting `CacheError::UploadError(n)`, carried
//!   through to the bootstrap layer's process exit code.
//! - Local-scheme remote round-trip for both a file checksum and a
//!   directory checksum, via two independent cache roots.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use cas_sync::domain::checksum::Md5ChecksumService;
use cas_sync::domain::{CacheError, Checksum, NamedCache, PathLayout};
use cas_sync::infrastructure::local_cache::{LocalCache, LocalCacheConfig};
use cas_sync::infrastructure::local_remote::LocalRemote;
use cas_sync::infrastructure::logging::NoOpProgressReporter;
use cas_sync::infrastructure::remote::RemoteCache;
use cas_sync::infrastructure::state_index::StateIndex;
use cas_sync::infrastructure::transfer::TransferEngine;
use cas_sync_bootstrap::exit_code::ExitCode;
use cas_sync_bootstrap::logger::NoOpLogger;
use cas_sync_bootstrap::result_to_exit_code;

async fn new_local_cache(root: &Path) -> LocalCache {
    let db_path = root.join("state.db");
    let url = format!("sqlite://{}", db_path.display());
    let state_index = StateIndex::open(&url).await.unwrap();
    LocalCache::new(
        PathLayout::new(root.join("objects")),
        Arc::new(Md5ChecksumService::new()),
        state_index,
        LocalCacheConfig::default(),
    )
}

/// A [`RemoteCache`] that wraps a real [`LocalRemote`] but deliberately
/// fails upload/download for a fixed number of calls, then delegates.
/// Models a flaky backend for exercising the transfer engine's
/// batch-then-aggregate failure path.
struct FailingRemote {
    inner: LocalRemote,
    uploads_to_fail: AtomicUsize,
}

impl FailingRemote {
    fn new(root: &Path, uploads_to_fail: usize) -> Self {
        Self {
            inner: LocalRemote::new(root),
            uploads_to_fail: AtomicUsize::new(uploads_to_fail),
        }
    }
}

#[async_trait]
impl RemoteCache for FailingRemote {
    async fn exists(&self, checksums: &HashSet<Checksum>) -> Result<HashSet<Checksum>, CacheError> {
        self.inner.exists(checksums).await
    }

    async fn upload(&self, src_path: &Path, checksum: &Checksum) -> Result<(), CacheError> {
        let remaining = self.uploads_to_fail.load(Ordering::SeqCst);
        if remaining > 0 {
            self.uploads_to_fail.store(remaining - 1, Ordering::SeqCst);
            return Err(CacheError::configuration(format!("simulated upload failure for {checksum}")));
        }
        self.inner.upload(src_path, checksum).await
    }

    async fn download(&self, checksum: &Checksum, dst_path: &Path) -> Result<(), CacheError> {
        self.inner.download(checksum, dst_path).await
    }

    fn jobs(&self) -> usize {
        4
    }
}

/// S5: pushing a batch where some uploads fail reports the aggregate
/// failure count, not the first error; S7: that aggregate error maps to
/// the `TempFail` exit code end-to-end through the bootstrap layer.
#[tokio::test]
async fn push_aggregates_failures_across_the_batch_s5_s7() {
    let local_root = tempfile::tempdir().unwrap();
    let remote_root = tempfile::tempdir().unwrap();
    let local = Arc::new(new_local_cache(local_root.path()).await);
    let remote = Arc::new(FailingRemote::new(remote_root.path(), 2));

    let src_dir = tempfile::tempdir().unwrap();
    let mut named = NamedCache::new();
    for (i, name) in ["a", "b", "c"].iter().enumerate() {
        let path = src_dir.path().join(name);
        tokio::fs::write(&path, format!("payload-{i}")).await.unwrap();
        let checksum = local.save(&path).await.unwrap();
        named.insert(checksum, *name);
    }

    let engine = TransferEngine::new(Arc::clone(&local), remote, Some(3), Arc::new(NoOpProgressReporter));
    let result = engine.push(&named).await;

    let err = result.expect_err("two of three uploads were configured to fail");
    assert!(matches!(err, CacheError::UploadError(2)), "expected UploadError(2), got {err:?}");

    let logger = NoOpLogger::new();
    let exit_code = result_to_exit_code(Err(err), &logger);
    assert_eq!(exit_code, ExitCode::TempFail);
    assert_eq!(exit_code.code(), 75);
}

/// S9: a file checksum and a directory checksum both survive a push to a
/// local-scheme remote followed by a pull into a second, independent
/// cache root.
#[tokio::test]
async fn push_then_pull_round_trips_file_and_directory_checksums_s9() {
    let push_root = tempfile::tempdir().unwrap();
    let pull_root = tempfile::tempdir().unwrap();
    let remote_root = tempfile::tempdir().unwrap();

    let push_side = Arc::new(new_local_cache(push_root.path()).await);
    let remote_for_push = Arc::new(LocalRemote::new(remote_root.path()));

    let src_dir = tempfile::tempdir().unwrap();
    let file_path = src_dir.path().join("tracked.bin");
    tokio::fs::write(&file_path, b"round trip me\n").await.unwrap();
    let file_checksum = push_side.save(&file_path).await.unwrap();

    tokio::fs::create_dir_all(src_dir.path().join("tree")).await.unwrap();
    tokio::fs::write(src_dir.path().join("tree/one"), b"1").await.unwrap();
    tokio::fs::write(src_dir.path().join("tree/two"), b"2").await.unwrap();
    let dir_checksum = push_side.save(src_dir.path().join("tree").as_path()).await.unwrap();
    assert!(dir_checksum.is_directory());

    let mut named = NamedCache::new();
    named.insert(file_checksum.clone(), "tracked.bin");
    named.insert(dir_checksum.clone(), "tree");

    // Expansion flattens the directory checksum into its manifest's child
    // file checksums; every member (already saved locally) is new to the
    // remote, so all four objects get pushed: the tracked file, the
    // manifest, and its two entries.
    let push_engine = TransferEngine::new(Arc::clone(&push_side), remote_for_push, Some(2), Arc::new(NoOpProgressReporter));
    push_engine.expand_named_cache(&mut named).await.unwrap();
    let pushed = push_engine.push(&named).await.unwrap();
    assert_eq!(pushed, 4, "the file, the directory manifest, and its two entries");

    let pull_side = Arc::new(new_local_cache(pull_root.path()).await);
    let remote_for_pull = Arc::new(LocalRemote::new(remote_root.path()));
    let pull_engine = TransferEngine::new(Arc::clone(&pull_side), remote_for_pull, Some(2), Arc::new(NoOpProgressReporter));

    let mut pull_named = NamedCache::new();
    pull_named.insert(file_checksum.clone(), "tracked.bin");
    pull_named.insert(dir_checksum.clone(), "tree");
    pull_engine.expand_named_cache(&mut pull_named).await.unwrap();

    // Expanding flattened the directory checksum's children into the
    // universe, so a fresh cache root with nothing local sees every member
    // (file, directory manifest, and its two entries) as `Deleted`.
    let fetched = pull_engine.fetch(&pull_named).await.unwrap();
    assert_eq!(fetched, 4, "the file, the directory manifest, and its two entries");

    let dest_file = pull_root.path().join("checked_out.bin");
    pull_side.checkout(&dest_file, &file_checksum).await.unwrap();
    assert_eq!(tokio::fs::read(&dest_file).await.unwrap(), b"round trip me\n");

    let dest_dir = pull_root.path().join("checked_out_tree");
    pull_side.checkout(&dest_dir, &dir_checksum).await.unwrap();
    assert_eq!(tokio::fs::read(dest_dir.join("one")).await.unwrap(), b"1");
    assert_eq!(tokio::fs::read(dest_dir.join("two")).await.unwrap(), b"2");
}
